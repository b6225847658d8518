use anyhow::{Context, Result};
use std::process;
use suiteboot::{bootstrap, error::EXIT_FAILURE, OptionRegistry};

fn collect_argv() -> Result<Vec<String>> {
    std::env::args_os()
        .enumerate()
        .map(|(position, arg)| {
            arg.into_string().map_err(|arg| {
                suiteboot::Error::configuration(
                    arg.to_string_lossy(),
                    format!("argument {} is not valid UTF-8", position),
                )
            })
        })
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(Into::into)
}

fn run() -> Result<i32> {
    let argv = collect_argv()?;
    let code = bootstrap::run(argv)
        .execute()
        .context("PHPUnit launch failed")?;
    Ok(code)
}

fn main() {
    // Initialize tracing based on RUST_LOG env var, progress output by default
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .init();

    match run() {
        Ok(code) => process::exit(code),
        Err(err) => {
            let launch_error = err.downcast_ref::<suiteboot::Error>();
            match launch_error {
                Some(configuration @ suiteboot::Error::Configuration { .. }) => {
                    eprintln!("{}", configuration);
                    eprintln!("\nLauncher options:\n{}", OptionRegistry::standard().usage());
                }
                Some(launch_error) => eprintln!("{}", launch_error),
                None => eprintln!("{:#}", err),
            }
            process::exit(launch_error.map_or(EXIT_FAILURE, suiteboot::Error::exit_code));
        }
    }
}
