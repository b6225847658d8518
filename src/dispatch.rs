//! Final argument assembly and hand-off to the runtime

use crate::argv::ExtractedOptions;
use crate::error::Result;
use crate::locator::LoadedFramework;
use crate::sandbox::Sandbox;
use std::process::Command;
use tracing::{debug, info};

pub const CONFIGURATION_FLAG: &str = "--configuration";
pub const INCLUDE_PATH_FLAG: &str = "--include-path";
pub const PRINTER_FLAG: &str = "--printer";

/// Values injected when the caller did not supply them
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchDefaults {
    /// Suite definition passed with `--configuration`
    pub configuration: String,
    /// Value passed with `--include-path`
    pub include_path: String,
    /// Result listener passed with `--printer` in debug mode
    pub listener: String,
}

fn has_flag(argv: &[String], flag: &str) -> bool {
    argv.iter().skip(1).any(|arg| arg == flag)
}

/// Build the vector handed to the runtime
///
/// Missing `--printer` (only with `--debug-tests`), `--configuration` and
/// `--include-path` flags are inserted right after the program name, in that
/// order. A flag the caller supplied is never replaced.
pub fn assemble(
    forwardable: &[String],
    options: &ExtractedOptions,
    defaults: &DispatchDefaults,
) -> Vec<String> {
    let mut injected = Vec::new();

    if options.is_set(crate::DEBUG_TESTS) && !has_flag(forwardable, PRINTER_FLAG) {
        injected.push(PRINTER_FLAG.to_string());
        injected.push(defaults.listener.clone());
    }
    if !has_flag(forwardable, CONFIGURATION_FLAG) {
        injected.push(CONFIGURATION_FLAG.to_string());
        injected.push(defaults.configuration.clone());
    }
    if !has_flag(forwardable, INCLUDE_PATH_FLAG) {
        injected.push(INCLUDE_PATH_FLAG.to_string());
        injected.push(defaults.include_path.clone());
    }

    forwardable
        .iter()
        .take(1)
        .cloned()
        .chain(injected)
        .chain(forwardable.iter().skip(1).cloned())
        .collect()
}

/// Run the runtime with `argv` inside the sandbox and return its exit code
///
/// `argv[0]` is the launcher's program name and is not passed on. The code is
/// returned unchanged; a runtime killed by a signal reports 1.
pub fn dispatch(framework: &LoadedFramework, argv: &[String], sandbox: &Sandbox) -> Result<i32> {
    let mut command = Command::new(&framework.entry_point);
    command.args(argv.iter().skip(1));
    sandbox.apply(&mut command);

    debug!(entry_point = %framework.entry_point.display(), args = ?argv, "dispatching");
    let status = command.status()?;
    info!(version = %framework.version, %status, "PHPUnit finished");

    Ok(status.code().unwrap_or(crate::error::EXIT_FAILURE))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::argv::OptionValue;

    fn args(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn defaults() -> DispatchDefaults {
        DispatchDefaults {
            configuration: "/srv/wiki/tests/phpunit/suite.xml".to_string(),
            include_path: "/srv/wiki/tests/phpunit:.".to_string(),
            listener: "MediaWikiPHPUnitTestListener".to_string(),
        }
    }

    #[test]
    fn test_injects_missing_defaults() {
        let argv = assemble(
            &args(&["prog", "tests/FooTest.php"]),
            &ExtractedOptions::default(),
            &defaults(),
        );
        assert_eq!(
            argv,
            args(&[
                "prog",
                "--configuration",
                "/srv/wiki/tests/phpunit/suite.xml",
                "--include-path",
                "/srv/wiki/tests/phpunit:.",
                "tests/FooTest.php",
            ])
        );
    }

    #[test]
    fn test_never_overrides_caller_flags() {
        let forwardable = args(&[
            "prog",
            "--configuration",
            "custom.xml",
            "--include-path",
            "/custom",
        ]);
        let argv = assemble(&forwardable, &ExtractedOptions::default(), &defaults());
        assert_eq!(argv, forwardable);
    }

    #[test]
    fn test_printer_only_in_debug_mode() {
        let mut options = ExtractedOptions::default();
        let argv = assemble(&args(&["prog"]), &options, &defaults());
        assert!(!argv.contains(&"--printer".to_string()));

        options.insert("debug-tests", OptionValue::Flag);
        let argv = assemble(&args(&["prog"]), &options, &defaults());
        assert_eq!(&argv[1..3], &args(&["--printer", "MediaWikiPHPUnitTestListener"])[..]);
    }

    #[test]
    fn test_caller_printer_kept_in_debug_mode() {
        let mut options = ExtractedOptions::default();
        options.insert("debug-tests", OptionValue::Flag);
        let argv = assemble(
            &args(&["prog", "--printer", "MyPrinter"]),
            &options,
            &defaults(),
        );
        assert_eq!(argv.iter().filter(|a| *a == "--printer").count(), 1);
        assert!(argv.ends_with(&args(&["--printer", "MyPrinter"])));
    }

    #[test]
    fn test_program_name_is_not_a_flag() {
        let argv = assemble(
            &args(&["--configuration"]),
            &ExtractedOptions::default(),
            &defaults(),
        );
        assert_eq!(argv[0], "--configuration");
        assert_eq!(argv[1], "--configuration");
        assert_eq!(argv.len(), 5);
    }
}
