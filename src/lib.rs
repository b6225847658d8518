//! # suiteboot
//!
//! Bootstrap for running an external test-framework runtime (PHPUnit) in an
//! isolated, deterministic environment.
//!
//! A launch happens in four steps:
//! 1. the raw command line is normalized and the launcher's own options are
//!    extracted ([`argv`]);
//! 2. shared host subsystems are replaced by isolated substitutes
//!    ([`sandbox`]);
//! 3. exactly one compatible runtime is located ([`locator`]);
//! 4. the final argument vector is assembled and control is handed to the
//!    runtime, whose exit code becomes the launcher's ([`dispatch`]).

pub mod argv;
pub mod dispatch;
pub mod error;
pub mod locator;
pub mod params;
pub mod sandbox;
pub mod version;

pub use argv::{normalize, Arity, ExtractedOptions, Normalized, OptionRegistry, OptionValue};
pub use dispatch::DispatchDefaults;
pub use error::{Error, Result};
pub use locator::{FrameworkCandidate, FrameworkLocator, IncludePath, LoadOutcome, LoadedFramework};
pub use params::LaunchParams;
pub use sandbox::{Sandbox, SandboxConfig};

use locator::Preloaded;
use std::path::PathBuf;
use tracing::info;

/// Option naming a directory to load the runtime from
pub const WITH_PHPUNITDIR: &str = "with-phpunitdir";

/// Option switching on the debug result listener
pub const DEBUG_TESTS: &str = "debug-tests";

/// Everything needed to hand control to the runtime
pub struct Prepared {
    /// Final argument vector, program name first
    pub argv: Vec<String>,
    /// Options the launcher consumed
    pub options: ExtractedOptions,
    /// The runtime that will receive `argv`
    pub framework: LoadedFramework,
    /// Environment the runtime runs in
    pub sandbox: Sandbox,
}

impl Prepared {
    /// Run the runtime and return its exit code
    pub fn dispatch(self) -> Result<i32> {
        dispatch::dispatch(&self.framework, &self.argv, &self.sandbox)
    }
}

fn prepare(argv: &[String], params: &LaunchParams) -> Result<Prepared> {
    let Normalized {
        forwardable,
        options,
    } = argv::normalize(argv, &params.registry)?;

    let sandbox = Sandbox::new_in(SandboxConfig::isolated(), params.scratch_root.as_deref())?;

    let mut include_path = params.include_path.clone();
    let override_dir = options.value(WITH_PHPUNITDIR).map(PathBuf::from);
    if let Some(dir) = &override_dir {
        info!("Will attempt loading PHPUnit from `{}`", dir.display());
        include_path.prepend(dir);
    }

    let candidates = locator::build_candidates(
        override_dir.as_deref(),
        &include_path,
        &params.runtime_names,
        &params.install_root,
    )?;
    let mut framework_locator = FrameworkLocator::new(&params.minimum_version);
    if let Some(framework) = &params.preloaded {
        framework_locator = framework_locator.strategy(Preloaded(framework.clone()));
    }
    let framework = framework_locator
        .candidates(candidates, &sandbox.env_vars)
        .locate()?;

    let defaults = DispatchDefaults {
        configuration: params.configuration().to_string_lossy().to_string(),
        include_path: include_path.joined_after(&params.suite_dir())?,
        listener: params.listener.clone(),
    };
    let argv = dispatch::assemble(&forwardable, &options, &defaults);

    Ok(Prepared {
        argv,
        options,
        framework,
        sandbox,
    })
}

/// Builder for configuring and running a launch
///
/// # Examples
///
/// ```no_run
/// use suiteboot::bootstrap;
///
/// let code = bootstrap::run(std::env::args())
///     .install_root("/srv/wiki")
///     .execute()
///     .unwrap();
/// std::process::exit(code);
/// ```
pub struct Launcher {
    argv: Vec<String>,
    params: LaunchParams,
}

impl Launcher {
    fn new<I, S>(argv: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            argv: argv.into_iter().map(Into::into).collect(),
            params: LaunchParams::new(),
        }
    }

    /// Replace all parameters at once
    pub fn params(mut self, params: LaunchParams) -> Self {
        self.params = params;
        self
    }

    /// Set the base installation path
    pub fn install_root(mut self, root: impl AsRef<std::path::Path>) -> Self {
        self.params = self.params.install_root(root);
        self
    }

    /// Set the include path used to resolve runtimes
    pub fn include_path(mut self, include_path: IncludePath) -> Self {
        self.params = self.params.include_path(include_path);
        self
    }

    /// Set the oldest accepted runtime version
    pub fn minimum_version(mut self, version: &str) -> Self {
        self.params = self.params.minimum_version(version);
        self
    }

    /// Use a runtime the caller already located
    pub fn preloaded(mut self, framework: LoadedFramework) -> Self {
        self.params = self.params.preloaded(framework);
        self
    }

    /// Normalize, sandbox, locate and assemble without running anything
    ///
    /// The runtime's `--version` probe is the only process started.
    pub fn prepare(self) -> Result<Prepared> {
        prepare(&self.argv, &self.params)
    }

    /// Prepare and hand control to the runtime
    ///
    /// # Returns
    /// The runtime's exit code, unchanged.
    pub fn execute(self) -> Result<i32> {
        self.prepare()?.dispatch()
    }
}

/// Entry point for launching a test run
pub mod bootstrap {
    use super::*;

    /// Create a launcher for a raw command line, program name first
    pub fn run<I, S>(argv: I) -> Launcher
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Launcher::new(argv)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn preloaded(version: &str) -> LoadedFramework {
        LoadedFramework {
            entry_point: PathBuf::from("/usr/bin/phpunit"),
            version: version.to_string(),
            source: "/usr/bin/phpunit".to_string(),
        }
    }

    #[test]
    fn test_prepare_with_preloaded_runtime() {
        let root = TempDir::new().unwrap();
        let prepared = bootstrap::run(["prog", "--reuse-db", "tests/FooTest.php"])
            .install_root(root.path())
            .include_path(IncludePath::new())
            .preloaded(preloaded("4.8.0"))
            .prepare()
            .unwrap();

        assert_eq!(prepared.framework.version, "4.8.0");
        assert!(prepared.options.is_set("reuse-db"));
        assert_eq!(prepared.argv[0], "prog");
        assert_eq!(prepared.argv[1], "--configuration");
        assert_eq!(
            PathBuf::from(&prepared.argv[2]),
            root.path().join("tests/phpunit/suite.xml")
        );
        assert_eq!(prepared.argv.last().map(String::as_str), Some("tests/FooTest.php"));
        assert!(!prepared.argv.contains(&"--reuse-db".to_string()));
    }

    #[test]
    fn test_configuration_error_stops_before_locating() {
        let result = bootstrap::run(["prog", "--wiki"])
            .preloaded(preloaded("4.8.0"))
            .prepare();
        assert!(matches!(result, Err(Error::Configuration { .. })));
    }

    #[test]
    fn test_old_preloaded_runtime_rejected() {
        let root = TempDir::new().unwrap();
        let result = bootstrap::run(["prog"])
            .install_root(root.path())
            .include_path(IncludePath::new())
            .preloaded(preloaded("3.6.0"))
            .prepare();
        assert!(matches!(result, Err(Error::IncompatibleVersion { .. })));
    }

    #[test]
    fn test_empty_command_line_rejected() {
        let result = bootstrap::run(Vec::<String>::new())
            .preloaded(preloaded("4.8.0"))
            .prepare();
        match result {
            Err(err @ Error::Configuration { .. }) => assert_eq!(err.exit_code(), 2),
            other => panic!("expected configuration error, got {:?}", other.err()),
        }
    }

    #[test]
    fn test_prepared_services_intercept_mail() {
        use crate::sandbox::{MailMessage, MailStatus, Mailer};

        let root = TempDir::new().unwrap();
        let prepared = bootstrap::run(["prog"])
            .install_root(root.path())
            .include_path(IncludePath::new())
            .preloaded(preloaded("4.8.0"))
            .prepare()
            .unwrap();

        let mailer = &prepared.sandbox.services.mailer;
        let message = MailMessage {
            to: "admin@example.org".to_string(),
            subject: "Test run".to_string(),
            body: String::new(),
        };
        assert_eq!(mailer.send(&message), MailStatus::NotSent);
        assert_eq!(mailer.suppressed(), 1);
    }
}
