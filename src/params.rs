//! Configuration parameters for a launch

use crate::argv::OptionRegistry;
use crate::locator::{IncludePath, LoadedFramework, DEFAULT_RUNTIME_NAMES};
use crate::version::MINIMUM_VERSION;
use std::path::{Path, PathBuf};

/// Environment variable naming the base installation path
pub const INSTALL_PATH_VAR: &str = "MW_INSTALL_PATH";

/// Environment variable holding the current include path
pub const INCLUDE_PATH_VAR: &str = "PHP_INCLUDE_PATH";

/// Listener injected with `--printer` when `--debug-tests` is given
pub const DEFAULT_LISTENER: &str = "MediaWikiPHPUnitTestListener";

/// Configuration parameters for a launch
#[derive(Debug, Clone)]
pub struct LaunchParams {
    /// Base installation path established by the host
    pub install_root: PathBuf,
    suite_dir: Option<PathBuf>,
    configuration: Option<PathBuf>,
    /// Directories used to resolve runtime names
    pub include_path: IncludePath,
    /// Listener injected in debug mode
    pub listener: String,
    /// Oldest accepted runtime version
    pub minimum_version: String,
    /// Runtime file names, in priority order
    pub runtime_names: Vec<String>,
    /// Options extracted from the command line
    pub registry: OptionRegistry,
    /// Runtime tried before any candidate
    pub preloaded: Option<LoadedFramework>,
    /// Parent directory for the sandbox scratch directory
    pub scratch_root: Option<PathBuf>,
}

impl LaunchParams {
    /// Create params from the host environment
    ///
    /// Reads `MW_INSTALL_PATH` (default: current directory) and
    /// `PHP_INCLUDE_PATH` (default: `.`).
    pub fn new() -> Self {
        let install_root = std::env::var_os(INSTALL_PATH_VAR)
            .map(PathBuf::from)
            .or_else(|| std::env::current_dir().ok())
            .unwrap_or_else(|| PathBuf::from("."));
        let include_path = std::env::var_os(INCLUDE_PATH_VAR)
            .map(|value| IncludePath::parse(&value))
            .unwrap_or_else(|| IncludePath::from_dirs(["."]));

        LaunchParams {
            install_root,
            suite_dir: None,
            configuration: None,
            include_path,
            listener: DEFAULT_LISTENER.to_string(),
            minimum_version: MINIMUM_VERSION.to_string(),
            runtime_names: DEFAULT_RUNTIME_NAMES.iter().map(|s| s.to_string()).collect(),
            registry: OptionRegistry::standard(),
            preloaded: None,
            scratch_root: None,
        }
    }

    /// Directory holding the suite definition and the launcher's own files
    pub fn suite_dir(&self) -> PathBuf {
        self.suite_dir
            .clone()
            .unwrap_or_else(|| self.install_root.join("tests").join("phpunit"))
    }

    /// Suite definition injected with `--configuration`
    pub fn configuration(&self) -> PathBuf {
        self.configuration
            .clone()
            .unwrap_or_else(|| self.suite_dir().join("suite.xml"))
    }

    pub fn install_root(mut self, root: impl AsRef<Path>) -> Self {
        self.install_root = root.as_ref().to_path_buf();
        self
    }

    pub fn with_suite_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.suite_dir = Some(dir.as_ref().to_path_buf());
        self
    }

    pub fn with_configuration(mut self, path: impl AsRef<Path>) -> Self {
        self.configuration = Some(path.as_ref().to_path_buf());
        self
    }

    pub fn include_path(mut self, include_path: IncludePath) -> Self {
        self.include_path = include_path;
        self
    }

    pub fn listener(mut self, listener: &str) -> Self {
        self.listener = listener.to_string();
        self
    }

    pub fn minimum_version(mut self, version: &str) -> Self {
        self.minimum_version = version.to_string();
        self
    }

    pub fn runtime_names(mut self, names: &[&str]) -> Self {
        self.runtime_names = names.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn registry(mut self, registry: OptionRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Use a runtime the caller already located
    pub fn preloaded(mut self, framework: LoadedFramework) -> Self {
        self.preloaded = Some(framework);
        self
    }

    pub fn scratch_root(mut self, root: impl AsRef<Path>) -> Self {
        self.scratch_root = Some(root.as_ref().to_path_buf());
        self
    }
}

impl Default for LaunchParams {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paths_follow_install_root() {
        let params = LaunchParams::new().install_root("/srv/wiki");
        assert_eq!(params.suite_dir(), PathBuf::from("/srv/wiki/tests/phpunit"));
        assert_eq!(
            params.configuration(),
            PathBuf::from("/srv/wiki/tests/phpunit/suite.xml")
        );
    }

    #[test]
    fn test_explicit_paths_win() {
        let params = LaunchParams::new()
            .install_root("/srv/wiki")
            .with_suite_dir("/opt/suite")
            .with_configuration("/etc/phpunit.xml");
        assert_eq!(params.suite_dir(), PathBuf::from("/opt/suite"));
        assert_eq!(params.configuration(), PathBuf::from("/etc/phpunit.xml"));
    }

    #[test]
    fn test_defaults() {
        let params = LaunchParams::new();
        assert_eq!(params.listener, DEFAULT_LISTENER);
        assert_eq!(params.minimum_version, "3.7.0");
        assert_eq!(params.runtime_names[0], "phpunit.phar");
        assert!(params.registry.lookup("--with-phpunitdir").is_some());
        assert!(params.preloaded.is_none());
    }
}
