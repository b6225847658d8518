//! Discovery of the test-framework runtime
//!
//! The locator walks an ordered list of [`LoaderStrategy`] values and stops
//! at the first one that yields a runtime. The list is usually built from
//! [`FrameworkCandidate`]s: files in the `--with-phpunitdir` override
//! directory first, then runtimes resolvable through the include path, then
//! the install's own `vendor/bin/phpunit`.

use crate::error::{Error, Result};
use crate::version::{parse_banner, satisfies_minimum, DEVELOPMENT_VERSION};
use regex::Regex;
use std::collections::BTreeMap;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

/// Runtime file names searched for, in priority order
pub const DEFAULT_RUNTIME_NAMES: &[&str] = &["phpunit.phar", "phpunit-old.phar", "phpunit"];

/// Ordered list of directories used to resolve relative runtime names
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IncludePath {
    dirs: Vec<PathBuf>,
}

impl IncludePath {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a platform path list (`:`-separated on unix)
    pub fn parse(value: &OsStr) -> Self {
        IncludePath {
            dirs: std::env::split_paths(value)
                .filter(|dir| !dir.as_os_str().is_empty())
                .collect(),
        }
    }

    pub fn from_dirs<I, P>(dirs: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        IncludePath {
            dirs: dirs.into_iter().map(Into::into).collect(),
        }
    }

    /// Give a directory precedence over every existing entry
    pub fn prepend(&mut self, dir: impl Into<PathBuf>) {
        self.dirs.insert(0, dir.into());
    }

    pub fn dirs(&self) -> &[PathBuf] {
        &self.dirs
    }

    /// First directory entry that contains `file_name` as a regular file
    pub fn resolve(&self, file_name: &str) -> Option<PathBuf> {
        self.dirs
            .iter()
            .map(|dir| dir.join(file_name))
            .find(|path| path.is_file())
    }

    /// Render `first` followed by every entry as a platform path list
    pub fn joined_after(&self, first: &Path) -> Result<String> {
        let joined = std::env::join_paths(
            std::iter::once(first).chain(self.dirs.iter().map(PathBuf::as_path)),
        )
        .map_err(|e| Error::Generic(format!("Cannot build include path: {}", e)))?;
        Ok(joined.to_string_lossy().to_string())
    }
}

/// A location that may hold a runtime
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameworkCandidate {
    pub location: PathBuf,
    /// Lower values are tried first
    pub priority: usize,
}

/// A runtime that loaded successfully
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadedFramework {
    /// Executable that receives the final argument vector
    pub entry_point: PathBuf,
    /// Version reported by the runtime
    pub version: String,
    /// Human-readable origin, used in progress output
    pub source: String,
}

/// Result of one load attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadOutcome {
    Loaded(LoadedFramework),
    NotFound,
}

/// One way of obtaining a runtime
pub trait LoaderStrategy {
    /// Short description used in diagnostics
    fn describe(&self) -> String;
    fn load(&self) -> LoadOutcome;
}

/// A runtime the caller already holds
#[derive(Debug, Clone)]
pub struct Preloaded(pub LoadedFramework);

impl LoaderStrategy for Preloaded {
    fn describe(&self) -> String {
        "preloaded runtime".to_string()
    }

    fn load(&self) -> LoadOutcome {
        info!("PHPUnit already present");
        LoadOutcome::Loaded(self.0.clone())
    }
}

/// Loads an executable candidate by asking it for its version
#[derive(Debug, Clone)]
pub struct ExecutableLoader {
    pub candidate: FrameworkCandidate,
    /// Environment the version probe runs with
    pub env: BTreeMap<String, String>,
}

impl ExecutableLoader {
    pub fn new(candidate: FrameworkCandidate) -> Self {
        ExecutableLoader {
            candidate,
            env: BTreeMap::new(),
        }
    }
}

impl LoaderStrategy for ExecutableLoader {
    fn describe(&self) -> String {
        self.candidate.location.display().to_string()
    }

    fn load(&self) -> LoadOutcome {
        let location = &self.candidate.location;
        if !location.is_file() {
            debug!(candidate = %location.display(), "candidate does not exist");
            return LoadOutcome::NotFound;
        }

        let output = match Command::new(location)
            .arg("--version")
            .envs(&self.env)
            .stdin(Stdio::null())
            .output()
        {
            Ok(output) => output,
            Err(e) => {
                debug!(candidate = %location.display(), error = %e, "candidate failed to start");
                return LoadOutcome::NotFound;
            }
        };

        let banner = format!(
            "{}\n{}",
            String::from_utf8_lossy(&output.stdout),
            String::from_utf8_lossy(&output.stderr)
        );
        match parse_banner(&banner) {
            Some(version) => LoadOutcome::Loaded(LoadedFramework {
                entry_point: location.clone(),
                version,
                source: location.display().to_string(),
            }),
            None => {
                debug!(candidate = %location.display(), "candidate reported no version");
                LoadOutcome::NotFound
            }
        }
    }
}

/// Files in the override directory named like a runtime
///
/// The directory may hold a runtime archive directly or a full checkout, so
/// one level of subdirectories is searched as well. Symlinks are followed;
/// entries that cannot be read are skipped.
fn scan_override_dir(dir: &Path, runtime_names: &[String]) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        warn!("Override directory {} does not exist", dir.display());
        return Ok(Vec::new());
    }

    let alternatives = runtime_names
        .iter()
        .map(|name| regex::escape(name))
        .collect::<Vec<_>>()
        .join("|");
    let regex = Regex::new(&format!("^(?:{})$", alternatives))?;

    let mut found = Vec::new();
    let walker = WalkDir::new(dir).min_depth(1).max_depth(2).follow_links(true);
    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!("Skipping unreadable entry in {}: {}", dir.display(), e);
                continue;
            }
        };
        if !entry.path().is_file() {
            continue;
        }
        if let Some(file_name) = entry.file_name().to_str() {
            if regex.is_match(file_name) {
                let rank = runtime_names
                    .iter()
                    .position(|name| name == file_name)
                    .unwrap_or(runtime_names.len());
                found.push((rank, entry.depth(), entry.path().to_path_buf()));
            }
        }
    }

    found.sort();
    Ok(found.into_iter().map(|(_, _, path)| path).collect())
}

/// Build the ordered candidate list
pub fn build_candidates(
    override_dir: Option<&Path>,
    include_path: &IncludePath,
    runtime_names: &[String],
    install_root: &Path,
) -> Result<Vec<FrameworkCandidate>> {
    let mut locations = Vec::new();

    if let Some(dir) = override_dir {
        locations.extend(scan_override_dir(dir, runtime_names)?);
    }
    locations.extend(
        runtime_names
            .iter()
            .filter_map(|name| include_path.resolve(name)),
    );
    locations.push(install_root.join("vendor").join("bin").join("phpunit"));

    let mut candidates: Vec<FrameworkCandidate> = Vec::new();
    for location in locations {
        if candidates.iter().any(|c| c.location == location) {
            continue;
        }
        candidates.push(FrameworkCandidate {
            location,
            priority: candidates.len(),
        });
    }
    Ok(candidates)
}

/// Reject runtimes older than `minimum`
pub fn check_version(version: &str, minimum: &str) -> Result<()> {
    if version == DEVELOPMENT_VERSION {
        debug!("development runtime, version check skipped");
        return Ok(());
    }
    if satisfies_minimum(version, minimum) {
        Ok(())
    } else {
        Err(Error::IncompatibleVersion {
            found: version.to_string(),
            minimum: minimum.to_string(),
        })
    }
}

/// Finds exactly one usable runtime
pub struct FrameworkLocator {
    strategies: Vec<Box<dyn LoaderStrategy>>,
    minimum_version: String,
}

impl FrameworkLocator {
    pub fn new(minimum_version: impl Into<String>) -> Self {
        FrameworkLocator {
            strategies: Vec::new(),
            minimum_version: minimum_version.into(),
        }
    }

    /// Append a strategy; strategies run in insertion order
    pub fn strategy(mut self, strategy: impl LoaderStrategy + 'static) -> Self {
        self.strategies.push(Box::new(strategy));
        self
    }

    /// Append one executable loader per candidate, by ascending priority
    ///
    /// Version probes run with `env` applied, so no runtime code executes
    /// outside the sandbox.
    pub fn candidates(
        mut self,
        mut candidates: Vec<FrameworkCandidate>,
        env: &BTreeMap<String, String>,
    ) -> Self {
        candidates.sort_by_key(|candidate| candidate.priority);
        for candidate in candidates {
            self.strategies.push(Box::new(ExecutableLoader {
                candidate,
                env: env.clone(),
            }));
        }
        self
    }

    pub fn len(&self) -> usize {
        self.strategies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strategies.is_empty()
    }

    /// Load the first available runtime and apply the version gate
    ///
    /// # Errors
    /// [`Error::FrameworkNotFound`] when no strategy loads,
    /// [`Error::IncompatibleVersion`] when the runtime is too old.
    pub fn locate(&self) -> Result<LoadedFramework> {
        let mut searched = Vec::new();
        let loaded = self.strategies.iter().find_map(|strategy| {
            searched.push(strategy.describe());
            match strategy.load() {
                LoadOutcome::Loaded(framework) => Some(framework),
                LoadOutcome::NotFound => None,
            }
        });

        let Some(framework) = loaded else {
            debug!(?searched, "no candidate loaded");
            return Err(Error::FrameworkNotFound { searched });
        };
        info!("Using PHPUnit from {}", framework.source);
        check_version(&framework.version, &self.minimum_version)?;
        Ok(framework)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::fs;
    use std::rc::Rc;
    use tempfile::TempDir;

    struct Fixed {
        name: &'static str,
        version: Option<&'static str>,
        calls: Rc<Cell<usize>>,
    }

    impl LoaderStrategy for Fixed {
        fn describe(&self) -> String {
            self.name.to_string()
        }

        fn load(&self) -> LoadOutcome {
            self.calls.set(self.calls.get() + 1);
            match self.version {
                Some(version) => LoadOutcome::Loaded(LoadedFramework {
                    entry_point: PathBuf::from(self.name),
                    version: version.to_string(),
                    source: self.name.to_string(),
                }),
                None => LoadOutcome::NotFound,
            }
        }
    }

    fn fixed(name: &'static str, version: Option<&'static str>) -> (Fixed, Rc<Cell<usize>>) {
        let calls = Rc::new(Cell::new(0));
        (
            Fixed {
                name,
                version,
                calls: calls.clone(),
            },
            calls,
        )
    }

    fn names() -> Vec<String> {
        DEFAULT_RUNTIME_NAMES.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_stops_at_first_loaded() {
        let (missing, missing_calls) = fixed("missing", None);
        let (first, first_calls) = fixed("first", Some("3.8.0"));
        let (second, second_calls) = fixed("second", Some("4.0.0"));

        let framework = FrameworkLocator::new("3.7.0")
            .strategy(missing)
            .strategy(first)
            .strategy(second)
            .locate()
            .unwrap();

        assert_eq!(framework.source, "first");
        assert_eq!(missing_calls.get(), 1);
        assert_eq!(first_calls.get(), 1);
        assert_eq!(second_calls.get(), 0);
    }

    #[test]
    fn test_nothing_loads() {
        let (a, _) = fixed("a", None);
        let (b, _) = fixed("b", None);
        let result = FrameworkLocator::new("3.7.0").strategy(a).strategy(b).locate();
        match result {
            Err(Error::FrameworkNotFound { searched }) => assert_eq!(searched, vec!["a", "b"]),
            other => panic!("expected FrameworkNotFound, got {:?}", other),
        }
    }

    #[test]
    fn test_empty_locator() {
        let locator = FrameworkLocator::new("3.7.0");
        assert!(locator.is_empty());
        assert!(matches!(
            locator.locate(),
            Err(Error::FrameworkNotFound { .. })
        ));
    }

    #[test]
    fn test_too_old_is_rejected() {
        let (old, _) = fixed("old", Some("1.0.0"));
        let result = FrameworkLocator::new("3.7.0").strategy(old).locate();
        match result {
            Err(Error::IncompatibleVersion { found, minimum }) => {
                assert_eq!(found, "1.0.0");
                assert_eq!(minimum, "3.7.0");
            }
            other => panic!("expected IncompatibleVersion, got {:?}", other),
        }
    }

    #[test]
    fn test_development_sentinel_skips_gate() {
        let (dev, _) = fixed("dev", Some(DEVELOPMENT_VERSION));
        let framework = FrameworkLocator::new("99.0.0").strategy(dev).locate().unwrap();
        assert_eq!(framework.version, DEVELOPMENT_VERSION);
    }

    #[test]
    fn test_preloaded_wins() {
        let preloaded = LoadedFramework {
            entry_point: PathBuf::from("/usr/bin/phpunit"),
            version: "5.7.27".to_string(),
            source: "host".to_string(),
        };
        let (other, other_calls) = fixed("other", Some("4.0.0"));
        let framework = FrameworkLocator::new("3.7.0")
            .strategy(Preloaded(preloaded.clone()))
            .strategy(other)
            .locate()
            .unwrap();
        assert_eq!(framework, preloaded);
        assert_eq!(other_calls.get(), 0);
    }

    #[test]
    fn test_missing_executable_is_not_found() {
        let loader = ExecutableLoader::new(FrameworkCandidate {
            location: PathBuf::from("/nonexistent/phpunit.phar"),
            priority: 0,
        });
        assert_eq!(loader.load(), LoadOutcome::NotFound);
    }

    #[test]
    fn test_include_path_resolution() {
        let first = TempDir::new().unwrap();
        let second = TempDir::new().unwrap();
        fs::write(second.path().join("phpunit.phar"), "").unwrap();

        let include_path = IncludePath::from_dirs([first.path(), second.path()]);
        assert_eq!(
            include_path.resolve("phpunit.phar"),
            Some(second.path().join("phpunit.phar"))
        );
        assert_eq!(include_path.resolve("phpunit-old.phar"), None);
    }

    #[test]
    fn test_include_path_parse_and_join() {
        let parsed = IncludePath::parse(OsStr::new(""));
        assert!(parsed.dirs().is_empty());

        let include_path = IncludePath::from_dirs(["/usr/share/php"]);
        let joined = include_path.joined_after(Path::new("/srv/wiki/tests/phpunit")).unwrap();
        let expected = std::env::join_paths(["/srv/wiki/tests/phpunit", "/usr/share/php"]).unwrap();
        assert_eq!(joined, expected.to_string_lossy());
    }

    #[test]
    fn test_candidate_order() {
        let override_dir = TempDir::new().unwrap();
        let include_dir = TempDir::new().unwrap();
        let install_root = TempDir::new().unwrap();

        fs::create_dir(override_dir.path().join("checkout")).unwrap();
        fs::write(override_dir.path().join("checkout/phpunit"), "").unwrap();
        fs::write(override_dir.path().join("phpunit-old.phar"), "").unwrap();
        fs::write(override_dir.path().join("README"), "").unwrap();
        fs::write(include_dir.path().join("phpunit.phar"), "").unwrap();

        let mut include_path = IncludePath::from_dirs([include_dir.path()]);
        include_path.prepend(override_dir.path());

        let candidates = build_candidates(
            Some(override_dir.path()),
            &include_path,
            &names(),
            install_root.path(),
        )
        .unwrap();

        let locations: Vec<PathBuf> = candidates.iter().map(|c| c.location.clone()).collect();
        assert_eq!(
            locations,
            vec![
                override_dir.path().join("phpunit-old.phar"),
                override_dir.path().join("checkout/phpunit"),
                include_dir.path().join("phpunit.phar"),
                install_root.path().join("vendor/bin/phpunit"),
            ]
        );
        let priorities: Vec<usize> = candidates.iter().map(|c| c.priority).collect();
        assert_eq!(priorities, vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_missing_override_dir_is_skipped() {
        let install_root = TempDir::new().unwrap();
        let candidates = build_candidates(
            Some(Path::new("/nonexistent/phpunit-dir")),
            &IncludePath::new(),
            &names(),
            install_root.path(),
        )
        .unwrap();
        assert_eq!(candidates.len(), 1);
    }
}
