//! Isolation of the shared host subsystems for a test run

pub mod config;
pub mod services;

pub use config::SandboxConfig;
pub use services::{
    HashCache, Job, MailMessage, MailStatus, Mailer, MemoryJobQueue, NullCache,
    NullLocalisationStore, NullMailer, ObjectCache, Services,
};

use crate::error::Result;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::process::Command;
use tempfile::TempDir;
use tracing::debug;

/// The isolated environment of a single test run
///
/// Holds the override set, the substitutes built from it and a scratch
/// directory that replaces the host's temporary directory. The scratch
/// directory is removed when the sandbox is dropped.
///
/// A runtime started as a separate process only sees [`Sandbox::env_vars`].
/// The in-process substitutes in [`Sandbox::services`] are for a host that
/// embeds the launcher and runs jobs, cache lookups or mail through them.
pub struct Sandbox {
    config: SandboxConfig,
    /// In-process substitutes for the host subsystems
    pub services: Services,
    /// Environment variables applied to the framework process
    pub env_vars: BTreeMap<String, String>,
    /// Scratch directory handed to the framework as its temp dir
    pub scratch_dir: PathBuf,
    _temp_dir: TempDir,
}

impl Sandbox {
    /// Build a sandbox with a scratch directory under the system temp dir
    pub fn new(config: SandboxConfig) -> Result<Self> {
        Self::new_in(config, None)
    }

    /// Build a sandbox with its scratch directory under `root`
    pub fn new_in(config: SandboxConfig, root: Option<&Path>) -> Result<Self> {
        let temp_dir = match root {
            Some(root) => tempfile::Builder::new().prefix("suiteboot").tempdir_in(root)?,
            None => tempfile::Builder::new().prefix("suiteboot").tempdir()?,
        };
        let scratch_dir = temp_dir.path().to_path_buf();

        let mut env_vars = config.to_env();
        let scratch = scratch_dir.to_string_lossy().to_string();
        env_vars.insert("TMPDIR".to_string(), scratch.clone());
        env_vars.insert("TMP".to_string(), scratch.clone());
        env_vars.insert("TEMP".to_string(), scratch);

        let services = Services::from_config(&config);
        debug!(scratch = %scratch_dir.display(), vars = env_vars.len(), "sandbox installed");

        Ok(Sandbox {
            config,
            services,
            env_vars,
            scratch_dir,
            _temp_dir: temp_dir,
        })
    }

    pub fn config(&self) -> &SandboxConfig {
        &self.config
    }

    /// Apply the sandbox environment to a framework command
    pub fn apply(&self, command: &mut Command) {
        command.envs(&self.env_vars);
    }
}
