//! Error types for suiteboot

use thiserror::Error;

/// Result type alias for bootstrap operations
pub type Result<T> = std::result::Result<T, Error>;

/// Exit code for a malformed command line
pub const EXIT_CONFIGURATION: i32 = 2;

/// Exit code for every other launcher failure
pub const EXIT_FAILURE: i32 = 1;

/// Main error type for bootstrap operations
#[derive(Error, Debug)]
pub enum Error {
    /// Regex error
    #[error("Regex error: {0}")]
    Regex(#[from] regex::Error),
    /// IO error occurred
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed command line
    #[error("Invalid option '{option}': {message}")]
    Configuration { option: String, message: String },

    /// No candidate produced a usable runtime
    #[error("Couldn't find a usable PHPUnit.")]
    FrameworkNotFound { searched: Vec<String> },

    /// The runtime that loaded is older than the supported minimum
    #[error("PHPUnit {minimum} or later required; you have {found}.")]
    IncompatibleVersion { found: String, minimum: String },

    /// Generic error with message
    #[error("{0}")]
    Generic(String),
}

impl Error {
    /// Create a configuration error
    pub fn configuration(option: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Configuration {
            option: option.into(),
            message: message.into(),
        }
    }

    /// Process exit code reported when this error aborts the run
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::Configuration { .. } => EXIT_CONFIGURATION,
            _ => EXIT_FAILURE,
        }
    }
}
