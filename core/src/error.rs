//! Error types for s3harness-core

use thiserror::Error;

use crate::config::ConfigError;
use crate::verify::VerificationFailure;

/// Core error type
#[derive(Error, Debug)]
pub enum HarnessError {
    /// Invalid configuration values
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Configuration file could not be parsed
    #[error("failed to parse configuration file: {0}")]
    ConfigParse(#[from] toml::de::Error),

    /// A builder was finished without a required field
    #[error("missing required configuration: {0}")]
    MissingConfig(&'static str),

    /// The external command could not be started
    #[error("failed to spawn `{command}`: {source}")]
    Spawn {
        /// Command line that failed to start
        command: String,
        /// Underlying OS error
        #[source]
        source: std::io::Error,
    },

    /// A must-find / must-not-find regex did not compile
    #[error("invalid pattern `{pattern}`: {source}")]
    Pattern {
        /// Pattern source as declared by the caller
        pattern: String,
        /// Compilation error
        #[source]
        source: regex::Error,
    },

    /// Exit code or output assertion failed
    #[error(transparent)]
    Verification(Box<VerificationFailure>),

    /// `mb` reported success but the bucket is not listed
    #[error("bucket `{0}` was created but does not show up in the listing")]
    BucketNotListed(String),

    /// A load worker thread panicked instead of returning
    #[error("worker `{0}` panicked")]
    WorkerPanicked(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl HarnessError {
    /// Error for a builder field that was never set
    pub fn missing_config(field: &'static str) -> Self {
        Self::MissingConfig(field)
    }

    /// Whether this error is an assertion failure (as opposed to plumbing)
    pub fn is_verification(&self) -> bool {
        matches!(self, Self::Verification(_))
    }

    /// The assertion failure, if this is one
    pub fn as_verification(&self) -> Option<&VerificationFailure> {
        match self {
            Self::Verification(failure) => Some(failure),
            _ => None,
        }
    }
}

impl From<VerificationFailure> for HarnessError {
    fn from(failure: VerificationFailure) -> Self {
        Self::Verification(Box::new(failure))
    }
}

/// Result type alias
pub type HarnessResult<T> = std::result::Result<T, HarnessError>;
