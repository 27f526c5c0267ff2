//! Error types for the statistics pipeline.
//!
//! Library modules return [`StatError`]; the binary wraps it in
//! `anyhow` at the edges.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while reading and reducing simulation output.
#[derive(Error, Debug)]
pub enum StatError {
    /// File could not be opened or read
    #[error("I/O failure on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Malformed numeric token, table shape or directory name
    #[error("Parse failure in {context}: {reason}")]
    Parse { context: String, reason: String },

    /// Caller supplied an unusable parameter
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Division by zero or an undefined value in a formula
    #[error("Degenerate arithmetic: {0}")]
    Degenerate(String),

    /// A quantity or field required by a derivation is absent
    #[error("Missing key: {0}")]
    MissingKey(String),
}

impl StatError {
    /// Build a parse failure with location context.
    pub fn parse(context: impl Into<String>, reason: impl Into<String>) -> Self {
        StatError::Parse {
            context: context.into(),
            reason: reason.into(),
        }
    }

    /// Whether the pipeline may skip the offending file and continue.
    ///
    /// Invalid parameters indicate a configuration mistake and abort the run.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, StatError::InvalidParameter(_))
    }
}

/// Result alias used across the library modules.
pub type StatResult<T> = std::result::Result<T, StatError>;
