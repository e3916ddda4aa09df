//! Error Types
//!
//! Batch-level errors surfaced to callers. Failures local to a single unit
//! never show up here; they are converted into a [`UnitResult`] instead.
//!
//! [`UnitResult`]: crate::execution::UnitResult

use thiserror::Error;

/// Errors that abort a whole scan or batch.
#[derive(Debug, Error)]
pub enum SmokeError {
    /// Bad batch parameters or malformed user input. No units run.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// A global setting directive carried a value that could not be used.
    #[error("Invalid setting '{name}' on line {line}: '{value}'")]
    InvalidSetting {
        name: String,
        value: String,
        line: usize,
    },

    /// The worker pool could not be started or was interrupted.
    #[error("Engine failure: {0}")]
    EngineFailure(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl SmokeError {
    /// Shorthand for [`SmokeError::InvalidArgument`].
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }
}

/// Result alias used across the crate.
pub type Result<T> = std::result::Result<T, SmokeError>;
