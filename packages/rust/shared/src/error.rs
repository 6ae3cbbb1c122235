//! Error types for octochat.
//!
//! Library crates use [`OctochatError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

/// Top-level error type for all octochat operations.
#[derive(Debug, thiserror::Error)]
pub enum OctochatError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Network/HTTP error talking to an external service.
    #[error("network error: {0}")]
    Network(String),

    /// URL or knowledge-base payload could not be parsed.
    #[error("parse error: {message}")]
    Parse { message: String },

    /// Database or storage layer error.
    #[error("storage error: {0}")]
    Storage(String),

    /// The bot platform rejected a request.
    #[error("platform error ({code}): {message}")]
    Platform { code: String, message: String },

    /// The named resource does not exist on the remote side.
    #[error("not found: {0}")]
    NotFound(String),

    /// The named resource already exists.
    #[error("already exists: {0}")]
    AlreadyExists(String),

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Data validation error (invalid stage transition, oversized batch, etc.).
    #[error("validation error: {message}")]
    Validation { message: String },

    /// A bounded retry loop ran out of attempts.
    #[error("{operation} failed after {attempts} attempts: {last}")]
    RetryExhausted {
        operation: String,
        attempts: u32,
        last: Box<OctochatError>,
    },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, OctochatError>;

impl OctochatError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a parse error from any displayable message.
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse {
            message: msg.into(),
        }
    }

    /// Create a validation error from any displayable message.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
            message: msg.into(),
        }
    }

    /// Create a platform error with the service's error code.
    pub fn platform(code: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Platform {
            code: code.into(),
            message: msg.into(),
        }
    }

    /// Create a not-found error naming the missing resource.
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    /// Create an already-exists error naming the resource.
    pub fn already_exists(what: impl Into<String>) -> Self {
        Self::AlreadyExists(what.into())
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// True when the remote side reported the resource as missing.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// True for errors that no amount of retrying will fix.
    pub fn is_permanent(&self) -> bool {
        matches!(
            self,
            Self::Config { .. } | Self::Parse { .. } | Self::Validation { .. }
        )
    }
}
