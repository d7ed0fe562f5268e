//! Error types for Termweave.
//!
//! Library crates use [`TermweaveError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.
//!
//! Resolver contracts never let these escape: every public resolver
//! returns `Option` and maps failures to `None` after logging, so the
//! pipeline can finish best-effort.

use std::path::PathBuf;

use chrono::{DateTime, Utc};

/// Top-level error type for all Termweave operations.
#[derive(Debug, thiserror::Error)]
pub enum TermweaveError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Network/HTTP error during a remote lookup.
    #[error("network error: {0}")]
    Network(String),

    /// GitHub API rate limit exhausted; no further remote calls should
    /// be made in the affected resolver path until `reset`.
    #[error("rate limit exceeded, resets at {reset}")]
    RateLimited { reset: DateTime<Utc> },

    /// HTML/JSON parsing or structure-extraction error.
    #[error("parse error: {message}")]
    Parse { message: String },

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Data validation error (missing field, invalid format, etc.).
    #[error("validation error: {message}")]
    Validation { message: String },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, TermweaveError>;

impl TermweaveError {
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

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Whether this error means the run should stop issuing remote
    /// calls on the affected resolver path.
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, Self::RateLimited { .. })
    }
}
