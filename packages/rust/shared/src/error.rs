//! Error types for tallycheck.
//!
//! Library crates use [`TallycheckError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

/// Longest slice of raw markup carried inside an extraction error.
const RAW_SNIPPET_LIMIT: usize = 2000;

/// Top-level error type for all tallycheck operations.
#[derive(Debug, thiserror::Error)]
pub enum TallycheckError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// No row labels were found under any known page layout.
    #[error("malformed page: row labels are empty (block: {raw})")]
    MalformedPage { raw: String },

    /// No location path was found in the page header.
    #[error("no geography found in page header (links: {raw})")]
    NoGeography { raw: String },

    /// Data validation error.
    #[error("validation error: {message}")]
    Validation { message: String },

    /// A worker task panicked or was cancelled.
    #[error("task error: {0}")]
    Task(String),
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, TallycheckError>;

impl TallycheckError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
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

    /// A page whose description block could not be located.
    pub fn malformed_page(raw: &str) -> Self {
        Self::MalformedPage {
            raw: snippet(raw),
        }
    }

    /// A page without any location links in its header.
    pub fn no_geography(raw: &str) -> Self {
        Self::NoGeography {
            raw: snippet(raw),
        }
    }

    /// Whether the batch can skip the offending document and carry on.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::MalformedPage { .. } | Self::NoGeography { .. })
    }
}

fn snippet(raw: &str) -> String {
    let raw = raw.trim();
    match raw.char_indices().nth(RAW_SNIPPET_LIMIT) {
        Some((cut, _)) => format!("{}…", &raw[..cut]),
        None => raw.to_string(),
    }
}
