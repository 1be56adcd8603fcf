//! Error types for Seedbank.
//!
//! Library crates use [`SeedError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

/// Top-level error type for all Seedbank operations.
#[derive(Debug, thiserror::Error)]
pub enum SeedError {
    /// Configuration loading or validation error.
    #[error("config error: {message}")]
    Config { message: String },

    /// Transport or HTTP failure reaching a remote page.
    #[error("fetch error: {0}")]
    Fetch(String),

    /// HTML selector or document parsing error.
    #[error("parse error: {message}")]
    Parse { message: String },

    /// Ordinal day token not present in the ordinal table.
    #[error("day out of range: {token:?}")]
    InvalidDay { token: String },

    /// Month name not present in the month table.
    #[error("month out of range: {token:?}")]
    InvalidMonth { token: String },

    /// Year token is not an integer.
    #[error("year out of range: {token:?}")]
    InvalidYear { token: String },

    /// Date string does not split into day, month and year.
    #[error("malformed date: {value:?}")]
    MalformedDate { value: String },

    /// Database or storage layer error.
    #[error("storage error: {0}")]
    Storage(String),

    /// No record exists for the requested day, locally or after scraping.
    #[error("no seed found for {day}/{month}/{year}")]
    NotFound { day: u32, month: u32, year: i32 },

    /// No record exists with the given identifier.
    #[error("no seed with id {id}")]
    RecordNotFound { id: i64 },

    /// Record failed validation before persisting.
    #[error("validation error: {message}")]
    Validation { message: String },

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, SeedError>;

impl SeedError {
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

    /// Create a storage error from any displayable value.
    pub fn storage(err: impl std::fmt::Display) -> Self {
        Self::Storage(err.to_string())
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// True for date normalization failures, which never abort an extraction.
    pub fn is_date_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidDay { .. }
                | Self::InvalidMonth { .. }
                | Self::InvalidYear { .. }
                | Self::MalformedDate { .. }
        )
    }
}
