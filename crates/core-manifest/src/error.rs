//! Error types for manifest operations

use std::io;
use thiserror::Error;

/// Result type for manifest operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur during manifest operations
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error occurred
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Manifest text could not be parsed
    #[error("Parse error at line {line}: {message}")]
    Parse { line: usize, message: String },

    /// Manifest validation failed
    #[error("Validation error: {message}")]
    Validation { message: String },

    /// Invalid flag field in a file entry
    #[error("Invalid flags: {0:?}")]
    InvalidFlags(String),

    /// Invalid digest text
    #[error("Invalid digest: {0}")]
    InvalidDigest(String),

    /// Missing required header field
    #[error("Missing required field: {field}")]
    MissingField { field: String },

    /// Unknown bundle status
    #[error("Unknown bundle status: {0}")]
    InvalidStatus(String),
}

impl Error {
    /// Create a validation error with a message
    pub fn validation<S: Into<String>>(message: S) -> Self {
        Error::Validation {
            message: message.into(),
        }
    }

    /// Create a parse error for the given 1-based line
    pub fn parse<S: Into<String>>(line: usize, message: S) -> Self {
        Error::Parse {
            line,
            message: message.into(),
        }
    }

    /// Create a missing field error
    pub fn missing_field<S: Into<String>>(field: S) -> Self {
        Error::MissingField {
            field: field.into(),
        }
    }

    /// Whether this error is a caller contract violation
    pub fn is_validation(&self) -> bool {
        matches!(self, Error::Validation { .. })
    }
}
