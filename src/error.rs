/*!
 * Error types for mixer
 */

use std::fmt;
use std::io;
use std::path::PathBuf;

use mixer_core_interface::StorageError;

pub type Result<T> = std::result::Result<T, MixerError>;

/// Exit code constants for structured process exit
pub const EXIT_SUCCESS: i32 = 0;
pub const EXIT_FAILURE: i32 = 1;
pub const EXIT_USAGE: i32 = 2;

#[derive(Debug)]
pub enum MixerError {
    /// Caller contract violation: bad version ordering, bundle mismatch, ...
    Validation(String),

    /// Manifest parse or model error
    Manifest(mixer_core_manifest::Error),

    /// Storage collaborator error
    Storage(StorageError),

    /// Local I/O error (scanning, content access)
    Io(io::Error),

    /// Bundle content tree is missing
    BundleNotFound(PathBuf),

    /// Configuration error
    Config(String),

    /// Pack encoding or decoding error
    Codec(String),

    /// Worker pool error
    Parallel(String),

    /// Reconstructed content did not match the expected digest
    ChecksumMismatch { expected: String, actual: String },
}

impl MixerError {
    /// Get the process exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            MixerError::Config(_) | MixerError::Validation(_) => EXIT_USAGE,
            _ => EXIT_FAILURE,
        }
    }

    /// Whether the error is a caller contract violation
    pub fn is_validation(&self) -> bool {
        match self {
            MixerError::Validation(_) => true,
            MixerError::Manifest(err) => err.is_validation(),
            _ => false,
        }
    }

    /// Get error category for logging
    pub fn category(&self) -> ErrorCategory {
        match self {
            MixerError::Validation(_) => ErrorCategory::Validation,
            MixerError::Manifest(err) if err.is_validation() => ErrorCategory::Validation,
            MixerError::Manifest(_) => ErrorCategory::Format,
            MixerError::Storage(_) | MixerError::Io(_) | MixerError::BundleNotFound(_) => {
                ErrorCategory::IoError
            }
            MixerError::Config(_) => ErrorCategory::Configuration,
            MixerError::Codec(_) => ErrorCategory::Codec,
            MixerError::Parallel(_) => ErrorCategory::Concurrency,
            MixerError::ChecksumMismatch { .. } => ErrorCategory::Integrity,
        }
    }
}

/// Error category for classification and reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Validation,
    Format,
    IoError,
    Configuration,
    Codec,
    Concurrency,
    Integrity,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorCategory::Validation => write!(f, "validation"),
            ErrorCategory::Format => write!(f, "format"),
            ErrorCategory::IoError => write!(f, "io"),
            ErrorCategory::Configuration => write!(f, "configuration"),
            ErrorCategory::Codec => write!(f, "codec"),
            ErrorCategory::Concurrency => write!(f, "concurrency"),
            ErrorCategory::Integrity => write!(f, "integrity"),
        }
    }
}

impl fmt::Display for MixerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MixerError::Validation(msg) => write!(f, "Validation error: {}", msg),
            MixerError::Manifest(err) => write!(f, "Manifest error: {}", err),
            MixerError::Storage(err) => write!(f, "Storage error: {}", err),
            MixerError::Io(err) => write!(f, "I/O error: {}", err),
            MixerError::BundleNotFound(path) => {
                write!(f, "Bundle content not found: {}", path.display())
            }
            MixerError::Config(msg) => write!(f, "Configuration error: {}", msg),
            MixerError::Codec(msg) => write!(f, "Pack codec error: {}", msg),
            MixerError::Parallel(msg) => write!(f, "Parallel processing error: {}", msg),
            MixerError::ChecksumMismatch { expected, actual } => write!(
                f,
                "Checksum verification failed: expected {}, got {}",
                expected, actual
            ),
        }
    }
}

impl std::error::Error for MixerError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            MixerError::Manifest(err) => Some(err),
            MixerError::Storage(err) => Some(err),
            MixerError::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<io::Error> for MixerError {
    fn from(err: io::Error) -> Self {
        MixerError::Io(err)
    }
}

impl From<mixer_core_manifest::Error> for MixerError {
    fn from(err: mixer_core_manifest::Error) -> Self {
        MixerError::Manifest(err)
    }
}

impl From<StorageError> for MixerError {
    fn from(err: StorageError) -> Self {
        MixerError::Storage(err)
    }
}

impl From<serde_json::Error> for MixerError {
    fn from(err: serde_json::Error) -> Self {
        MixerError::Config(format!("JSON parse error: {}", err))
    }
}

impl From<toml::de::Error> for MixerError {
    fn from(err: toml::de::Error) -> Self {
        MixerError::Config(format!("TOML parse error: {}", err))
    }
}

impl From<bincode::Error> for MixerError {
    fn from(err: bincode::Error) -> Self {
        MixerError::Codec(err.to_string())
    }
}
