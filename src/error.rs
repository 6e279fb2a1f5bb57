//! Error types and handling infrastructure for jsonlens.
//!
//! Only failures of an operation as a whole are errors here. A line that is not
//! valid JSON is a normal outcome recorded on its [`Record`](crate::record::Record),
//! a bad regular expression degrades to literal matching, and a cancelled scan
//! reports `interrupted = true` instead of failing.

use std::path::PathBuf;
use thiserror::Error;

/// The main error type for jsonlens operations.
#[derive(Error, Debug)]
pub enum JsonlError {
    /// File system related errors (permission denied, read failure mid-scan, etc.)
    #[error("File operation failed: {message}")]
    FileError {
        message: String,
        #[source]
        source: std::io::Error,
    },

    /// File not found specifically (common case for user feedback)
    #[error("File not found: {path}")]
    FileNotFound { path: PathBuf },

    /// Path exists but is not a regular file
    #[error("Path is not a regular file: {path}")]
    NotAFile { path: PathBuf },

    /// Requested page lies outside the navigable range
    #[error("Page {page} is out of range (total pages: {total_pages})")]
    PageOutOfRange { page: u64, total_pages: u64 },

    /// Search could not be started or its task died
    #[error("Search operation failed: {message}")]
    SearchError { message: String },

    /// The session was closed while a request was pending
    #[error("Session closed: {path}")]
    SessionClosed { path: PathBuf },

    /// Configuration related errors
    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    /// Invalid caller-supplied argument
    #[error("Invalid argument: {message}")]
    InvalidArgument { message: String },

    /// Generic error for cases not covered by specific variants
    #[error("Operation failed: {message}")]
    Other { message: String },
}

/// Standard Result type for jsonlens operations.
pub type Result<T> = std::result::Result<T, JsonlError>;

impl JsonlError {
    /// Create a FileError from an io::Error with additional context
    pub fn file_error(message: impl Into<String>, source: std::io::Error) -> Self {
        Self::FileError {
            message: message.into(),
            source,
        }
    }

    /// Create a SearchError with a descriptive message
    pub fn search(message: impl Into<String>) -> Self {
        Self::SearchError {
            message: message.into(),
        }
    }

    /// Create a ConfigError with a descriptive message
    pub fn config(message: impl Into<String>) -> Self {
        Self::ConfigError {
            message: message.into(),
        }
    }

    /// Create an InvalidArgument error with a descriptive message
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    /// Create a generic Other error with a descriptive message
    pub fn other(message: impl Into<String>) -> Self {
        Self::Other {
            message: message.into(),
        }
    }

    /// True for errors raised by the file system rather than by argument checks
    pub fn is_io(&self) -> bool {
        matches!(
            self,
            Self::FileError { .. } | Self::FileNotFound { .. } | Self::NotAFile { .. }
        )
    }
}

impl From<std::io::Error> for JsonlError {
    fn from(err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::NotFound => Self::FileError {
                message: "File not found".to_string(),
                source: err,
            },
            std::io::ErrorKind::PermissionDenied => Self::FileError {
                message: "Permission denied".to_string(),
                source: err,
            },
            _ => Self::FileError {
                message: "IO operation failed".to_string(),
                source: err,
            },
        }
    }
}
