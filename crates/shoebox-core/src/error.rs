//! Error types module
//!
//! All failures that end a single file's processing are unified under
//! `ArchiveError`. Expected branches of the upload pipeline (conflict, already
//! exists, missing date) are *not* errors; they are `UploadOutcome` values.

use std::io;
use std::path::PathBuf;

/// Log level for error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Debug level - for expected errors like validation failures
    Debug,
    /// Info level - for normal progress
    Info,
    /// Warning level - for recoverable issues a user should look at
    Warn,
    /// Error level - for unexpected failures
    Error,
}

/// Metadata describing how an error should be reported
pub trait ErrorMetadata {
    /// Machine-readable error code (e.g., "STORAGE_ERROR")
    fn error_code(&self) -> &'static str;

    /// Whether re-running the archive may succeed
    fn is_recoverable(&self) -> bool;

    /// Log level for this error
    fn log_level(&self) -> LogLevel;
}

#[derive(Debug, thiserror::Error)]
pub enum ArchiveError {
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("IO error: {0}")]
    Io(String),

    #[error("Verification failed for '{}' uploaded to '{key}'", .path.display())]
    VerificationFailed { path: PathBuf, key: String },

    /// The destination holds different content and the policy could not place the file
    #[error("Cannot resolve conflict at '{key}': {reason}")]
    UnresolvedConflict { key: String, reason: String },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Metadata error: {0}")]
    Metadata(String),

    #[error("Thumbnail error: {0}")]
    Thumbnail(String),

    #[error("Not supported: {0}")]
    NotSupported(String),

    #[error("Operation cancelled")]
    Cancelled,

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Internal error with source")]
    InternalWithSource {
        message: String,
        #[source]
        source: anyhow::Error,
    },
}

pub type ArchiveResult<T> = Result<T, ArchiveError>;

impl From<anyhow::Error> for ArchiveError {
    fn from(err: anyhow::Error) -> Self {
        ArchiveError::InternalWithSource {
            message: err.to_string(),
            source: err,
        }
    }
}

impl From<io::Error> for ArchiveError {
    fn from(err: io::Error) -> Self {
        ArchiveError::Io(err.to_string())
    }
}

impl From<serde_json::Error> for ArchiveError {
    fn from(err: serde_json::Error) -> Self {
        ArchiveError::InvalidInput(format!("JSON parsing error: {}", err))
    }
}

/// Static metadata for each variant: (error_code, recoverable, log_level).
fn archive_error_static_metadata(err: &ArchiveError) -> (&'static str, bool, LogLevel) {
    match err {
        ArchiveError::Storage(_) => ("STORAGE_ERROR", true, LogLevel::Error),
        ArchiveError::Io(_) => ("IO_ERROR", true, LogLevel::Error),
        ArchiveError::VerificationFailed { .. } => ("VERIFICATION_FAILED", true, LogLevel::Error),
        ArchiveError::UnresolvedConflict { .. } => ("UNRESOLVED_CONFLICT", false, LogLevel::Error),
        ArchiveError::InvalidInput(_) => ("INVALID_INPUT", false, LogLevel::Debug),
        ArchiveError::Config(_) => ("CONFIGURATION_ERROR", false, LogLevel::Error),
        ArchiveError::Metadata(_) => ("METADATA_ERROR", false, LogLevel::Warn),
        ArchiveError::Thumbnail(_) => ("THUMBNAIL_ERROR", false, LogLevel::Warn),
        ArchiveError::NotSupported(_) => ("NOT_SUPPORTED", false, LogLevel::Error),
        ArchiveError::Cancelled => ("CANCELLED", true, LogLevel::Warn),
        ArchiveError::Internal(_) => ("INTERNAL_ERROR", true, LogLevel::Error),
        ArchiveError::InternalWithSource { .. } => ("INTERNAL_ERROR", true, LogLevel::Error),
    }
}

impl ArchiveError {
    /// Get detailed error information including error chain
    pub fn detailed_message(&self) -> String {
        use std::error::Error;

        let mut details = self.to_string();

        let mut source = self.source();
        let mut depth = 0;
        while let Some(err) = source {
            depth += 1;
            if depth > 5 {
                details.push_str("\n  ... (truncated)");
                break;
            }
            details.push_str(&format!("\n  Caused by: {}", err));
            source = err.source();
        }

        details
    }
}

impl ErrorMetadata for ArchiveError {
    fn error_code(&self) -> &'static str {
        archive_error_static_metadata(self).0
    }

    fn is_recoverable(&self) -> bool {
        archive_error_static_metadata(self).1
    }

    fn log_level(&self) -> LogLevel {
        archive_error_static_metadata(self).2
    }
}
