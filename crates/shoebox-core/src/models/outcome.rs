use std::fmt::{Display, Formatter, Result as FmtResult};

use serde::{Deserialize, Serialize};

use crate::error::LogLevel;

/// Result of archiving one candidate file. Produced exactly once per file per run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UploadOutcome {
    Uploaded,
    AlreadyExists,
    /// Remote content differs and the policy left it untouched
    Conflict,
    /// No capture date could be resolved; the file was not uploaded
    DateMissing,
    Error,
}

impl UploadOutcome {
    pub fn is_successful(self) -> bool {
        matches!(self, UploadOutcome::Uploaded | UploadOutcome::AlreadyExists)
    }

    pub fn log_level(self) -> LogLevel {
        match self {
            UploadOutcome::Uploaded | UploadOutcome::AlreadyExists => LogLevel::Info,
            UploadOutcome::Conflict | UploadOutcome::DateMissing => LogLevel::Warn,
            UploadOutcome::Error => LogLevel::Error,
        }
    }
}

impl Display for UploadOutcome {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        let name = match self {
            UploadOutcome::Uploaded => "Uploaded",
            UploadOutcome::AlreadyExists => "AlreadyExists",
            UploadOutcome::Conflict => "Conflict",
            UploadOutcome::DateMissing => "DateMissing",
            UploadOutcome::Error => "Error",
        };
        f.pad(name)
    }
}

/// Result of retrieving one blob
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DownloadOutcome {
    Succeeded,
    /// Blob is still rehydrating from the archive tier
    Pending,
    /// Local target already exists
    Conflict,
    Failed,
}

impl DownloadOutcome {
    pub fn is_successful(self) -> bool {
        matches!(self, DownloadOutcome::Succeeded)
    }

    pub fn log_level(self) -> LogLevel {
        match self {
            DownloadOutcome::Succeeded => LogLevel::Info,
            DownloadOutcome::Pending | DownloadOutcome::Conflict => LogLevel::Warn,
            DownloadOutcome::Failed => LogLevel::Error,
        }
    }
}

impl Display for DownloadOutcome {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        let name = match self {
            DownloadOutcome::Succeeded => "Succeeded",
            DownloadOutcome::Pending => "Pending",
            DownloadOutcome::Conflict => "Conflict",
            DownloadOutcome::Failed => "Failed",
        };
        f.pad(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_uploaded_and_already_exists_are_successful() {
        assert!(UploadOutcome::Uploaded.is_successful());
        assert!(UploadOutcome::AlreadyExists.is_successful());
        assert!(!UploadOutcome::Conflict.is_successful());
        assert!(!UploadOutcome::DateMissing.is_successful());
        assert!(!UploadOutcome::Error.is_successful());
    }

    #[test]
    fn warning_level_outcomes() {
        assert_eq!(UploadOutcome::Conflict.log_level(), LogLevel::Warn);
        assert_eq!(UploadOutcome::DateMissing.log_level(), LogLevel::Warn);
        assert_eq!(UploadOutcome::Error.log_level(), LogLevel::Error);
        assert_eq!(DownloadOutcome::Pending.log_level(), LogLevel::Warn);
    }

    #[test]
    fn display_pads() {
        assert_eq!(format!("{:<10}|", UploadOutcome::Conflict), "Conflict  |");
    }
}
