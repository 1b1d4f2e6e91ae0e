//! Per-file results of a run

use std::path::PathBuf;

use shoebox_core::{ArchiveError, DownloadOutcome, LogLevel, UploadOutcome};

/// Outcome of archiving one file
#[derive(Debug)]
pub struct FileResult {
    pub path: PathBuf,
    pub outcome: UploadOutcome,
    /// Set when `outcome` is `Error`
    pub error: Option<ArchiveError>,
}

impl FileResult {
    pub fn new(path: impl Into<PathBuf>, outcome: UploadOutcome) -> Self {
        Self {
            path: path.into(),
            outcome,
            error: None,
        }
    }

    pub fn failed(path: impl Into<PathBuf>, error: ArchiveError) -> Self {
        Self {
            path: path.into(),
            outcome: UploadOutcome::Error,
            error: Some(error),
        }
    }
}

#[derive(Debug, Default)]
pub struct ArchiveReport {
    pub results: Vec<FileResult>,
    /// The run stopped before every file was processed
    pub cancelled: bool,
}

impl ArchiveReport {
    pub fn succeeded(&self) -> impl Iterator<Item = &FileResult> {
        self.results.iter().filter(|r| r.outcome.is_successful())
    }

    pub fn failed(&self) -> impl Iterator<Item = &FileResult> {
        self.results.iter().filter(|r| !r.outcome.is_successful())
    }

    pub fn count(&self, outcome: UploadOutcome) -> usize {
        self.results.iter().filter(|r| r.outcome == outcome).count()
    }

    pub fn has_errors(&self) -> bool {
        self.results
            .iter()
            .any(|r| r.outcome == UploadOutcome::Error)
    }
}

/// Outcome of retrieving one blob
#[derive(Debug)]
pub struct BlobResult {
    /// `{container}/{blob name}`
    pub blob_identifier: String,
    pub local_path: PathBuf,
    pub outcome: DownloadOutcome,
    pub error: Option<ArchiveError>,
}

impl BlobResult {
    pub fn new(
        blob_identifier: impl Into<String>,
        local_path: impl Into<PathBuf>,
        outcome: DownloadOutcome,
    ) -> Self {
        Self {
            blob_identifier: blob_identifier.into(),
            local_path: local_path.into(),
            outcome,
            error: None,
        }
    }

    pub fn failed(
        blob_identifier: impl Into<String>,
        local_path: impl Into<PathBuf>,
        error: ArchiveError,
    ) -> Self {
        Self {
            error: Some(error),
            ..Self::new(blob_identifier, local_path, DownloadOutcome::Failed)
        }
    }
}

#[derive(Debug, Default)]
pub struct RetrieveReport {
    pub results: Vec<BlobResult>,
    pub cancelled: bool,
}

impl RetrieveReport {
    pub fn succeeded(&self) -> impl Iterator<Item = &BlobResult> {
        self.results.iter().filter(|r| r.outcome.is_successful())
    }

    pub fn failed(&self) -> impl Iterator<Item = &BlobResult> {
        self.results.iter().filter(|r| !r.outcome.is_successful())
    }

    pub fn count(&self, outcome: DownloadOutcome) -> usize {
        self.results.iter().filter(|r| r.outcome == outcome).count()
    }

    pub fn has_errors(&self) -> bool {
        self.results
            .iter()
            .any(|r| r.outcome == DownloadOutcome::Failed)
    }

    pub(crate) fn extend(&mut self, other: RetrieveReport) {
        self.results.extend(other.results);
        self.cancelled |= other.cancelled;
    }
}

/// Emit `message` at a level only known at runtime
pub(crate) fn log_at(level: LogLevel, message: &str) {
    match level {
        LogLevel::Debug => tracing::debug!("{}", message),
        LogLevel::Info => tracing::info!("{}", message),
        LogLevel::Warn => tracing::warn!("{}", message),
        LogLevel::Error => tracing::error!("{}", message),
    }
}
