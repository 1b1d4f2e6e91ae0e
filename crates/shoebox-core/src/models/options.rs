//! Per-run options supplied by the CLI.

use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::constants::DEFAULT_SEARCH_PATTERN;
use crate::error::{ArchiveError, ArchiveResult};
use crate::models::{AccessTier, ConflictResolution};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadOptions {
    /// Glob matched against paths relative to the source root
    pub search_pattern: String,
    /// Applied after the stable path sort
    pub skip: usize,
    pub take: Option<usize>,
    pub deduplicate: bool,
    pub conflict_resolution: ConflictResolution,
    /// Re-fetch the stored hash after upload and compare it
    pub verify: bool,
    /// Remove the local file after a successful outcome
    pub delete: bool,
    pub access_tier: AccessTier,
    pub parallel_block_count: Option<usize>,
}

impl Default for UploadOptions {
    fn default() -> Self {
        Self {
            search_pattern: DEFAULT_SEARCH_PATTERN.to_string(),
            skip: 0,
            take: None,
            deduplicate: false,
            conflict_resolution: ConflictResolution::default(),
            verify: true,
            delete: false,
            access_tier: AccessTier::default(),
            parallel_block_count: None,
        }
    }
}

impl UploadOptions {
    pub fn validate(&self) -> ArchiveResult<()> {
        if self.search_pattern.trim().is_empty() {
            return Err(ArchiveError::InvalidInput(
                "search pattern must not be empty".to_string(),
            ));
        }
        if self.parallel_block_count == Some(0) {
            return Err(ArchiveError::InvalidInput(
                "parallel block count must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownloadOptions {
    pub date: NaiveDate,
    /// Inclusive; defaults to `date`
    pub end_date: Option<NaiveDate>,
    /// Match blobs whose `Tags` contain any of these
    pub tags: Vec<String>,
    /// Match blobs whose `People` contain any of these
    pub people: Vec<String>,
    pub verify: bool,
    /// Move blobs back to the archive tier once downloaded
    pub archive: bool,
    pub rehydration_tier: AccessTier,
}

impl DownloadOptions {
    pub fn new(date: NaiveDate) -> Self {
        Self {
            date,
            end_date: None,
            tags: Vec::new(),
            people: Vec::new(),
            verify: false,
            archive: false,
            rehydration_tier: AccessTier::Hot,
        }
    }

    pub fn validate(&self) -> ArchiveResult<()> {
        if let Some(end) = self.end_date {
            if end < self.date {
                return Err(ArchiveError::InvalidInput(format!(
                    "end date {} is before start date {}",
                    end, self.date
                )));
            }
        }
        if self.rehydration_tier.is_archive() {
            return Err(ArchiveError::InvalidInput(
                "rehydration tier must be an online tier".to_string(),
            ));
        }
        Ok(())
    }

    /// Every calendar day in the requested range, in order.
    pub fn dates(&self) -> Vec<NaiveDate> {
        let end = self.end_date.unwrap_or(self.date);
        let mut dates = Vec::new();
        let mut current = self.date;
        while current <= end {
            dates.push(current);
            match current.checked_add_days(Days::new(1)) {
                Some(next) => current = next,
                None => break,
            }
        }
        dates
    }

    pub fn has_filters(&self) -> bool {
        !self.tags.is_empty() || !self.people.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upload_defaults() {
        let options = UploadOptions::default();
        assert!(options.verify);
        assert!(!options.delete);
        assert_eq!(options.search_pattern, "**/*");
        assert_eq!(options.conflict_resolution, ConflictResolution::Skip);
        assert_eq!(options.access_tier, AccessTier::Cool);
        assert!(options.validate().is_ok());
    }

    #[test]
    fn rejects_zero_block_count() {
        let options = UploadOptions {
            parallel_block_count: Some(0),
            ..Default::default()
        };
        assert!(options.validate().is_err());
    }

    #[test]
    fn download_date_range() {
        let mut options = DownloadOptions::new(NaiveDate::from_ymd_opt(2019, 2, 27).unwrap());
        options.end_date = NaiveDate::from_ymd_opt(2019, 3, 2);
        let dates = options.dates();
        assert_eq!(dates.len(), 4);
        assert_eq!(dates[2], NaiveDate::from_ymd_opt(2019, 3, 1).unwrap());
        assert!(options.validate().is_ok());
    }

    #[test]
    fn download_rejects_reversed_range_and_archive_rehydration() {
        let mut options = DownloadOptions::new(NaiveDate::from_ymd_opt(2019, 3, 2).unwrap());
        options.end_date = NaiveDate::from_ymd_opt(2019, 3, 1);
        assert!(options.validate().is_err());

        let mut options = DownloadOptions::new(NaiveDate::from_ymd_opt(2019, 3, 2).unwrap());
        options.rehydration_tier = AccessTier::Archive;
        assert!(options.validate().is_err());
    }
}
