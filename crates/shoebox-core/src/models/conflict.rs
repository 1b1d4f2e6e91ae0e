use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ArchiveError;

/// What to do when the destination already holds different content
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ConflictResolution {
    /// Leave the remote blob alone and report `Conflict`
    #[default]
    Skip,
    /// Upload under a name qualified with the content hash
    KeepBoth,
    /// Snapshot the existing blob, then overwrite it
    SnapshotAndOverwrite,
    /// Overwrite in place; archived blobs are deleted first
    Overwrite,
}

impl FromStr for ConflictResolution {
    type Err = ArchiveError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .chars()
            .filter(|c| !matches!(c, '-' | '_'))
            .collect::<String>()
            .to_lowercase();
        match normalized.as_str() {
            "skip" => Ok(ConflictResolution::Skip),
            "keepboth" => Ok(ConflictResolution::KeepBoth),
            "snapshotandoverwrite" => Ok(ConflictResolution::SnapshotAndOverwrite),
            "overwrite" => Ok(ConflictResolution::Overwrite),
            _ => Err(ArchiveError::InvalidInput(format!(
                "Invalid conflict resolution: {}",
                s
            ))),
        }
    }
}

impl Display for ConflictResolution {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            ConflictResolution::Skip => write!(f, "skip"),
            ConflictResolution::KeepBoth => write!(f, "keep-both"),
            ConflictResolution::SnapshotAndOverwrite => write!(f, "snapshot-and-overwrite"),
            ConflictResolution::Overwrite => write!(f, "overwrite"),
        }
    }
}
