use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ArchiveError;

/// Blob access tier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccessTier {
    Hot,
    #[default]
    Cool,
    Cold,
    /// Offline tier; content must be rehydrated before it can be read
    Archive,
}

impl AccessTier {
    pub fn is_archive(self) -> bool {
        matches!(self, AccessTier::Archive)
    }
}

impl FromStr for AccessTier {
    type Err = ArchiveError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "hot" => Ok(AccessTier::Hot),
            "cool" => Ok(AccessTier::Cool),
            "cold" => Ok(AccessTier::Cold),
            "archive" => Ok(AccessTier::Archive),
            _ => Err(ArchiveError::InvalidInput(format!(
                "Invalid access tier: {}",
                s
            ))),
        }
    }
}

impl Display for AccessTier {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            AccessTier::Hot => write!(f, "hot"),
            AccessTier::Cool => write!(f, "cool"),
            AccessTier::Cold => write!(f, "cold"),
            AccessTier::Archive => write!(f, "archive"),
        }
    }
}
