use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A download batch whose items were not all retrievable yet.
///
/// Persisted as JSON so `continue` can pick it up after the blobs have been
/// rehydrated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetrievalSession {
    pub id: Uuid,
    /// Local directory the batch downloads into
    pub path: PathBuf,
    pub started: DateTime<Utc>,
    pub pending_items: Vec<PendingItem>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingItem {
    /// `container/blob-name`
    pub blob_identifier: String,
    pub local_path: PathBuf,
}

impl RetrievalSession {
    pub fn new(path: impl Into<PathBuf>, pending_items: Vec<PendingItem>) -> Self {
        Self {
            id: Uuid::new_v4(),
            path: path.into(),
            started: Utc::now(),
            pending_items,
        }
    }

    pub fn is_complete(&self) -> bool {
        self.pending_items.is_empty()
    }

    /// File name used when the session is stored on disk
    pub fn file_name(&self) -> String {
        format!("{}.json", self.id)
    }
}

impl PendingItem {
    pub fn new(blob_identifier: impl Into<String>, local_path: impl Into<PathBuf>) -> Self {
        Self {
            blob_identifier: blob_identifier.into(),
            local_path: local_path.into(),
        }
    }

    /// Splits the identifier into `(container, blob name)`.
    pub fn split_identifier(&self) -> Option<(&str, &str)> {
        let (container, name) = self.blob_identifier.split_once('/')?;
        if container.is_empty() || name.is_empty() {
            return None;
        }
        Some((container, name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_with_camel_case_keys() {
        let session = RetrievalSession::new(
            "/restore",
            vec![PendingItem::new(
                "photos/2019/05/25/IMG_1.jpg",
                "/restore/IMG_1.jpg",
            )],
        );
        let json = serde_json::to_value(&session).unwrap();
        assert!(json.get("pendingItems").is_some());
        assert_eq!(
            json["pendingItems"][0]["blobIdentifier"],
            "photos/2019/05/25/IMG_1.jpg"
        );
        assert_eq!(json["pendingItems"][0]["localPath"], "/restore/IMG_1.jpg");

        let parsed: RetrievalSession = serde_json::from_value(json).unwrap();
        assert_eq!(parsed, session);
    }

    #[test]
    fn splits_identifier() {
        let item = PendingItem::new("photos/2019/05/25/IMG_1.jpg", "/tmp/IMG_1.jpg");
        assert_eq!(
            item.split_identifier(),
            Some(("photos", "2019/05/25/IMG_1.jpg"))
        );
        assert!(PendingItem::new("nocontainer", "/tmp/x").split_identifier().is_none());
    }
}
