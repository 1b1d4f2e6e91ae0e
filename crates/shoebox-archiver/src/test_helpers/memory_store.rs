//! In-memory blob store

use async_trait::async_trait;
use bytes::Bytes;
use shoebox_core::constants::DEFAULT_CONTENT_TYPE;
use shoebox_core::{AccessTier, ContentHash, UploadMetadata};
use shoebox_storage::{
    BlobItem, BlobKey, BlobProperties, BlobStore, BlobStream, StorageBackend, StorageError,
    StorageResult, UploadRequest,
};
use std::collections::{BTreeMap, HashSet};
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone, PartialEq)]
pub struct MemoryBlob {
    pub data: Bytes,
    pub content_type: String,
    pub metadata: UploadMetadata,
    pub content_hash: Option<ContentHash>,
    pub tier: AccessTier,
    /// Target tier of a requested rehydration that has not completed
    pub rehydrate_to: Option<AccessTier>,
}

impl MemoryBlob {
    fn properties(&self, with_metadata: bool) -> BlobProperties {
        BlobProperties {
            size: self.data.len() as u64,
            content_hash: self.content_hash,
            tier: self.tier,
            rehydrating: self.rehydrate_to.is_some(),
            content_type: self.content_type.clone(),
            metadata: if with_metadata {
                self.metadata.clone()
            } else {
                UploadMetadata::new()
            },
        }
    }
}

#[derive(Debug, Default)]
struct State {
    containers: HashSet<String>,
    blobs: BTreeMap<(String, String), MemoryBlob>,
    snapshots: Vec<(BlobKey, Bytes)>,
    deletes: Vec<BlobKey>,
    uploads: Vec<BlobKey>,
    fail_uploads: bool,
}

/// Blob store kept in memory.
///
/// Rehydration does not complete on its own: after `set_access_tier` moves a
/// blob out of `Archive`, it reports `BeingRehydrated` until
/// `complete_rehydration` is called.
#[derive(Debug, Clone, Default)]
pub struct MemoryBlobStore {
    state: Arc<Mutex<State>>,
}

fn map_key(key: &BlobKey) -> (String, String) {
    (key.container.clone(), key.name.clone())
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_container(container: &str) -> Self {
        let store = Self::new();
        store
            .state
            .lock()
            .unwrap()
            .containers
            .insert(container.to_string());
        store
    }

    /// Store a blob directly, creating its container
    pub fn put_blob(&self, key: &BlobKey, data: &[u8], metadata: UploadMetadata) {
        let mut state = self.state.lock().unwrap();
        state.containers.insert(key.container.clone());
        state.blobs.insert(
            map_key(key),
            MemoryBlob {
                data: Bytes::copy_from_slice(data),
                content_type: DEFAULT_CONTENT_TYPE.to_string(),
                metadata,
                content_hash: Some(ContentHash::compute(data)),
                tier: AccessTier::Hot,
                rehydrate_to: None,
            },
        );
    }

    pub fn blob(&self, key: &BlobKey) -> Option<MemoryBlob> {
        self.state.lock().unwrap().blobs.get(&map_key(key)).cloned()
    }

    pub fn has_container(&self, container: &str) -> bool {
        self.state.lock().unwrap().containers.contains(container)
    }

    /// Blob names in a container, sorted
    pub fn blob_names(&self, container: &str) -> Vec<String> {
        self.state
            .lock()
            .unwrap()
            .blobs
            .keys()
            .filter(|(c, _)| c == container)
            .map(|(_, name)| name.clone())
            .collect()
    }

    pub fn set_tier(&self, key: &BlobKey, tier: AccessTier) {
        if let Some(blob) = self.state.lock().unwrap().blobs.get_mut(&map_key(key)) {
            blob.tier = tier;
            blob.rehydrate_to = None;
        }
    }

    pub fn clear_hash(&self, key: &BlobKey) {
        if let Some(blob) = self.state.lock().unwrap().blobs.get_mut(&map_key(key)) {
            blob.content_hash = None;
        }
    }

    /// Replace the stored hash without touching the content
    pub fn corrupt_hash(&self, key: &BlobKey) {
        if let Some(blob) = self.state.lock().unwrap().blobs.get_mut(&map_key(key)) {
            blob.content_hash = Some(ContentHash::compute(b"corrupted"));
        }
    }

    pub fn complete_rehydration(&self, key: &BlobKey) {
        if let Some(blob) = self.state.lock().unwrap().blobs.get_mut(&map_key(key)) {
            if let Some(tier) = blob.rehydrate_to.take() {
                blob.tier = tier;
            }
        }
    }

    pub fn set_fail_uploads(&self, fail: bool) {
        self.state.lock().unwrap().fail_uploads = fail;
    }

    /// Every successful upload, in order
    pub fn uploads(&self) -> Vec<BlobKey> {
        self.state.lock().unwrap().uploads.clone()
    }

    pub fn snapshots(&self) -> Vec<(BlobKey, Bytes)> {
        self.state.lock().unwrap().snapshots.clone()
    }

    pub fn deletes(&self) -> Vec<BlobKey> {
        self.state.lock().unwrap().deletes.clone()
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn exists(&self, key: &BlobKey) -> StorageResult<bool> {
        Ok(self.state.lock().unwrap().blobs.contains_key(&map_key(key)))
    }

    async fn get_properties(&self, key: &BlobKey) -> StorageResult<BlobProperties> {
        self.state
            .lock()
            .unwrap()
            .blobs
            .get(&map_key(key))
            .map(|blob| blob.properties(true))
            .ok_or_else(|| StorageError::NotFound(key.identifier()))
    }

    async fn upload(&self, key: &BlobKey, request: UploadRequest) -> StorageResult<()> {
        key.validate()?;
        let mut state = self.state.lock().unwrap();
        if state.fail_uploads {
            return Err(StorageError::UploadFailed(format!(
                "Simulated failure for {}",
                key
            )));
        }
        if !state.containers.contains(&key.container) {
            return Err(StorageError::ContainerNotFound(key.container.clone()));
        }
        if let Some(existing) = state.blobs.get(&map_key(key)) {
            if existing.tier.is_archive() {
                return Err(StorageError::BlobArchived(key.identifier()));
            }
        }

        request.report_progress(request.size());
        let content_hash = ContentHash::compute(&request.data);
        state.blobs.insert(
            map_key(key),
            MemoryBlob {
                data: request.data,
                content_type: request.content_type,
                metadata: request.metadata,
                content_hash: Some(content_hash),
                tier: request.access_tier.unwrap_or(AccessTier::Hot),
                rehydrate_to: None,
            },
        );
        state.uploads.push(key.clone());
        Ok(())
    }

    async fn download(&self, key: &BlobKey) -> StorageResult<Bytes> {
        let state = self.state.lock().unwrap();
        let blob = state
            .blobs
            .get(&map_key(key))
            .ok_or_else(|| StorageError::NotFound(key.identifier()))?;
        if blob.tier.is_archive() {
            return Err(if blob.rehydrate_to.is_some() {
                StorageError::BeingRehydrated(key.identifier())
            } else {
                StorageError::BlobArchived(key.identifier())
            });
        }
        Ok(blob.data.clone())
    }

    async fn create_snapshot(&self, key: &BlobKey) -> StorageResult<String> {
        let mut state = self.state.lock().unwrap();
        let data = state
            .blobs
            .get(&map_key(key))
            .map(|blob| blob.data.clone())
            .ok_or_else(|| StorageError::NotFound(key.identifier()))?;
        state.snapshots.push((key.clone(), data));
        Ok(format!("snapshot-{}", state.snapshots.len()))
    }

    async fn delete(&self, key: &BlobKey) -> StorageResult<()> {
        let mut state = self.state.lock().unwrap();
        if state.blobs.remove(&map_key(key)).is_some() {
            state.deletes.push(key.clone());
        }
        Ok(())
    }

    async fn list_blobs(
        &self,
        container: &str,
        prefix: &str,
        with_metadata: bool,
    ) -> StorageResult<BlobStream> {
        let items: Vec<StorageResult<BlobItem>> = self
            .state
            .lock()
            .unwrap()
            .blobs
            .iter()
            .filter(|((c, name), _)| c == container && name.starts_with(prefix))
            .map(|((_, name), blob)| {
                Ok(BlobItem {
                    name: name.clone(),
                    properties: blob.properties(with_metadata),
                })
            })
            .collect();
        Ok(Box::pin(futures::stream::iter(items)))
    }

    async fn create_container_if_not_exists(&self, container: &str) -> StorageResult<bool> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .containers
            .insert(container.to_string()))
    }

    async fn set_access_tier(&self, key: &BlobKey, tier: AccessTier) -> StorageResult<()> {
        let mut state = self.state.lock().unwrap();
        let blob = state
            .blobs
            .get_mut(&map_key(key))
            .ok_or_else(|| StorageError::NotFound(key.identifier()))?;
        if blob.tier.is_archive() && !tier.is_archive() {
            blob.rehydrate_to = Some(tier);
        } else {
            blob.tier = tier;
            blob.rehydrate_to = None;
        }
        Ok(())
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::Local
    }
}
