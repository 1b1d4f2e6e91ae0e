//! Blob store abstraction
//!
//! This module defines the BlobStore trait that all storage backends must implement.

use crate::keys::BlobKey;
use crate::StorageBackend;
use async_trait::async_trait;
use bytes::Bytes;
use futures::Stream;
use shoebox_core::{AccessTier, ArchiveError, ContentHash, UploadMetadata};
use std::fmt;
use std::pin::Pin;
use std::sync::Arc;
use thiserror::Error;

/// Storage operation errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Upload failed: {0}")]
    UploadFailed(String),

    #[error("Download failed: {0}")]
    DownloadFailed(String),

    #[error("Delete failed: {0}")]
    DeleteFailed(String),

    #[error("Blob not found: {0}")]
    NotFound(String),

    #[error("Container not found: {0}")]
    ContainerNotFound(String),

    /// Blob is in the archive tier and cannot be read or overwritten in place
    #[error("Blob is archived: {0}")]
    BlobArchived(String),

    #[error("Blob is being rehydrated: {0}")]
    BeingRehydrated(String),

    #[error("Invalid blob key: {0}")]
    InvalidKey(String),

    #[error("Storage backend error: {0}")]
    BackendError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

impl From<StorageError> for ArchiveError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::InvalidKey(msg) => ArchiveError::InvalidInput(msg),
            StorageError::ConfigError(msg) => ArchiveError::Config(msg),
            StorageError::IoError(e) => ArchiveError::Io(e.to_string()),
            other => ArchiveError::Storage(other.to_string()),
        }
    }
}

/// Called with the cumulative number of bytes transferred
pub type UploadProgress = Arc<dyn Fn(u64) + Send + Sync>;

/// Stream of blobs returned by a listing
pub type BlobStream = Pin<Box<dyn Stream<Item = StorageResult<BlobItem>> + Send>>;

/// Properties of a stored blob
#[derive(Debug, Clone, PartialEq)]
pub struct BlobProperties {
    pub size: u64,
    /// MD5 of the content, when the backend stored one
    pub content_hash: Option<ContentHash>,
    pub tier: AccessTier,
    /// A tier change out of `Archive` has been requested but has not completed
    pub rehydrating: bool,
    pub content_type: String,
    pub metadata: UploadMetadata,
}

impl BlobProperties {
    pub fn is_archived(&self) -> bool {
        self.tier.is_archive()
    }
}

/// A blob returned by `list_blobs`
#[derive(Debug, Clone, PartialEq)]
pub struct BlobItem {
    pub name: String,
    pub properties: BlobProperties,
}

/// Everything attached to a blob in a single upload call
#[derive(Clone)]
pub struct UploadRequest {
    pub data: Bytes,
    pub content_type: String,
    pub metadata: UploadMetadata,
    /// Stored with the blob so it can be compared later
    pub content_hash: Option<ContentHash>,
    pub access_tier: Option<AccessTier>,
    /// Block-level parallelism for large transfers
    pub parallel_block_count: Option<usize>,
    pub progress: Option<UploadProgress>,
}

impl UploadRequest {
    pub fn new(data: Bytes, content_type: impl Into<String>, metadata: UploadMetadata) -> Self {
        Self {
            data,
            content_type: content_type.into(),
            metadata,
            content_hash: None,
            access_tier: None,
            parallel_block_count: None,
            progress: None,
        }
    }

    pub fn with_content_hash(mut self, hash: ContentHash) -> Self {
        self.content_hash = Some(hash);
        self
    }

    pub fn with_access_tier(mut self, tier: AccessTier) -> Self {
        self.access_tier = Some(tier);
        self
    }

    pub fn with_parallel_block_count(mut self, count: Option<usize>) -> Self {
        self.parallel_block_count = count;
        self
    }

    pub fn with_progress(mut self, progress: UploadProgress) -> Self {
        self.progress = Some(progress);
        self
    }

    pub fn size(&self) -> u64 {
        self.data.len() as u64
    }

    /// Report cumulative bytes written to the progress callback, if any
    pub fn report_progress(&self, bytes: u64) {
        if let Some(progress) = &self.progress {
            progress(bytes);
        }
    }
}

impl fmt::Debug for UploadRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UploadRequest")
            .field("size", &self.data.len())
            .field("content_type", &self.content_type)
            .field("metadata", &self.metadata)
            .field("content_hash", &self.content_hash)
            .field("access_tier", &self.access_tier)
            .field("parallel_block_count", &self.parallel_block_count)
            .finish()
    }
}

/// Blob store abstraction trait
///
/// All storage backends (local filesystem, S3-compatible) implement this
/// trait, so the archiver never couples to a specific SDK.
///
/// Uploads replace an existing blob unless that blob is archived, in which
/// case they fail with `BlobArchived`. Uploads into a missing container fail
/// with `ContainerNotFound`.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Check if a blob exists
    async fn exists(&self, key: &BlobKey) -> StorageResult<bool>;

    /// Fetch a blob's properties; `NotFound` when it does not exist
    async fn get_properties(&self, key: &BlobKey) -> StorageResult<BlobProperties>;

    /// Upload content, metadata and content type in a single call
    async fn upload(&self, key: &BlobKey, request: UploadRequest) -> StorageResult<()>;

    /// Download a blob's content.
    ///
    /// Fails with `BlobArchived` or `BeingRehydrated` for offline blobs.
    async fn download(&self, key: &BlobKey) -> StorageResult<Bytes>;

    /// Create a point-in-time copy of a blob and return its snapshot id
    async fn create_snapshot(&self, key: &BlobKey) -> StorageResult<String>;

    /// Delete a blob; deleting a missing blob is not an error
    async fn delete(&self, key: &BlobKey) -> StorageResult<()>;

    /// List every blob whose name starts with `prefix`.
    ///
    /// Listing a missing container yields an empty stream. Metadata is only
    /// populated when `with_metadata` is set.
    async fn list_blobs(
        &self,
        container: &str,
        prefix: &str,
        with_metadata: bool,
    ) -> StorageResult<BlobStream>;

    /// Returns `true` when the container was created by this call
    async fn create_container_if_not_exists(&self, container: &str) -> StorageResult<bool>;

    /// Move a blob to another tier. Leaving `Archive` starts a rehydration.
    async fn set_access_tier(&self, key: &BlobKey, tier: AccessTier) -> StorageResult<()>;

    /// Get the storage backend type
    fn backend_type(&self) -> StorageBackend;
}
