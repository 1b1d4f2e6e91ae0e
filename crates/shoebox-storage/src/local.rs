use crate::keys::{validate_container, BlobKey};
use crate::traits::{
    BlobItem, BlobProperties, BlobStore, BlobStream, StorageError, StorageResult, UploadRequest,
};
use crate::StorageBackend;
use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use shoebox_core::constants::DEFAULT_CONTENT_TYPE;
use shoebox_core::{AccessTier, ContentHash, UploadMetadata};
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use walkdir::WalkDir;

const BLOBS_DIR: &str = "blobs";
const PROPERTIES_DIR: &str = "properties";
const SNAPSHOTS_DIR: &str = "snapshots";

/// Sidecar record kept next to each blob
#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredProperties {
    content_type: String,
    /// Base64 MD5
    content_hash: Option<String>,
    tier: AccessTier,
    #[serde(default)]
    rehydrating: bool,
    #[serde(default)]
    metadata: UploadMetadata,
}

impl Default for StoredProperties {
    fn default() -> Self {
        Self {
            content_type: DEFAULT_CONTENT_TYPE.to_string(),
            content_hash: None,
            tier: AccessTier::Hot,
            rehydrating: false,
            metadata: UploadMetadata::new(),
        }
    }
}

impl StoredProperties {
    fn into_blob_properties(self, size: u64, with_metadata: bool) -> BlobProperties {
        BlobProperties {
            size,
            content_hash: self
                .content_hash
                .as_deref()
                .and_then(ContentHash::from_base64),
            tier: self.tier,
            rehydrating: self.rehydrating,
            content_type: self.content_type,
            metadata: if with_metadata {
                self.metadata
            } else {
                UploadMetadata::new()
            },
        }
    }
}

/// Local filesystem blob store
///
/// Each container is a directory under the base path. Blob content lives in
/// `{container}/blobs/{name}` and its properties in
/// `{container}/properties/{name}.json`. Rehydration completes immediately.
#[derive(Clone)]
pub struct LocalBlobStore {
    base_path: PathBuf,
}

impl LocalBlobStore {
    /// Create a new LocalBlobStore instance
    ///
    /// # Arguments
    /// * `base_path` - Root directory for containers (e.g., "/var/lib/shoebox")
    pub async fn new(base_path: impl Into<PathBuf>) -> StorageResult<Self> {
        let base_path = base_path.into();

        fs::create_dir_all(&base_path).await.map_err(|e| {
            StorageError::ConfigError(format!(
                "Failed to create storage directory {}: {}",
                base_path.display(),
                e
            ))
        })?;

        Ok(LocalBlobStore { base_path })
    }

    fn container_path(&self, container: &str) -> StorageResult<PathBuf> {
        validate_container(container)?;
        Ok(self.base_path.join(container))
    }

    fn blob_path(&self, key: &BlobKey) -> StorageResult<PathBuf> {
        key.validate()?;
        Ok(self.base_path.join(&key.container).join(BLOBS_DIR).join(&key.name))
    }

    fn properties_path(&self, key: &BlobKey) -> StorageResult<PathBuf> {
        key.validate()?;
        Ok(self
            .base_path
            .join(&key.container)
            .join(PROPERTIES_DIR)
            .join(format!("{}.json", key.name)))
    }

    async fn container_exists(&self, container: &str) -> StorageResult<bool> {
        let path = self.container_path(container)?;
        Ok(fs::try_exists(&path).await.unwrap_or(false))
    }

    /// Ensure parent directory exists
    async fn ensure_parent_dir(&self, path: &Path) -> StorageResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        Ok(())
    }

    async fn read_properties(&self, key: &BlobKey) -> StorageResult<StoredProperties> {
        let path = self.properties_path(key)?;
        match fs::read(&path).await {
            Ok(data) => parse_properties(&path, &data),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(StoredProperties::default()),
            Err(e) => Err(StorageError::IoError(e)),
        }
    }

    async fn write_properties(
        &self,
        key: &BlobKey,
        properties: &StoredProperties,
    ) -> StorageResult<()> {
        let path = self.properties_path(key)?;
        self.ensure_parent_dir(&path).await?;
        let json = serde_json::to_vec_pretty(properties)
            .map_err(|e| StorageError::BackendError(e.to_string()))?;
        fs::write(&path, json).await?;
        Ok(())
    }

    async fn require_blob(&self, key: &BlobKey) -> StorageResult<PathBuf> {
        let path = self.blob_path(key)?;
        if !fs::try_exists(&path).await.unwrap_or(false) {
            return Err(StorageError::NotFound(key.identifier()));
        }
        Ok(path)
    }
}

/// A properties file that exists but cannot be parsed fails the read or listing.
fn parse_properties(path: &Path, data: &[u8]) -> StorageResult<StoredProperties> {
    serde_json::from_slice(data).map_err(|e| {
        tracing::warn!(path = %path.display(), error = %e, "Corrupt blob properties file");
        StorageError::BackendError(format!("Corrupt properties file {}: {}", path.display(), e))
    })
}

/// Walks `{container}/blobs` and returns every blob whose name starts with `prefix`, sorted by name.
fn scan_container(
    container_path: &Path,
    prefix: &str,
    with_metadata: bool,
) -> StorageResult<Vec<BlobItem>> {
    let blobs_root = container_path.join(BLOBS_DIR);
    let properties_root = container_path.join(PROPERTIES_DIR);
    if !blobs_root.is_dir() {
        return Ok(Vec::new());
    }

    let mut items = Vec::new();
    for entry in WalkDir::new(&blobs_root).follow_links(false) {
        let entry = entry.map_err(|e| StorageError::BackendError(e.to_string()))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let relative = match entry.path().strip_prefix(&blobs_root) {
            Ok(relative) => relative,
            Err(_) => continue,
        };
        let name = relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect::<Vec<_>>()
            .join("/");
        if !name.starts_with(prefix) {
            continue;
        }

        let size = entry
            .metadata()
            .map_err(|e| StorageError::BackendError(e.to_string()))?
            .len();
        let properties_path = properties_root.join(format!("{}.json", name));
        let stored = match std::fs::read(&properties_path) {
            Ok(data) => parse_properties(&properties_path, &data)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => StoredProperties::default(),
            Err(e) => return Err(StorageError::IoError(e)),
        };

        items.push(BlobItem {
            name,
            properties: stored.into_blob_properties(size, with_metadata),
        });
    }

    items.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(items)
}

#[async_trait]
impl BlobStore for LocalBlobStore {
    async fn exists(&self, key: &BlobKey) -> StorageResult<bool> {
        let path = self.blob_path(key)?;
        Ok(fs::try_exists(&path).await.unwrap_or(false))
    }

    async fn get_properties(&self, key: &BlobKey) -> StorageResult<BlobProperties> {
        let path = self.require_blob(key).await?;
        let size = fs::metadata(&path)
            .await
            .map_err(|e| StorageError::BackendError(e.to_string()))?
            .len();
        let stored = self.read_properties(key).await?;
        Ok(stored.into_blob_properties(size, true))
    }

    async fn upload(&self, key: &BlobKey, request: UploadRequest) -> StorageResult<()> {
        let path = self.blob_path(key)?;
        if !self.container_exists(&key.container).await? {
            return Err(StorageError::ContainerNotFound(key.container.clone()));
        }

        if fs::try_exists(&path).await.unwrap_or(false) {
            let existing = self.read_properties(key).await?;
            if existing.tier.is_archive() {
                return Err(StorageError::BlobArchived(key.identifier()));
            }
        }

        self.ensure_parent_dir(&path).await?;

        let start = std::time::Instant::now();
        let size = request.size();

        let mut file = fs::File::create(&path).await.map_err(|e| {
            StorageError::UploadFailed(format!("Failed to create file {}: {}", path.display(), e))
        })?;

        let block_size = request
            .parallel_block_count
            .map(|count| (request.data.len() / count.max(1)).max(1))
            .unwrap_or(request.data.len().max(1));
        let mut written = 0u64;
        for block in request.data.chunks(block_size) {
            file.write_all(block).await.map_err(|e| {
                StorageError::UploadFailed(format!(
                    "Failed to write file {}: {}",
                    path.display(),
                    e
                ))
            })?;
            written += block.len() as u64;
            request.report_progress(written);
        }

        file.sync_all().await.map_err(|e| {
            StorageError::UploadFailed(format!("Failed to sync file {}: {}", path.display(), e))
        })?;

        // the stored digest always describes the written bytes
        let hash = ContentHash::compute(&request.data);
        if let Some(claimed) = request.content_hash {
            if claimed != hash {
                tracing::warn!(
                    key = %key,
                    claimed = %claimed.to_hex(),
                    stored = %hash.to_hex(),
                    "Uploaded content does not match the supplied hash"
                );
            }
        }
        let properties = StoredProperties {
            content_type: request.content_type.clone(),
            content_hash: Some(hash.to_base64()),
            tier: request.access_tier.unwrap_or(AccessTier::Hot),
            rehydrating: false,
            metadata: request.metadata.clone(),
        };
        self.write_properties(key, &properties).await?;

        tracing::info!(
            path = %path.display(),
            key = %key,
            size_bytes = size,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Local storage upload successful"
        );

        Ok(())
    }

    async fn download(&self, key: &BlobKey) -> StorageResult<Bytes> {
        let path = self.require_blob(key).await?;
        let start = std::time::Instant::now();

        let stored = self.read_properties(key).await?;
        if stored.tier.is_archive() {
            return Err(if stored.rehydrating {
                StorageError::BeingRehydrated(key.identifier())
            } else {
                StorageError::BlobArchived(key.identifier())
            });
        }

        let data = fs::read(&path).await.map_err(|e| {
            StorageError::DownloadFailed(format!("Failed to read file {}: {}", path.display(), e))
        })?;

        tracing::info!(
            path = %path.display(),
            key = %key,
            size_bytes = data.len(),
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Local storage download successful"
        );

        Ok(Bytes::from(data))
    }

    async fn create_snapshot(&self, key: &BlobKey) -> StorageResult<String> {
        let from_path = self.require_blob(key).await?;
        let snapshot_id = chrono::Utc::now().format("%Y%m%dT%H%M%S%.6fZ").to_string();
        let to_path = self
            .container_path(&key.container)?
            .join(SNAPSHOTS_DIR)
            .join(&key.name)
            .join(&snapshot_id);

        self.ensure_parent_dir(&to_path).await?;

        fs::copy(&from_path, &to_path).await.map_err(|e| {
            StorageError::BackendError(format!(
                "Failed to snapshot {} to {}: {}",
                from_path.display(),
                to_path.display(),
                e
            ))
        })?;

        tracing::info!(
            key = %key,
            snapshot = %snapshot_id,
            to_path = %to_path.display(),
            "Local storage snapshot created"
        );

        Ok(snapshot_id)
    }

    async fn delete(&self, key: &BlobKey) -> StorageResult<()> {
        let path = self.blob_path(key)?;
        let start = std::time::Instant::now();

        if !fs::try_exists(&path).await.unwrap_or(false) {
            return Ok(());
        }

        fs::remove_file(&path).await.map_err(|e| {
            StorageError::DeleteFailed(format!("Failed to delete file {}: {}", path.display(), e))
        })?;

        let properties_path = self.properties_path(key)?;
        if fs::try_exists(&properties_path).await.unwrap_or(false) {
            fs::remove_file(&properties_path).await.map_err(|e| {
                StorageError::DeleteFailed(format!(
                    "Failed to delete properties {}: {}",
                    properties_path.display(),
                    e
                ))
            })?;
        }

        tracing::info!(
            path = %path.display(),
            key = %key,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Local storage delete successful"
        );

        Ok(())
    }

    async fn list_blobs(
        &self,
        container: &str,
        prefix: &str,
        with_metadata: bool,
    ) -> StorageResult<BlobStream> {
        let container_path = self.container_path(container)?;
        let prefix = prefix.trim_start_matches('/').to_string();
        let start = std::time::Instant::now();

        let scan_prefix = prefix.clone();
        let items = tokio::task::spawn_blocking(move || {
            scan_container(&container_path, &scan_prefix, with_metadata)
        })
        .await
        .map_err(|e| StorageError::BackendError(format!("Listing task failed: {}", e)))??;

        tracing::debug!(
            container = %container,
            prefix = %prefix,
            count = items.len(),
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Local storage listing complete"
        );

        Ok(Box::pin(futures::stream::iter(items.into_iter().map(Ok))))
    }

    async fn create_container_if_not_exists(&self, container: &str) -> StorageResult<bool> {
        if self.container_exists(container).await? {
            return Ok(false);
        }
        let path = self.container_path(container)?;
        fs::create_dir_all(path.join(BLOBS_DIR)).await?;
        tracing::info!(container = %container, "Local storage container created");
        Ok(true)
    }

    async fn set_access_tier(&self, key: &BlobKey, tier: AccessTier) -> StorageResult<()> {
        self.require_blob(key).await?;
        let mut stored = self.read_properties(key).await?;
        let previous = stored.tier;
        stored.tier = tier;
        stored.rehydrating = false;
        self.write_properties(key, &stored).await?;

        tracing::info!(
            key = %key,
            from = %previous,
            to = %tier,
            "Local storage access tier changed"
        );

        Ok(())
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::Local
    }
}
