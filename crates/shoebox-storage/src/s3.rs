use crate::keys::{validate_container, BlobKey};
use crate::traits::{
    BlobItem, BlobProperties, BlobStore, BlobStream, StorageError, StorageResult, UploadRequest,
};
use crate::StorageBackend;
use async_trait::async_trait;
use bytes::Bytes;
use futures::TryStreamExt;
use object_store::aws::{AmazonS3, AmazonS3Builder};
use object_store::path::Path;
use object_store::Error as ObjectStoreError;
use object_store::{
    Attribute, AttributeValue, Attributes, GetOptions, GetResult, ObjectMeta, ObjectStore,
    ObjectStoreExt, PutOptions, PutPayload, Result as ObjectResult,
};
use shoebox_core::constants::DEFAULT_CONTENT_TYPE;
use shoebox_core::models::metadata_keys;
use shoebox_core::{AccessTier, ContentHash, UploadMetadata};
use std::borrow::Cow;
use std::collections::BTreeMap;

/// User metadata entry carrying the hex MD5 of the content
const CONTENT_MD5_METADATA: &str = "shoebox-content-md5";
const SNAPSHOTS_PREFIX: &str = ".snapshots";

/// Metadata keys S3 returns lowercased, mapped back to their written form
const KNOWN_METADATA_KEYS: &[&str] = &[
    metadata_keys::ORIGINAL_FILE_NAME,
    metadata_keys::CREATED_AT,
    metadata_keys::ORIGINAL_FILE_SIZE,
    metadata_keys::ORIGINAL_MD5,
    metadata_keys::CAPTION,
    metadata_keys::TAGS,
    metadata_keys::PEOPLE,
];

/// S3-compatible blob store
///
/// A container is the first segment of the object key inside one bucket.
/// S3 has no container lifecycle and no archive tier reachable through this
/// backend, so every blob reports `Hot` and tier changes are rejected.
#[derive(Clone)]
pub struct S3BlobStore {
    store: AmazonS3,
    bucket: String,
}

impl S3BlobStore {
    /// Create a new S3BlobStore instance
    ///
    /// # Arguments
    /// * `bucket` - S3 bucket name
    /// * `region` - AWS region (or region identifier for S3-compatible providers)
    /// * `endpoint_url` - Optional custom endpoint URL for S3-compatible providers
    ///   (e.g., "http://localhost:9000" for MinIO)
    pub async fn new(
        bucket: String,
        region: String,
        endpoint_url: Option<String>,
    ) -> StorageResult<Self> {
        let mut builder = AmazonS3Builder::from_env()
            .with_region(region)
            .with_bucket_name(bucket.clone());

        if let Some(ref endpoint) = endpoint_url {
            let allow_http = endpoint.starts_with("http://");
            builder = builder
                .with_endpoint(endpoint.clone())
                .with_allow_http(allow_http);
        }

        let store = builder
            .build()
            .map_err(|e| StorageError::ConfigError(e.to_string()))?;

        Ok(S3BlobStore { store, bucket })
    }

    fn location(key: &BlobKey) -> StorageResult<Path> {
        key.validate()?;
        Ok(Path::from(format!("{}/{}", key.container, key.name)))
    }

    fn map_error(key: &BlobKey, err: ObjectStoreError) -> StorageError {
        match err {
            ObjectStoreError::NotFound { .. } => StorageError::NotFound(key.identifier()),
            other => StorageError::BackendError(other.to_string()),
        }
    }

    async fn head_with_attributes(&self, key: &BlobKey) -> StorageResult<GetResult> {
        let location = Self::location(key)?;
        let options = GetOptions {
            head: true,
            ..Default::default()
        };
        let result: ObjectResult<GetResult> = self.store.get_opts(&location, options).await;
        result.map_err(|e| Self::map_error(key, e))
    }
}

fn attribute_str(value: &AttributeValue) -> String {
    let value: &str = value.as_ref();
    value.to_string()
}

fn canonical_metadata_key(key: &str) -> String {
    KNOWN_METADATA_KEYS
        .iter()
        .find(|known| known.eq_ignore_ascii_case(key))
        .map(|known| known.to_string())
        .unwrap_or_else(|| key.to_string())
}

/// Multipart ETags (`<hex>-<parts>`) are not content digests and yield `None`.
fn hash_from_etag(meta: &ObjectMeta) -> Option<ContentHash> {
    meta.e_tag.as_deref().and_then(ContentHash::from_hex)
}

/// The server-computed ETag digest wins over the hash written as metadata at upload time.
fn preferred_hash(
    etag_hash: Option<ContentHash>,
    stored_hash: Option<ContentHash>,
) -> Option<ContentHash> {
    etag_hash.or(stored_hash)
}

/// Listing location for a name prefix, cut back to whole path segments since
/// object_store matches prefixes segment by segment.
fn list_location(container: &str, prefix: &str) -> Path {
    match prefix.rfind('/') {
        Some(end) if end > 0 => Path::from(format!("{}/{}", container, &prefix[..end])),
        _ => Path::from(container.to_string()),
    }
}

fn properties_from_result(result: &GetResult) -> BlobProperties {
    let mut content_type = DEFAULT_CONTENT_TYPE.to_string();
    let mut stored_hash = None;
    let mut metadata = BTreeMap::new();

    for (attribute, value) in result.attributes.iter() {
        match attribute {
            Attribute::ContentType => content_type = attribute_str(value),
            Attribute::Metadata(name) if name.eq_ignore_ascii_case(CONTENT_MD5_METADATA) => {
                stored_hash = ContentHash::from_hex(&attribute_str(value));
            }
            Attribute::Metadata(name) => {
                metadata.insert(canonical_metadata_key(name), attribute_str(value));
            }
            _ => {}
        }
    }

    BlobProperties {
        size: result.meta.size as u64,
        content_hash: preferred_hash(hash_from_etag(&result.meta), stored_hash),
        tier: AccessTier::Hot,
        rehydrating: false,
        content_type,
        metadata: UploadMetadata::from_map(metadata),
    }
}

fn upload_attributes(request: &UploadRequest, hash: &ContentHash) -> Attributes {
    let mut attributes = Attributes::new();
    attributes.insert(
        Attribute::ContentType,
        AttributeValue::from(request.content_type.clone()),
    );
    for (name, value) in request.metadata.iter() {
        attributes.insert(
            Attribute::Metadata(Cow::Owned(name.clone())),
            AttributeValue::from(value.clone()),
        );
    }
    attributes.insert(
        Attribute::Metadata(Cow::Borrowed(CONTENT_MD5_METADATA)),
        AttributeValue::from(hash.to_hex()),
    );
    attributes
}

#[async_trait]
impl BlobStore for S3BlobStore {
    async fn exists(&self, key: &BlobKey) -> StorageResult<bool> {
        let location = Self::location(key)?;
        match self.store.head(&location).await {
            Ok(_) => Ok(true),
            Err(ObjectStoreError::NotFound { .. }) => Ok(false),
            Err(e) => Err(StorageError::BackendError(e.to_string())),
        }
    }

    async fn get_properties(&self, key: &BlobKey) -> StorageResult<BlobProperties> {
        let result = self.head_with_attributes(key).await?;
        Ok(properties_from_result(&result))
    }

    async fn upload(&self, key: &BlobKey, request: UploadRequest) -> StorageResult<()> {
        let location = Self::location(key)?;
        let size = request.size();
        // the metadata digest always describes the written bytes
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

        if let Some(tier) = request.access_tier {
            tracing::debug!(key = %key, tier = %tier, "S3 backend ignores access tier on upload");
        }

        let options = PutOptions {
            attributes: upload_attributes(&request, &hash),
            ..Default::default()
        };

        let start = std::time::Instant::now();

        let result: ObjectResult<_> = self
            .store
            .put_opts(&location, PutPayload::from(request.data.clone()), options)
            .await;

        result.map_err(|e| {
            tracing::error!(
                error = %e,
                bucket = %self.bucket,
                key = %key,
                size_bytes = size,
                duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                "S3 upload failed"
            );
            StorageError::UploadFailed(e.to_string())
        })?;

        request.report_progress(size);

        tracing::info!(
            bucket = %self.bucket,
            key = %key,
            size_bytes = size,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "S3 upload successful"
        );

        Ok(())
    }

    async fn download(&self, key: &BlobKey) -> StorageResult<Bytes> {
        let start = std::time::Instant::now();
        let location = Self::location(key)?;

        let result: ObjectResult<_> = self.store.get(&location).await;

        let result = result.map_err(|e| match e {
            ObjectStoreError::NotFound { .. } => StorageError::NotFound(key.identifier()),
            other => {
                tracing::error!(
                    error = %other,
                    bucket = %self.bucket,
                    key = %key,
                    duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                    "S3 download failed"
                );
                StorageError::DownloadFailed(other.to_string())
            }
        })?;

        let bytes = result
            .bytes()
            .await
            .map_err(|e| StorageError::DownloadFailed(e.to_string()))?;

        tracing::info!(
            bucket = %self.bucket,
            key = %key,
            size_bytes = bytes.len(),
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "S3 download successful"
        );

        Ok(bytes)
    }

    async fn create_snapshot(&self, key: &BlobKey) -> StorageResult<String> {
        let start = std::time::Instant::now();
        let from = Self::location(key)?;
        let snapshot_id = chrono::Utc::now().format("%Y%m%dT%H%M%S%.6fZ").to_string();
        let to = Path::from(format!(
            "{}/{}/{}/{}",
            SNAPSHOTS_PREFIX, key.container, key.name, snapshot_id
        ));

        let copy_result: ObjectResult<_> = self.store.copy(&from, &to).await;
        copy_result.map_err(|e| Self::map_error(key, e))?;

        tracing::info!(
            key = %key,
            snapshot = %snapshot_id,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "S3 snapshot created"
        );

        Ok(snapshot_id)
    }

    async fn delete(&self, key: &BlobKey) -> StorageResult<()> {
        let start = std::time::Instant::now();
        let location = Self::location(key)?;

        let result: ObjectResult<_> = self.store.delete(&location).await;

        match result {
            Ok(()) | Err(ObjectStoreError::NotFound { .. }) => {}
            Err(e) => {
                tracing::error!(
                    error = %e,
                    bucket = %self.bucket,
                    key = %key,
                    duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                    "S3 delete failed"
                );
                return Err(StorageError::DeleteFailed(e.to_string()));
            }
        }

        tracing::info!(
            bucket = %self.bucket,
            key = %key,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "S3 delete successful"
        );

        Ok(())
    }

    async fn list_blobs(
        &self,
        container: &str,
        prefix: &str,
        with_metadata: bool,
    ) -> StorageResult<BlobStream> {
        validate_container(container)?;
        let start = std::time::Instant::now();
        let container_prefix = format!("{}/", container);
        let list_prefix = list_location(container, prefix);

        let objects: Vec<ObjectMeta> = self
            .store
            .list(Some(&list_prefix))
            .try_collect()
            .await
            .map_err(|e| StorageError::BackendError(e.to_string()))?;

        let matching: Vec<(String, ObjectMeta)> = objects
            .into_iter()
            .filter_map(|meta| {
                let name = meta
                    .location
                    .as_ref()
                    .strip_prefix(&container_prefix)?
                    .to_string();
                name.starts_with(prefix).then_some((name, meta))
            })
            .collect();

        let mut items = Vec::with_capacity(matching.len());
        for (name, meta) in matching {

            let key = BlobKey::new(container, name.clone());
            let hash = hash_from_etag(&meta);
            let properties = if with_metadata || hash.is_none() {
                self.get_properties(&key).await?
            } else {
                BlobProperties {
                    size: meta.size as u64,
                    content_hash: hash,
                    tier: AccessTier::Hot,
                    rehydrating: false,
                    content_type: DEFAULT_CONTENT_TYPE.to_string(),
                    metadata: UploadMetadata::new(),
                }
            };
            items.push(BlobItem { name, properties });
        }
        items.sort_by(|a, b| a.name.cmp(&b.name));

        tracing::debug!(
            bucket = %self.bucket,
            container = %container,
            prefix = %prefix,
            count = items.len(),
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "S3 listing complete"
        );

        Ok(Box::pin(futures::stream::iter(items.into_iter().map(Ok))))
    }

    async fn create_container_if_not_exists(&self, container: &str) -> StorageResult<bool> {
        validate_container(container)?;
        Ok(false)
    }

    async fn set_access_tier(&self, key: &BlobKey, tier: AccessTier) -> StorageResult<()> {
        Err(StorageError::ConfigError(format!(
            "S3 backend cannot move '{}' to the {} tier",
            key, tier
        )))
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::S3
    }
}
