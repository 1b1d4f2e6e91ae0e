//! Upload reconciliation
//!
//! Decides what happens to one file at its destination key:
//!
//! ```text
//! CheckingExistence -> NotExists  -> upload              -> Uploaded
//!                   -> Matching                          -> AlreadyExists
//!                   -> Mismatched -> conflict policy     -> Conflict | Uploaded | AlreadyExists | error
//! ```
//!
//! A blob matches when both its size and its stored MD5 equal the local
//! file's. Expected branches are `UploadOutcome` values; only failures are
//! errors.

use std::sync::Arc;

use shoebox_core::{
    ArchiveError, ArchiveResult, ConflictResolution, DestinationKey, UploadMetadata,
    UploadOptions, UploadOutcome,
};
use shoebox_processing::content_type_for;
use shoebox_storage::{BlobKey, BlobProperties, BlobStore, StorageError, UploadRequest};

use crate::costs::CostEstimator;
use crate::files::CandidateFile;

/// What the destination holds before the conflict policy runs
#[derive(Debug, Clone, PartialEq)]
pub enum RemoteState {
    NotExists,
    Matching(BlobProperties),
    Mismatched(BlobProperties),
}

/// Outcome plus the key it refers to, which differs from the requested key
/// when `KeepBoth` renamed the file
#[derive(Debug, Clone, PartialEq)]
pub struct Reconciled {
    pub outcome: UploadOutcome,
    pub key: DestinationKey,
}

pub struct UploadReconciler {
    store: Arc<dyn BlobStore>,
    costs: Arc<CostEstimator>,
    options: UploadOptions,
}

impl UploadReconciler {
    pub fn new(store: Arc<dyn BlobStore>, costs: Arc<CostEstimator>, options: UploadOptions) -> Self {
        Self {
            store,
            costs,
            options,
        }
    }

    /// Place `candidate` at `key` according to the conflict policy.
    ///
    /// `metadata` must be complete: it is attached with the upload and never
    /// patched afterwards. The content hash is recorded in it when computed.
    pub async fn reconcile(
        &self,
        candidate: &CandidateFile,
        key: &DestinationKey,
        metadata: &mut UploadMetadata,
    ) -> ArchiveResult<Reconciled> {
        let (outcome, key) = match self.compare(candidate, key, metadata).await? {
            RemoteState::NotExists => (self.upload(candidate, key, metadata).await?, key.clone()),
            RemoteState::Matching(_) => (UploadOutcome::AlreadyExists, key.clone()),
            RemoteState::Mismatched(existing) => {
                self.resolve_conflict(candidate, key, existing, metadata)
                    .await?
            }
        };

        if outcome.is_successful() && self.options.verify {
            self.verify(candidate, &key).await?;
        }

        Ok(Reconciled { outcome, key })
    }

    /// Check whether `key` exists and holds the same content as `candidate`
    pub async fn compare(
        &self,
        candidate: &CandidateFile,
        key: &DestinationKey,
        metadata: &mut UploadMetadata,
    ) -> ArchiveResult<RemoteState> {
        let blob_key = BlobKey::from(key);

        tracing::trace!(key = %blob_key, "Checking if blob exists");
        self.costs.add_other();
        if !self.store.exists(&blob_key).await? {
            return Ok(RemoteState::NotExists);
        }

        tracing::trace!(key = %blob_key, "Fetching blob properties");
        self.costs.add_other();
        let properties = match self.store.get_properties(&blob_key).await {
            Ok(properties) => properties,
            Err(StorageError::NotFound(_)) => return Ok(RemoteState::NotExists),
            Err(e) => return Err(e.into()),
        };

        if properties.size != candidate.size() {
            return Ok(RemoteState::Mismatched(properties));
        }

        let hash = candidate.record_hash(metadata).await?;
        match properties.content_hash {
            Some(stored) if stored == hash => Ok(RemoteState::Matching(properties)),
            Some(_) => Ok(RemoteState::Mismatched(properties)),
            None => {
                tracing::warn!(key = %blob_key, "Blob has no stored content hash");
                Ok(RemoteState::Mismatched(properties))
            }
        }
    }

    async fn resolve_conflict(
        &self,
        candidate: &CandidateFile,
        key: &DestinationKey,
        existing: BlobProperties,
        metadata: &mut UploadMetadata,
    ) -> ArchiveResult<(UploadOutcome, DestinationKey)> {
        match self.options.conflict_resolution {
            ConflictResolution::Skip => Ok((UploadOutcome::Conflict, key.clone())),

            // A hash-qualified name that still holds different content is not
            // retried again; it surfaces as an error.
            ConflictResolution::KeepBoth => {
                let hash = candidate.record_hash(metadata).await?;
                let renamed = key.keep_both(&hash);
                tracing::debug!(from = %key, to = %renamed, "Keeping both versions");

                match self.compare(candidate, &renamed, metadata).await? {
                    RemoteState::NotExists => {
                        let outcome = self.upload(candidate, &renamed, metadata).await?;
                        Ok((outcome, renamed))
                    }
                    RemoteState::Matching(_) => Ok((UploadOutcome::AlreadyExists, renamed)),
                    RemoteState::Mismatched(_) => Err(ArchiveError::UnresolvedConflict {
                        key: renamed.to_string(),
                        reason: "the hash-qualified name also holds different content"
                            .to_string(),
                    }),
                }
            }

            ConflictResolution::SnapshotAndOverwrite => {
                if existing.is_archived() {
                    return Err(ArchiveError::UnresolvedConflict {
                        key: key.to_string(),
                        reason: "archived blobs cannot be snapshotted".to_string(),
                    });
                }
                let blob_key = BlobKey::from(key);
                let snapshot = self.store.create_snapshot(&blob_key).await?;
                self.costs.add_write();
                tracing::debug!(key = %blob_key, snapshot = %snapshot, "Snapshot created");

                let outcome = self.upload(candidate, key, metadata).await?;
                Ok((outcome, key.clone()))
            }

            ConflictResolution::Overwrite => {
                if existing.is_archived() {
                    let blob_key = BlobKey::from(key);
                    tracing::debug!(key = %blob_key, "Deleting archived blob before overwrite");
                    self.store.delete(&blob_key).await?;
                }
                let outcome = self.upload(candidate, key, metadata).await?;
                Ok((outcome, key.clone()))
            }
        }
    }

    /// Upload content, metadata and content type to `key`.
    ///
    /// A missing container is created and the upload retried once.
    pub async fn upload(
        &self,
        candidate: &CandidateFile,
        key: &DestinationKey,
        metadata: &mut UploadMetadata,
    ) -> ArchiveResult<UploadOutcome> {
        let hash = candidate.record_hash(metadata).await?;
        let data = candidate.bytes().await?;
        let blob_key = BlobKey::from(key);

        let request = UploadRequest::new(
            data,
            content_type_for(&candidate.extension()),
            metadata.clone(),
        )
        .with_content_hash(hash)
        .with_access_tier(self.options.access_tier)
        .with_parallel_block_count(self.options.parallel_block_count);

        tracing::trace!(
            path = %candidate.path().display(),
            key = %blob_key,
            "Uploading"
        );

        match self.store.upload(&blob_key, request.clone()).await {
            Ok(()) => {}
            Err(StorageError::ContainerNotFound(container)) => {
                tracing::info!(container = %container, "Creating container");
                self.store
                    .create_container_if_not_exists(&blob_key.container)
                    .await?;
                self.costs.add_list_or_create_container();
                self.store.upload(&blob_key, request).await?;
            }
            Err(e) => return Err(e.into()),
        }

        self.costs.add_upload(candidate.size());
        Ok(UploadOutcome::Uploaded)
    }

    /// Compare the stored hash of `key` with the local content
    pub async fn verify(&self, candidate: &CandidateFile, key: &DestinationKey) -> ArchiveResult<()> {
        let blob_key = BlobKey::from(key);
        tracing::trace!(key = %blob_key, "Verifying");
        self.costs.add_other();
        let properties = self.store.get_properties(&blob_key).await?;
        let hash = candidate.hash().await?;

        if properties.content_hash != Some(hash) {
            return Err(ArchiveError::VerificationFailed {
                path: candidate.path().to_path_buf(),
                key: key.to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::files::FileSource;
    use crate::test_helpers::{MemoryBlobStore, MemoryFileSource};
    use shoebox_core::models::metadata::metadata_keys;
    use shoebox_core::{AccessTier, ContentHash};

    const NAME: &str = "IMG_20190525_120904.jpg";

    struct Fixture {
        store: MemoryBlobStore,
        files: MemoryFileSource,
        costs: Arc<CostEstimator>,
        key: DestinationKey,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                store: MemoryBlobStore::with_container("photos"),
                files: MemoryFileSource::new(),
                costs: Arc::new(CostEstimator::new()),
                key: DestinationKey::new("photos", "2019/05/25", NAME),
            }
        }

        fn reconciler(&self, policy: ConflictResolution) -> UploadReconciler {
            let options = UploadOptions {
                conflict_resolution: policy,
                ..UploadOptions::default()
            };
            UploadReconciler::new(Arc::new(self.store.clone()), self.costs.clone(), options)
        }

        async fn candidate(&self, data: &[u8]) -> CandidateFile {
            self.files.add(NAME, data.to_vec());
            let entry = self
                .files
                .list_files()
                .await
                .unwrap()
                .into_iter()
                .find(|f| f.name == NAME)
                .unwrap();
            CandidateFile::new(entry, Arc::new(self.files.clone()))
        }

        fn existing(&self, data: &[u8]) {
            self.store
                .put_blob(&BlobKey::from(&self.key), data, UploadMetadata::new());
        }
    }

    #[tokio::test]
    async fn test_uploads_when_missing() {
        let fixture = Fixture::new();
        let candidate = fixture.candidate(b"new content").await;
        let mut metadata = UploadMetadata::new();

        let reconciled = fixture
            .reconciler(ConflictResolution::Skip)
            .reconcile(&candidate, &fixture.key, &mut metadata)
            .await
            .unwrap();

        assert_eq!(reconciled.outcome, UploadOutcome::Uploaded);
        let blob = fixture.store.blob(&BlobKey::from(&fixture.key)).unwrap();
        assert_eq!(blob.content_type, "image/jpeg");
        assert_eq!(blob.tier, AccessTier::Cool);
        assert_eq!(
            blob.metadata.get(metadata_keys::ORIGINAL_MD5),
            Some(ContentHash::compute(b"new content").to_base64().as_str())
        );
        assert_eq!(fixture.costs.snapshot().bytes_written, 11);
    }

    #[tokio::test]
    async fn test_matching_blob_already_exists() {
        let fixture = Fixture::new();
        fixture.existing(b"same");
        let candidate = fixture.candidate(b"same").await;

        let reconciled = fixture
            .reconciler(ConflictResolution::Skip)
            .reconcile(&candidate, &fixture.key, &mut UploadMetadata::new())
            .await
            .unwrap();

        assert_eq!(reconciled.outcome, UploadOutcome::AlreadyExists);
        assert!(fixture.store.uploads().is_empty());
        assert_eq!(fixture.costs.snapshot().bytes_written, 0);
    }

    #[tokio::test]
    async fn test_skip_reports_conflict() {
        let fixture = Fixture::new();
        fixture.existing(b"old");
        let candidate = fixture.candidate(b"new").await;

        let reconciled = fixture
            .reconciler(ConflictResolution::Skip)
            .reconcile(&candidate, &fixture.key, &mut UploadMetadata::new())
            .await
            .unwrap();

        assert_eq!(reconciled.outcome, UploadOutcome::Conflict);
        let blob = fixture.store.blob(&BlobKey::from(&fixture.key)).unwrap();
        assert_eq!(&blob.data[..], b"old");
    }

    #[tokio::test]
    async fn test_missing_stored_hash_is_a_mismatch() {
        let fixture = Fixture::new();
        fixture.existing(b"same");
        fixture.store.clear_hash(&BlobKey::from(&fixture.key));
        let candidate = fixture.candidate(b"same").await;

        let state = fixture
            .reconciler(ConflictResolution::Skip)
            .compare(&candidate, &fixture.key, &mut UploadMetadata::new())
            .await
            .unwrap();
        assert!(matches!(state, RemoteState::Mismatched(_)));
    }

    #[tokio::test]
    async fn test_keep_both_uploads_hash_qualified_name() {
        let fixture = Fixture::new();
        fixture.existing(b"old");
        let candidate = fixture.candidate(b"new").await;
        let hex = ContentHash::compute(b"new").to_hex();

        let reconciled = fixture
            .reconciler(ConflictResolution::KeepBoth)
            .reconcile(&candidate, &fixture.key, &mut UploadMetadata::new())
            .await
            .unwrap();

        assert_eq!(reconciled.outcome, UploadOutcome::Uploaded);
        assert_eq!(
            reconciled.key.name,
            format!("IMG_20190525_120904.{}.jpg", hex)
        );
        let original = fixture.store.blob(&BlobKey::from(&fixture.key)).unwrap();
        assert_eq!(&original.data[..], b"old");
        let renamed = fixture.store.blob(&BlobKey::from(&reconciled.key)).unwrap();
        assert_eq!(&renamed.data[..], b"new");
    }

    #[tokio::test]
    async fn test_keep_both_second_mismatch_is_error() {
        let fixture = Fixture::new();
        fixture.existing(b"old");
        let renamed = fixture.key.keep_both(&ContentHash::compute(b"new"));
        fixture
            .store
            .put_blob(&BlobKey::from(&renamed), b"something else", UploadMetadata::new());
        let candidate = fixture.candidate(b"new").await;

        let err = fixture
            .reconciler(ConflictResolution::KeepBoth)
            .reconcile(&candidate, &fixture.key, &mut UploadMetadata::new())
            .await
            .unwrap_err();
        assert!(matches!(err, ArchiveError::UnresolvedConflict { .. }));
        assert!(fixture.store.uploads().is_empty());
    }

    #[tokio::test]
    async fn test_snapshot_and_overwrite() {
        let fixture = Fixture::new();
        fixture.existing(b"old");
        let candidate = fixture.candidate(b"new").await;

        let reconciled = fixture
            .reconciler(ConflictResolution::SnapshotAndOverwrite)
            .reconcile(&candidate, &fixture.key, &mut UploadMetadata::new())
            .await
            .unwrap();

        assert_eq!(reconciled.outcome, UploadOutcome::Uploaded);
        let snapshots = fixture.store.snapshots();
        assert_eq!(snapshots.len(), 1);
        assert_eq!(&snapshots[0].1[..], b"old");
        let blob = fixture.store.blob(&BlobKey::from(&fixture.key)).unwrap();
        assert_eq!(&blob.data[..], b"new");
    }

    #[tokio::test]
    async fn test_snapshot_refused_for_archived_blob() {
        let fixture = Fixture::new();
        fixture.existing(b"old");
        fixture
            .store
            .set_tier(&BlobKey::from(&fixture.key), AccessTier::Archive);
        let candidate = fixture.candidate(b"new").await;

        let err = fixture
            .reconciler(ConflictResolution::SnapshotAndOverwrite)
            .reconcile(&candidate, &fixture.key, &mut UploadMetadata::new())
            .await
            .unwrap_err();
        assert!(matches!(err, ArchiveError::UnresolvedConflict { .. }));
        assert!(fixture.store.snapshots().is_empty());
    }

    #[tokio::test]
    async fn test_overwrite_deletes_archived_blob_first() {
        let fixture = Fixture::new();
        fixture.existing(b"old");
        let blob_key = BlobKey::from(&fixture.key);
        fixture.store.set_tier(&blob_key, AccessTier::Archive);
        let candidate = fixture.candidate(b"new").await;

        let reconciled = fixture
            .reconciler(ConflictResolution::Overwrite)
            .reconcile(&candidate, &fixture.key, &mut UploadMetadata::new())
            .await
            .unwrap();

        assert_eq!(reconciled.outcome, UploadOutcome::Uploaded);
        assert_eq!(fixture.store.deletes(), vec![blob_key.clone()]);
        assert_eq!(&fixture.store.blob(&blob_key).unwrap().data[..], b"new");
    }

    #[tokio::test]
    async fn test_upload_creates_missing_container() {
        let fixture = Fixture {
            store: MemoryBlobStore::new(),
            ..Fixture::new()
        };
        let candidate = fixture.candidate(b"data").await;

        let reconciled = fixture
            .reconciler(ConflictResolution::Skip)
            .reconcile(&candidate, &fixture.key, &mut UploadMetadata::new())
            .await
            .unwrap();

        assert_eq!(reconciled.outcome, UploadOutcome::Uploaded);
        assert!(fixture.store.has_container("photos"));
        assert_eq!(fixture.costs.snapshot().list_or_create_containers, 1);
    }

    #[tokio::test]
    async fn test_verification_failure() {
        let fixture = Fixture::new();
        fixture.existing(b"same");
        fixture.store.corrupt_hash(&BlobKey::from(&fixture.key));
        let candidate = fixture.candidate(b"same").await;

        let err = fixture
            .reconciler(ConflictResolution::Skip)
            .verify(&candidate, &fixture.key)
            .await
            .unwrap_err();
        assert!(matches!(err, ArchiveError::VerificationFailed { .. }));
    }
}
