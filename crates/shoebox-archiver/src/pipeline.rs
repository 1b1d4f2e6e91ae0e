//! Archive pipeline driver
//!
//! Processes the candidate files of one run sequentially, in path order:
//! date resolution, base metadata, deduplication, enrichment, reconciliation,
//! then thumbnail upload and local deletion for successful outcomes. A failure
//! ends only the file it happened on.

use std::path::PathBuf;
use std::sync::Arc;

use shoebox_core::constants::ENRICHMENT_THUMBNAIL_SIZE;
use shoebox_core::models::metadata_keys;
use shoebox_core::{
    ArchiveError, ArchiveResult, ArchiverConfig, DestinationKey, ErrorMetadata, UploadMetadata,
    UploadOptions, UploadOutcome,
};
use shoebox_plugins::{FaceIdentifier, ImageDescriber};
use shoebox_processing::{is_jpeg, ImageThumbnailGenerator, ThumbnailGenerator};
use shoebox_storage::{BlobKey, BlobStore, StorageError, UploadRequest};
use tokio_util::sync::CancellationToken;

use crate::costs::CostEstimator;
use crate::date_resolver::{DateResolver, PeerFiles};
use crate::dedup::DeduplicationIndex;
use crate::files::{CandidateFile, FileEntry, FileSource, SearchPattern};
use crate::progress::ProgressSink;
use crate::reconciler::UploadReconciler;
use crate::report::{log_at, ArchiveReport, FileResult};

const THUMBNAIL_CONTENT_TYPE: &str = "image/jpeg";

pub struct ArchivePipeline {
    store: Arc<dyn BlobStore>,
    source: Arc<dyn FileSource>,
    config: ArchiverConfig,
    options: UploadOptions,
    costs: Arc<CostEstimator>,
    thumbnails: Arc<dyn ThumbnailGenerator>,
    describer: Option<Arc<dyn ImageDescriber>>,
    faces: Option<Arc<dyn FaceIdentifier>>,
}

/// State that lives for one run
struct RunContext {
    resolver: DateResolver,
    reconciler: UploadReconciler,
    dedup: DeduplicationIndex,
    peers: PeerFiles,
}

impl ArchivePipeline {
    pub fn new(
        store: Arc<dyn BlobStore>,
        source: Arc<dyn FileSource>,
        config: ArchiverConfig,
        options: UploadOptions,
        costs: Arc<CostEstimator>,
    ) -> Self {
        Self {
            store,
            source,
            config,
            options,
            costs,
            thumbnails: Arc::new(ImageThumbnailGenerator),
            describer: None,
            faces: None,
        }
    }

    pub fn with_thumbnail_generator(mut self, generator: Arc<dyn ThumbnailGenerator>) -> Self {
        self.thumbnails = generator;
        self
    }

    pub fn with_describer(mut self, describer: Arc<dyn ImageDescriber>) -> Self {
        self.describer = Some(describer);
        self
    }

    pub fn with_face_identifier(mut self, faces: Arc<dyn FaceIdentifier>) -> Self {
        self.faces = Some(faces);
        self
    }

    /// Files this run will process: filtered by the search pattern, sorted by
    /// path, then paged by skip/take.
    pub async fn candidates(&self) -> ArchiveResult<(Vec<FileEntry>, PeerFiles)> {
        let pattern = SearchPattern::new(&self.options.search_pattern)?;
        let all = self.source.list_files().await?;
        let peers = PeerFiles::new(&all);

        let mut matched: Vec<FileEntry> = all.into_iter().filter(|f| pattern.matches(f)).collect();
        matched.sort_by(|a, b| a.path.cmp(&b.path));

        let selected = matched
            .into_iter()
            .skip(self.options.skip)
            .take(self.options.take.unwrap_or(usize::MAX))
            .collect();
        Ok((selected, peers))
    }

    /// Archive every candidate file.
    ///
    /// Errors are returned only for failures before the first file is
    /// processed. Cancellation stops before the next file and returns the
    /// results gathered so far.
    pub async fn archive(
        &self,
        progress: &dyn ProgressSink,
        cancel: &CancellationToken,
    ) -> ArchiveResult<ArchiveReport> {
        self.options.validate()?;
        progress.indeterminate();

        let (files, peers) = self.candidates().await?;
        let total_items = files.len();
        let total_bytes: u64 = files.iter().map(|f| f.size).sum();

        let mut run = RunContext {
            resolver: DateResolver::new(self.source.clone()),
            reconciler: UploadReconciler::new(
                self.store.clone(),
                self.costs.clone(),
                self.options.clone(),
            ),
            dedup: DeduplicationIndex::new(self.store.clone(), self.costs.clone()),
            peers,
        };

        tracing::debug!(
            files = total_items,
            total_bytes,
            container = %self.config.container,
            "Archiving"
        );
        progress.initialize(total_bytes, total_items as u64);
        progress.bytes_progress(0);

        let mut report = ArchiveReport::default();
        let mut processed_items = 0u64;
        let mut processed_bytes = 0u64;
        let mut last_directory: Option<PathBuf> = None;

        for entry in files {
            if cancel.is_cancelled() {
                tracing::warn!(
                    remaining = total_items - processed_items as usize,
                    "Archive cancelled"
                );
                report.cancelled = true;
                break;
            }

            let directory = entry.directory().to_path_buf();
            if last_directory.as_ref() != Some(&directory) {
                tracing::info!("Processing directory '{}'", directory.display());
                last_directory = Some(directory);
            }

            let size = entry.size;
            let candidate = CandidateFile::new(entry, self.source.clone());
            tracing::trace!(path = %candidate.path().display(), "Processing");

            match self.process_file(&candidate, &mut run).await {
                Ok(outcome) => {
                    log_at(
                        outcome.log_level(),
                        &format!(
                            "{}\t{}\t({} of {})",
                            outcome,
                            candidate.name(),
                            processed_items + 1,
                            total_items
                        ),
                    );
                    report
                        .results
                        .push(FileResult::new(candidate.path(), outcome));
                }
                Err(e) => {
                    tracing::error!(
                        path = %candidate.path().display(),
                        error_code = e.error_code(),
                        error = %e.detailed_message(),
                        "Failed to process {}",
                        candidate.name()
                    );
                    progress.error();
                    report
                        .results
                        .push(FileResult::failed(candidate.path(), e));
                }
            }

            processed_items += 1;
            processed_bytes += size;
            progress.item_progress(processed_items);
            progress.bytes_progress(processed_bytes);
        }

        progress.finished();
        Ok(report)
    }

    async fn process_file(
        &self,
        file: &CandidateFile,
        run: &mut RunContext,
    ) -> ArchiveResult<UploadOutcome> {
        let Some(date) = run.resolver.resolve(file, &run.peers).await? else {
            return Ok(UploadOutcome::DateMissing);
        };

        let key = DestinationKey::for_date(
            &self.config.container,
            &self.config.directory_format,
            &date,
            file.name(),
        )?;
        let mut metadata = UploadMetadata::for_file(
            &file.path().to_string_lossy(),
            &date,
            file.size(),
        );

        if self.options.deduplicate {
            let hash = file.record_hash(&mut metadata).await?;
            if run
                .dedup
                .contains(&key.container, &key.directory, &hash)
                .await?
            {
                // a duplicate skips enrichment, upload, thumbnail and delete
                tracing::debug!(path = %file.path().display(), key = %key, "Duplicate content");
                return Ok(UploadOutcome::AlreadyExists);
            }
        }

        self.enrich(file, &mut metadata).await;

        let reconciled = run.reconciler.reconcile(file, &key, &mut metadata).await?;
        if self.options.deduplicate && reconciled.outcome.is_successful() {
            let hash = file.hash().await?;
            run.dedup.add(&key.container, &key.directory, hash);
        }
        let (outcome, key) = (reconciled.outcome, reconciled.key);

        if outcome.is_successful() {
            let thumbnails = &self.config.thumbnails;
            if is_jpeg(&file.extension())
                && thumbnails.is_enabled()
                && (outcome == UploadOutcome::Uploaded || thumbnails.force)
            {
                self.upload_thumbnail(file, &key, &metadata).await?;
            }

            if self.options.delete {
                tracing::trace!(path = %file.path().display(), "Deleting local file");
                self.source.delete(file.path()).await?;
            }
        }

        Ok(outcome)
    }

    /// Add caption, tags and people to `metadata`. Failures are logged and
    /// leave `metadata` as it was.
    async fn enrich(&self, file: &CandidateFile, metadata: &mut UploadMetadata) {
        if !is_jpeg(&file.extension()) || (self.describer.is_none() && self.faces.is_none()) {
            return;
        }

        let thumbnail = match self.enrichment_thumbnail(file).await {
            Ok(thumbnail) => thumbnail,
            Err(e) => {
                tracing::warn!(
                    path = %file.path().display(),
                    error = %e,
                    "Cannot prepare image for enrichment"
                );
                return;
            }
        };

        if let Some(describer) = &self.describer {
            tracing::trace!(path = %file.path().display(), plugin = describer.name(), "Describing");
            match describer.describe(thumbnail.clone()).await {
                Ok(description) => {
                    self.costs.add_describe();
                    if let Some(caption) = description.best_caption() {
                        metadata.insert(metadata_keys::CAPTION, &caption.text);
                    }
                    metadata.insert_list(metadata_keys::TAGS, &description.tags);
                }
                Err(e) => tracing::warn!(
                    path = %file.path().display(),
                    plugin = describer.name(),
                    error = %e,
                    "Image description failed"
                ),
            }
        }

        if let Some(faces) = &self.faces {
            tracing::trace!(path = %file.path().display(), plugin = faces.name(), "Identifying faces");
            match faces.identify(thumbnail).await {
                Ok(people) => {
                    self.costs.add_face();
                    metadata.insert_list(metadata_keys::PEOPLE, &people);
                }
                Err(e) => tracing::warn!(
                    path = %file.path().display(),
                    plugin = faces.name(),
                    error = %e,
                    "Face identification failed"
                ),
            }
        }
    }

    async fn enrichment_thumbnail(&self, file: &CandidateFile) -> ArchiveResult<bytes::Bytes> {
        let data = file.bytes().await?;
        self.thumbnails
            .generate(data, ENRICHMENT_THUMBNAIL_SIZE, ENRICHMENT_THUMBNAIL_SIZE)
            .await
            .map_err(|e| ArchiveError::Thumbnail(e.to_string()))
    }

    /// Store a thumbnail under the same blob name in the thumbnail container
    async fn upload_thumbnail(
        &self,
        file: &CandidateFile,
        key: &DestinationKey,
        metadata: &UploadMetadata,
    ) -> ArchiveResult<()> {
        let Some((max_width, max_height)) = self.config.thumbnails.bounds() else {
            return Ok(());
        };

        let data = file.bytes().await?;
        let thumbnail = self
            .thumbnails
            .generate(data, max_width, max_height)
            .await
            .map_err(|e| ArchiveError::Thumbnail(e.to_string()))?;
        let size = thumbnail.len() as u64;

        let blob_key = BlobKey::new(&self.config.thumbnails.container, key.blob_name());
        let request = UploadRequest::new(thumbnail, THUMBNAIL_CONTENT_TYPE, metadata.clone());
        tracing::trace!(key = %blob_key, size_bytes = size, "Uploading thumbnail");

        match self.store.upload(&blob_key, request.clone()).await {
            Ok(()) => {}
            Err(StorageError::ContainerNotFound(_)) => {
                self.store
                    .create_container_if_not_exists(&blob_key.container)
                    .await?;
                self.costs.add_list_or_create_container();
                self.store.upload(&blob_key, request).await?;
            }
            Err(StorageError::BlobArchived(_)) if self.config.thumbnails.force => {
                tracing::debug!(key = %blob_key, "Replacing archived thumbnail");
                self.store.delete(&blob_key).await?;
                self.store.upload(&blob_key, request).await?;
            }
            Err(e) => return Err(e.into()),
        }

        self.costs.add_upload(size);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{
        MemoryBlobStore, MemoryFileSource, ProgressEvent, RecordingProgress, StubThumbnails,
    };
    use shoebox_core::ThumbnailConfig;
    use shoebox_plugins::test_helpers::{MockDescriber, MockFaceIdentifier};

    struct Fixture {
        store: MemoryBlobStore,
        files: MemoryFileSource,
        costs: Arc<CostEstimator>,
        config: ArchiverConfig,
        options: UploadOptions,
        thumbnails: StubThumbnails,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                store: MemoryBlobStore::new(),
                files: MemoryFileSource::new(),
                costs: Arc::new(CostEstimator::new()),
                config: ArchiverConfig::default(),
                options: UploadOptions {
                    verify: false,
                    ..UploadOptions::default()
                },
                thumbnails: StubThumbnails::new(),
            }
        }

        fn with_thumbnails(mut self, force: bool) -> Self {
            self.config.thumbnails = ThumbnailConfig {
                max_width: Some(200),
                max_height: Some(200),
                force,
                ..ThumbnailConfig::default()
            };
            self
        }

        fn pipeline(&self) -> ArchivePipeline {
            ArchivePipeline::new(
                Arc::new(self.store.clone()),
                Arc::new(self.files.clone()),
                self.config.clone(),
                self.options.clone(),
                self.costs.clone(),
            )
            .with_thumbnail_generator(Arc::new(self.thumbnails.clone()))
        }

        async fn run(&self, pipeline: &ArchivePipeline) -> ArchiveReport {
            pipeline
                .archive(&RecordingProgress::new(), &CancellationToken::new())
                .await
                .unwrap()
        }

        fn outcomes(report: &ArchiveReport) -> Vec<UploadOutcome> {
            report.results.iter().map(|r| r.outcome).collect()
        }
    }

    #[tokio::test]
    async fn test_candidates_sorted_filtered_and_paged() {
        let mut fixture = Fixture::new();
        for name in ["b/IMG_20190101_000000.jpg", "a/IMG_20190102_000000.jpg", "a/notes.txt", "c/IMG_20190103_000000.JPG"] {
            fixture.files.add(name, b"x".to_vec());
        }
        fixture.options.search_pattern = "**/*.jpg".to_string();
        fixture.options.skip = 1;
        fixture.options.take = Some(1);

        let (files, peers) = fixture.pipeline().candidates().await.unwrap();

        let names: Vec<&str> = files.iter().map(|f| f.relative_path.as_str()).collect();
        assert_eq!(names, vec!["b/IMG_20190101_000000.jpg"]);
        assert_eq!(peers.len(), 4);
    }

    #[tokio::test]
    async fn test_date_missing_is_reported_and_counted() {
        let fixture = Fixture::new();
        fixture.files.add("notes.txt", b"hello".to_vec());
        fixture.files.add("IMG_20190525_120904.jpg", b"photo".to_vec());
        let progress = RecordingProgress::new();

        let report = fixture
            .pipeline()
            .archive(&progress, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(
            Fixture::outcomes(&report),
            vec![UploadOutcome::Uploaded, UploadOutcome::DateMissing]
        );
        assert_eq!(progress.items(), Some(2));
        assert_eq!(progress.bytes(), Some(10));
        let events = progress.events();
        assert_eq!(events.first(), Some(&ProgressEvent::Indeterminate));
        assert_eq!(
            events[1],
            ProgressEvent::Initialize {
                total_bytes: 10,
                total_items: 2
            }
        );
        assert_eq!(events.last(), Some(&ProgressEvent::Finished));
    }

    #[tokio::test]
    async fn test_error_does_not_abort_batch() {
        let fixture = Fixture::new();
        fixture.files.add("IMG_20190525_120904.jpg", b"one".to_vec());
        fixture.files.add("IMG_20190526_120904.jpg", b"two".to_vec());
        fixture.store.set_fail_uploads(true);
        let progress = RecordingProgress::new();

        let report = fixture
            .pipeline()
            .archive(&progress, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(
            Fixture::outcomes(&report),
            vec![UploadOutcome::Error, UploadOutcome::Error]
        );
        assert!(report.results[0].error.is_some());
        assert!(progress.events().contains(&ProgressEvent::Error));
        assert_eq!(progress.items(), Some(2));
    }

    #[tokio::test]
    async fn test_cancelled_before_start() {
        let fixture = Fixture::new();
        fixture.files.add("IMG_20190525_120904.jpg", b"one".to_vec());
        let cancel = CancellationToken::new();
        cancel.cancel();

        let report = fixture
            .pipeline()
            .archive(&RecordingProgress::new(), &cancel)
            .await
            .unwrap();

        assert!(report.cancelled);
        assert!(report.results.is_empty());
        assert!(fixture.store.uploads().is_empty());
    }

    #[tokio::test]
    async fn test_cancelled_mid_run_keeps_earlier_outcomes() {
        let fixture = Fixture::new();
        fixture.files.add("IMG_20190525_120904.jpg", b"one".to_vec());
        fixture.files.add("IMG_20190526_120904.jpg", b"two".to_vec());
        fixture.files.add("IMG_20190527_120904.jpg", b"three".to_vec());
        let cancel = CancellationToken::new();
        let progress = RecordingProgress::cancelling_after(1, cancel.clone());

        let report = fixture
            .pipeline()
            .archive(&progress, &cancel)
            .await
            .unwrap();

        assert!(report.cancelled);
        assert_eq!(Fixture::outcomes(&report), vec![UploadOutcome::Uploaded]);
        assert_eq!(
            fixture.store.blob_names("photos"),
            vec!["2019/05/25/IMG_20190525_120904.jpg".to_string()]
        );
        assert_eq!(progress.items(), Some(1));
    }

    #[tokio::test]
    async fn test_enrichment_metadata_for_jpeg() {
        let fixture = Fixture::new();
        fixture.files.add("IMG_20190525_120904.jpg", b"photo".to_vec());
        fixture.files.add("VID_20190525_120904.mp4", b"video".to_vec());
        let describer = MockDescriber::new("a dog on a beach", &["dog", "beach"]);
        let faces = MockFaceIdentifier::new(&["alice", "bob"]);
        let pipeline = fixture
            .pipeline()
            .with_describer(Arc::new(describer.clone()))
            .with_face_identifier(Arc::new(faces.clone()));

        fixture.run(&pipeline).await;

        let blob = fixture
            .store
            .blob(&BlobKey::new("photos", "2019/05/25/IMG_20190525_120904.jpg"))
            .unwrap();
        assert_eq!(blob.metadata.get(metadata_keys::CAPTION), Some("a dog on a beach"));
        assert_eq!(blob.metadata.get(metadata_keys::TAGS), Some("dog, beach"));
        assert_eq!(blob.metadata.get(metadata_keys::PEOPLE), Some("alice, bob"));
        assert_eq!(describer.calls(), 1);
        assert_eq!(faces.calls(), 1);
        assert_eq!(fixture.costs.snapshot().describes, 1);

        let video = fixture
            .store
            .blob(&BlobKey::new("photos", "2019/05/25/VID_20190525_120904.mp4"))
            .unwrap();
        assert!(!video.metadata.contains_key(metadata_keys::TAGS));
    }

    #[tokio::test]
    async fn test_enrichment_failures_are_swallowed() {
        let fixture = Fixture::new();
        fixture.files.add("IMG_20190525_120904.jpg", b"photo".to_vec());
        let pipeline = fixture
            .pipeline()
            .with_describer(Arc::new(MockDescriber::failing()))
            .with_face_identifier(Arc::new(MockFaceIdentifier::failing()));

        let report = fixture.run(&pipeline).await;

        assert_eq!(Fixture::outcomes(&report), vec![UploadOutcome::Uploaded]);
        let blob = fixture
            .store
            .blob(&BlobKey::new("photos", "2019/05/25/IMG_20190525_120904.jpg"))
            .unwrap();
        assert!(!blob.metadata.contains_key(metadata_keys::CAPTION));
        assert_eq!(fixture.costs.snapshot().describes, 0);
    }

    #[tokio::test]
    async fn test_thumbnail_only_for_fresh_uploads() {
        let fixture = Fixture::new().with_thumbnails(false);
        fixture.files.add("IMG_20190525_120904.jpg", b"photo".to_vec());
        let pipeline = fixture.pipeline();

        fixture.run(&pipeline).await;
        let thumbnail_key = BlobKey::new("photos-thumbnails", "2019/05/25/IMG_20190525_120904.jpg");
        let thumbnail = fixture.store.blob(&thumbnail_key).unwrap();
        assert_eq!(&thumbnail.data[..], StubThumbnails::OUTPUT);
        assert_eq!(thumbnail.content_type, "image/jpeg");
        assert!(thumbnail.metadata.contains_key(metadata_keys::ORIGINAL_FILE_NAME));

        let report = fixture.run(&pipeline).await;
        assert_eq!(Fixture::outcomes(&report), vec![UploadOutcome::AlreadyExists]);
        assert_eq!(fixture.thumbnails.calls(), 1);
    }

    #[tokio::test]
    async fn test_online_thumbnail_is_overwritten_in_place() {
        let fixture = Fixture::new().with_thumbnails(false);
        let thumbnail_key = BlobKey::new("photos-thumbnails", "2019/05/25/IMG_20190525_120904.jpg");
        fixture
            .store
            .put_blob(&thumbnail_key, b"stale thumbnail", UploadMetadata::new());
        fixture.files.add("IMG_20190525_120904.jpg", b"photo".to_vec());

        let report = fixture.run(&fixture.pipeline()).await;

        assert_eq!(Fixture::outcomes(&report), vec![UploadOutcome::Uploaded]);
        assert!(fixture.store.deletes().is_empty());
        let thumbnail = fixture.store.blob(&thumbnail_key).unwrap();
        assert_eq!(&thumbnail.data[..], StubThumbnails::OUTPUT);
    }

    #[tokio::test]
    async fn test_forced_thumbnail_replaces_archived_one() {
        let fixture = Fixture::new().with_thumbnails(true);
        fixture.files.add("IMG_20190525_120904.jpg", b"photo".to_vec());
        let pipeline = fixture.pipeline();
        fixture.run(&pipeline).await;

        let thumbnail_key = BlobKey::new("photos-thumbnails", "2019/05/25/IMG_20190525_120904.jpg");
        fixture
            .store
            .set_tier(&thumbnail_key, shoebox_core::AccessTier::Archive);

        let report = fixture.run(&pipeline).await;

        assert_eq!(Fixture::outcomes(&report), vec![UploadOutcome::AlreadyExists]);
        assert_eq!(fixture.store.deletes(), vec![thumbnail_key.clone()]);
        assert!(!fixture.store.blob(&thumbnail_key).unwrap().tier.is_archive());
    }

    #[tokio::test]
    async fn test_thumbnail_failure_is_file_error() {
        let mut fixture = Fixture::new().with_thumbnails(false);
        fixture.thumbnails = StubThumbnails::failing();
        fixture.files.add("IMG_20190525_120904.jpg", b"photo".to_vec());

        let report = fixture.run(&fixture.pipeline()).await;

        assert_eq!(Fixture::outcomes(&report), vec![UploadOutcome::Error]);
        assert!(matches!(
            report.results[0].error,
            Some(ArchiveError::Thumbnail(_))
        ));
    }

    #[tokio::test]
    async fn test_delete_only_after_success() {
        let mut fixture = Fixture::new();
        fixture.options.delete = true;
        let uploaded = fixture.files.add("IMG_20190525_120904.jpg", b"new".to_vec());
        let conflicting = fixture.files.add("IMG_20190526_120904.jpg", b"new".to_vec());
        fixture.store.put_blob(
            &BlobKey::new("photos", "2019/05/26/IMG_20190526_120904.jpg"),
            b"old",
            UploadMetadata::new(),
        );

        let report = fixture.run(&fixture.pipeline()).await;

        assert_eq!(
            Fixture::outcomes(&report),
            vec![UploadOutcome::Uploaded, UploadOutcome::Conflict]
        );
        assert!(!fixture.files.contains(&uploaded));
        assert!(fixture.files.contains(&conflicting));
    }

    #[tokio::test]
    async fn test_deduplicate_skips_same_content_under_other_name() {
        let mut fixture = Fixture::new();
        fixture.options.deduplicate = true;
        fixture.files.add("a/IMG_20190525_120904.jpg", b"same".to_vec());
        fixture.files.add("b/IMG_20190525_130000.jpg", b"same".to_vec());

        let report = fixture.run(&fixture.pipeline()).await;

        assert_eq!(
            Fixture::outcomes(&report),
            vec![UploadOutcome::Uploaded, UploadOutcome::AlreadyExists]
        );
        assert_eq!(
            fixture.store.blob_names("photos"),
            vec!["2019/05/25/IMG_20190525_120904.jpg".to_string()]
        );
        assert_eq!(fixture.costs.snapshot().list_or_create_containers, 2);
    }

    #[tokio::test]
    async fn test_duplicate_skips_thumbnail_and_delete() {
        let mut fixture = Fixture::new().with_thumbnails(true);
        fixture.options.deduplicate = true;
        fixture.options.delete = true;
        let first = fixture.files.add("a/IMG_20190525_120904.jpg", b"same".to_vec());
        let duplicate = fixture.files.add("b/IMG_20190525_130000.jpg", b"same".to_vec());

        let report = fixture.run(&fixture.pipeline()).await;

        assert_eq!(
            Fixture::outcomes(&report),
            vec![UploadOutcome::Uploaded, UploadOutcome::AlreadyExists]
        );
        assert!(!fixture.files.contains(&first));
        assert!(fixture.files.contains(&duplicate));
        assert_eq!(fixture.thumbnails.calls(), 1);
    }
}
