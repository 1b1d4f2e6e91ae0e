//! Retrieval of archived files
//!
//! A download lists the date directories in range, keeps the blobs matching
//! the tag/people filters and writes each one into the target directory.
//! Blobs in the archive tier cannot be read directly: the first attempt
//! requests rehydration and reports `Pending`, and the pending items are
//! saved as a retrieval session for `resume` to pick up later.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::NaiveTime;
use futures::StreamExt;
use shoebox_core::models::key::format_directory;
use shoebox_core::models::metadata_keys;
use shoebox_core::{
    AccessTier, ArchiveError, ArchiveResult, ArchiverConfig, ContentHash, DownloadOptions,
    DownloadOutcome, ErrorMetadata, PendingItem, RetrievalSession, UploadMetadata,
};
use shoebox_storage::keys::directory_prefix;
use shoebox_storage::{BlobItem, BlobKey, BlobProperties, BlobStore, StorageError};
use tokio::fs;
use tokio_util::sync::CancellationToken;

use crate::costs::CostEstimator;
use crate::files::FileSource;
use crate::progress::ProgressSink;
use crate::report::{log_at, BlobResult, RetrieveReport};

/// Per-blob behaviour shared by `download` and `resume`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetrieveOptions {
    pub verify: bool,
    /// Move the blob back to the archive tier once downloaded
    pub archive: bool,
    pub rehydration_tier: AccessTier,
}

impl Default for RetrieveOptions {
    fn default() -> Self {
        Self {
            verify: false,
            archive: false,
            rehydration_tier: AccessTier::Hot,
        }
    }
}

impl From<&DownloadOptions> for RetrieveOptions {
    fn from(options: &DownloadOptions) -> Self {
        Self {
            verify: options.verify,
            archive: options.archive,
            rehydration_tier: options.rehydration_tier,
        }
    }
}

/// Whether a blob passes the tag and people filters.
///
/// Tags take precedence: when any are requested, people are not consulted.
pub fn matches_filters(metadata: &UploadMetadata, options: &DownloadOptions) -> bool {
    if !options.tags.is_empty() {
        return matches_any(metadata, metadata_keys::TAGS, &options.tags);
    }
    if !options.people.is_empty() {
        return matches_any(metadata, metadata_keys::PEOPLE, &options.people);
    }
    true
}

fn matches_any(metadata: &UploadMetadata, key: &str, wanted: &[String]) -> bool {
    let values = metadata.get_list(key);
    wanted.iter().any(|w| values.iter().any(|v| v == w.trim()))
}

pub struct Retriever {
    store: Arc<dyn BlobStore>,
    files: Arc<dyn FileSource>,
    container: String,
    directory_format: String,
    sessions: SessionStore,
    costs: Arc<CostEstimator>,
}

impl Retriever {
    pub fn new(
        store: Arc<dyn BlobStore>,
        files: Arc<dyn FileSource>,
        config: &ArchiverConfig,
        costs: Arc<CostEstimator>,
    ) -> Self {
        Self {
            store,
            files,
            container: config.container.clone(),
            directory_format: config.directory_format.clone(),
            sessions: SessionStore::new(&config.sessions_dir),
            costs,
        }
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    /// Blobs under every date directory in range that match the filters
    pub async fn collect(&self, options: &DownloadOptions) -> ArchiveResult<Vec<BlobItem>> {
        let mut blobs = Vec::new();
        for date in options.dates() {
            let directory = format_directory(&self.directory_format, &date.and_time(NaiveTime::MIN))?;
            let prefix = directory_prefix(&directory);
            tracing::trace!(date = %date, prefix = %prefix, "Listing blobs by date");
            self.costs.add_list_or_create_container();

            let mut stream = self.store.list_blobs(&self.container, &prefix, true).await?;
            while let Some(item) = stream.next().await {
                let item = item?;
                if matches_filters(&item.properties.metadata, options) {
                    blobs.push(item);
                }
            }
        }
        Ok(blobs)
    }

    /// Download the matching blobs into `target_dir`.
    ///
    /// Blobs that are still pending are saved as a new retrieval session.
    pub async fn download(
        &self,
        options: &DownloadOptions,
        target_dir: &Path,
        progress: &dyn ProgressSink,
        cancel: &CancellationToken,
    ) -> ArchiveResult<RetrieveReport> {
        options.validate()?;
        progress.indeterminate();

        let blobs = self.collect(options).await?;
        let total_items = blobs.len();
        let total_bytes: u64 = blobs.iter().map(|b| b.properties.size).sum();
        progress.initialize(total_bytes, total_items as u64);
        progress.bytes_progress(0);

        let retrieve = RetrieveOptions::from(options);
        let mut report = RetrieveReport::default();
        let mut processed_items = 0u64;
        let mut processed_bytes = 0u64;

        for blob in blobs {
            if cancel.is_cancelled() {
                tracing::warn!("Download cancelled");
                report.cancelled = true;
                break;
            }

            let key = BlobKey::new(self.container.clone(), blob.name.clone());
            let local_path = target_dir.join(key.file_name());
            let result = self
                .retrieve_blob(&key, &blob.properties, &local_path, &retrieve)
                .await;
            report
                .results
                .push(self.record(key.identifier(), local_path, result, progress));

            processed_items += 1;
            processed_bytes += blob.properties.size;
            progress.item_progress(processed_items);
            progress.bytes_progress(processed_bytes);
        }

        let pending: Vec<PendingItem> = report
            .results
            .iter()
            .filter(|r| r.outcome == DownloadOutcome::Pending)
            .map(|r| PendingItem::new(r.blob_identifier.clone(), r.local_path.clone()))
            .collect();
        if !pending.is_empty() {
            let session = RetrievalSession::new(target_dir, pending);
            let path = self.sessions.save(&session).await?;
            tracing::info!(
                session = %session.id,
                pending = session.pending_items.len(),
                path = %path.display(),
                "Saved retrieval session"
            );
        }

        progress.finished();
        Ok(report)
    }

    /// Retry the pending items of every saved session.
    ///
    /// A session whose items all succeeded is deleted; otherwise it is
    /// rewritten with the items that did not.
    pub async fn resume(
        &self,
        options: &RetrieveOptions,
        progress: &dyn ProgressSink,
        cancel: &CancellationToken,
    ) -> ArchiveResult<RetrieveReport> {
        progress.indeterminate();
        let sessions = self.sessions.load_all().await?;
        let total_items: usize = sessions.iter().map(|s| s.pending_items.len()).sum();
        progress.initialize(0, total_items as u64);

        let mut report = RetrieveReport::default();
        let mut processed_items = 0u64;

        for session in sessions {
            if cancel.is_cancelled() {
                report.cancelled = true;
                break;
            }
            tracing::info!(
                session = %session.id,
                pending = session.pending_items.len(),
                "Continuing retrieval session"
            );

            let mut session_report = RetrieveReport::default();
            let mut remaining = Vec::new();
            for item in &session.pending_items {
                if cancel.is_cancelled() {
                    session_report.cancelled = true;
                    remaining.push(item.clone());
                    continue;
                }

                let result = self.resume_item(item, options).await;
                let recorded = self.record(
                    item.blob_identifier.clone(),
                    item.local_path.clone(),
                    result,
                    progress,
                );
                if !recorded.outcome.is_successful() {
                    remaining.push(item.clone());
                }
                session_report.results.push(recorded);

                processed_items += 1;
                progress.item_progress(processed_items);
            }

            if remaining.is_empty() {
                self.sessions.delete(&session).await?;
                tracing::info!(session = %session.id, "Retrieval session completed");
            } else {
                let session = RetrievalSession {
                    pending_items: remaining,
                    ..session
                };
                self.sessions.save(&session).await?;
                tracing::info!(
                    session = %session.id,
                    pending = session.pending_items.len(),
                    "Retrieval session still has pending items"
                );
            }
            report.extend(session_report);
        }

        progress.finished();
        Ok(report)
    }

    async fn resume_item(
        &self,
        item: &PendingItem,
        options: &RetrieveOptions,
    ) -> ArchiveResult<DownloadOutcome> {
        let key = BlobKey::parse(&item.blob_identifier)?;
        self.costs.add_other();
        let properties = self.store.get_properties(&key).await?;
        self.retrieve_blob(&key, &properties, &item.local_path, options)
            .await
    }

    /// Move one blob towards the local file at `local_path`
    async fn retrieve_blob(
        &self,
        key: &BlobKey,
        properties: &BlobProperties,
        local_path: &Path,
        options: &RetrieveOptions,
    ) -> ArchiveResult<DownloadOutcome> {
        if properties.rehydrating {
            return Ok(DownloadOutcome::Pending);
        }
        if properties.is_archived() {
            tracing::info!("Rehydrate '{}'", key);
            self.store
                .set_access_tier(key, options.rehydration_tier)
                .await?;
            self.costs.add_read();
            self.costs.add_write();
            return Ok(DownloadOutcome::Pending);
        }
        if self.files.exists(local_path).await? {
            return Ok(DownloadOutcome::Conflict);
        }

        let data = match self.store.download(key).await {
            Ok(data) => data,
            Err(StorageError::BeingRehydrated(_)) => return Ok(DownloadOutcome::Pending),
            Err(e) => return Err(e.into()),
        };
        self.costs.add_download(data.len() as u64);

        if options.verify {
            let stored = match properties.content_hash {
                Some(hash) => Some(hash),
                None => {
                    self.costs.add_other();
                    self.store.get_properties(key).await?.content_hash
                }
            };
            if stored != Some(ContentHash::compute(&data)) {
                return Err(ArchiveError::VerificationFailed {
                    path: local_path.to_path_buf(),
                    key: key.identifier(),
                });
            }
        }

        tracing::trace!(key = %key, path = %local_path.display(), size_bytes = data.len(), "Writing");
        self.files.create_file(local_path, data).await?;

        if options.archive {
            self.store.set_access_tier(key, AccessTier::Archive).await?;
            self.costs.add_read();
            self.costs.add_write();
        }
        Ok(DownloadOutcome::Succeeded)
    }

    fn record(
        &self,
        blob_identifier: String,
        local_path: PathBuf,
        result: ArchiveResult<DownloadOutcome>,
        progress: &dyn ProgressSink,
    ) -> BlobResult {
        match result {
            Ok(outcome) => {
                log_at(
                    outcome.log_level(),
                    &format!("{}\t{}", outcome, blob_identifier),
                );
                BlobResult::new(blob_identifier, local_path, outcome)
            }
            Err(e) => {
                tracing::error!(
                    blob = %blob_identifier,
                    error_code = e.error_code(),
                    error = %e.detailed_message(),
                    "Failed to retrieve blob"
                );
                progress.error();
                BlobResult::failed(blob_identifier, local_path, e)
            }
        }
    }
}

/// Retrieval sessions stored as one JSON file each
#[derive(Debug, Clone)]
pub struct SessionStore {
    dir: PathBuf,
}

impl SessionStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_of(&self, session: &RetrievalSession) -> PathBuf {
        self.dir.join(session.file_name())
    }

    /// Write `session`, replacing an earlier version of it
    pub async fn save(&self, session: &RetrievalSession) -> ArchiveResult<PathBuf> {
        fs::create_dir_all(&self.dir).await?;
        let path = self.path_of(session);
        let json = serde_json::to_vec_pretty(session)?;
        fs::write(&path, json).await?;
        Ok(path)
    }

    /// Every readable session, oldest first. Unreadable files are skipped.
    pub async fn load_all(&self) -> ArchiveResult<Vec<RetrievalSession>> {
        if !fs::try_exists(&self.dir).await? {
            return Ok(Vec::new());
        }

        let mut sessions = Vec::new();
        let mut entries = fs::read_dir(&self.dir).await?;
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let data = fs::read(&path).await?;
            match serde_json::from_slice::<RetrievalSession>(&data) {
                Ok(session) => sessions.push(session),
                Err(e) => tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "Skipping unreadable retrieval session"
                ),
            }
        }

        sessions.sort_by(|a, b| a.started.cmp(&b.started).then(a.id.cmp(&b.id)));
        Ok(sessions)
    }

    pub async fn delete(&self, session: &RetrievalSession) -> ArchiveResult<()> {
        match fs::remove_file(self.path_of(session)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{MemoryBlobStore, MemoryFileSource, RecordingProgress};
    use chrono::NaiveDate;
    use tempfile::TempDir;

    fn options() -> DownloadOptions {
        DownloadOptions::new(NaiveDate::from_ymd_opt(2019, 5, 25).unwrap())
    }

    fn tagged(tags: &str, people: &str) -> UploadMetadata {
        let mut metadata = UploadMetadata::new();
        if !tags.is_empty() {
            metadata.insert(metadata_keys::TAGS, tags);
        }
        if !people.is_empty() {
            metadata.insert(metadata_keys::PEOPLE, people);
        }
        metadata
    }

    struct Fixture {
        sessions: TempDir,
        store: MemoryBlobStore,
        files: MemoryFileSource,
        costs: Arc<CostEstimator>,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                sessions: TempDir::new().unwrap(),
                store: MemoryBlobStore::with_container("photos"),
                files: MemoryFileSource::new(),
                costs: Arc::new(CostEstimator::new()),
            }
        }

        fn retriever(&self) -> Retriever {
            let config = ArchiverConfig {
                sessions_dir: self.sessions.path().to_path_buf(),
                ..ArchiverConfig::default()
            };
            Retriever::new(
                Arc::new(self.store.clone()),
                Arc::new(self.files.clone()),
                &config,
                self.costs.clone(),
            )
        }

        fn blob(&self, name: &str, data: &[u8]) -> BlobKey {
            let key = BlobKey::new("photos", format!("2019/05/25/{}", name));
            self.store.put_blob(&key, data, UploadMetadata::new());
            key
        }

        async fn download(&self, options: &DownloadOptions) -> RetrieveReport {
            self.retriever()
                .download(
                    options,
                    Path::new("/restore"),
                    &RecordingProgress::new(),
                    &CancellationToken::new(),
                )
                .await
                .unwrap()
        }

        async fn resume(&self) -> RetrieveReport {
            self.retriever()
                .resume(
                    &RetrieveOptions::default(),
                    &RecordingProgress::new(),
                    &CancellationToken::new(),
                )
                .await
                .unwrap()
        }
    }

    fn outcomes(report: &RetrieveReport) -> Vec<DownloadOutcome> {
        report.results.iter().map(|r| r.outcome).collect()
    }

    #[test]
    fn test_tags_take_precedence_over_people() {
        let mut options = options();
        options.tags = vec!["dog".to_string()];
        options.people = vec!["alice".to_string()];

        assert!(matches_filters(&tagged("beach, dog", ""), &options));
        assert!(!matches_filters(&tagged("beach", "alice"), &options));
        assert!(!matches_filters(&tagged("", "alice"), &options));
    }

    #[test]
    fn test_people_filter_and_no_filter() {
        let mut options = options();
        assert!(matches_filters(&UploadMetadata::new(), &options));

        options.people = vec![" bob ".to_string()];
        assert!(matches_filters(&tagged("", "alice,bob"), &options));
        assert!(!matches_filters(&tagged("", "bobby"), &options));
        assert!(!matches_filters(&UploadMetadata::new(), &options));
    }

    #[tokio::test]
    async fn test_download_outcomes() {
        let fixture = Fixture::new();
        fixture.blob("a.jpg", b"aaa");
        let archived = fixture.blob("b.jpg", b"bbb");
        fixture.store.set_tier(&archived, AccessTier::Archive);
        fixture.blob("c.jpg", b"ccc");
        fixture.files.add("/restore/c.jpg", b"local".to_vec());
        fixture.store.put_blob(
            &BlobKey::new("photos", "2019/05/26/d.jpg"),
            b"other day",
            UploadMetadata::new(),
        );

        let report = fixture.download(&options()).await;

        assert_eq!(
            outcomes(&report),
            vec![
                DownloadOutcome::Succeeded,
                DownloadOutcome::Pending,
                DownloadOutcome::Conflict
            ]
        );
        assert_eq!(
            fixture.files.get(Path::new("/restore/a.jpg")).as_deref(),
            Some(&b"aaa"[..])
        );
        assert!(fixture.store.blob(&archived).unwrap().rehydrate_to.is_some());
        assert_eq!(fixture.costs.snapshot().bytes_read, 3);

        let sessions = fixture.retriever().sessions().load_all().await.unwrap();
        assert_eq!(sessions.len(), 1);
        assert_eq!(
            sessions[0].pending_items,
            vec![PendingItem::new("photos/2019/05/25/b.jpg", "/restore/b.jpg")]
        );
    }

    #[tokio::test]
    async fn test_download_filters_by_tags() {
        let fixture = Fixture::new();
        fixture.store.put_blob(
            &BlobKey::new("photos", "2019/05/25/dog.jpg"),
            b"dog",
            tagged("dog, beach", ""),
        );
        fixture.store.put_blob(
            &BlobKey::new("photos", "2019/05/25/cat.jpg"),
            b"cat",
            tagged("cat", ""),
        );
        let mut options = options();
        options.tags = vec!["dog".to_string()];

        let report = fixture.download(&options).await;

        assert_eq!(report.results.len(), 1);
        assert_eq!(report.results[0].blob_identifier, "photos/2019/05/25/dog.jpg");
    }

    #[tokio::test]
    async fn test_verification_failure_writes_nothing() {
        let fixture = Fixture::new();
        let key = fixture.blob("a.jpg", b"aaa");
        fixture.store.corrupt_hash(&key);
        let mut options = options();
        options.verify = true;

        let report = fixture.download(&options).await;

        assert_eq!(outcomes(&report), vec![DownloadOutcome::Failed]);
        assert!(matches!(
            report.results[0].error,
            Some(ArchiveError::VerificationFailed { .. })
        ));
        assert!(!fixture.files.contains(Path::new("/restore/a.jpg")));
    }

    #[tokio::test]
    async fn test_archive_after_download() {
        let fixture = Fixture::new();
        let key = fixture.blob("a.jpg", b"aaa");
        let mut options = options();
        options.archive = true;

        let report = fixture.download(&options).await;

        assert_eq!(outcomes(&report), vec![DownloadOutcome::Succeeded]);
        assert!(fixture.store.blob(&key).unwrap().tier.is_archive());
    }

    #[tokio::test]
    async fn test_resume_keeps_pending_then_completes() {
        let fixture = Fixture::new();
        let key = fixture.blob("a.jpg", b"aaa");
        fixture.store.set_tier(&key, AccessTier::Archive);
        fixture.download(&options()).await;

        let report = fixture.resume().await;
        assert_eq!(outcomes(&report), vec![DownloadOutcome::Pending]);
        let sessions = fixture.retriever().sessions().load_all().await.unwrap();
        assert_eq!(sessions.len(), 1);

        fixture.store.complete_rehydration(&key);
        let report = fixture.resume().await;
        assert_eq!(outcomes(&report), vec![DownloadOutcome::Succeeded]);
        assert!(fixture.files.contains(Path::new("/restore/a.jpg")));
        assert!(fixture
            .retriever()
            .sessions()
            .load_all()
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_resume_rewrites_session_with_remaining_items() {
        let fixture = Fixture::new();
        let ready = fixture.blob("a.jpg", b"aaa");
        let waiting = fixture.blob("b.jpg", b"bbb");
        fixture.store.set_tier(&ready, AccessTier::Archive);
        fixture.store.set_tier(&waiting, AccessTier::Archive);
        fixture.download(&options()).await;
        fixture.store.complete_rehydration(&ready);

        let report = fixture.resume().await;

        assert_eq!(
            outcomes(&report),
            vec![DownloadOutcome::Succeeded, DownloadOutcome::Pending]
        );
        let sessions = fixture.retriever().sessions().load_all().await.unwrap();
        assert_eq!(
            sessions[0].pending_items,
            vec![PendingItem::new("photos/2019/05/25/b.jpg", "/restore/b.jpg")]
        );
    }

    #[tokio::test]
    async fn test_load_all_skips_unreadable_files() {
        let dir = TempDir::new().unwrap();
        let store = SessionStore::new(dir.path());
        let session = RetrievalSession::new("/restore", vec![]);
        store.save(&session).await.unwrap();
        fs::write(dir.path().join("broken.json"), b"{ not json").await.unwrap();
        fs::write(dir.path().join("notes.txt"), b"ignored").await.unwrap();

        let sessions = store.load_all().await.unwrap();

        assert_eq!(sessions, vec![session.clone()]);
        store.delete(&session).await.unwrap();
        assert!(store.load_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_missing_session_dir_is_empty() {
        let dir = TempDir::new().unwrap();
        let store = SessionStore::new(dir.path().join("Sessions"));
        assert!(store.load_all().await.unwrap().is_empty());
    }
}
