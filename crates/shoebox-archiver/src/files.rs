//! Local files awaiting archival and download targets.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use globset::{GlobBuilder, GlobMatcher};
use shoebox_core::constants::{IGNORED_EXTENSIONS, IGNORED_FILE_NAMES};
use shoebox_core::models::metadata::metadata_keys;
use shoebox_core::{ArchiveError, ArchiveResult, ContentHash, UploadMetadata};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::OnceCell;
use walkdir::WalkDir;

/// A file found under the source root
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEntry {
    pub path: PathBuf,
    /// Path relative to the source root, `/` separated
    pub relative_path: String,
    pub name: String,
    pub size: u64,
}

impl FileEntry {
    pub fn new(path: impl Into<PathBuf>, relative_path: impl Into<String>, size: u64) -> Self {
        let path = path.into();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self {
            path,
            relative_path: relative_path.into(),
            name,
            size,
        }
    }

    /// Lowercase extension without the dot; empty when there is none
    pub fn extension(&self) -> String {
        self.path
            .extension()
            .map(|e| e.to_string_lossy().to_ascii_lowercase())
            .unwrap_or_default()
    }

    pub fn directory(&self) -> &Path {
        self.path.parent().unwrap_or_else(|| Path::new(""))
    }

    /// System files and sidecars that are never archived
    pub fn is_ignored(&self) -> bool {
        let extension = self.extension();
        IGNORED_FILE_NAMES
            .iter()
            .any(|ignored| ignored.eq_ignore_ascii_case(&self.name))
            || IGNORED_EXTENSIONS.contains(&extension.as_str())
    }
}

/// Where candidate files come from and download targets go
#[async_trait]
pub trait FileSource: Send + Sync {
    /// Every file under the root that is not ignored, sorted by full path
    async fn list_files(&self) -> ArchiveResult<Vec<FileEntry>>;

    async fn read(&self, path: &Path) -> ArchiveResult<Bytes>;

    async fn delete(&self, path: &Path) -> ArchiveResult<()>;

    async fn exists(&self, path: &Path) -> ArchiveResult<bool>;

    /// Write a new file, creating parent directories. Fails if it exists.
    async fn create_file(&self, path: &Path, data: Bytes) -> ArchiveResult<()>;
}

/// Files on the local filesystem under a root directory
#[derive(Debug, Clone)]
pub struct LocalFileSource {
    root: PathBuf,
}

impl LocalFileSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

fn scan_directory(root: &Path) -> ArchiveResult<Vec<FileEntry>> {
    if !root.is_dir() {
        return Err(ArchiveError::InvalidInput(format!(
            "Source directory does not exist: {}",
            root.display()
        )));
    }

    let mut entries = Vec::new();
    for entry in WalkDir::new(root).follow_links(false) {
        let entry = entry.map_err(|e| ArchiveError::Io(e.to_string()))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let size = entry
            .metadata()
            .map_err(|e| ArchiveError::Io(e.to_string()))?
            .len();
        let relative = entry
            .path()
            .strip_prefix(root)
            .unwrap_or(entry.path())
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");
        let file = FileEntry::new(entry.path(), relative, size);
        if !file.is_ignored() {
            entries.push(file);
        }
    }

    entries.sort_by(|a, b| a.path.cmp(&b.path));
    Ok(entries)
}

#[async_trait]
impl FileSource for LocalFileSource {
    async fn list_files(&self) -> ArchiveResult<Vec<FileEntry>> {
        let root = self.root.clone();
        tokio::task::spawn_blocking(move || scan_directory(&root))
            .await
            .map_err(|e| ArchiveError::Internal(format!("Directory scan failed: {}", e)))?
    }

    async fn read(&self, path: &Path) -> ArchiveResult<Bytes> {
        let data = fs::read(path).await?;
        Ok(Bytes::from(data))
    }

    async fn delete(&self, path: &Path) -> ArchiveResult<()> {
        fs::remove_file(path).await?;
        Ok(())
    }

    async fn exists(&self, path: &Path) -> ArchiveResult<bool> {
        Ok(fs::try_exists(path).await?)
    }

    async fn create_file(&self, path: &Path, data: Bytes) -> ArchiveResult<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }
        let mut file = fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(path)
            .await?;
        file.write_all(&data).await?;
        file.sync_all().await?;
        Ok(())
    }
}

/// Glob over paths relative to the source root (`**/*.jpg`).
///
/// `*` does not cross directory separators and matching ignores case.
#[derive(Debug, Clone)]
pub struct SearchPattern {
    matcher: GlobMatcher,
}

impl SearchPattern {
    pub fn new(pattern: &str) -> ArchiveResult<Self> {
        let glob = GlobBuilder::new(pattern)
            .literal_separator(true)
            .case_insensitive(true)
            .build()
            .map_err(|e| {
                ArchiveError::InvalidInput(format!("Invalid search pattern '{}': {}", pattern, e))
            })?;
        Ok(Self {
            matcher: glob.compile_matcher(),
        })
    }

    pub fn matches(&self, entry: &FileEntry) -> bool {
        self.matcher.is_match(&entry.relative_path)
    }
}

/// A file being archived.
///
/// Content is read at most once, the first time any step needs the bytes or
/// the hash, and dropped with the candidate.
pub struct CandidateFile {
    entry: FileEntry,
    source: Arc<dyn FileSource>,
    data: OnceCell<Bytes>,
    hash: OnceCell<ContentHash>,
}

impl CandidateFile {
    pub fn new(entry: FileEntry, source: Arc<dyn FileSource>) -> Self {
        Self {
            entry,
            source,
            data: OnceCell::new(),
            hash: OnceCell::new(),
        }
    }

    pub fn entry(&self) -> &FileEntry {
        &self.entry
    }

    pub fn path(&self) -> &Path {
        &self.entry.path
    }

    pub fn name(&self) -> &str {
        &self.entry.name
    }

    pub fn size(&self) -> u64 {
        self.entry.size
    }

    pub fn extension(&self) -> String {
        self.entry.extension()
    }

    pub fn is_loaded(&self) -> bool {
        self.data.initialized()
    }

    pub async fn bytes(&self) -> ArchiveResult<Bytes> {
        let data = self
            .data
            .get_or_try_init(|| async {
                tracing::trace!(path = %self.entry.path.display(), "Reading file");
                self.source.read(&self.entry.path).await
            })
            .await?;
        Ok(data.clone())
    }

    /// MD5 of the content
    pub async fn hash(&self) -> ArchiveResult<ContentHash> {
        let hash = self
            .hash
            .get_or_try_init(|| async {
                let data = self.bytes().await?;
                tracing::trace!(path = %self.entry.path.display(), "Computing hash");
                tokio::task::spawn_blocking(move || ContentHash::compute(&data))
                    .await
                    .map_err(|e| ArchiveError::Internal(format!("Hash task failed: {}", e)))
            })
            .await?;
        Ok(*hash)
    }

    /// Hash the content and record it as `OriginalMd5` unless already present
    pub async fn record_hash(&self, metadata: &mut UploadMetadata) -> ArchiveResult<ContentHash> {
        let hash = self.hash().await?;
        if !metadata.contains_key(metadata_keys::ORIGINAL_MD5) {
            metadata.insert(metadata_keys::ORIGINAL_MD5, hash.to_base64());
        }
        Ok(hash)
    }
}

impl std::fmt::Debug for CandidateFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CandidateFile")
            .field("entry", &self.entry)
            .field("loaded", &self.is_loaded())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    async fn write(dir: &Path, relative: &str, data: &[u8]) {
        let path = dir.join(relative);
        fs::create_dir_all(path.parent().unwrap()).await.unwrap();
        fs::write(path, data).await.unwrap();
    }

    #[tokio::test]
    async fn test_list_files_sorted_without_ignored() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "b/IMG_2.jpg", b"2").await;
        write(dir.path(), "a/IMG_1.jpg", b"1").await;
        write(dir.path(), "a/Thumbs.db", b"x").await;
        write(dir.path(), "a/DESKTOP.INI", b"x").await;
        write(dir.path(), "a/MVI_1.THM", b"x").await;
        write(dir.path(), "a/upload.tmp", b"x").await;

        let source = LocalFileSource::new(dir.path());
        let files = source.list_files().await.unwrap();
        let relative: Vec<_> = files.iter().map(|f| f.relative_path.as_str()).collect();
        assert_eq!(relative, vec!["a/IMG_1.jpg", "b/IMG_2.jpg"]);
        assert_eq!(files[0].size, 1);
    }

    #[tokio::test]
    async fn test_list_missing_root() {
        let source = LocalFileSource::new("/definitely/not/here");
        let err = source.list_files().await.unwrap_err();
        assert!(matches!(err, ArchiveError::InvalidInput(_)));
    }

    #[test]
    fn test_search_pattern() {
        let all = SearchPattern::new("**/*").unwrap();
        let jpegs = SearchPattern::new("*.jpg").unwrap();
        let nested = FileEntry::new("/src/a/IMG_1.JPG", "a/IMG_1.JPG", 1);
        let top = FileEntry::new("/src/IMG_2.jpg", "IMG_2.jpg", 1);

        assert!(all.matches(&nested));
        assert!(all.matches(&top));
        assert!(jpegs.matches(&top));
        assert!(!jpegs.matches(&nested));
        assert!(SearchPattern::new("a/[").is_err());
    }

    #[tokio::test]
    async fn test_candidate_loads_once_and_records_hash() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "IMG_1.jpg", b"hello").await;
        let source: Arc<dyn FileSource> = Arc::new(LocalFileSource::new(dir.path()));
        let entry = source.list_files().await.unwrap().remove(0);
        let candidate = CandidateFile::new(entry, source);

        assert!(!candidate.is_loaded());
        let mut metadata = UploadMetadata::new();
        let hash = candidate.record_hash(&mut metadata).await.unwrap();
        assert!(candidate.is_loaded());
        assert_eq!(hash, ContentHash::compute(b"hello"));
        assert_eq!(
            metadata.get(metadata_keys::ORIGINAL_MD5),
            Some(hash.to_base64().as_str())
        );

        // later changes on disk are not observed
        fs::remove_file(candidate.path()).await.unwrap();
        assert_eq!(candidate.bytes().await.unwrap(), Bytes::from_static(b"hello"));
    }

    #[tokio::test]
    async fn test_create_file_refuses_existing() {
        let dir = TempDir::new().unwrap();
        let source = LocalFileSource::new(dir.path());
        let path = dir.path().join("out/IMG_1.jpg");

        source
            .create_file(&path, Bytes::from_static(b"one"))
            .await
            .unwrap();
        assert!(source.exists(&path).await.unwrap());
        assert!(source
            .create_file(&path, Bytes::from_static(b"two"))
            .await
            .is_err());
        assert_eq!(fs::read(&path).await.unwrap(), b"one");
    }
}
