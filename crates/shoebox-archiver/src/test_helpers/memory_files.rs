//! In-memory file source

use async_trait::async_trait;
use bytes::Bytes;
use shoebox_core::{ArchiveError, ArchiveResult};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use crate::files::{FileEntry, FileSource};

/// Files kept in memory under a fixed root
#[derive(Debug, Clone)]
pub struct MemoryFileSource {
    root: PathBuf,
    files: Arc<Mutex<BTreeMap<PathBuf, Bytes>>>,
}

impl Default for MemoryFileSource {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryFileSource {
    pub fn new() -> Self {
        Self {
            root: PathBuf::from("/source"),
            files: Arc::new(Mutex::new(BTreeMap::new())),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Add a file at `relative` (`/` separated) and return its full path
    pub fn add(&self, relative: &str, data: impl Into<Bytes>) -> PathBuf {
        let path = self.root.join(relative);
        self.files.lock().unwrap().insert(path.clone(), data.into());
        path
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.files.lock().unwrap().contains_key(path)
    }

    pub fn get(&self, path: &Path) -> Option<Bytes> {
        self.files.lock().unwrap().get(path).cloned()
    }
}

#[async_trait]
impl FileSource for MemoryFileSource {
    async fn list_files(&self) -> ArchiveResult<Vec<FileEntry>> {
        let files = self.files.lock().unwrap();
        Ok(files
            .iter()
            .filter_map(|(path, data)| {
                let relative = path.strip_prefix(&self.root).ok()?;
                let relative = relative.to_string_lossy().replace('\\', "/");
                let entry = FileEntry::new(path.clone(), relative, data.len() as u64);
                (!entry.is_ignored()).then_some(entry)
            })
            .collect())
    }

    async fn read(&self, path: &Path) -> ArchiveResult<Bytes> {
        self.get(path)
            .ok_or_else(|| ArchiveError::Io(format!("No such file: {}", path.display())))
    }

    async fn delete(&self, path: &Path) -> ArchiveResult<()> {
        self.files
            .lock()
            .unwrap()
            .remove(path)
            .map(|_| ())
            .ok_or_else(|| ArchiveError::Io(format!("No such file: {}", path.display())))
    }

    async fn exists(&self, path: &Path) -> ArchiveResult<bool> {
        Ok(self.contains(path))
    }

    async fn create_file(&self, path: &Path, data: Bytes) -> ArchiveResult<()> {
        let mut files = self.files.lock().unwrap();
        if files.contains_key(path) {
            return Err(ArchiveError::Io(format!(
                "File already exists: {}",
                path.display()
            )));
        }
        files.insert(path.to_path_buf(), data);
        Ok(())
    }
}
