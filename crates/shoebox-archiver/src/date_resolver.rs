//! Capture date resolution
//!
//! Embedded metadata is tried first, then a sibling file for formats that
//! usually travel in pairs (RAW next to its JPEG, WAV next to its MP4), and
//! finally the camera naming conventions in the file name. Sibling lookup is
//! a single hop: a sibling's own siblings are never consulted.
//!
//! Malformed metadata is not an error; it falls through to the next source.
//! Failing to read the file is.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::NaiveDateTime;
use shoebox_core::ArchiveResult;
use shoebox_processing::exif::read_exif_date;
use shoebox_processing::quicktime::read_creation_time;
use shoebox_processing::riff::read_idit_date;
use shoebox_processing::{parse_filename_date, FormatResult};

use crate::files::{CandidateFile, FileEntry, FileSource};

const PHOTO_EXTENSIONS: &[&str] = &["jpg", "jpeg", "jfif", "heif", "heic"];
const RAW_EXTENSIONS: &[&str] = &["cr2", "nef", "dng", "gpr"];
const QUICKTIME_EXTENSIONS: &[&str] = &["mp4", "mov"];

type DateReader = fn(&[u8]) -> FormatResult<Option<NaiveDateTime>>;

/// Every file enumerated in the run, looked up by case-insensitive path
#[derive(Debug, Default)]
pub struct PeerFiles {
    by_path: HashMap<String, FileEntry>,
}

impl PeerFiles {
    pub fn new<'a>(entries: impl IntoIterator<Item = &'a FileEntry>) -> Self {
        Self {
            by_path: entries
                .into_iter()
                .map(|entry| (path_key(&entry.path), entry.clone()))
                .collect(),
        }
    }

    pub fn find(&self, path: &Path) -> Option<&FileEntry> {
        self.by_path.get(&path_key(path))
    }

    pub fn len(&self) -> usize {
        self.by_path.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_path.is_empty()
    }
}

fn path_key(path: &Path) -> String {
    path.to_string_lossy().to_lowercase()
}

pub struct DateResolver {
    source: Arc<dyn FileSource>,
}

impl DateResolver {
    pub fn new(source: Arc<dyn FileSource>) -> Self {
        Self { source }
    }

    /// Resolve the capture date of `file`; `None` means the file is `DateMissing`.
    ///
    /// Dates taken from file names carry midnight.
    pub async fn resolve(
        &self,
        file: &CandidateFile,
        peers: &PeerFiles,
    ) -> ArchiveResult<Option<NaiveDateTime>> {
        tracing::trace!(path = %file.path().display(), "Reading date");
        let extension = file.extension();

        if let Some(date) = embedded_date(file, &extension).await? {
            return Ok(Some(date));
        }

        for sibling_path in sibling_paths(file.path(), &extension) {
            let Some(sibling) = peers.find(&sibling_path) else {
                continue;
            };
            tracing::debug!(
                path = %file.path().display(),
                sibling = %sibling.path.display(),
                "Falling back to sibling file for date"
            );
            let sibling_file = CandidateFile::new(sibling.clone(), self.source.clone());
            if let Some(date) = embedded_date(&sibling_file, &sibling.extension()).await? {
                return Ok(Some(date));
            }
            if let Some(date) = filename_date(&sibling.name) {
                return Ok(Some(date));
            }
        }

        Ok(filename_date(file.name()))
    }
}

fn reader_for(extension: &str) -> Option<DateReader> {
    if PHOTO_EXTENSIONS.contains(&extension) || RAW_EXTENSIONS.contains(&extension) {
        Some(read_exif_date as DateReader)
    } else if QUICKTIME_EXTENSIONS.contains(&extension) {
        Some(read_creation_time as DateReader)
    } else if extension == "avi" {
        Some(read_riff_date as DateReader)
    } else {
        None
    }
}

fn read_riff_date(data: &[u8]) -> FormatResult<Option<NaiveDateTime>> {
    Ok(read_idit_date(data))
}

async fn embedded_date(
    file: &CandidateFile,
    extension: &str,
) -> ArchiveResult<Option<NaiveDateTime>> {
    let Some(reader) = reader_for(extension) else {
        return Ok(None);
    };
    let data = file.bytes().await?;
    match reader(&data) {
        Ok(date) => Ok(date),
        Err(e) => {
            tracing::debug!(
                path = %file.path().display(),
                error = %e,
                "Ignoring unreadable embedded metadata"
            );
            Ok(None)
        }
    }
}

/// Paths of the files whose date stands in for this one, in lookup order
fn sibling_paths(path: &Path, extension: &str) -> Vec<PathBuf> {
    if RAW_EXTENSIONS.contains(&extension) {
        let jpeg = path.with_extension("jpg");
        let mut paths = vec![jpeg.clone()];
        if extension == "dng" {
            let stripped = PathBuf::from(jpeg.to_string_lossy().replace("__highres", ""));
            if stripped != jpeg {
                paths.push(stripped);
            }
        }
        paths
    } else if extension == "wav" {
        vec![path.with_extension("mp4")]
    } else {
        Vec::new()
    }
}

fn filename_date(name: &str) -> Option<NaiveDateTime> {
    parse_filename_date(name).and_then(|date| date.and_hms_opt(0, 0, 0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::files::LocalFileSource;
    use chrono::NaiveDate;
    use shoebox_processing::fixtures::{avi_with_idit, jpeg_with_exif_date, mp4_with_creation_time};
    use tempfile::TempDir;

    struct Fixture {
        _dir: TempDir,
        source: Arc<dyn FileSource>,
        files: Vec<FileEntry>,
    }

    impl Fixture {
        async fn new(files: &[(&str, Vec<u8>)]) -> Self {
            let dir = TempDir::new().unwrap();
            for (name, data) in files {
                tokio::fs::write(dir.path().join(name), data).await.unwrap();
            }
            let source: Arc<dyn FileSource> = Arc::new(LocalFileSource::new(dir.path()));
            let files = source.list_files().await.unwrap();
            Self {
                _dir: dir,
                source,
                files,
            }
        }

        async fn resolve(&self, name: &str) -> Option<NaiveDateTime> {
            let entry = self
                .files
                .iter()
                .find(|f| f.name == name)
                .cloned()
                .unwrap();
            let peers = PeerFiles::new(&self.files);
            let resolver = DateResolver::new(self.source.clone());
            resolver
                .resolve(&CandidateFile::new(entry, self.source.clone()), &peers)
                .await
                .unwrap()
        }
    }

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, min, s)
            .unwrap()
    }

    #[tokio::test]
    async fn test_exif_date_wins_over_file_name() {
        let fixture = Fixture::new(&[(
            "IMG_20190525_120904.jpg",
            jpeg_with_exif_date("2018:01:02 03:04:05"),
        )])
        .await;
        assert_eq!(
            fixture.resolve("IMG_20190525_120904.jpg").await,
            Some(at(2018, 1, 2, 3, 4, 5))
        );
    }

    #[tokio::test]
    async fn test_file_name_pattern_regardless_of_content() {
        let fixture = Fixture::new(&[("IMG_20190525_120904.jpg", b"not a jpeg".to_vec())]).await;
        assert_eq!(
            fixture.resolve("IMG_20190525_120904.jpg").await,
            Some(at(2019, 5, 25, 0, 0, 0))
        );
    }

    #[tokio::test]
    async fn test_raw_falls_back_to_sibling_jpeg() {
        let fixture = Fixture::new(&[
            ("DSC_0001.NEF", b"raw sensor data".to_vec()),
            ("DSC_0001.jpg", jpeg_with_exif_date("2017:08:09 10:11:12")),
        ])
        .await;
        assert_eq!(
            fixture.resolve("DSC_0001.NEF").await,
            Some(at(2017, 8, 9, 10, 11, 12))
        );
    }

    #[tokio::test]
    async fn test_dng_highres_sibling() {
        let fixture = Fixture::new(&[
            ("PXL_0001__highres.dng", b"raw".to_vec()),
            ("PXL_0001.jpg", jpeg_with_exif_date("2021:03:04 05:06:07")),
        ])
        .await;
        assert_eq!(
            fixture.resolve("PXL_0001__highres.dng").await,
            Some(at(2021, 3, 4, 5, 6, 7))
        );
    }

    #[tokio::test]
    async fn test_quicktime_and_wav_sibling() {
        let fixture = Fixture::new(&[
            ("clip.mp4", mp4_with_creation_time(3_628_773_157)),
            ("clip.wav", b"RIFF....WAVE".to_vec()),
        ])
        .await;
        let expected = Some(at(2018, 12, 27, 16, 32, 37));
        assert_eq!(fixture.resolve("clip.mp4").await, expected);
        assert_eq!(fixture.resolve("clip.wav").await, expected);
    }

    #[tokio::test]
    async fn test_avi_idit() {
        let fixture = Fixture::new(&[("MVI_0001.AVI", avi_with_idit("Sat May 25 12:09:04 2019"))]).await;
        assert_eq!(
            fixture.resolve("MVI_0001.AVI").await,
            Some(at(2019, 5, 25, 12, 9, 4))
        );
    }

    #[tokio::test]
    async fn test_missing_date() {
        let fixture = Fixture::new(&[
            ("holiday.mpg", b"mpeg".to_vec()),
            ("broken.jpg", jpeg_with_exif_date("not a date")),
        ])
        .await;
        assert_eq!(fixture.resolve("holiday.mpg").await, None);
        assert_eq!(fixture.resolve("broken.jpg").await, None);
    }

    #[test]
    fn test_sibling_paths() {
        assert_eq!(
            sibling_paths(Path::new("/p/a.cr2"), "cr2"),
            vec![PathBuf::from("/p/a.jpg")]
        );
        assert_eq!(
            sibling_paths(Path::new("/p/a__highres.dng"), "dng"),
            vec![PathBuf::from("/p/a__highres.jpg"), PathBuf::from("/p/a.jpg")]
        );
        assert!(sibling_paths(Path::new("/p/a.jpg"), "jpg").is_empty());
    }
}
