//! Defaults shared by configuration and the CLI.

pub const DEFAULT_CONTAINER: &str = "photos";
pub const DEFAULT_THUMBNAIL_CONTAINER: &str = "photos-thumbnails";

/// strftime pattern for the date directory of a blob (`2019/05/25`)
pub const DEFAULT_DIRECTORY_FORMAT: &str = "%Y/%m/%d";

pub const DEFAULT_SEARCH_PATTERN: &str = "**/*";
pub const DEFAULT_SESSIONS_DIR: &str = "Sessions";

/// Edge length of the thumbnail sent to enrichment services
pub const ENRICHMENT_THUMBNAIL_SIZE: u32 = 1024;

pub const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// File names never archived (Windows Explorer, Canon PowerShot caches)
pub const IGNORED_FILE_NAMES: &[&str] = &["Thumbs.db", "desktop.ini", "ZbThumbnail.info"];

/// Extensions never archived, without the leading dot
pub const IGNORED_EXTENSIONS: &[&str] = &["thumb", "thm", "tmp"];
