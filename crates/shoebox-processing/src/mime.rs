//! Content types attached to uploaded blobs.

use shoebox_core::constants::DEFAULT_CONTENT_TYPE;

/// Looks up the content type for an extension, with or without the leading dot.
pub fn content_type_for(extension: &str) -> &'static str {
    match extension.trim_start_matches('.').to_ascii_lowercase().as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "mp4" => "video/mp4",
        "nef" => "image/nef",
        "dng" => "image/dng",
        "mov" => "video/quicktime",
        "avi" => "video/x-msvideo",
        "mpg" => "video/mpeg",
        _ => DEFAULT_CONTENT_TYPE,
    }
}

/// JPEGs are the only files that get enrichment and thumbnails.
pub fn is_jpeg(extension: &str) -> bool {
    matches!(
        extension.trim_start_matches('.').to_ascii_lowercase().as_str(),
        "jpg" | "jpeg"
    )
}
