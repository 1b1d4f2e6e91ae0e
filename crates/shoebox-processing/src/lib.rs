//! Shoebox Processing Library
//!
//! Readers for the capture-date metadata embedded in media containers
//! (EXIF, QuickTime `mvhd`, RIFF `IDIT`), camera filename conventions, the
//! extension to content-type table and thumbnail generation.
//!
//! Every reader works on an in-memory buffer and never panics on malformed
//! input: a structural problem is a `FormatError`, an absent date is `None`.

pub mod error;
#[cfg(feature = "image")]
pub mod exif;
pub mod filename;
#[cfg(any(test, feature = "test-fixtures"))]
pub mod fixtures;
pub mod mime;
pub mod quicktime;
pub mod riff;
pub mod thumbnail;

pub use error::{FormatError, FormatResult};
pub use filename::parse_filename_date;
pub use mime::{content_type_for, is_jpeg};
#[cfg(feature = "image")]
pub use thumbnail::ImageThumbnailGenerator;
pub use thumbnail::ThumbnailGenerator;
