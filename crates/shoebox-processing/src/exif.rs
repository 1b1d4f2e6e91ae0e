//! EXIF capture dates for JPEG and TIFF-based RAW files.

use std::io::Cursor;

use chrono::{NaiveDate, NaiveDateTime};
use exif::{In, Reader, Tag, Value};

use crate::error::{FormatError, FormatResult};

/// Tags consulted in order
const DATE_TAGS: [Tag; 2] = [Tag::DateTimeOriginal, Tag::DateTime];

const EXIF_DATE_FORMATS: &[&str] = &["%Y:%m:%d %H:%M:%S", "%Y-%m-%d %H:%M:%S", "%Y.%m.%d %H:%M:%S"];

/// Reads "Date/Time Original", falling back to "Date/Time".
///
/// Returns `Ok(None)` when the file has no EXIF block or neither tag holds a
/// parseable value.
pub fn read_exif_date(data: &[u8]) -> FormatResult<Option<NaiveDateTime>> {
    let exif = match Reader::new().read_from_container(&mut Cursor::new(data)) {
        Ok(exif) => exif,
        Err(exif::Error::NotFound(_)) => return Ok(None),
        Err(e) => return Err(FormatError::Exif(e.to_string())),
    };

    for tag in DATE_TAGS {
        let Some(field) = exif.get_field(tag, In::PRIMARY) else {
            continue;
        };
        if let Value::Ascii(ref values) = field.value {
            for raw in values {
                let text = String::from_utf8_lossy(raw);
                match parse_exif_datetime(&text) {
                    Some(date) => return Ok(Some(date)),
                    None => tracing::debug!(tag = %tag, value = %text, "Unparseable EXIF date"),
                }
            }
        }
    }

    Ok(None)
}

/// Parses `YYYY:MM:DD HH:MM:SS` and its common variants. A bare date reads as midnight.
pub fn parse_exif_datetime(text: &str) -> Option<NaiveDateTime> {
    let text = text.trim_matches(|c: char| c == '\0' || c.is_whitespace());
    for format in EXIF_DATE_FORMATS {
        if let Ok(date) = NaiveDateTime::parse_from_str(text, format) {
            return Some(date);
        }
    }
    NaiveDate::parse_from_str(text, "%Y:%m:%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
}
