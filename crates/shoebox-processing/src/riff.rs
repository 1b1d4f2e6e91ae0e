//! Capture date from the `IDIT` chunk of AVI files.

use chrono::NaiveDateTime;

/// Only the start of the file is scanned; `IDIT` sits in the `hdrl` list.
pub const SCAN_LIMIT: usize = 4096;

const IDIT: &[u8] = b"IDIT";
const TERMINATOR: &[u8] = &[0x0A, 0x00];

/// `Sat May 25 12:09:04 2019`
const RIFF_DATE_FORMAT: &str = "%a %b %d %H:%M:%S %Y";

/// Reads the `IDIT` date string: it starts after the chunk id and its 4-byte
/// size and runs to the `\n\0` terminator.
pub fn read_idit_date(data: &[u8]) -> Option<NaiveDateTime> {
    let head = &data[..data.len().min(SCAN_LIMIT)];
    let marker = find(head, IDIT)?;
    let start = marker + IDIT.len() + 4;
    let rest = head.get(start..)?;
    let end = find(rest, TERMINATOR)?;
    let text = std::str::from_utf8(&rest[..end]).ok()?;
    parse_riff_date(text)
}

pub fn parse_riff_date(text: &str) -> Option<NaiveDateTime> {
    let normalized = text.split_whitespace().collect::<Vec<_>>().join(" ");
    match NaiveDateTime::parse_from_str(&normalized, RIFF_DATE_FORMAT) {
        Ok(date) => Some(date),
        Err(e) => {
            tracing::debug!(value = %text, error = %e, "Unparseable IDIT date");
            None
        }
    }
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}
