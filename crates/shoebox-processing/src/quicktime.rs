//! Movie creation time from the `moov/mvhd` atom of MP4 and QuickTime files.

use std::io::Cursor;

use chrono::{DateTime, NaiveDateTime};
use mp4::{BoxType, Mp4Reader};

use crate::error::{FormatError, FormatResult};

const CONTAINER: &str = "QuickTime";

/// Seconds between the QuickTime epoch (1904-01-01) and the Unix epoch
const SECONDS_FROM_1904_TO_1970: u64 = 2_082_844_800;

/// Reads the movie header creation time.
///
/// QuickTime counts seconds from 1904-01-01 UTC. A zero timestamp (written by
/// some encoders when the clock was unset) reads as `None`, as does a file
/// without an `ftyp` or `moov` box.
pub fn read_creation_time(data: &[u8]) -> FormatResult<Option<NaiveDateTime>> {
    let reader = match Mp4Reader::read_header(Cursor::new(data), data.len() as u64) {
        Ok(reader) => reader,
        Err(mp4::Error::BoxNotFound(BoxType::FtypBox | BoxType::MoovBox)) => return Ok(None),
        Err(e) => return Err(FormatError::malformed(CONTAINER, e.to_string())),
    };

    Ok(quicktime_epoch_to_datetime(reader.moov.mvhd.creation_time))
}

fn quicktime_epoch_to_datetime(seconds: u64) -> Option<NaiveDateTime> {
    // anything at or before the Unix epoch is an unset clock
    let unix_seconds = seconds.checked_sub(SECONDS_FROM_1904_TO_1970)?;
    if unix_seconds == 0 {
        return None;
    }
    let unix_seconds = i64::try_from(unix_seconds).ok()?;
    DateTime::from_timestamp(unix_seconds, 0).map(|date| date.naive_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::mp4_with_creation_time;

    // 2018-12-27 16:32:37 UTC in QuickTime epoch seconds
    const CREATED: u64 = 3_628_773_157;

    #[test]
    fn reads_mvhd_creation_time() {
        let data = mp4_with_creation_time(CREATED);
        let date = read_creation_time(&data).unwrap().unwrap();
        assert_eq!(date.to_string(), "2018-12-27 16:32:37");
    }

    #[test]
    fn zero_creation_time_is_absent() {
        let data = mp4_with_creation_time(0);
        assert!(read_creation_time(&data).unwrap().is_none());
    }

    #[test]
    fn pre_unix_epoch_creation_time_is_absent() {
        let data = mp4_with_creation_time(SECONDS_FROM_1904_TO_1970 - 60);
        assert!(read_creation_time(&data).unwrap().is_none());
    }

    #[test]
    fn missing_moov_is_absent() {
        let mut data = Vec::new();
        data.extend_from_slice(&16u32.to_be_bytes());
        data.extend_from_slice(b"ftypisom");
        data.extend_from_slice(&0u32.to_be_bytes());
        assert!(read_creation_time(&data).unwrap().is_none());
        assert!(read_creation_time(b"").unwrap().is_none());
    }

    #[test]
    fn corrupt_box_size_is_an_error() {
        let mut data = Vec::new();
        data.extend_from_slice(&4u32.to_be_bytes());
        data.extend_from_slice(b"moov");
        assert!(read_creation_time(&data).is_err());
    }
}
