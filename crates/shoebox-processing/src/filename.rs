//! Capture dates encoded in camera and app file names.
//!
//! Only the calendar date is taken from a name; the time of day is ignored.

use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;

const OFFICE_LENS_SUFFIX: &str = " Office Lens.jpg";

/// `.trashed-1712345678-` prefix added by Android's recycle bin
static TRASH_PREFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\.trashed-\d{10}-").expect("Valid trash prefix regex"));

/// Parses a capture date from a file name, trying each known convention in turn:
///
/// - `IMG_20190525_120904.jpg`, `VID_...`, `PXL_...`
/// - `Screenshot_20190525_120904.png`
/// - `WP_20140711_15_25_11_0_Pro.jpg`
/// - `2018_07_01 18_41 Office Lens.jpg`
/// - `5_25_18 11_39 Office Lens.jpg`
/// - `Office Lens_20140919_110252.jpg`
pub fn parse_filename_date(file_name: &str) -> Option<NaiveDate> {
    let name = TRASH_PREFIX.replace(file_name, "");
    let name = name.as_ref();

    camera_prefix(name)
        .or_else(|| screenshot(name))
        .or_else(|| windows_phone(name))
        .or_else(|| office_lens_iso(name))
        .or_else(|| office_lens_us(name))
        .or_else(|| office_lens_prefix(name))
}

/// `IMG_YYYYMMDD_`: date at 4..12, underscore at 12
fn camera_prefix(name: &str) -> Option<NaiveDate> {
    let prefixed = ["IMG_2", "VID_2", "PXL_2"]
        .iter()
        .any(|prefix| name.starts_with(prefix));
    if !prefixed || name.len() < 23 || name.as_bytes().get(12) != Some(&b'_') {
        return None;
    }
    compact_date(name.get(4..12)?)
}

/// `Screenshot_YYYYMMDD_`: date at 11..19, underscore at 19
fn screenshot(name: &str) -> Option<NaiveDate> {
    const PREFIX: &str = "Screenshot_";
    if !name.starts_with(PREFIX) || name.as_bytes().get(PREFIX.len() + 8) != Some(&b'_') {
        return None;
    }
    compact_date(name.get(PREFIX.len()..PREFIX.len() + 8)?)
}

/// `WP_YYYYMMDD_`: date at 3..11, underscore at 11
fn windows_phone(name: &str) -> Option<NaiveDate> {
    if !name.starts_with("WP_") || name.len() < 15 || name.as_bytes().get(11) != Some(&b'_') {
        return None;
    }
    compact_date(name.get(3..11)?)
}

/// `YYYY_MM_DD HH_MM Office Lens.jpg`
fn office_lens_iso(name: &str) -> Option<NaiveDate> {
    if name.len() < 29 || !name.ends_with(OFFICE_LENS_SUFFIX) || !name.starts_with('2') {
        return None;
    }
    if !leading_digits(name) {
        return None;
    }
    let year = name.get(0..4)?.parse().ok()?;
    let month = name.get(5..7)?.parse().ok()?;
    let day = name.get(8..10)?.parse().ok()?;
    NaiveDate::from_ymd_opt(year, month, day)
}

/// `M_DD_YY HH_MM Office Lens.jpg`, two-digit year in the 2000s
fn office_lens_us(name: &str) -> Option<NaiveDate> {
    if name.len() < 29 || !name.ends_with(OFFICE_LENS_SUFFIX) || leading_digits(name) {
        return None;
    }
    let mut parts = name.split(['_', ' ']);
    let month = parts.next()?.parse().ok()?;
    let day = parts.next()?.parse().ok()?;
    let year: i32 = parts.next()?.parse().ok()?;
    NaiveDate::from_ymd_opt(year + 2000, month, day)
}

/// `Office Lens_YYYYMMDD_`: date at 12..20
fn office_lens_prefix(name: &str) -> Option<NaiveDate> {
    if name.len() < 29 || !name.starts_with("Office Lens_2") {
        return None;
    }
    compact_date(name.get(12..20)?)
}

fn leading_digits(name: &str) -> bool {
    name.len() >= 4 && name.bytes().take(4).all(|b| b.is_ascii_digit())
}

/// `YYYYMMDD`
fn compact_date(text: &str) -> Option<NaiveDate> {
    if text.len() != 8 || !text.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let year = text.get(0..4)?.parse().ok()?;
    let month = text.get(4..6)?.parse().ok()?;
    let day = text.get(6..8)?.parse().ok()?;
    NaiveDate::from_ymd_opt(year, month, day)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(y: i32, m: u32, d: u32) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(y, m, d)
    }

    #[test]
    fn camera_names() {
        assert_eq!(parse_filename_date("IMG_20190525_120904.jpg"), ymd(2019, 5, 25));
        assert_eq!(parse_filename_date("IMG_20190526_120904 1.jpg"), ymd(2019, 5, 26));
        assert_eq!(parse_filename_date("VID_20181227_163237.mp4"), ymd(2018, 12, 27));
        assert_eq!(parse_filename_date("PXL_20210101_101010123.jpg"), ymd(2021, 1, 1));
    }

    #[test]
    fn trashed_prefix_is_stripped() {
        assert_eq!(
            parse_filename_date(".trashed-1712345678-IMG_20190525_120904.jpg"),
            ymd(2019, 5, 25)
        );
        // wrong digit count is not a trash marker
        assert_eq!(
            parse_filename_date(".trashed-123-IMG_20190525_120904.jpg"),
            None
        );
    }

    #[test]
    fn screenshot_names() {
        assert_eq!(
            parse_filename_date("Screenshot_20200314_092653.png"),
            ymd(2020, 3, 14)
        );
        assert_eq!(parse_filename_date("Screenshot_2020-03-14.png"), None);
    }

    #[test]
    fn windows_phone_names() {
        assert_eq!(
            parse_filename_date("WP_20140711_15_25_11_0_Pro.jpg"),
            ymd(2014, 7, 11)
        );
        assert_eq!(
            parse_filename_date("WP_20140713_15_25_11_Raw__highres.dng"),
            ymd(2014, 7, 13)
        );
    }

    #[test]
    fn office_lens_names() {
        assert_eq!(
            parse_filename_date("2018_07_01 18_41 Office Lens.jpg"),
            ymd(2018, 7, 1)
        );
        assert_eq!(
            parse_filename_date("5_25_18 11_39 Office Lens.jpg"),
            ymd(2018, 5, 25)
        );
        assert_eq!(
            parse_filename_date("Office Lens_20140919_110252.jpg"),
            ymd(2014, 9, 19)
        );
    }

    #[test]
    fn unrecognized_or_invalid_names() {
        assert_eq!(parse_filename_date("DSC_0001.NEF"), None);
        assert_eq!(parse_filename_date("IMG_1234.jpg"), None);
        assert_eq!(parse_filename_date("IMG_20191345_120904.jpg"), None);
        assert_eq!(parse_filename_date("IMG_2019x525_120904.jpg"), None);
        assert_eq!(parse_filename_date(""), None);
    }
}
