use std::fmt::{Display, Formatter, Result as FmtResult, Write};

use chrono::format::{Item, StrftimeItems};
use chrono::NaiveDateTime;

use crate::error::{ArchiveError, ArchiveResult};
use crate::models::ContentHash;

/// Where a file's blob lives: container, date directory and blob name.
///
/// Two files with the same capture date and file name map to the same key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DestinationKey {
    pub container: String,
    pub directory: String,
    pub name: String,
}

impl DestinationKey {
    pub fn new(
        container: impl Into<String>,
        directory: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            container: container.into(),
            directory: directory.into(),
            name: name.into(),
        }
    }

    /// Build the key for a file captured at `date`, placing it under the
    /// directory produced by `directory_format` (strftime).
    pub fn for_date(
        container: &str,
        directory_format: &str,
        date: &NaiveDateTime,
        name: &str,
    ) -> ArchiveResult<Self> {
        let directory = format_directory(directory_format, date)?;
        Ok(Self::new(container, directory, name))
    }

    /// Full blob name inside the container (`2019/05/25/IMG_1.jpg`)
    pub fn blob_name(&self) -> String {
        let directory = self.directory.trim_end_matches('/');
        if directory.is_empty() {
            self.name.clone()
        } else {
            format!("{}/{}", directory, self.name)
        }
    }

    /// Same directory, different blob name
    pub fn with_name(&self, name: impl Into<String>) -> Self {
        Self::new(self.container.clone(), self.directory.clone(), name)
    }

    /// Key used by the `KeepBoth` policy: the uppercase hex digest is spliced
    /// in before the extension (`IMG_1.jpg` becomes `IMG_1.<HEX>.jpg`).
    pub fn keep_both(&self, hash: &ContentHash) -> Self {
        let name = match self.name.rfind('.') {
            Some(dot) if dot > 0 => format!(
                "{}.{}{}",
                &self.name[..dot],
                hash.to_hex(),
                &self.name[dot..]
            ),
            _ => format!("{}.{}", self.name, hash.to_hex()),
        };
        self.with_name(name)
    }
}

impl Display for DestinationKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}/{}", self.container, self.blob_name())
    }
}

/// Returns an error for strftime patterns chrono cannot render.
pub fn validate_directory_format(format: &str) -> ArchiveResult<()> {
    if StrftimeItems::new(format).any(|item| matches!(item, Item::Error)) {
        return Err(ArchiveError::Config(format!(
            "Invalid directory format: {}",
            format
        )));
    }
    Ok(())
}

pub fn format_directory(format: &str, date: &NaiveDateTime) -> ArchiveResult<String> {
    validate_directory_format(format)?;
    let mut directory = String::new();
    write!(directory, "{}", date.format(format)).map_err(|_| {
        ArchiveError::Config(format!("Failed to format directory with '{}'", format))
    })?;
    Ok(directory)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn date(y: i32, m: u32, d: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
    }

    #[test]
    fn formats_default_directory() {
        let key = DestinationKey::for_date(
            "photos",
            "%Y/%m/%d",
            &date(2019, 5, 25),
            "IMG_20190525_120904.jpg",
        )
        .unwrap();
        assert_eq!(key.directory, "2019/05/25");
        assert_eq!(key.blob_name(), "2019/05/25/IMG_20190525_120904.jpg");
        assert_eq!(key.to_string(), "photos/2019/05/25/IMG_20190525_120904.jpg");
    }

    #[test]
    fn trailing_slash_in_format_is_trimmed() {
        let key = DestinationKey::for_date("photos", "%Y/%m/", &date(2020, 1, 2), "a.jpg").unwrap();
        assert_eq!(key.blob_name(), "2020/01/a.jpg");
    }

    #[test]
    fn keep_both_splices_hash_before_extension() {
        let hash = ContentHash::compute(b"hello");
        let key = DestinationKey::new("photos", "2019/05/25", "IMG_1.jpg");
        assert_eq!(
            key.keep_both(&hash).name,
            "IMG_1.5D41402ABC4B2A76B9719D911017C592.jpg"
        );

        let bare = DestinationKey::new("photos", "2019/05/25", "README");
        assert_eq!(
            bare.keep_both(&hash).name,
            "README.5D41402ABC4B2A76B9719D911017C592"
        );
    }

    #[test]
    fn rejects_invalid_format() {
        assert!(validate_directory_format("%Y/%Q").is_err());
        assert!(validate_directory_format("%Y/%m/%d").is_ok());
    }
}
