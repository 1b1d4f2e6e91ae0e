//! Key/value metadata attached to a blob at upload time.

use std::collections::BTreeMap;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Metadata keys written by the archiver
pub mod metadata_keys {
    pub const ORIGINAL_FILE_NAME: &str = "OriginalFileName";
    pub const CREATED_AT: &str = "CreatedAt";
    pub const ORIGINAL_FILE_SIZE: &str = "OriginalFileSize";
    pub const ORIGINAL_MD5: &str = "OriginalMd5";
    pub const CAPTION: &str = "Caption";
    pub const TAGS: &str = "Tags";
    pub const PEOPLE: &str = "People";
}

/// Format of the `CreatedAt` value
pub const CREATED_AT_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Separator used when a metadata value holds a list
pub const LIST_SEPARATOR: &str = ", ";

/// Metadata map built up by the pipeline stages.
///
/// Blob stores only accept ASCII header values, so non-ASCII values are
/// percent-encoded on insert.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UploadMetadata(BTreeMap<String, String>);

impl UploadMetadata {
    pub fn new() -> Self {
        Self::default()
    }

    /// Base fields every archived file carries.
    pub fn for_file(file_name: &str, created_at: &NaiveDateTime, size: u64) -> Self {
        let mut metadata = Self::new();
        metadata.insert(metadata_keys::ORIGINAL_FILE_NAME, file_name);
        metadata.insert(
            metadata_keys::CREATED_AT,
            created_at.format(CREATED_AT_FORMAT).to_string(),
        );
        metadata.insert(metadata_keys::ORIGINAL_FILE_SIZE, size.to_string());
        metadata
    }

    pub fn from_map(map: BTreeMap<String, String>) -> Self {
        Self(map)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl AsRef<str>) {
        let value = value.as_ref();
        let value = if value.is_ascii() {
            value.to_string()
        } else {
            urlencoding::encode(value).into_owned()
        };
        self.0.insert(key.into(), value);
    }

    /// Joins `values` with `", "`. Empty lists are not recorded.
    pub fn insert_list<I, S>(&mut self, key: &str, values: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let joined = values
            .into_iter()
            .map(|v| v.as_ref().trim().to_string())
            .filter(|v| !v.is_empty())
            .collect::<Vec<_>>()
            .join(LIST_SEPARATOR);
        if !joined.is_empty() {
            self.insert(key, joined);
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    /// Splits a list value on `,`, trimming each entry.
    pub fn get_list(&self, key: &str) -> Vec<String> {
        self.get(key)
            .map(|value| {
                value
                    .split(',')
                    .map(|item| item.trim().to_string())
                    .filter(|item| !item.is_empty())
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &String)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_map(&self) -> &BTreeMap<String, String> {
        &self.0
    }

    pub fn into_map(self) -> BTreeMap<String, String> {
        self.0
    }
}

impl From<BTreeMap<String, String>> for UploadMetadata {
    fn from(map: BTreeMap<String, String>) -> Self {
        Self(map)
    }
}
