//! Blob addressing shared by all backends.

use std::fmt::{Display, Formatter, Result as FmtResult};

use shoebox_core::DestinationKey;

use crate::traits::{StorageError, StorageResult};

/// Container plus blob name
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BlobKey {
    pub container: String,
    pub name: String,
}

impl BlobKey {
    pub fn new(container: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            container: container.into(),
            name: name.into(),
        }
    }

    /// Parses a `{container}/{blob name}` identifier.
    pub fn parse(identifier: &str) -> StorageResult<Self> {
        match identifier.split_once('/') {
            Some((container, name)) if !container.is_empty() && !name.is_empty() => {
                let key = Self::new(container, name);
                key.validate()?;
                Ok(key)
            }
            _ => Err(StorageError::InvalidKey(format!(
                "Blob identifier must be '<container>/<name>': {}",
                identifier
            ))),
        }
    }

    /// `{container}/{blob name}`
    pub fn identifier(&self) -> String {
        format!("{}/{}", self.container, self.name)
    }

    /// Last path segment of the blob name
    pub fn file_name(&self) -> &str {
        self.name.rsplit('/').next().unwrap_or(&self.name)
    }

    pub fn validate(&self) -> StorageResult<()> {
        validate_container(&self.container)?;
        validate_blob_name(&self.name)
    }
}

impl From<&DestinationKey> for BlobKey {
    fn from(key: &DestinationKey) -> Self {
        Self::new(key.container.clone(), key.blob_name())
    }
}

impl Display for BlobKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}/{}", self.container, self.name)
    }
}

pub fn validate_container(container: &str) -> StorageResult<()> {
    if container.is_empty()
        || container.contains('/')
        || container.contains('\\')
        || container.starts_with('.')
    {
        return Err(StorageError::InvalidKey(format!(
            "Invalid container name: {}",
            container
        )));
    }
    Ok(())
}

/// Rejects empty names, absolute names and `..` segments.
pub fn validate_blob_name(name: &str) -> StorageResult<()> {
    if name.is_empty() || name.starts_with('/') || name.contains('\\') {
        return Err(StorageError::InvalidKey(format!("Invalid blob name: {}", name)));
    }
    if name.split('/').any(|segment| segment == ".." || segment.is_empty()) {
        return Err(StorageError::InvalidKey(format!(
            "Blob name contains invalid segments: {}",
            name
        )));
    }
    Ok(())
}

/// Normalizes a listing prefix: no leading slash, and a directory prefix
/// always ends with `/` so `2019/05/2` does not match `2019/05/25/...`.
pub fn directory_prefix(directory: &str) -> String {
    let trimmed = directory.trim_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("{}/", trimmed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_identifier() {
        let key = BlobKey::parse("photos/2019/05/25/IMG_1.jpg").unwrap();
        assert_eq!(key.container, "photos");
        assert_eq!(key.name, "2019/05/25/IMG_1.jpg");
        assert_eq!(key.file_name(), "IMG_1.jpg");
        assert_eq!(key.identifier(), "photos/2019/05/25/IMG_1.jpg");
    }

    #[test]
    fn rejects_traversal() {
        assert!(BlobKey::parse("photos/../etc/passwd").is_err());
        assert!(BlobKey::parse("photos//etc").is_err());
        assert!(BlobKey::parse("photos").is_err());
        assert!(validate_container("..").is_err());
    }

    #[test]
    fn from_destination_key() {
        let destination = DestinationKey::new("photos", "2019/05/25/", "IMG_1.jpg");
        let key = BlobKey::from(&destination);
        assert_eq!(key.identifier(), "photos/2019/05/25/IMG_1.jpg");
    }

    #[test]
    fn directory_prefix_is_slash_terminated() {
        assert_eq!(directory_prefix("2019/05/25"), "2019/05/25/");
        assert_eq!(directory_prefix("/2019/05/25/"), "2019/05/25/");
        assert_eq!(directory_prefix(""), "");
    }
}
