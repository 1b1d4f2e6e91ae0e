use thiserror::Error;

/// Errors raised while reading media containers
#[derive(Debug, Error)]
pub enum FormatError {
    #[error("EXIF error: {0}")]
    Exif(String),

    #[error("Malformed {container} data: {reason}")]
    Malformed {
        container: &'static str,
        reason: String,
    },

    #[error("Image error: {0}")]
    Image(String),

    #[error("Processing task failed: {0}")]
    Task(String),
}

pub type FormatResult<T> = Result<T, FormatError>;

impl FormatError {
    pub(crate) fn malformed(container: &'static str, reason: impl Into<String>) -> Self {
        FormatError::Malformed {
            container,
            reason: reason.into(),
        }
    }
}
