//! Face identification

use anyhow::Result;
use async_trait::async_trait;
use bytes::Bytes;
use std::fmt::Debug;

/// Detects faces in an image and matches them against a collection of known people
#[async_trait]
pub trait FaceIdentifier: Send + Sync + Debug {
    /// Short identifier used in logs
    fn name(&self) -> &str;

    /// Ids of the people recognised in the image, best match first, without duplicates
    async fn identify(&self, image: Bytes) -> Result<Vec<String>>;
}
