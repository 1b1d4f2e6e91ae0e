//! Image description

use anyhow::Result;
use async_trait::async_trait;
use bytes::Bytes;
use std::fmt::Debug;

/// A candidate caption with the service's confidence in it
#[derive(Debug, Clone, PartialEq)]
pub struct Caption {
    pub text: String,
    pub confidence: f32,
}

/// What a describer found in an image
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImageDescription {
    pub captions: Vec<Caption>,
    pub tags: Vec<String>,
}

impl ImageDescription {
    /// The caption with the highest confidence
    pub fn best_caption(&self) -> Option<&Caption> {
        self.captions
            .iter()
            .max_by(|a, b| a.confidence.total_cmp(&b.confidence))
    }
}

/// Produces a caption and tags for a JPEG image
#[async_trait]
pub trait ImageDescriber: Send + Sync + Debug {
    /// Short identifier used in logs
    fn name(&self) -> &str;

    async fn describe(&self, image: Bytes) -> Result<ImageDescription>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_best_caption_picks_highest_confidence() {
        let description = ImageDescription {
            captions: vec![
                Caption {
                    text: "a dog".to_string(),
                    confidence: 0.4,
                },
                Caption {
                    text: "a dog on a beach".to_string(),
                    confidence: 0.9,
                },
            ],
            tags: vec![],
        };
        assert_eq!(
            description.best_caption().map(|c| c.text.as_str()),
            Some("a dog on a beach")
        );
    }

    #[test]
    fn test_best_caption_empty() {
        assert!(ImageDescription::default().best_caption().is_none());
    }
}
