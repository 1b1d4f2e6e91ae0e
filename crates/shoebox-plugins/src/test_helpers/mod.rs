//! Test doubles for the enrichment collaborators
//!
//! Both mocks count their calls and can be switched to fail, so callers can
//! check that enrichment errors never escape.

use anyhow::Result;
use async_trait::async_trait;
use bytes::Bytes;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::describer::{Caption, ImageDescriber, ImageDescription};
use crate::faces::FaceIdentifier;

/// Describer returning a fixed description
#[derive(Debug, Clone, Default)]
pub struct MockDescriber {
    description: ImageDescription,
    fail: bool,
    calls: Arc<AtomicUsize>,
}

impl MockDescriber {
    pub fn new(caption: &str, tags: &[&str]) -> Self {
        Self {
            description: ImageDescription {
                captions: vec![Caption {
                    text: caption.to_string(),
                    confidence: 0.9,
                }],
                tags: tags.iter().map(|t| t.to_string()).collect(),
            },
            fail: false,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ImageDescriber for MockDescriber {
    fn name(&self) -> &str {
        "mock_describer"
    }

    async fn describe(&self, _image: Bytes) -> Result<ImageDescription> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            anyhow::bail!("describe service unavailable");
        }
        Ok(self.description.clone())
    }
}

/// Face identifier returning a fixed list of people
#[derive(Debug, Clone, Default)]
pub struct MockFaceIdentifier {
    people: Vec<String>,
    fail: bool,
    calls: Arc<AtomicUsize>,
}

impl MockFaceIdentifier {
    pub fn new(people: &[&str]) -> Self {
        Self {
            people: people.iter().map(|p| p.to_string()).collect(),
            fail: false,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl FaceIdentifier for MockFaceIdentifier {
    fn name(&self) -> &str {
        "mock_faces"
    }

    async fn identify(&self, _image: Bytes) -> Result<Vec<String>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            anyhow::bail!("face service unavailable");
        }
        Ok(self.people.clone())
    }
}
