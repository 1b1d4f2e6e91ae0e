//! Shoebox enrichment plugins
//!
//! Optional collaborators that add descriptive metadata to photos before
//! they are uploaded: an image describer (caption and tags) and a face
//! identifier (known people). The archiver treats every failure from these
//! as non-fatal.

pub mod describer;
pub mod faces;

#[cfg(feature = "plugin-aws-rekognition")]
mod aws_rekognition;
#[cfg(feature = "plugin-claude-vision")]
mod claude_vision;

#[cfg(any(test, feature = "test-helpers"))]
pub mod test_helpers;

#[cfg(feature = "plugin-aws-rekognition")]
pub use aws_rekognition::RekognitionFaceIdentifier;
#[cfg(feature = "plugin-claude-vision")]
pub use claude_vision::ClaudeVisionDescriber;
pub use describer::{Caption, ImageDescriber, ImageDescription};
pub use faces::FaceIdentifier;
