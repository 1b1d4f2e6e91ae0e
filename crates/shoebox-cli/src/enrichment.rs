//! Enrichment plugins enabled by configuration

use std::sync::Arc;

use shoebox_archiver::ArchivePipeline;
use shoebox_core::ArchiverConfig;
use shoebox_plugins::{ClaudeVisionDescriber, RekognitionFaceIdentifier};

/// Attach the describer and face identifier that `config` enables.
///
/// A plugin that cannot be set up is logged and skipped; archiving proceeds
/// without it.
pub async fn attach_plugins(pipeline: ArchivePipeline, config: &ArchiverConfig) -> ArchivePipeline {
    let mut pipeline = pipeline;

    if let Some(api_key) = &config.vision.anthropic_api_key {
        match ClaudeVisionDescriber::new(api_key, &config.vision.anthropic_vision_model) {
            Ok(describer) => {
                tracing::info!(model = %config.vision.anthropic_vision_model, "Image description enabled");
                pipeline = pipeline.with_describer(Arc::new(describer));
            }
            Err(e) => tracing::warn!(error = %e, "Image description disabled"),
        }
    }

    if let Some(collection_id) = &config.face.collection_id {
        match RekognitionFaceIdentifier::new(
            collection_id,
            config.face.region.clone(),
            config.face.confidence_threshold,
        )
        .await
        {
            Ok(faces) => {
                tracing::info!(collection = %collection_id, "Face identification enabled");
                pipeline = pipeline.with_face_identifier(Arc::new(faces));
            }
            Err(e) => tracing::warn!(error = %e, "Face identification disabled"),
        }
    }

    pipeline
}
