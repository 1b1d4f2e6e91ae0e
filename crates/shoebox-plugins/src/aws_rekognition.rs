//! Face identifier backed by an AWS Rekognition face collection

use anyhow::{Context, Result};
use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_rekognition::error::ProvideErrorMetadata;
use aws_sdk_rekognition::operation::search_faces_by_image::SearchFacesByImageError;
use aws_sdk_rekognition::primitives::Blob;
use aws_sdk_rekognition::types::{FaceMatch, Image};
use aws_sdk_rekognition::Client as RekognitionClient;
use bytes::Bytes;
use std::fmt::{Debug, Formatter, Result as FmtResult};

use crate::faces::FaceIdentifier;

const MAX_FACES: i32 = 16;

/// Searches a Rekognition collection whose faces were indexed with the
/// person id as their external image id.
pub struct RekognitionFaceIdentifier {
    client: RekognitionClient,
    collection_id: String,
    confidence_threshold: f32,
}

impl Debug for RekognitionFaceIdentifier {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("RekognitionFaceIdentifier")
            .field("collection_id", &self.collection_id)
            .field("confidence_threshold", &self.confidence_threshold)
            .finish()
    }
}

impl RekognitionFaceIdentifier {
    /// Create an identifier for the given collection; credentials come from the default AWS chain
    pub async fn new(
        collection_id: impl Into<String>,
        region: Option<String>,
        confidence_threshold: f32,
    ) -> Result<Self> {
        let collection_id = collection_id.into();
        if collection_id.trim().is_empty() {
            anyhow::bail!("Face collection id is required but not provided");
        }

        let mut loader = aws_config::defaults(BehaviorVersion::latest());
        if let Some(region) = region {
            loader = loader.region(aws_config::Region::new(region));
        }
        let config = loader.load().await;

        Ok(Self {
            client: RekognitionClient::new(&config),
            collection_id,
            confidence_threshold,
        })
    }

    /// Person ids ordered by similarity, first occurrence wins
    fn person_ids(matches: &[FaceMatch]) -> Vec<String> {
        let mut sorted: Vec<&FaceMatch> = matches.iter().collect();
        sorted.sort_by(|a, b| {
            b.similarity()
                .unwrap_or(0.0)
                .total_cmp(&a.similarity().unwrap_or(0.0))
        });

        let mut people: Vec<String> = Vec::new();
        for face_match in sorted {
            let Some(face) = face_match.face() else {
                continue;
            };
            let Some(id) = face.external_image_id().or(face.face_id()) else {
                continue;
            };
            if !people.iter().any(|p| p == id) {
                people.push(id.to_string());
            }
        }
        people
    }
}

#[async_trait]
impl FaceIdentifier for RekognitionFaceIdentifier {
    fn name(&self) -> &str {
        "aws_rekognition"
    }

    async fn identify(&self, image: Bytes) -> Result<Vec<String>> {
        let rekognition_image = Image::builder()
            .bytes(Blob::new(image.to_vec()))
            .build();

        let response = match self
            .client
            .search_faces_by_image()
            .collection_id(&self.collection_id)
            .image(rekognition_image)
            .face_match_threshold(self.confidence_threshold)
            .max_faces(MAX_FACES)
            .send()
            .await
        {
            Ok(response) => response,
            // Rekognition reports "no face in image" as an invalid parameter
            Err(err)
                if matches!(
                    err.as_service_error(),
                    Some(SearchFacesByImageError::InvalidParameterException(_))
                ) =>
            {
                tracing::debug!(
                    reason = err.message().unwrap_or_default(),
                    "No face detected"
                );
                return Ok(Vec::new());
            }
            Err(err) => {
                return Err(err).context("Failed to search faces in AWS Rekognition");
            }
        };

        let people = Self::person_ids(response.face_matches());
        tracing::debug!(
            collection_id = %self.collection_id,
            matches = people.len(),
            "Identified faces"
        );
        Ok(people)
    }
}
