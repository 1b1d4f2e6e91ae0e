//! Image describer backed by Anthropic's Claude Messages API

use anyhow::{Context, Result};
use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::fmt::{Debug, Formatter, Result as FmtResult};
use std::time::Duration;

use crate::describer::{Caption, ImageDescriber, ImageDescription};

const API_BASE: &str = "https://api.anthropic.com/v1";
const API_VERSION: &str = "2023-06-01";
const MAX_TOKENS: u32 = 1024;

const DESCRIBE_PROMPT: &str = "Describe this photo. Respond with JSON only, in the form \
{\"captions\": [{\"text\": \"<one sentence caption>\", \"confidence\": <0.0-1.0>}], \
\"tags\": [\"<lowercase single-word tag>\", ...]}. \
Give up to three captions and up to twenty tags.";

pub struct ClaudeVisionDescriber {
    http_client: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
}

impl Debug for ClaudeVisionDescriber {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("ClaudeVisionDescriber")
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .finish()
    }
}

#[derive(Debug, Serialize)]
struct MessagesRequest {
    model: String,
    max_tokens: u32,
    messages: Vec<MessageParam>,
}

#[derive(Debug, Serialize)]
struct MessageParam {
    role: String,
    content: Vec<ContentBlock>,
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentBlock {
    Text { text: String },
    Image { source: ImageSource },
}

#[derive(Debug, Serialize)]
struct ImageSource {
    #[serde(rename = "type")]
    source_type: String,
    media_type: String,
    data: String,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlockResponse>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentBlockResponse {
    Text {
        text: String,
    },
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
struct DescriptionPayload {
    #[serde(default)]
    captions: Vec<CaptionPayload>,
    #[serde(default)]
    tags: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct CaptionPayload {
    text: String,
    #[serde(default)]
    confidence: f32,
}

impl ClaudeVisionDescriber {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Result<Self> {
        Self::with_base_url(api_key, model, API_BASE)
    }

    /// Point the describer at another Messages API endpoint (a proxy or a test server)
    pub fn with_base_url(
        api_key: impl Into<String>,
        model: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Result<Self> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            anyhow::bail!("Claude Vision API key is required but not provided");
        }

        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(120))
            .build()
            .context("Failed to create HTTP client for Claude Vision")?;

        Ok(Self {
            http_client,
            api_key,
            model: model.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    /// Extract the JSON object from a reply that may be wrapped in a markdown fence
    fn parse_description(text: &str) -> Result<ImageDescription> {
        let json_text = if text.contains("```json") {
            text.split("```json")
                .nth(1)
                .and_then(|s| s.split("```").next())
                .unwrap_or(text)
                .trim()
        } else if text.contains("```") {
            text.split("```").nth(1).unwrap_or(text).trim()
        } else {
            text.trim()
        };

        let payload: DescriptionPayload = serde_json::from_str(json_text)
            .context("Failed to parse Claude Vision description as JSON")?;

        Ok(ImageDescription {
            captions: payload
                .captions
                .into_iter()
                .filter(|c| !c.text.trim().is_empty())
                .map(|c| Caption {
                    text: c.text.trim().to_string(),
                    confidence: c.confidence,
                })
                .collect(),
            tags: payload
                .tags
                .into_iter()
                .map(|t| t.trim().to_string())
                .filter(|t| !t.is_empty())
                .collect(),
        })
    }
}

#[async_trait]
impl ImageDescriber for ClaudeVisionDescriber {
    fn name(&self) -> &str {
        "claude_vision"
    }

    async fn describe(&self, image: Bytes) -> Result<ImageDescription> {
        use base64::Engine;
        let data = base64::engine::general_purpose::STANDARD.encode(&image);

        let body = MessagesRequest {
            model: self.model.clone(),
            max_tokens: MAX_TOKENS,
            messages: vec![MessageParam {
                role: "user".to_string(),
                content: vec![
                    ContentBlock::Image {
                        source: ImageSource {
                            source_type: "base64".to_string(),
                            // thumbnails are always re-encoded as JPEG
                            media_type: "image/jpeg".to_string(),
                            data,
                        },
                    },
                    ContentBlock::Text {
                        text: DESCRIBE_PROMPT.to_string(),
                    },
                ],
            }],
        };

        tracing::debug!(
            image_size = image.len(),
            model = %self.model,
            "Sending image to Claude Vision"
        );

        let response = self
            .http_client
            .post(format!("{}/messages", self.base_url))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", API_VERSION)
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await
            .context("Failed to send request to Claude Vision API")?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(anyhow::anyhow!(
                "Claude Vision API request failed: {} - {}",
                status,
                error_text
            ));
        }

        let parsed: MessagesResponse = response
            .json()
            .await
            .context("Failed to parse Claude Vision API response")?;

        let text = parsed
            .content
            .into_iter()
            .find_map(|b| match b {
                ContentBlockResponse::Text { text } => Some(text),
                ContentBlockResponse::Other => None,
            })
            .context("Claude Vision response contained no text")?;

        Self::parse_description(&text)
    }
}
