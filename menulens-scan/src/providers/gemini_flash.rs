//! Gemini Flash extraction: one multimodal call, no separate OCR step

use crate::providers::chat::{parse_dish_payload, truncate};
use crate::providers::prompts::VISION_EXTRACTION_PROMPT;
use crate::types::{with_cancel, ExtractionProvider, MenuImage, ProviderError};
use async_trait::async_trait;
use menulens_common::RawDish;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

const GEMINI_URL: &str =
    "https://generativelanguage.googleapis.com/v1beta/models/gemini-2.0-flash:generateContent";

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(90);

const MAX_OUTPUT_TOKENS: u32 = 8192;

pub struct GeminiFlashProvider {
    http_client: Client,
    api_key: Option<String>,
}

impl GeminiFlashProvider {
    pub const NAME: &'static str = "gemini";

    pub fn new(api_key: Option<String>) -> Self {
        Self {
            http_client: Client::builder()
                .timeout(DEFAULT_TIMEOUT)
                .build()
                .unwrap_or_default(),
            api_key: api_key.filter(|k| !k.trim().is_empty()),
        }
    }
}

#[async_trait]
impl ExtractionProvider for GeminiFlashProvider {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    async fn extract_dishes(
        &self,
        image: &MenuImage,
        cancel: &CancellationToken,
    ) -> Result<Vec<RawDish>, ProviderError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| ProviderError::NotConfigured("Gemini API key".to_string()))?;

        let body = json!({
            "contents": [{
                "parts": [
                    { "inlineData": { "mimeType": image.mime_type(), "data": image.base64() } },
                    { "text": format!("{}\n\nExtract ALL dishes from this menu image. Do not miss any items.", VISION_EXTRACTION_PROMPT) },
                ],
            }],
            "generationConfig": {
                "responseMimeType": "application/json",
                "temperature": 0.2,
                "maxOutputTokens": MAX_OUTPUT_TOKENS,
            },
        });

        let started = Instant::now();
        let content = with_cancel(cancel, async {
            let response = self
                .http_client
                .post(GEMINI_URL)
                .query(&[("key", api_key)])
                .json(&body)
                .send()
                .await
                .map_err(|e| ProviderError::Network(format!("Gemini request failed: {}", e)))?;

            let status = response.status();
            if !status.is_success() {
                let text = response.text().await.unwrap_or_default();
                warn!(status = status.as_u16(), "Gemini extraction failed");
                return Err(ProviderError::Api {
                    status: status.as_u16(),
                    message: truncate(&text, 300),
                });
            }

            let generated: GenerateResponse = response
                .json()
                .await
                .map_err(|e| ProviderError::Parse(format!("Gemini response unreadable: {}", e)))?;

            Ok(generated
                .candidates
                .into_iter()
                .next()
                .and_then(|c| c.content.parts.into_iter().next())
                .and_then(|p| p.text)
                .unwrap_or_default())
        })
        .await?;

        let dishes: Vec<RawDish> = parse_dish_payload(&content)?;
        info!(
            dishes = dishes.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Gemini extraction complete"
        );
        Ok(dishes)
    }
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: CandidateContent,
}

#[derive(Debug, Default, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Deserialize)]
struct Part {
    text: Option<String>,
}
