//! Cloud Vision OCR followed by text-model parsing
//!
//! OCR runs once; the text is then parsed by Groq, falling back to OpenAI
//! when Groq is unconfigured, fails, or finds no dishes. Native-script
//! names the text model drops are recovered from the OCR lines.

use crate::providers::chat::{parse_dish_payload, text_messages, ChatClient};
use crate::providers::ocr::{backfill_name_local, CloudVisionOcr};
use crate::providers::prompts::TEXT_EXTRACTION_PROMPT;
use crate::types::{ExtractionProvider, MenuImage, ProviderError};
use async_trait::async_trait;
use menulens_common::RawDish;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

const MAX_TOKENS: u32 = 4096;

pub struct CloudVisionGroqProvider {
    ocr: CloudVisionOcr,
    text_engines: Vec<ChatClient>,
}

impl CloudVisionGroqProvider {
    pub const NAME: &'static str = "cloud-vision-groq";

    pub fn new(ocr: CloudVisionOcr, groq: ChatClient, openai: ChatClient) -> Self {
        Self {
            ocr,
            text_engines: vec![groq, openai],
        }
    }
}

#[async_trait]
impl ExtractionProvider for CloudVisionGroqProvider {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    async fn extract_dishes(
        &self,
        image: &MenuImage,
        cancel: &CancellationToken,
    ) -> Result<Vec<RawDish>, ProviderError> {
        let started = Instant::now();
        let ocr_text = self.ocr.extract_text(image, cancel).await?;
        let messages = text_messages(
            TEXT_EXTRACTION_PROMPT,
            &format!("Extract ALL dishes from this menu text:\n\n{}", ocr_text),
        );

        let mut last_error = ProviderError::NotConfigured("text parsing engine".to_string());
        for engine in self.text_engines.iter().filter(|e| e.is_configured()) {
            let parsed = match engine.complete_json(messages.clone(), MAX_TOKENS, cancel).await {
                Ok(content) => parse_dish_payload::<RawDish>(&content),
                Err(e) => Err(e),
            };

            match parsed {
                Ok(dishes) if !dishes.is_empty() => {
                    info!(
                        engine = engine.label(),
                        dishes = dishes.len(),
                        elapsed_ms = started.elapsed().as_millis() as u64,
                        "Parsed OCR text"
                    );
                    return Ok(backfill_name_local(dishes, &ocr_text));
                }
                Ok(_) => {
                    warn!(engine = engine.label(), "Text engine found no dishes, trying next");
                    last_error = ProviderError::EmptyResult;
                }
                Err(ProviderError::Cancelled) => return Err(ProviderError::Cancelled),
                Err(e) => {
                    warn!(engine = engine.label(), error = %e, "Text engine failed, trying next");
                    last_error = e;
                }
            }
        }

        Err(last_error)
    }
}
