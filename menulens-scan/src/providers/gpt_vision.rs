//! GPT vision extraction: the photo goes straight to the model

use crate::providers::chat::{parse_dish_payload, ChatClient};
use crate::providers::prompts::VISION_EXTRACTION_PROMPT;
use crate::types::{ExtractionProvider, MenuImage, ProviderError};
use async_trait::async_trait;
use menulens_common::RawDish;
use serde_json::json;
use tokio_util::sync::CancellationToken;
use tracing::info;

const MAX_TOKENS: u32 = 8192;

pub struct GptVisionProvider {
    client: ChatClient,
}

impl GptVisionProvider {
    pub const NAME: &'static str = "gpt-vision";

    pub fn new(client: ChatClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ExtractionProvider for GptVisionProvider {
    fn name(&self) -> &'static str {
        Self::NAME
    }

    async fn extract_dishes(
        &self,
        image: &MenuImage,
        cancel: &CancellationToken,
    ) -> Result<Vec<RawDish>, ProviderError> {
        let messages = vec![
            json!({ "role": "system", "content": VISION_EXTRACTION_PROMPT }),
            json!({
                "role": "user",
                "content": [
                    { "type": "image_url", "image_url": { "url": image.data_uri(), "detail": "auto" } },
                    { "type": "text", "text": "Extract ALL dishes from this menu. Do not miss any items." },
                ],
            }),
        ];

        let content = self.client.complete_json(messages, MAX_TOKENS, cancel).await?;
        let dishes: Vec<RawDish> = parse_dish_payload(&content)?;
        info!(dishes = dishes.len(), "GPT vision extraction complete");
        Ok(dishes)
    }
}
