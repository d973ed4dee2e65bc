//! Enrichment over an OpenAI-compatible chat backend (Groq or OpenAI)

use crate::providers::chat::{parse_dish_payload, text_messages, ChatClient};
use crate::providers::prompts::{
    batch_country, card_enrichment_prompt, detail_enrichment_prompt, detail_request_list,
    full_enrichment_prompt, raw_dish_list,
};
use crate::types::{EnrichmentProvider, ProviderError};
use async_trait::async_trait;
use menulens_common::{DetailRequest, Dish, DishDetail, RawDish};
use serde::de::DeserializeOwned;
use tokio_util::sync::CancellationToken;
use tracing::warn;

const MAX_TOKENS: u32 = 8192;

pub struct ChatEnrichmentProvider {
    name: &'static str,
    client: ChatClient,
}

impl ChatEnrichmentProvider {
    pub const GROQ: &'static str = "groq";
    pub const GPT: &'static str = "gpt";

    pub fn groq(api_key: Option<String>) -> Self {
        Self {
            name: Self::GROQ,
            client: ChatClient::groq(api_key),
        }
    }

    pub fn gpt(api_key: Option<String>) -> Self {
        Self {
            name: Self::GPT,
            client: ChatClient::openai(api_key),
        }
    }

    async fn call<T: DeserializeOwned>(
        &self,
        system_prompt: String,
        dish_list: String,
        expected: usize,
        cancel: &CancellationToken,
    ) -> Result<Vec<T>, ProviderError> {
        let messages = text_messages(&system_prompt, &format!("Enrich these dishes:\n{}", dish_list));
        let content = self.client.complete_json(messages, MAX_TOKENS, cancel).await?;
        let dishes: Vec<T> = parse_dish_payload(&content)?;
        if dishes.len() < expected {
            warn!(
                provider = self.name,
                returned = dishes.len(),
                expected,
                "Enrichment returned fewer dishes than requested"
            );
        }
        Ok(dishes)
    }
}

#[async_trait]
impl EnrichmentProvider for ChatEnrichmentProvider {
    fn name(&self) -> &'static str {
        self.name
    }

    async fn enrich_batch(
        &self,
        dishes: &[RawDish],
        prefs_text: &str,
        cancel: &CancellationToken,
    ) -> Result<Vec<Dish>, ProviderError> {
        let country = batch_country(dishes.iter().map(|d| d.country.as_str()));
        self.call(
            full_enrichment_prompt(country, prefs_text),
            raw_dish_list(dishes),
            dishes.len(),
            cancel,
        )
        .await
    }

    async fn enrich_batch_card(
        &self,
        dishes: &[RawDish],
        prefs_text: &str,
        cancel: &CancellationToken,
    ) -> Result<Vec<Dish>, ProviderError> {
        let country = batch_country(dishes.iter().map(|d| d.country.as_str()));
        let mut cards: Vec<Dish> = self
            .call(
                card_enrichment_prompt(country, prefs_text),
                raw_dish_list(dishes),
                dishes.len(),
                cancel,
            )
            .await?;

        // Card tier never carries detail, whatever the model volunteered
        for card in &mut cards {
            card.apply_detail(&DishDetail::default());
        }
        Ok(cards)
    }

    async fn enrich_batch_detail(
        &self,
        dishes: &[DetailRequest],
        prefs_text: &str,
        cancel: &CancellationToken,
    ) -> Result<Vec<DishDetail>, ProviderError> {
        let country = batch_country(dishes.iter().map(|d| d.country.as_str()));
        self.call(
            detail_enrichment_prompt(country, prefs_text),
            detail_request_list(dishes),
            dishes.len(),
            cancel,
        )
        .await
    }
}
