//! Scripted providers for tests
//!
//! Compiled for unit tests and behind the `test-util` feature.
//!
//! Deterministic stand-ins for the model-backed providers. They record how
//! they were called so tests can assert on batching, retries and fallback.

use crate::types::{with_cancel, EnrichmentProvider, ExtractionProvider, MenuImage, ProviderError};
use async_trait::async_trait;
use menulens_common::{
    DetailRequest, Dish, DishDetail, Ingredient, IngredientCategory, Nutrition, RawDish,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Response function: `(batch, zero-based call number) -> result`
pub type RespondFn = dyn Fn(&[RawDish], usize) -> Result<Vec<Dish>, ProviderError> + Send + Sync;

/// Delay function applied before each enrichment call
pub type DelayFn = dyn Fn(&[RawDish]) -> Duration + Send + Sync;

/// Extraction provider with a fixed answer
pub struct ScriptedExtraction {
    name: &'static str,
    result: Result<Vec<RawDish>, ProviderError>,
    delay: Duration,
    calls: AtomicUsize,
}

impl ScriptedExtraction {
    pub fn returning(name: &'static str, dishes: Vec<RawDish>) -> Self {
        Self {
            name,
            result: Ok(dishes),
            delay: Duration::ZERO,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing(name: &'static str, error: ProviderError) -> Self {
        Self {
            name,
            result: Err(error),
            delay: Duration::ZERO,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ExtractionProvider for ScriptedExtraction {
    fn name(&self) -> &'static str {
        self.name
    }

    async fn extract_dishes(
        &self,
        _image: &MenuImage,
        cancel: &CancellationToken,
    ) -> Result<Vec<RawDish>, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            with_cancel(cancel, async {
                tokio::time::sleep(self.delay).await;
                Ok(())
            })
            .await?;
        }
        self.result.clone()
    }
}

/// Enrichment provider driven by a response function
pub struct ScriptedEnrichment {
    name: &'static str,
    respond: Box<RespondFn>,
    delay: Box<DelayFn>,
    calls: AtomicUsize,
    requests: Mutex<Vec<Vec<String>>>,
}

impl ScriptedEnrichment {
    /// Enrich every dish it is given
    pub fn echo(name: &'static str) -> Self {
        Self::from_fn(name, move |batch, _| {
            Ok(batch.iter().map(|raw| enriched_from_raw(raw, name)).collect())
        })
    }

    /// Always fail with `error`
    pub fn failing(name: &'static str, error: ProviderError) -> Self {
        Self::from_fn(name, move |_, _| Err(error.clone()))
    }

    pub fn from_fn<F>(name: &'static str, respond: F) -> Self
    where
        F: Fn(&[RawDish], usize) -> Result<Vec<Dish>, ProviderError> + Send + Sync + 'static,
    {
        Self {
            name,
            respond: Box::new(respond),
            delay: Box::new(|_| Duration::ZERO),
            calls: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn with_delay<F>(mut self, delay: F) -> Self
    where
        F: Fn(&[RawDish]) -> Duration + Send + Sync + 'static,
    {
        self.delay = Box::new(delay);
        self
    }

    /// Number of batch calls (card or full) received
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Dish ids of every batch call, in call order
    pub fn requests(&self) -> Vec<Vec<String>> {
        self.requests
            .lock()
            .map(|r| r.clone())
            .unwrap_or_default()
    }

    async fn respond(
        &self,
        dishes: &[RawDish],
        cancel: &CancellationToken,
    ) -> Result<Vec<Dish>, ProviderError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(dishes.iter().map(|d| d.id.clone()).collect());
        }

        let delay = (self.delay)(dishes);
        if !delay.is_zero() {
            with_cancel(cancel, async {
                tokio::time::sleep(delay).await;
                Ok(())
            })
            .await?;
        }
        if cancel.is_cancelled() {
            return Err(ProviderError::Cancelled);
        }

        (self.respond)(dishes, call)
    }
}

#[async_trait]
impl EnrichmentProvider for ScriptedEnrichment {
    fn name(&self) -> &'static str {
        self.name
    }

    async fn enrich_batch(
        &self,
        dishes: &[RawDish],
        _prefs_text: &str,
        cancel: &CancellationToken,
    ) -> Result<Vec<Dish>, ProviderError> {
        self.respond(dishes, cancel).await
    }

    async fn enrich_batch_card(
        &self,
        dishes: &[RawDish],
        _prefs_text: &str,
        cancel: &CancellationToken,
    ) -> Result<Vec<Dish>, ProviderError> {
        let mut cards = self.respond(dishes, cancel).await?;
        for card in &mut cards {
            card.apply_detail(&DishDetail::default());
        }
        Ok(cards)
    }

    async fn enrich_batch_detail(
        &self,
        dishes: &[DetailRequest],
        _prefs_text: &str,
        cancel: &CancellationToken,
    ) -> Result<Vec<DishDetail>, ProviderError> {
        if cancel.is_cancelled() {
            return Err(ProviderError::Cancelled);
        }
        Ok(dishes
            .iter()
            .map(|d| DishDetail {
                id: d.id.clone(),
                ingredients: vec![main_ingredient(&d.name_english)],
                nutrition: SAMPLE_NUTRITION,
                explanation: format!("{} explained by {}.", d.name_english, self.name),
                cultural_terms: vec![],
            })
            .collect())
    }
}

const SAMPLE_NUTRITION: Nutrition = Nutrition {
    protein: 20.0,
    carbs: 45.0,
    fat: 12.0,
    fiber: 4.0,
    kcal: 380.0,
};

fn main_ingredient(name_english: &str) -> Ingredient {
    Ingredient {
        name: name_english.to_lowercase(),
        category: IngredientCategory::Other,
        is_unfamiliar: false,
        explanation: None,
    }
}

/// Deterministic full-tier dish for a raw stub
pub fn enriched_from_raw(raw: &RawDish, provider: &str) -> Dish {
    Dish {
        id: raw.id.clone(),
        name_english: raw.name_english.clone(),
        name_local: raw.name_local.clone(),
        description: if raw.brief.is_empty() {
            raw.name_english.clone()
        } else {
            raw.brief.clone()
        },
        country: raw.country.clone(),
        price: raw.price.clone(),
        ingredients: vec![main_ingredient(&raw.name_english)],
        nutrition: SAMPLE_NUTRITION,
        explanation: format!("{} explained by {}.", raw.name_english, provider),
        rank_score: Some(10.0),
        ..Default::default()
    }
}

/// Numbered raw dishes `dish-1..=count` for demos and tests
pub fn sample_menu(count: usize, country: &str) -> Vec<RawDish> {
    (1..=count)
        .map(|n| RawDish {
            id: format!("dish-{}", n),
            name_english: format!("Dish {}", n),
            name_local: String::new(),
            price: format!("{}", n * 1000),
            brief: format!("house dish {}", n),
            country: country.to_string(),
        })
        .collect()
}
