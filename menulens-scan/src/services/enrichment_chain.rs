//! Enrichment fallback chain
//!
//! Same rule as extraction: on error or zero dishes, try the next provider.

use crate::types::{with_cancel, EnrichmentProvider, EnrichmentTier, ProviderError};
use menulens_common::{DetailRequest, Dish, DishDetail, RawDish};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

pub struct EnrichmentChain {
    providers: Vec<Arc<dyn EnrichmentProvider>>,
}

impl EnrichmentChain {
    pub fn new(providers: Vec<Arc<dyn EnrichmentProvider>>) -> Self {
        Self { providers }
    }

    pub fn provider_names(&self) -> Vec<&'static str> {
        self.providers.iter().map(|p| p.name()).collect()
    }

    /// Enrich one batch at the given tier
    pub async fn enrich(
        &self,
        dishes: &[RawDish],
        prefs_text: &str,
        tier: EnrichmentTier,
        cancel: &CancellationToken,
    ) -> Result<Vec<Dish>, ProviderError> {
        let mut last_error = no_providers();

        for provider in &self.providers {
            let call = async {
                match tier {
                    EnrichmentTier::Full => provider.enrich_batch(dishes, prefs_text, cancel).await,
                    EnrichmentTier::Card => {
                        provider.enrich_batch_card(dishes, prefs_text, cancel).await
                    }
                }
            };

            match with_cancel(cancel, call).await {
                Ok(enriched) if !enriched.is_empty() => {
                    debug!(
                        provider = provider.name(),
                        requested = dishes.len(),
                        returned = enriched.len(),
                        "Enrichment call OK"
                    );
                    return Ok(enriched);
                }
                Ok(_) => {
                    warn!(provider = provider.name(), "Enrichment returned 0 dishes, falling back");
                    last_error = ProviderError::EmptyResult;
                }
                Err(ProviderError::Cancelled) => return Err(ProviderError::Cancelled),
                Err(e) => {
                    warn!(provider = provider.name(), error = %e, "Enrichment failed, falling back");
                    last_error = e;
                }
            }
        }

        Err(last_error)
    }

    /// Detail-tier enrichment for card dishes
    pub async fn enrich_detail(
        &self,
        dishes: &[DetailRequest],
        prefs_text: &str,
        cancel: &CancellationToken,
    ) -> Result<Vec<DishDetail>, ProviderError> {
        let mut last_error = no_providers();

        for provider in &self.providers {
            match with_cancel(cancel, provider.enrich_batch_detail(dishes, prefs_text, cancel)).await
            {
                Ok(details) if !details.is_empty() => return Ok(details),
                Ok(_) => {
                    warn!(provider = provider.name(), "Detail enrichment returned nothing, falling back");
                    last_error = ProviderError::EmptyResult;
                }
                Err(ProviderError::Cancelled) => return Err(ProviderError::Cancelled),
                Err(e) => {
                    warn!(provider = provider.name(), error = %e, "Detail enrichment failed, falling back");
                    last_error = e;
                }
            }
        }

        Err(last_error)
    }
}

fn no_providers() -> ProviderError {
    ProviderError::NotConfigured("enrichment provider".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::scripted::{sample_menu, ScriptedEnrichment};

    #[tokio::test]
    async fn test_falls_back_to_next_provider() {
        let primary = Arc::new(ScriptedEnrichment::failing(
            "groq",
            ProviderError::Api {
                status: 429,
                message: "rate limited".into(),
            },
        ));
        let fallback = Arc::new(ScriptedEnrichment::echo("gpt"));
        let chain = EnrichmentChain::new(vec![primary.clone(), fallback.clone()]);

        let dishes = chain
            .enrich(&sample_menu(2, "Vietnam"), "", EnrichmentTier::Full, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(dishes.len(), 2);
        assert_eq!(primary.calls(), 1);
        assert_eq!(fallback.calls(), 1);
    }

    #[tokio::test]
    async fn test_zero_dishes_counts_as_failure() {
        let chain = EnrichmentChain::new(vec![
            Arc::new(ScriptedEnrichment::from_fn("groq", |_, _| Ok(vec![]))),
            Arc::new(ScriptedEnrichment::from_fn("gpt", |_, _| Ok(vec![]))),
        ]);

        let result = chain
            .enrich(&sample_menu(1, "Vietnam"), "", EnrichmentTier::Card, &CancellationToken::new())
            .await;

        assert_eq!(result, Err(ProviderError::EmptyResult));
    }

    #[tokio::test]
    async fn test_detail_chain() {
        let chain = EnrichmentChain::new(vec![Arc::new(ScriptedEnrichment::echo("groq"))]);
        let requests: Vec<DetailRequest> =
            sample_menu(2, "Japan").iter().map(DetailRequest::from).collect();

        let details = chain
            .enrich_detail(&requests, "", &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(details.len(), 2);
        assert_eq!(details[1].id, "dish-2");
    }

    #[tokio::test]
    async fn test_empty_chain_is_not_configured() {
        let chain = EnrichmentChain::new(vec![]);
        let result = chain
            .enrich_detail(&[], "", &CancellationToken::new())
            .await;
        assert!(matches!(result, Err(ProviderError::NotConfigured(_))));
    }
}
