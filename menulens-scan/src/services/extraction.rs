//! Phase 1: extraction with provider fallback
//!
//! Providers are tried in order. An error or an empty dish list moves on to
//! the next provider. Only when every provider has been tried does the scan
//! fail, with [`ScanError::EmptyExtraction`].

use crate::types::{with_cancel, ExtractionProvider, MenuImage, ProviderError, ScanError};
use menulens_common::RawDish;
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Ordered extraction fallback chain
pub struct ExtractionStage {
    providers: Vec<Arc<dyn ExtractionProvider>>,
}

impl ExtractionStage {
    pub fn new(providers: Vec<Arc<dyn ExtractionProvider>>) -> Self {
        Self { providers }
    }

    pub fn provider_names(&self) -> Vec<&'static str> {
        self.providers.iter().map(|p| p.name()).collect()
    }

    /// Extract raw dishes from a menu image
    ///
    /// Returned dishes are numbered `dish-1..=N` in menu order and never
    /// include rows without any name.
    pub async fn extract(
        &self,
        image: &MenuImage,
        cancel: &CancellationToken,
    ) -> Result<Vec<RawDish>, ScanError> {
        let mut attempts = Vec::with_capacity(self.providers.len());

        for provider in &self.providers {
            let started = Instant::now();
            debug!(provider = provider.name(), "Trying extraction provider");

            match with_cancel(cancel, provider.extract_dishes(image, cancel)).await {
                Ok(dishes) => {
                    let dishes = number_dishes(dishes);
                    if !dishes.is_empty() {
                        info!(
                            provider = provider.name(),
                            dishes = dishes.len(),
                            elapsed_ms = started.elapsed().as_millis() as u64,
                            "Extraction complete"
                        );
                        return Ok(dishes);
                    }
                    warn!(provider = provider.name(), "Extraction found no dishes, falling back");
                    attempts.push(format!("{}: {}", provider.name(), ProviderError::EmptyResult));
                }
                Err(ProviderError::Cancelled) => return Err(ScanError::Cancelled),
                Err(e) => {
                    warn!(provider = provider.name(), error = %e, "Extraction failed, falling back");
                    attempts.push(format!("{}: {}", provider.name(), e));
                }
            }
        }

        Err(ScanError::EmptyExtraction { attempts })
    }
}

/// Drop nameless rows, trim fields, and assign `dish-N` ids in menu order
pub fn number_dishes(dishes: Vec<RawDish>) -> Vec<RawDish> {
    dishes
        .into_iter()
        .filter(|d| !d.is_blank())
        .enumerate()
        .map(|(i, d)| RawDish {
            id: format!("dish-{}", i + 1),
            name_english: d.name_english.trim().to_string(),
            name_local: d.name_local.trim().to_string(),
            price: d.price.trim().to_string(),
            brief: d.brief.trim().to_string(),
            country: d.country.trim().to_string(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::scripted::{sample_menu, ScriptedExtraction};

    fn image() -> MenuImage {
        MenuImage::from_bytes(b"menu photo").unwrap()
    }

    #[tokio::test]
    async fn test_falls_back_on_error_and_empty() {
        let failing = Arc::new(ScriptedExtraction::failing(
            "gemini",
            ProviderError::Network("timeout".into()),
        ));
        let empty = Arc::new(ScriptedExtraction::returning("cloud-vision-groq", vec![]));
        let working = Arc::new(ScriptedExtraction::returning("gpt-vision", sample_menu(3, "Korea")));
        let stage = ExtractionStage::new(vec![failing.clone(), empty.clone(), working.clone()]);

        let dishes = stage.extract(&image(), &CancellationToken::new()).await.unwrap();

        assert_eq!(dishes.len(), 3);
        assert_eq!((failing.calls(), empty.calls(), working.calls()), (1, 1, 1));
    }

    #[tokio::test]
    async fn test_stops_at_first_success() {
        let first = Arc::new(ScriptedExtraction::returning("gemini", sample_menu(2, "Japan")));
        let second = Arc::new(ScriptedExtraction::returning("gpt-vision", sample_menu(5, "Japan")));
        let stage = ExtractionStage::new(vec![first, second.clone()]);

        let dishes = stage.extract(&image(), &CancellationToken::new()).await.unwrap();

        assert_eq!(dishes.len(), 2);
        assert_eq!(second.calls(), 0);
    }

    #[tokio::test]
    async fn test_all_failing_reports_attempts() {
        let stage = ExtractionStage::new(vec![
            Arc::new(ScriptedExtraction::failing("gemini", ProviderError::EmptyResult)),
            Arc::new(ScriptedExtraction::returning("gpt-vision", vec![RawDish::default()])),
        ]);

        let err = stage.extract(&image(), &CancellationToken::new()).await.unwrap_err();

        match err {
            ScanError::EmptyExtraction { attempts } => {
                assert_eq!(attempts.len(), 2);
                assert!(attempts[0].starts_with("gemini:"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_cancelled_extraction() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let stage = ExtractionStage::new(vec![Arc::new(ScriptedExtraction::returning(
            "gemini",
            sample_menu(1, "Japan"),
        ))]);

        let err = stage.extract(&image(), &cancel).await.unwrap_err();
        assert!(matches!(err, ScanError::Cancelled));
    }

    #[test]
    fn test_number_dishes_drops_blank_rows() {
        let mut menu = sample_menu(3, "Thailand");
        menu[1].name_english = "  ".into();
        menu[2].id = "x-99".into();
        menu[2].price = " 120 ".into();

        let numbered = number_dishes(menu);

        assert_eq!(numbered.len(), 2);
        assert_eq!(numbered[1].id, "dish-2");
        assert_eq!(numbered[1].price, "120");
    }
}
