//! Provider implementations and the registry that assembles fallback chains
//!
//! Provider names accepted in configuration form a closed set. Unknown names
//! are logged and replaced by the hard defaults (`cloud-vision-groq` for
//! extraction, `groq` for enrichment).

pub mod chat;
pub mod chat_enrichment;
pub mod cloud_vision_groq;
pub mod gemini_flash;
pub mod gpt_vision;
pub mod ocr;
pub mod prompts;
#[cfg(any(test, feature = "test-util"))]
pub mod scripted;

use crate::config::ProviderCredentials;
use crate::types::{EnrichmentProvider, ExtractionProvider};
use chat::ChatClient;
use chat_enrichment::ChatEnrichmentProvider;
use cloud_vision_groq::CloudVisionGroqProvider;
use gemini_flash::GeminiFlashProvider;
use gpt_vision::GptVisionProvider;
use ocr::CloudVisionOcr;
use std::fmt;
use std::sync::Arc;
use tracing::warn;

pub use prompts::build_prefs_description;

/// Phase 1 provider selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExtractionKind {
    Gemini,
    CloudVisionGroq,
    GptVision,
}

impl ExtractionKind {
    /// Used when nothing is configured
    pub const DEFAULT: ExtractionKind = ExtractionKind::Gemini;
    /// Used when the configured name is not recognised
    pub const FALLBACK: ExtractionKind = ExtractionKind::CloudVisionGroq;

    pub fn name(&self) -> &'static str {
        match self {
            ExtractionKind::Gemini => GeminiFlashProvider::NAME,
            ExtractionKind::CloudVisionGroq => CloudVisionGroqProvider::NAME,
            ExtractionKind::GptVision => GptVisionProvider::NAME,
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_lowercase().as_str() {
            "gemini" => Some(ExtractionKind::Gemini),
            "cloud-vision-groq" => Some(ExtractionKind::CloudVisionGroq),
            "gpt-vision" => Some(ExtractionKind::GptVision),
            _ => None,
        }
    }

    /// Resolve a configured value, warning on unknown names
    pub fn resolve(configured: Option<&str>) -> Self {
        match configured.map(str::trim).filter(|s| !s.is_empty()) {
            None => Self::DEFAULT,
            Some(name) => Self::from_name(name).unwrap_or_else(|| {
                warn!(
                    configured = name,
                    fallback = Self::FALLBACK.name(),
                    "Unknown extraction provider"
                );
                Self::FALLBACK
            }),
        }
    }
}

impl fmt::Display for ExtractionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Phase 2 provider selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EnrichmentKind {
    Groq,
    Gpt,
}

impl EnrichmentKind {
    pub const DEFAULT: EnrichmentKind = EnrichmentKind::Groq;
    pub const FALLBACK: EnrichmentKind = EnrichmentKind::Groq;

    pub fn name(&self) -> &'static str {
        match self {
            EnrichmentKind::Groq => ChatEnrichmentProvider::GROQ,
            EnrichmentKind::Gpt => ChatEnrichmentProvider::GPT,
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_lowercase().as_str() {
            "groq" => Some(EnrichmentKind::Groq),
            "gpt" => Some(EnrichmentKind::Gpt),
            _ => None,
        }
    }

    pub fn resolve(configured: Option<&str>) -> Self {
        match configured.map(str::trim).filter(|s| !s.is_empty()) {
            None => Self::DEFAULT,
            Some(name) => Self::from_name(name).unwrap_or_else(|| {
                warn!(
                    configured = name,
                    fallback = Self::FALLBACK.name(),
                    "Unknown enrichment provider"
                );
                Self::FALLBACK
            }),
        }
    }
}

impl fmt::Display for EnrichmentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Builds provider instances from credentials
#[derive(Debug, Clone, Default)]
pub struct ProviderRegistry {
    credentials: ProviderCredentials,
}

impl ProviderRegistry {
    pub fn new(credentials: ProviderCredentials) -> Self {
        Self { credentials }
    }

    pub fn extraction_provider(&self, kind: ExtractionKind) -> Arc<dyn ExtractionProvider> {
        let creds = &self.credentials;
        match kind {
            ExtractionKind::Gemini => Arc::new(GeminiFlashProvider::new(creds.gemini.clone())),
            ExtractionKind::CloudVisionGroq => Arc::new(CloudVisionGroqProvider::new(
                CloudVisionOcr::new(creds.cloud_vision.clone()),
                ChatClient::groq(creds.groq.clone()),
                ChatClient::openai(creds.openai.clone()),
            )),
            ExtractionKind::GptVision => {
                Arc::new(GptVisionProvider::new(ChatClient::openai(creds.openai.clone())))
            }
        }
    }

    pub fn enrichment_provider(&self, kind: EnrichmentKind) -> Arc<dyn EnrichmentProvider> {
        match kind {
            EnrichmentKind::Groq => {
                Arc::new(ChatEnrichmentProvider::groq(self.credentials.groq.clone()))
            }
            EnrichmentKind::Gpt => {
                Arc::new(ChatEnrichmentProvider::gpt(self.credentials.openai.clone()))
            }
        }
    }

    /// `[primary, cloud-vision-groq, gpt-vision]` without duplicates
    pub fn extraction_chain(&self, primary: ExtractionKind) -> Vec<Arc<dyn ExtractionProvider>> {
        extraction_chain_order(primary)
            .into_iter()
            .map(|kind| self.extraction_provider(kind))
            .collect()
    }

    /// `[primary, gpt]` without duplicates
    pub fn enrichment_chain(&self, primary: EnrichmentKind) -> Vec<Arc<dyn EnrichmentProvider>> {
        enrichment_chain_order(primary)
            .into_iter()
            .map(|kind| self.enrichment_provider(kind))
            .collect()
    }
}

pub fn extraction_chain_order(primary: ExtractionKind) -> Vec<ExtractionKind> {
    dedup_ordered([
        primary,
        ExtractionKind::CloudVisionGroq,
        ExtractionKind::GptVision,
    ])
}

pub fn enrichment_chain_order(primary: EnrichmentKind) -> Vec<EnrichmentKind> {
    dedup_ordered([primary, EnrichmentKind::Gpt])
}

fn dedup_ordered<T: PartialEq + Copy, const N: usize>(items: [T; N]) -> Vec<T> {
    let mut out: Vec<T> = Vec::with_capacity(N);
    for item in items {
        if !out.contains(&item) {
            out.push(item);
        }
    }
    out
}
