//! Core Types and Trait Definitions for the scan pipeline
//!
//! Defines the two provider capabilities the pipeline is built on:
//! - **Phase 1:** [`ExtractionProvider`] (menu image → raw dish stubs)
//! - **Phase 2:** [`EnrichmentProvider`] (raw dish batch → enriched dishes,
//!   at card or full fidelity, plus on-demand detail)
//!
//! plus the error taxonomy, the per-scan context and the image input type.

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use menulens_common::{DetailRequest, Dish, DishDetail, RawDish};
use std::collections::HashSet;
use std::future::Future;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

// ============================================================================
// Provider Capabilities
// ============================================================================

/// Phase 1 capability: turn a menu image into raw dish stubs
///
/// Returning an empty list is treated the same as an error by the
/// extraction stage: the next provider in the fallback chain is tried.
#[async_trait]
pub trait ExtractionProvider: Send + Sync {
    /// Provider name for logging and configuration
    fn name(&self) -> &'static str;

    /// Extract dishes from a menu image
    ///
    /// # Errors
    /// Returns `ProviderError` if the backend fails or its output is unusable.
    /// Returns `ProviderError::Cancelled` once `cancel` fires.
    async fn extract_dishes(
        &self,
        image: &MenuImage,
        cancel: &CancellationToken,
    ) -> Result<Vec<RawDish>, ProviderError>;
}

/// Phase 2 capability: enrich batches of raw dishes
#[async_trait]
pub trait EnrichmentProvider: Send + Sync {
    fn name(&self) -> &'static str;

    /// Full enrichment (card and detail fields in one call)
    async fn enrich_batch(
        &self,
        dishes: &[RawDish],
        prefs_text: &str,
        cancel: &CancellationToken,
    ) -> Result<Vec<Dish>, ProviderError>;

    /// Card-tier enrichment; detail fields stay at zero-value defaults
    async fn enrich_batch_card(
        &self,
        dishes: &[RawDish],
        prefs_text: &str,
        cancel: &CancellationToken,
    ) -> Result<Vec<Dish>, ProviderError>;

    /// Detail-tier enrichment for dishes already shown at card tier
    async fn enrich_batch_detail(
        &self,
        dishes: &[DetailRequest],
        prefs_text: &str,
        cancel: &CancellationToken,
    ) -> Result<Vec<DishDetail>, ProviderError>;
}

/// Enrichment fidelity used for the streaming pass
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnrichmentTier {
    /// Every field in one call
    Full,
    /// Identity, dietary and price fields only; detail fetched lazily
    Card,
}

impl EnrichmentTier {
    pub fn from_lazy_flag(lazy: bool) -> Self {
        if lazy {
            EnrichmentTier::Card
        } else {
            EnrichmentTier::Full
        }
    }
}

// ============================================================================
// Errors
// ============================================================================

/// A single extraction/enrichment backend failed
///
/// Recovered locally by the fallback chains and the retry-once policy.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ProviderError {
    /// Missing credentials for this backend
    #[error("{0} not configured")]
    NotConfigured(String),

    /// Request could not be sent or the connection failed
    #[error("Network error: {0}")]
    Network(String),

    /// Backend answered with a non-success status
    #[error("API error {status}: {message}")]
    Api { status: u16, message: String },

    /// Backend answered with output that could not be parsed
    #[error("Parse error: {0}")]
    Parse(String),

    /// Backend answered successfully with nothing usable
    #[error("Provider returned no results")]
    EmptyResult,

    /// Caller aborted the scan
    #[error("Cancelled")]
    Cancelled,
}

/// Pipeline-level outcome of a scan
#[derive(Debug, Error)]
pub enum ScanError {
    /// Every extraction provider failed or found no dishes
    #[error("Could not read menu from image. Try a clearer photo.")]
    EmptyExtraction {
        /// One entry per provider tried, `name: reason`
        attempts: Vec<String>,
    },

    /// Caller aborted the scan
    #[error("Scan cancelled")]
    Cancelled,

    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Run a provider future unless the scan is cancelled first
///
/// Dropping the inner future aborts its in-flight request.
pub async fn with_cancel<T, F>(cancel: &CancellationToken, call: F) -> Result<T, ProviderError>
where
    F: Future<Output = Result<T, ProviderError>>,
{
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(ProviderError::Cancelled),
        result = call => result,
    }
}

// ============================================================================
// Per-scan context
// ============================================================================

/// State owned by one scan and dropped with it
///
/// Deduplication sets live here rather than in process-wide statics, so two
/// concurrent scans never see each other's choices.
#[derive(Debug, Clone)]
pub struct ScanContext {
    pub scan_id: Uuid,
    pub cancel: CancellationToken,
    /// Cache entries already matched to a menu row in this scan
    pub used_cache_ids: HashSet<String>,
    /// Image URLs already shown for this scan's cache hits
    pub used_image_urls: HashSet<String>,
}

impl ScanContext {
    pub fn new() -> Self {
        Self::with_token(CancellationToken::new())
    }

    pub fn with_token(cancel: CancellationToken) -> Self {
        Self {
            scan_id: Uuid::new_v4(),
            cancel,
            used_cache_ids: HashSet::new(),
            used_image_urls: HashSet::new(),
        }
    }
}

impl Default for ScanContext {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Image input
// ============================================================================

/// Image input errors
#[derive(Debug, Error, PartialEq)]
pub enum ImageError {
    #[error("No image provided")]
    Empty,

    #[error("Image is not valid base64: {0}")]
    InvalidBase64(String),

    #[error("Unsupported data URI: {0}")]
    UnsupportedDataUri(String),
}

/// Menu photo as base64 plus its MIME type
#[derive(Debug, Clone, PartialEq)]
pub struct MenuImage {
    mime_type: String,
    base64: String,
}

impl MenuImage {
    /// Default MIME type when sniffing fails
    pub const FALLBACK_MIME: &'static str = "image/jpeg";

    /// Parse a `data:image/...;base64,` URI or bare base64 payload
    pub fn parse(input: &str) -> Result<Self, ImageError> {
        let input = input.trim();
        if input.is_empty() {
            return Err(ImageError::Empty);
        }

        if let Some(rest) = input.strip_prefix("data:") {
            let (header, payload) = rest
                .split_once(',')
                .ok_or_else(|| ImageError::UnsupportedDataUri("missing payload".to_string()))?;
            let mime_type = header
                .strip_suffix(";base64")
                .ok_or_else(|| ImageError::UnsupportedDataUri(header.to_string()))?;
            if !mime_type.starts_with("image/") {
                return Err(ImageError::UnsupportedDataUri(mime_type.to_string()));
            }
            BASE64
                .decode(payload)
                .map_err(|e| ImageError::InvalidBase64(e.to_string()))?;
            return Ok(Self {
                mime_type: mime_type.to_string(),
                base64: payload.to_string(),
            });
        }

        let bytes = BASE64
            .decode(input)
            .map_err(|e| ImageError::InvalidBase64(e.to_string()))?;
        if bytes.is_empty() {
            return Err(ImageError::Empty);
        }
        Ok(Self {
            mime_type: sniff_mime(&bytes),
            base64: input.to_string(),
        })
    }

    /// Build from raw file bytes, sniffing the MIME type
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ImageError> {
        if bytes.is_empty() {
            return Err(ImageError::Empty);
        }
        Ok(Self {
            mime_type: sniff_mime(bytes),
            base64: BASE64.encode(bytes),
        })
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    /// Base64 payload without any data URI prefix
    pub fn base64(&self) -> &str {
        &self.base64
    }

    pub fn data_uri(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, self.base64)
    }
}

fn sniff_mime(bytes: &[u8]) -> String {
    match infer::get(bytes) {
        Some(kind) if kind.mime_type().starts_with("image/") => kind.mime_type().to_string(),
        _ => MenuImage::FALLBACK_MIME.to_string(),
    }
}
