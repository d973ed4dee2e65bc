//! menulens-scan library interface
//!
//! Exposes the pipeline, providers and HTTP router for the binary and for
//! integration testing.

pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod providers;
pub mod services;
pub mod types;

pub use crate::error::{ApiError, ApiResult};

use crate::config::ScanConfig;
use crate::providers::ProviderRegistry;
use crate::services::{
    CacheMatcher, EnrichmentChain, EnrichmentOrchestrator, EnrichmentSettings, ExtractionStage,
    ScanPipeline,
};
use crate::types::EnrichmentTier;
use axum::Router;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;
use uuid::Uuid;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool (cuisine snapshots)
    pub db: SqlitePool,
    pub pipeline: Arc<ScanPipeline>,
    pub cache_matcher: Arc<CacheMatcher>,
    /// Cancellation tokens for in-flight scans
    pub cancellation_tokens: Arc<RwLock<HashMap<Uuid, CancellationToken>>>,
    /// Recently closed scans, kept for `FINISHED_SCAN_RETENTION`
    pub finished_scans: Arc<RwLock<HashMap<Uuid, Instant>>>,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
}

impl AppState {
    pub fn new(db: SqlitePool, pipeline: Arc<ScanPipeline>, cache_matcher: Arc<CacheMatcher>) -> Self {
        Self {
            db,
            pipeline,
            cache_matcher,
            cancellation_tokens: Arc::new(RwLock::new(HashMap::new())),
            finished_scans: Arc::new(RwLock::new(HashMap::new())),
            startup_time: Utc::now(),
        }
    }
}

/// Assemble the scan pipeline from resolved configuration
///
/// Provider chains are fixed here, once; scans never look providers up by
/// name.
pub fn build_pipeline(config: &ScanConfig, registry: &ProviderRegistry) -> ScanPipeline {
    let extraction = ExtractionStage::new(registry.extraction_chain(config.extraction));
    let chain = EnrichmentChain::new(registry.enrichment_chain(config.enrichment));
    let settings = EnrichmentSettings {
        batch_size: config.batch_size,
        stagger: config.stagger,
        tier: EnrichmentTier::from_lazy_flag(config.lazy_enrichment),
    };
    ScanPipeline::new(extraction, EnrichmentOrchestrator::new(chain, settings))
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(api::scan_routes())
        .merge(api::enrich_detail_routes())
        .merge(api::cache_routes())
        .merge(api::rank_routes())
        .merge(api::health_routes())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
