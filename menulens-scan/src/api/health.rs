//! `GET /health`: liveness plus the provider chains this instance resolved

use axum::{extract::State, routing::get, Json, Router};
use chrono::Utc;
use serde::Serialize;

use crate::types::EnrichmentTier;
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub module: &'static str,
    pub version: &'static str,
    pub uptime_seconds: u64,
    /// Scans whose NDJSON response is still open
    pub active_scans: usize,
    pub pipeline: PipelineSummary,
}

/// Fallback order and batching, as fixed at startup
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineSummary {
    pub extraction: Vec<&'static str>,
    pub enrichment: Vec<&'static str>,
    pub batch_size: usize,
    pub stagger_ms: u64,
    /// "full" or "card"
    pub tier: &'static str,
}

pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let uptime_seconds = Utc::now()
        .signed_duration_since(state.startup_time)
        .num_seconds()
        .max(0) as u64;
    let settings = state.pipeline.orchestrator().settings();

    Json(HealthResponse {
        status: "ok",
        module: "menulens-scan",
        version: env!("CARGO_PKG_VERSION"),
        uptime_seconds,
        active_scans: state.cancellation_tokens.read().await.len(),
        pipeline: PipelineSummary {
            extraction: state.pipeline.extraction().provider_names(),
            enrichment: state.pipeline.orchestrator().chain().provider_names(),
            batch_size: settings.batch_size,
            stagger_ms: settings.stagger.as_millis() as u64,
            tier: match settings.tier {
                EnrichmentTier::Full => "full",
                EnrichmentTier::Card => "card",
            },
        },
    })
}

pub fn health_routes() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}
