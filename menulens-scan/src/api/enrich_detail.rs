//! Lazy detail completion
//!
//! Card-tier dishes are completed on demand with ingredients, nutrition,
//! explanation and cultural terms.

use axum::{extract::State, routing::post, Json, Router};
use menulens_common::{DetailRequest, DishDetail, Preferences};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::{
    error::{ApiError, ApiResult},
    AppState,
};

/// POST /enrich-detail request
#[derive(Debug, Deserialize)]
pub struct EnrichDetailRequest {
    #[serde(default)]
    pub dishes: Vec<DetailRequest>,
    #[serde(default)]
    pub preferences: Option<Preferences>,
}

/// POST /enrich-detail response
#[derive(Debug, Serialize, Deserialize)]
pub struct EnrichDetailResponse {
    pub dishes: Vec<DishDetail>,
}

/// POST /enrich-detail
pub async fn enrich_detail(
    State(state): State<AppState>,
    Json(request): Json<EnrichDetailRequest>,
) -> ApiResult<Json<EnrichDetailResponse>> {
    if request.dishes.is_empty() {
        return Err(ApiError::NoDishes);
    }

    let prefs = request.preferences.unwrap_or_default();
    info!(
        dishes = request.dishes.len(),
        providers = ?state.pipeline.orchestrator().chain().provider_names(),
        "Enriching dish detail"
    );

    // Dropped with the request future if the client goes away
    let cancel = CancellationToken::new();
    let _guard = cancel.clone().drop_guard();

    let dishes = state
        .pipeline
        .enrich_detail(&request.dishes, &prefs, &cancel)
        .await?;

    Ok(Json(EnrichDetailResponse { dishes }))
}

/// Build detail enrichment routes
pub fn enrich_detail_routes() -> Router<AppState> {
    Router::new().route("/enrich-detail", post(enrich_detail))
}
