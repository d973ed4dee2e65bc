//! Offline cache matching endpoint

use axum::{extract::State, routing::post, Json, Router};
use menulens_common::RawDish;
use serde::Deserialize;

use crate::{
    error::ApiResult, services::CacheMatchResult, types::ScanContext, AppState,
};

/// POST /cache/match request
#[derive(Debug, Deserialize)]
pub struct CacheMatchRequest {
    #[serde(default)]
    pub dishes: Vec<RawDish>,
}

/// POST /cache/match
///
/// Each request is its own scan context, so entries used by one menu never
/// affect another.
pub async fn match_cache(
    State(state): State<AppState>,
    Json(request): Json<CacheMatchRequest>,
) -> ApiResult<Json<CacheMatchResult>> {
    let mut ctx = ScanContext::new();
    let result = state.cache_matcher.match_dishes(&request.dishes, &mut ctx).await;
    Ok(Json(result))
}

/// Build cache routes
pub fn cache_routes() -> Router<AppState> {
    Router::new().route("/cache/match", post(match_cache))
}
