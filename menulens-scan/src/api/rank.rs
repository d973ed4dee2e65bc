//! Ranking endpoint

use axum::{routing::post, Json, Router};
use menulens_common::{Dish, Preferences};
use serde::{Deserialize, Serialize};

use crate::{
    services::ranking::{rank, RankView},
    AppState,
};

/// POST /rank request
#[derive(Debug, Deserialize)]
pub struct RankRequest {
    #[serde(default)]
    pub dishes: Vec<Dish>,
    #[serde(default)]
    pub preferences: Preferences,
    #[serde(default)]
    pub view: RankView,
}

/// POST /rank response
#[derive(Debug, Serialize, Deserialize)]
pub struct RankResponse {
    pub dishes: Vec<Dish>,
}

/// POST /rank
pub async fn rank_dishes(Json(request): Json<RankRequest>) -> Json<RankResponse> {
    Json(RankResponse {
        dishes: rank(&request.dishes, &request.preferences, request.view),
    })
}

/// Build ranking routes
pub fn rank_routes() -> Router<AppState> {
    Router::new().route("/rank", post(rank_dishes))
}
