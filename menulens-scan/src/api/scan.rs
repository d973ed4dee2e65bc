//! Scan streaming API
//!
//! `POST /scan` starts a scan and streams its events as NDJSON; the scan id
//! is returned in the `x-scan-id` header so the caller can cancel it with
//! `POST /scan/{scan_id}/cancel`. Closing the response also cancels.

use axum::{
    body::Body,
    extract::{Path, State},
    http::header,
    response::Response,
    routing::post,
    Json, Router,
};
use menulens_common::Preferences;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{
    error::{ApiError, ApiResult},
    types::MenuImage,
    AppState,
};

pub const SCAN_ID_HEADER: &str = "x-scan-id";
pub const NDJSON_CONTENT_TYPE: &str = "application/x-ndjson";

/// How long a closed scan still answers cancel with 409 instead of 404
pub const FINISHED_SCAN_RETENTION: Duration = Duration::from_secs(300);

/// POST /scan request
#[derive(Debug, Deserialize)]
pub struct ScanRequest {
    /// Data URI or bare base64
    pub image: String,
    #[serde(default)]
    pub preferences: Option<Preferences>,
}

/// POST /scan/{scan_id}/cancel response
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CancelScanResponse {
    pub scan_id: Uuid,
    pub cancelled: bool,
}

/// Moves a scan from the live registry to the finished list when its
/// response body is dropped
struct ScanRegistration {
    scan_id: Uuid,
    tokens: Arc<RwLock<HashMap<Uuid, CancellationToken>>>,
    finished: Arc<RwLock<HashMap<Uuid, Instant>>>,
}

impl Drop for ScanRegistration {
    fn drop(&mut self) {
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            return;
        };
        let tokens = Arc::clone(&self.tokens);
        let finished = Arc::clone(&self.finished);
        let scan_id = self.scan_id;
        handle.spawn(async move {
            let now = Instant::now();
            {
                let mut finished = finished.write().await;
                finished.retain(|_, closed| now.duration_since(*closed) < FINISHED_SCAN_RETENTION);
                finished.insert(scan_id, now);
            }
            tokens.write().await.remove(&scan_id);
            debug!(scan_id = %scan_id, "Scan unregistered");
        });
    }
}

/// POST /scan
///
/// Streams `progress`, `phase1`, `batch`… and finally `done` or `error`.
pub async fn start_scan(
    State(state): State<AppState>,
    Json(request): Json<ScanRequest>,
) -> ApiResult<Response> {
    if request.image.trim().is_empty() {
        return Err(ApiError::MissingImage);
    }
    let image = MenuImage::parse(&request.image)?;
    let prefs = request.preferences.unwrap_or_default();

    let cancel = CancellationToken::new();
    let mut scan = state
        .pipeline
        .start_with_token(image, prefs, cancel.clone());
    let scan_id = scan.scan_id();

    state
        .cancellation_tokens
        .write()
        .await
        .insert(scan_id, cancel);
    let registration = ScanRegistration {
        scan_id,
        tokens: Arc::clone(&state.cancellation_tokens),
        finished: Arc::clone(&state.finished_scans),
    };

    info!(scan_id = %scan_id, "Scan stream opened");

    let body = async_stream::stream! {
        let _registration = registration;
        while let Some(event) = scan.next_event().await {
            match event.to_ndjson_line() {
                Ok(line) => yield Ok::<String, Infallible>(line),
                Err(e) => warn!(scan_id = %scan_id, event = event.event_type(), error = %e, "Failed to encode scan event"),
            }
        }
        debug!(scan_id = %scan_id, "Scan stream closed");
    };

    Response::builder()
        .header(header::CONTENT_TYPE, NDJSON_CONTENT_TYPE)
        .header(header::CACHE_CONTROL, "no-cache")
        .header(SCAN_ID_HEADER, scan_id.to_string())
        .body(Body::from_stream(body))
        .map_err(|e| ApiError::Internal(format!("Failed to build scan response: {}", e)))
}

/// POST /scan/{scan_id}/cancel
///
/// 409 when the scan was already cancelled or has closed within
/// `FINISHED_SCAN_RETENTION`; 404 when the id is unknown.
pub async fn cancel_scan(
    State(state): State<AppState>,
    Path(scan_id): Path<Uuid>,
) -> ApiResult<Json<CancelScanResponse>> {
    let live = state.cancellation_tokens.read().await.get(&scan_id).cloned();
    let token = match live {
        Some(token) => token,
        None => {
            let finished = state
                .finished_scans
                .read()
                .await
                .get(&scan_id)
                .is_some_and(|closed| closed.elapsed() < FINISHED_SCAN_RETENTION);
            return Err(if finished {
                ApiError::ScanFinished(scan_id)
            } else {
                ApiError::ScanNotFound(scan_id)
            });
        }
    };

    if token.is_cancelled() {
        return Err(ApiError::ScanCancelled(scan_id));
    }

    token.cancel();
    info!(scan_id = %scan_id, "Scan cancelled by request");

    Ok(Json(CancelScanResponse {
        scan_id,
        cancelled: true,
    }))
}

/// Build scan routes
pub fn scan_routes() -> Router<AppState> {
    Router::new()
        .route("/scan", post(start_scan))
        .route("/scan/:scan_id/cancel", post(cancel_scan))
}
