//! HTTP errors for the scan service
//!
//! Every failure leaves the service as `{"error":{"code","message"}}`.

use crate::types::{ImageError, ProviderError};
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum ApiError {
    /// Request body has no image
    #[error("No image provided")]
    MissingImage,

    /// Image could not be decoded or is not a supported format
    #[error(transparent)]
    InvalidImage(#[from] ImageError),

    /// Detail completion asked for zero dishes
    #[error("No dishes provided")]
    NoDishes,

    #[error("Scan not found: {0}")]
    ScanNotFound(Uuid),

    #[error("Scan already cancelled: {0}")]
    ScanCancelled(Uuid),

    /// Stream closed recently; cancelling has no effect
    #[error("Scan already finished: {0}")]
    ScanFinished(Uuid),

    /// Every provider in the chain failed
    #[error("All providers failed: {0}")]
    Provider(#[from] ProviderError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::MissingImage | ApiError::InvalidImage(_) | ApiError::NoDishes => {
                StatusCode::BAD_REQUEST
            }
            ApiError::ScanNotFound(_) => StatusCode::NOT_FOUND,
            ApiError::ScanCancelled(_) | ApiError::ScanFinished(_) => StatusCode::CONFLICT,
            ApiError::Provider(ProviderError::Cancelled) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Provider(_) => StatusCode::BAD_GATEWAY,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Stable machine-readable code
    pub fn code(&self) -> &'static str {
        match self {
            ApiError::MissingImage => "MISSING_IMAGE",
            ApiError::InvalidImage(_) => "INVALID_IMAGE",
            ApiError::NoDishes => "NO_DISHES",
            ApiError::ScanNotFound(_) => "SCAN_NOT_FOUND",
            ApiError::ScanCancelled(_) => "SCAN_CANCELLED",
            ApiError::ScanFinished(_) => "SCAN_FINISHED",
            ApiError::Provider(_) => "PROVIDER_FAILED",
            ApiError::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::warn!(code = self.code(), error = %self, "Request failed");
        }
        let body = Json(json!({
            "error": {
                "code": self.code(),
                "message": self.to_string(),
            }
        }));
        (status, body).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_and_code_mapping() {
        let id = Uuid::new_v4();

        assert_eq!(ApiError::NoDishes.status(), StatusCode::BAD_REQUEST);
        assert_eq!(ApiError::ScanNotFound(id).status(), StatusCode::NOT_FOUND);
        assert_eq!(ApiError::ScanFinished(id).status(), StatusCode::CONFLICT);
        assert_eq!(ApiError::ScanFinished(id).code(), "SCAN_FINISHED");
        assert_eq!(
            ApiError::from(ProviderError::Network("reset".into())).status(),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            ApiError::ScanCancelled(id).to_string(),
            format!("Scan already cancelled: {}", id)
        );
    }
}
