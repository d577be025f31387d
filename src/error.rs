use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tracing::error;

use crate::import::ImportError;
use crate::media::MediaError;
use crate::store::StoreError;

/// Errors surfaced by the HTTP handlers, rendered as `{"error": "..."}`.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Missing or malformed client input (400)
    #[error("{0}")]
    BadRequest(String),

    /// Path resolves outside the media root (403)
    #[error("Access denied")]
    AccessDenied,

    /// Nothing usable found (404)
    #[error("{0}")]
    NotFound(String),

    /// Local I/O or upstream failure (500)
    #[error("{0}")]
    Internal(String),
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        error!("recipe store failure: {}", e);
        ApiError::Internal(e.to_string())
    }
}

impl From<MediaError> for ApiError {
    fn from(e: MediaError) -> Self {
        match e {
            MediaError::AccessDenied => ApiError::AccessDenied,
            MediaError::Io(e) => {
                error!("media storage failure: {}", e);
                ApiError::Internal(e.to_string())
            }
        }
    }
}

impl From<ImportError> for ApiError {
    fn from(e: ImportError) -> Self {
        match e {
            ImportError::InvalidUrl(msg) => ApiError::BadRequest(msg),
            ImportError::NoRecipeData => ApiError::NotFound(e.to_string()),
            ImportError::Upstream(_) | ImportError::Request(_) | ImportError::Storage(_) => {
                error!("recipe import failed: {}", e);
                ApiError::Internal(format!("Failed to fetch recipe: {}", e))
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::AccessDenied => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
