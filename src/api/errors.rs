//! HTTP error normalization.
//!
//! Adapter failures are classified once, here, and every variant renders
//! as JSON. Transport failures keep the backing store's status and body;
//! everything unclassified collapses to a generic 500 so internal detail
//! never reaches the client.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::{json, Value};
use thiserror::Error;

use crate::store::StoreError;

/// Result type for request handling
pub type ApiResult<T> = Result<T, ApiError>;

/// Request-level errors
#[derive(Debug, Error)]
pub enum ApiError {
    /// Structured failure from the backing store, passed through verbatim.
    #[error("backing store responded with status {status}")]
    Transport { status: u16, body: Value },

    /// PATCH matched nothing.
    #[error("document not found")]
    DocumentNotFound,

    /// Request body had the wrong JSON shape.
    #[error("invalid body: {0}")]
    InvalidBody(String),

    /// Unclassified failure; the detail is logged, never sent.
    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    /// Get HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Transport { status, .. } => {
                StatusCode::from_u16(*status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
            }
            ApiError::DocumentNotFound => StatusCode::NOT_FOUND,
            ApiError::InvalidBody(_) => StatusCode::BAD_REQUEST,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn body(&self) -> Value {
        match self {
            ApiError::Transport { body, .. } => body.clone(),
            ApiError::DocumentNotFound => json!({"message": "Document not found"}),
            ApiError::InvalidBody(reason) => json!({"message": reason}),
            ApiError::Internal(_) => json!({"message": "Internal Server Error"}),
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Transport { status, body } => ApiError::Transport { status, body },
            StoreError::Credentials(detail) => ApiError::Internal(detail),
            StoreError::Internal(detail) => ApiError::Internal(detail),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if let ApiError::Internal(detail) = &self {
            log::error!("request failed: {detail}");
        }
        (self.status_code(), Json(self.body())).into_response()
    }
}
