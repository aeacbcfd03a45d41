//! Error handling for REST API
//!
//! Provides the `ApiError` type used across all endpoints.

use crate::store::StoreError;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;

#[derive(Debug)]
pub enum ApiError {
    /// Malformed or contradictory query input. Detected before any store
    /// call is made.
    Validation(String),
    /// Object absent, derived from an explicit existence probe.
    NotFound,
    /// Any backing-store failure. The client sees a fixed generic message.
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        match self {
            ApiError::Validation(msg) => {
                let body = serde_json::json!({
                    "detail": msg,
                    "errors": [format!("Value error, {msg}")],
                });
                (StatusCode::UNPROCESSABLE_ENTITY, Json(body)).into_response()
            }
            ApiError::NotFound => {
                let body = serde_json::json!({ "detail": "File not found" });
                (StatusCode::NOT_FOUND, Json(body)).into_response()
            }
            ApiError::Internal(details) => {
                // Log full details server-side, return generic message to
                // the client.
                tracing::error!(details = %details, "Internal server error");
                let body = serde_json::json!({ "detail": "Internal server error" });
                (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
            }
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        ApiError::Internal(err.to_string())
    }
}
