//! API error type.
//!
//! Errors render as `{"detail": "..."}` with the matching status code, the
//! shape existing clients of the engine already parse.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use fairway_store::StoreError;
use fairway_workflow::ExecutionError;
use serde_json::json;
use std::fmt;

/// Errors surfaced to HTTP clients.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    /// The request referenced something that does not exist.
    NotFound(String),
    /// The request is invalid or conflicts with existing state.
    BadRequest(String),
    /// The store or another internal component failed.
    Internal(String),
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound(detail) | Self::BadRequest(detail) | Self::Internal(detail) => {
                f.write_str(detail)
            }
        }
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Internal(detail) => {
                tracing::error!(detail = %detail, "internal error");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        (status, Json(json!({ "detail": self.to_string() }))).into_response()
    }
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        Self::Internal(e.to_string())
    }
}

impl From<ExecutionError> for ApiError {
    fn from(e: ExecutionError) -> Self {
        match e {
            ExecutionError::WorkflowNotFound { .. } => Self::NotFound("Workflow not found".to_string()),
            ExecutionError::Store(store) => Self::from(store),
        }
    }
}
