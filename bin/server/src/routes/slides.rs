//! Slide metadata endpoints.
//!
//! The engine tracks slide metadata only; the bytes themselves are moved by
//! the upload surface, which registers each stored slide here.

use crate::error::ApiError;
use crate::state::AppState;
use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use fairway_workflow::SlideRecord;
use serde::Deserialize;
use std::sync::Arc;
use ulid::Ulid;

/// Request body for slide registration.
#[derive(Debug, Deserialize)]
pub struct RegisterSlideRequest {
    /// Generated when absent.
    #[serde(default)]
    pub slide_id: Option<String>,
    pub user_id: String,
    pub slide_path: String,
    pub size_bytes: u64,
}

async fn register_slide(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<RegisterSlideRequest>,
) -> Result<Json<SlideRecord>, ApiError> {
    if !state.users.is_registered(&payload.user_id).await? {
        return Err(ApiError::BadRequest("User is not registered.".to_string()));
    }
    if payload.size_bytes == 0 {
        return Err(ApiError::BadRequest("Slide is empty.".to_string()));
    }

    let record = SlideRecord {
        slide_id: payload
            .slide_id
            .unwrap_or_else(|| Ulid::new().to_string()),
        user_id: payload.user_id,
        slide_path: payload.slide_path,
        size_bytes: payload.size_bytes,
    };
    state.slides.register(&record).await?;
    Ok(Json(record))
}

async fn get_slide(
    State(state): State<Arc<AppState>>,
    Path(slide_id): Path<String>,
) -> Result<Json<SlideRecord>, ApiError> {
    state
        .slides
        .get(&slide_id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound("Slide not found.".to_string()))
}

async fn list_user_slides(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
) -> Result<Json<Vec<SlideRecord>>, ApiError> {
    if !state.users.is_registered(&user_id).await? {
        return Err(ApiError::NotFound("User not found.".to_string()));
    }

    let mut records = state.slides.list_for_user(&user_id).await?;
    records.sort_by(|a, b| a.slide_id.cmp(&b.slide_id));
    Ok(Json(records))
}

/// Slide routes.
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/slides", post(register_slide))
        .route("/slides/{slide_id}", get(get_slide))
        .route("/users/{user_id}/slides", get(list_user_slides))
}
