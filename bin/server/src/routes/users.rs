//! User registration endpoints.

use crate::error::ApiError;
use crate::state::AppState;
use axum::extract::{Path, State};
use axum::routing::post;
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{Value, json};
use std::sync::Arc;

/// Request body for user registration.
#[derive(Debug, Deserialize)]
pub struct RegisterUserRequest {
    pub user_id: String,
}

async fn register_user(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<RegisterUserRequest>,
) -> Result<Json<Value>, ApiError> {
    if state.users.is_registered(&payload.user_id).await? {
        return Err(ApiError::BadRequest("User already exists.".to_string()));
    }

    state.users.register(&payload.user_id).await?;
    // A freshly registered user gets a worker right away.
    state.pool.ensure_worker(&payload.user_id);

    Ok(Json(json!({
        "message": "User registered successfully.",
        "user_id": payload.user_id,
    })))
}

async fn delete_user(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    if !state.users.delete(&user_id).await? {
        return Err(ApiError::NotFound("User not found.".to_string()));
    }

    Ok(Json(json!({
        "message": "User deleted successfully.",
        "user_id": user_id,
    })))
}

async fn list_users(State(state): State<Arc<AppState>>) -> Result<Json<Value>, ApiError> {
    let mut users = state.users.list().await?;
    users.sort();
    Ok(Json(json!({ "count": users.len(), "users": users })))
}

/// User routes.
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/users", post(register_user).get(list_users))
        .route("/users/{user_id}", axum::routing::delete(delete_user))
}
