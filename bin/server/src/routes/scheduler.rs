//! Scheduler control and status endpoints.

use crate::error::ApiError;
use crate::state::AppState;
use axum::extract::State;
use axum::routing::{get, post};
use axum::{Json, Router};
use fairway_scheduler::control::{self, SchedulerState};
use fairway_scheduler::GlobalStatus;
use serde_json::{Value, json};
use std::sync::Arc;

async fn start_scheduler(State(state): State<Arc<AppState>>) -> Result<Json<Value>, ApiError> {
    control::set_state(state.store.as_ref(), SchedulerState::Running).await?;
    Ok(Json(json!({ "message": "Scheduler started", "state": "running" })))
}

async fn pause_scheduler(State(state): State<Arc<AppState>>) -> Result<Json<Value>, ApiError> {
    control::set_state(state.store.as_ref(), SchedulerState::Paused).await?;
    Ok(Json(json!({ "message": "Scheduler paused", "state": "paused" })))
}

async fn scheduler_state(State(state): State<Arc<AppState>>) -> Result<Json<Value>, ApiError> {
    let current = control::current_state(state.store.as_ref()).await?;
    Ok(Json(json!({ "state": current.as_str() })))
}

async fn global_status(State(state): State<Arc<AppState>>) -> Result<Json<GlobalStatus>, ApiError> {
    let status = GlobalStatus::snapshot(state.store.as_ref()).await?;
    Ok(Json(status))
}

/// Scheduler routes.
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/scheduler/start", post(start_scheduler))
        .route("/scheduler/pause", post(pause_scheduler))
        .route("/scheduler/state", get(scheduler_state))
        .route("/scheduler/global_status", get(global_status))
}
