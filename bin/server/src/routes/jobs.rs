//! Job inspection endpoints.

use crate::error::ApiError;
use crate::state::AppState;
use axum::extract::{Path, State};
use axum::routing::get;
use axum::{Json, Router};
use fairway_core::JobId;
use fairway_workflow::JobInstance;
use std::sync::Arc;

async fn list_templates(State(state): State<Arc<AppState>>) -> Json<Vec<String>> {
    Json(state.registry.template_names())
}

async fn get_job(
    State(state): State<Arc<AppState>>,
    Path(job_id): Path<String>,
) -> Result<Json<JobInstance>, ApiError> {
    let job_id: JobId = job_id
        .parse()
        .map_err(|_| ApiError::NotFound("Job not found".to_string()))?;

    state
        .jobs
        .get(&job_id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound("Job not found".to_string()))
}

/// Job routes.
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/jobs/templates", get(list_templates))
        .route("/jobs/{job_id}", get(get_job))
}
