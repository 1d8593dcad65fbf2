//! Branch management endpoints.

use crate::error::ApiError;
use crate::state::AppState;
use axum::extract::{Path, State};
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use fairway_workflow::JobSpec;
use serde::Deserialize;
use serde_json::{Map, Value, json};
use std::sync::Arc;

/// Request body for branch creation.
#[derive(Debug, Deserialize)]
pub struct CreateBranchRequest {
    pub branch_id: String,
}

/// Request body for appending a job spec to a branch.
#[derive(Debug, Deserialize)]
pub struct AddJobRequest {
    pub template_id: String,
    #[serde(default)]
    pub input_payload: Map<String, Value>,
}

async fn require_workflow(state: &AppState, workflow_id: &str) -> Result<(), ApiError> {
    if state.workflows.exists(workflow_id).await? {
        Ok(())
    } else {
        Err(ApiError::NotFound("Workflow not found.".to_string()))
    }
}

async fn create_branch(
    State(state): State<Arc<AppState>>,
    Path(workflow_id): Path<String>,
    Json(payload): Json<CreateBranchRequest>,
) -> Result<Json<Value>, ApiError> {
    require_workflow(&state, &workflow_id).await?;

    if !state.branches.create(&workflow_id, &payload.branch_id).await? {
        return Err(ApiError::BadRequest("Branch already exists.".to_string()));
    }

    Ok(Json(json!({
        "message": "Branch created.",
        "workflow_id": workflow_id,
        "branch_id": payload.branch_id,
    })))
}

async fn list_branches(
    State(state): State<Arc<AppState>>,
    Path(workflow_id): Path<String>,
) -> Result<Json<Vec<String>>, ApiError> {
    require_workflow(&state, &workflow_id).await?;

    let mut branches = state.branches.list(&workflow_id).await?;
    branches.sort();
    Ok(Json(branches))
}

async fn add_job_to_branch(
    State(state): State<Arc<AppState>>,
    Path((workflow_id, branch_id)): Path<(String, String)>,
    Json(payload): Json<AddJobRequest>,
) -> Result<Json<Value>, ApiError> {
    require_workflow(&state, &workflow_id).await?;

    let spec = JobSpec::new(payload.template_id.clone(), payload.input_payload);
    if !state.branches.append_spec(&workflow_id, &branch_id, &spec).await? {
        return Err(ApiError::NotFound("Branch not found.".to_string()));
    }

    Ok(Json(json!({
        "message": "Job template added to branch.",
        "workflow_id": workflow_id,
        "branch_id": branch_id,
        "template_id": payload.template_id,
    })))
}

async fn get_branch_jobs(
    State(state): State<Arc<AppState>>,
    Path((workflow_id, branch_id)): Path<(String, String)>,
) -> Result<Json<Value>, ApiError> {
    require_workflow(&state, &workflow_id).await?;

    if !state.branches.exists(&workflow_id, &branch_id).await? {
        return Err(ApiError::NotFound("Branch not found.".to_string()));
    }

    let jobs = state.branches.specs(&workflow_id, &branch_id).await?;
    Ok(Json(json!({
        "workflow_id": workflow_id,
        "branch_id": branch_id,
        "jobs": jobs,
    })))
}

async fn delete_branch(
    State(state): State<Arc<AppState>>,
    Path((workflow_id, branch_id)): Path<(String, String)>,
) -> Result<Json<Value>, ApiError> {
    require_workflow(&state, &workflow_id).await?;

    if !state.branches.delete(&workflow_id, &branch_id).await? {
        return Err(ApiError::NotFound("Branch not found.".to_string()));
    }

    Ok(Json(json!({
        "message": "Branch deleted.",
        "workflow_id": workflow_id,
        "branch_id": branch_id,
    })))
}

async fn delete_job_from_branch(
    State(state): State<Arc<AppState>>,
    Path((workflow_id, branch_id, index)): Path<(String, String, usize)>,
) -> Result<Json<Value>, ApiError> {
    require_workflow(&state, &workflow_id).await?;

    if !state.branches.remove_spec(&workflow_id, &branch_id, index).await? {
        return Err(ApiError::NotFound("Job not found at index.".to_string()));
    }

    Ok(Json(json!({
        "message": "Job removed from branch.",
        "workflow_id": workflow_id,
        "branch_id": branch_id,
        "index": index,
    })))
}

/// Branch routes.
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/workflows/{workflow_id}/branches",
            post(create_branch).get(list_branches),
        )
        .route(
            "/workflows/{workflow_id}/branches/{branch_id}",
            get(get_branch_jobs).delete(delete_branch),
        )
        .route(
            "/workflows/{workflow_id}/branches/{branch_id}/jobs",
            post(add_job_to_branch),
        )
        .route(
            "/workflows/{workflow_id}/branches/{branch_id}/jobs/{index}",
            delete(delete_job_from_branch),
        )
}
