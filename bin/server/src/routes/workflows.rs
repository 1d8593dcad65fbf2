//! Workflow CRUD and execution endpoints.

use crate::error::ApiError;
use crate::state::AppState;
use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use fairway_workflow::WorkflowRecord;
use serde::Deserialize;
use serde_json::{Value, json};
use std::sync::Arc;

/// Request body for workflow creation.
#[derive(Debug, Deserialize)]
pub struct CreateWorkflowRequest {
    pub workflow_id: String,
    pub name: String,
    pub owner_user_id: String,
}

async fn create_workflow(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CreateWorkflowRequest>,
) -> Result<Json<WorkflowRecord>, ApiError> {
    if !state.users.is_registered(&payload.owner_user_id).await? {
        return Err(ApiError::BadRequest(
            "Owner user is not registered.".to_string(),
        ));
    }

    let created = state
        .workflows
        .create(&payload.workflow_id, &payload.name, &payload.owner_user_id)
        .await?;
    if !created {
        return Err(ApiError::BadRequest("Workflow ID already exists.".to_string()));
    }

    let record = state
        .workflows
        .get(&payload.workflow_id)
        .await?
        .ok_or_else(|| ApiError::Internal("workflow vanished after create".to_string()))?;
    Ok(Json(record))
}

async fn list_workflows(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<WorkflowRecord>>, ApiError> {
    let mut records = state.workflows.list().await?;
    records.sort_by(|a, b| a.workflow_id.cmp(&b.workflow_id));
    Ok(Json(records))
}

async fn get_workflow(
    State(state): State<Arc<AppState>>,
    Path(workflow_id): Path<String>,
) -> Result<Json<WorkflowRecord>, ApiError> {
    state
        .workflows
        .get(&workflow_id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound("Workflow not found.".to_string()))
}

async fn delete_workflow(
    State(state): State<Arc<AppState>>,
    Path(workflow_id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    if !state.workflows.delete(&workflow_id).await? {
        return Err(ApiError::NotFound("Workflow not found.".to_string()));
    }

    Ok(Json(json!({
        "message": "Workflow deleted successfully.",
        "workflow_id": workflow_id,
    })))
}

async fn list_workflows_by_user(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
) -> Result<Json<Vec<WorkflowRecord>>, ApiError> {
    if !state.users.is_registered(&user_id).await? {
        return Err(ApiError::NotFound("User not found.".to_string()));
    }

    let mut records = state.workflows.list_by_user(&user_id).await?;
    records.sort_by(|a, b| a.workflow_id.cmp(&b.workflow_id));
    Ok(Json(records))
}

async fn execute_workflow(
    State(state): State<Arc<AppState>>,
    Path(workflow_id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let receipt = state.executions.execute(&workflow_id).await?;

    let job_ids: Vec<String> = receipt.job_ids.iter().map(ToString::to_string).collect();
    Ok(Json(json!({
        "message": "Workflow execution started",
        "workflow_id": receipt.workflow_id,
        "run_id": receipt.run_id.to_string(),
        "job_ids": job_ids,
    })))
}

/// Workflow routes.
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/workflows", post(create_workflow).get(list_workflows))
        .route(
            "/workflows/{workflow_id}",
            get(get_workflow).delete(delete_workflow),
        )
        .route("/workflows/by_user/{user_id}", get(list_workflows_by_user))
        .route("/workflows/{workflow_id}/execute", post(execute_workflow))
}
