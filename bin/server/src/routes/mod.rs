//! HTTP route assembly.

pub mod branches;
pub mod jobs;
pub mod scheduler;
pub mod slides;
pub mod users;
pub mod workflows;

use crate::state::AppState;
use axum::Router;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Builds the full application router.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .merge(users::router())
        .merge(workflows::router())
        .merge(branches::router())
        .merge(jobs::router())
        .merge(slides::router())
        .merge(scheduler::router())
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Method, Request, StatusCode, header};
    use fairway_scheduler::SchedulerConfig;
    use fairway_store::{MemoryStore, SharedStore};
    use fairway_workflow::JobRegistry;
    use fairway_workflow::handlers::register_builtin;
    use http_body_util::BodyExt;
    use serde_json::{Value, json};
    use tower::ServiceExt;

    fn app() -> Router {
        let store: SharedStore = Arc::new(MemoryStore::new());
        let registry = Arc::new(register_builtin(JobRegistry::builder()).build());
        let state = Arc::new(AppState::new(
            store,
            registry,
            SchedulerConfig::default(),
        ));
        router(state)
    }

    async fn request(
        app: &Router,
        method: Method,
        uri: &str,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(value) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(value.to_string())),
            None => builder.body(Body::empty()),
        }
        .expect("request builds");

        let response = app.clone().oneshot(request).await.expect("request succeeds");
        let status = response.status();
        let bytes = response
            .into_body()
            .collect()
            .await
            .expect("body collects")
            .to_bytes();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).expect("body is JSON")
        };
        (status, value)
    }

    #[tokio::test]
    async fn register_user_then_duplicate() {
        let app = app();

        let (status, body) = request(
            &app,
            Method::POST,
            "/users",
            Some(json!({"user_id": "u1"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["user_id"], "u1");

        let (status, body) = request(
            &app,
            Method::POST,
            "/users",
            Some(json!({"user_id": "u1"})),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["detail"], "User already exists.");

        let (status, body) = request(&app, Method::GET, "/users", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["count"], 1);
    }

    #[tokio::test]
    async fn workflow_branch_execute_flow() {
        let app = app();

        request(&app, Method::POST, "/users", Some(json!({"user_id": "u1"}))).await;

        let (status, body) = request(
            &app,
            Method::POST,
            "/workflows",
            Some(json!({"workflow_id": "wf-1", "name": "demo", "owner_user_id": "u1"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["entry_branch"], "default");

        let (status, _) = request(
            &app,
            Method::POST,
            "/workflows/wf-1/branches/default/jobs",
            Some(json!({"template_id": "fake_sleep"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let (status, body) = request(
            &app,
            Method::GET,
            "/workflows/wf-1/branches/default",
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["jobs"][0]["template_id"], "fake_sleep");

        let (status, body) =
            request(&app, Method::POST, "/workflows/wf-1/execute", None).await;
        assert_eq!(status, StatusCode::OK);
        let job_ids = body["job_ids"].as_array().expect("job ids");
        assert_eq!(job_ids.len(), 1);

        // The created job is visible and PENDING.
        let job_uri = format!("/jobs/{}", job_ids[0].as_str().unwrap());
        let (status, body) = request(&app, Method::GET, &job_uri, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "PENDING");

        // And it shows up in the global status pending list.
        let (status, body) =
            request(&app, Method::GET, "/scheduler/global_status", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["pending_jobs"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn execute_unknown_workflow_is_404() {
        let app = app();
        let (status, body) =
            request(&app, Method::POST, "/workflows/ghost/execute", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["detail"], "Workflow not found");
    }

    #[tokio::test]
    async fn scheduler_control_roundtrip() {
        let app = app();

        let (status, body) = request(&app, Method::GET, "/scheduler/state", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["state"], "paused");

        let (status, body) = request(&app, Method::POST, "/scheduler/start", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["state"], "running");

        let (status, body) = request(&app, Method::GET, "/scheduler/state", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["state"], "running");

        let (status, body) = request(&app, Method::POST, "/scheduler/pause", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["state"], "paused");
    }

    #[tokio::test]
    async fn slide_registration_flow() {
        let app = app();
        request(&app, Method::POST, "/users", Some(json!({"user_id": "u1"}))).await;

        let (status, body) = request(
            &app,
            Method::POST,
            "/slides",
            Some(json!({
                "user_id": "u1",
                "slide_path": "/data/slides/a.svs",
                "size_bytes": 1024,
            })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        let slide_id = body["slide_id"].as_str().expect("generated id").to_string();

        let (status, body) =
            request(&app, Method::GET, &format!("/slides/{slide_id}"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["slide_path"], "/data/slides/a.svs");

        let (status, body) = request(&app, Method::GET, "/users/u1/slides", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.as_array().unwrap().len(), 1);

        // Unregistered owner is rejected.
        let (status, _) = request(
            &app,
            Method::POST,
            "/slides",
            Some(json!({
                "user_id": "ghost",
                "slide_path": "/data/slides/b.svs",
                "size_bytes": 1,
            })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn job_templates_are_listed() {
        let app = app();
        let (status, body) = request(&app, Method::GET, "/jobs/templates", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!(["fake_sleep", "sleep_for"]));
    }
}
