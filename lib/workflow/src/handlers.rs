//! Built-in job handlers.
//!
//! Small demo templates used by tests and smoke deployments. Real workloads
//! (tile generation, segmentation, model inference) register their own
//! handlers through the same builder at startup.

use crate::progress::ProgressUpdate;
use crate::registry::{HandlerError, JobContext, JobHandler, JobRegistryBuilder};
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::sync::Arc;
use std::time::Duration;

/// Demo job that runs five 1-second steps, reporting progress every step.
pub struct FakeSleepHandler;

const FAKE_SLEEP_STEPS: u64 = 5;

#[async_trait]
impl JobHandler for FakeSleepHandler {
    async fn run(
        &self,
        ctx: &JobContext,
        _payload: Map<String, Value>,
    ) -> Result<Map<String, Value>, HandlerError> {
        for step in 0..FAKE_SLEEP_STEPS {
            let progress = (step * 100 / FAKE_SLEEP_STEPS) as u8;
            let update = ProgressUpdate::new(
                progress,
                format!("Fake job running... ({}/{FAKE_SLEEP_STEPS})", step + 1),
            )
            .with_stage("fake");

            // Progress is best-effort; a store hiccup must not fail the job.
            if let Err(err) = ctx.update_progress(update).await {
                tracing::warn!(job_id = %ctx.job_id(), error = %err, "progress update failed");
            }

            tokio::time::sleep(Duration::from_secs(1)).await;
        }

        if let Err(err) = ctx
            .update_progress(ProgressUpdate::new(100, "Fake job completed.").with_stage("fake"))
            .await
        {
            tracing::warn!(job_id = %ctx.job_id(), error = %err, "progress update failed");
        }

        let mut output = Map::new();
        output.insert(
            "result".to_string(),
            Value::String("fake job success!".to_string()),
        );
        Ok(output)
    }
}

/// No-op job that sleeps for `payload.seconds` (default 5) seconds.
pub struct SleepForHandler;

#[async_trait]
impl JobHandler for SleepForHandler {
    async fn run(
        &self,
        ctx: &JobContext,
        payload: Map<String, Value>,
    ) -> Result<Map<String, Value>, HandlerError> {
        let seconds = payload
            .get("seconds")
            .and_then(Value::as_u64)
            .unwrap_or(5);

        if let Err(err) = ctx
            .update_progress(ProgressUpdate::new(0, format!("sleeping {seconds}s")))
            .await
        {
            tracing::warn!(job_id = %ctx.job_id(), error = %err, "progress update failed");
        }

        tokio::time::sleep(Duration::from_secs(seconds)).await;

        let mut output = Map::new();
        output.insert("slept_seconds".to_string(), Value::from(seconds));
        Ok(output)
    }
}

/// Registers the built-in templates.
#[must_use]
pub fn register_builtin(builder: JobRegistryBuilder) -> JobRegistryBuilder {
    builder
        .register("fake_sleep", Arc::new(FakeSleepHandler))
        .register("sleep_for", Arc::new(SleepForHandler))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::NewJob;
    use crate::manager::JobManager;
    use crate::progress::ProgressRecord;
    use crate::registry::JobRegistry;
    use fairway_core::RunId;
    use fairway_store::{MemoryStore, StateStore, keys};
    use serde_json::json;

    async fn context_with_job(store: Arc<MemoryStore>) -> JobContext {
        let jobs = JobManager::new(store);
        let job_id = jobs
            .create(NewJob {
                user_id: "u1".to_string(),
                workflow_id: "wf".to_string(),
                run_id: RunId::new(),
                branch_id: "default".to_string(),
                template_id: "fake_sleep".to_string(),
                input_payload: Map::new(),
            })
            .await
            .unwrap();
        JobContext::new(job_id, "u1", jobs)
    }

    #[tokio::test(start_paused = true)]
    async fn fake_sleep_returns_sentinel_output() {
        let store = Arc::new(MemoryStore::new());
        let ctx = context_with_job(store.clone()).await;

        let output = FakeSleepHandler.run(&ctx, Map::new()).await.unwrap();
        assert_eq!(output.get("result"), Some(&json!("fake job success!")));

        // Final progress record is at 100%.
        let raw = store
            .hash_get(keys::SCHEDULER_JOB_PROGRESS, &ctx.job_id().to_string())
            .await
            .unwrap()
            .expect("record present");
        let record = ProgressRecord::decode(&raw).unwrap();
        assert!((record.percent - 1.0).abs() < f64::EPSILON);
        assert_eq!(record.stage, "fake");
    }

    #[tokio::test(start_paused = true)]
    async fn sleep_for_honors_payload_seconds() {
        let store = Arc::new(MemoryStore::new());
        let ctx = context_with_job(store).await;

        let mut payload = Map::new();
        payload.insert("seconds".to_string(), json!(2));

        let started = tokio::time::Instant::now();
        let output = SleepForHandler.run(&ctx, payload).await.unwrap();
        assert_eq!(output.get("slept_seconds"), Some(&json!(2)));
        assert!(started.elapsed() >= Duration::from_secs(2));
    }

    #[test]
    fn builtin_registration() {
        let registry: JobRegistry = register_builtin(JobRegistry::builder()).build();
        assert_eq!(registry.template_names(), vec!["fake_sleep", "sleep_for"]);
    }
}
