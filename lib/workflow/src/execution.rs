//! Workflow expansion: turning branches into pending job instances.
//!
//! Executing a workflow walks every branch's spec list in order, hydrates
//! each payload (slide-initialization templates get slide metadata and tiling
//! defaults merged in), creates a PENDING job instance per spec, and pushes
//! the job id onto the run's job list and the global pending queue.
//!
//! A bad spec never aborts the execution: the offending job is logged and
//! skipped, and the remaining specs still run.

use crate::branch::{BranchManager, JobSpec};
use crate::error::ExecutionError;
use crate::job::NewJob;
use crate::manager::JobManager;
use crate::slide::SlideManager;
use crate::workflow::WorkflowManager;
use fairway_core::{JobId, RunId};
use fairway_store::{SharedStore, StoreError, keys};
use serde_json::{Map, Value};
use std::fmt;

/// Template names that trigger slide-metadata hydration.
const SLIDE_INIT_TEMPLATES: [&str; 2] = ["init_wsi", "wsi_initialize"];

/// Tiling defaults merged into slide-initialization payloads unless the spec
/// overrides them.
const TILING_DEFAULTS: [(&str, u64); 4] = [
    ("tile_size", 1024),
    ("overlap", 128),
    ("min_tile", 512),
    ("max_tile", 1536),
];

/// Outcome of one workflow execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionReceipt {
    pub workflow_id: String,
    pub run_id: RunId,
    pub job_ids: Vec<JobId>,
}

/// Per-spec hydration problems; tolerated and logged, never propagated.
#[derive(Debug, Clone, PartialEq, Eq)]
enum SpecError {
    MissingSlideId { template_id: String },
    SlideNotFound { slide_id: String },
}

impl fmt::Display for SpecError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingSlideId { template_id } => {
                write!(f, "template '{template_id}' requires 'slide_id' in payload")
            }
            Self::SlideNotFound { slide_id } => {
                write!(f, "slide metadata missing for '{slide_id}'")
            }
        }
    }
}

/// Expands workflows into job instances at execution time.
#[derive(Clone)]
pub struct ExecutionManager {
    store: SharedStore,
    jobs: JobManager,
    workflows: WorkflowManager,
    branches: BranchManager,
    slides: SlideManager,
}

impl ExecutionManager {
    /// Creates a manager over the shared store.
    #[must_use]
    pub fn new(store: SharedStore) -> Self {
        let jobs = JobManager::new(store.clone());
        let workflows = WorkflowManager::new(store.clone());
        let branches = BranchManager::new(store.clone());
        let slides = SlideManager::new(store.clone());
        Self {
            store,
            jobs,
            workflows,
            branches,
            slides,
        }
    }

    /// Executes a workflow: materializes every branch's specs into PENDING
    /// job instances and enqueues them globally.
    ///
    /// # Errors
    ///
    /// Returns [`ExecutionError::WorkflowNotFound`] for an unknown workflow,
    /// or a store error if coordination state cannot be written.
    pub async fn execute(&self, workflow_id: &str) -> Result<ExecutionReceipt, ExecutionError> {
        let Some(workflow) = self.workflows.get(workflow_id).await? else {
            return Err(ExecutionError::WorkflowNotFound {
                workflow_id: workflow_id.to_string(),
            });
        };

        let run_id = RunId::new();
        self.store
            .set_add(&keys::workflow_runs(workflow_id), &run_id.to_string())
            .await?;

        let mut job_ids = Vec::new();
        for branch_id in self.branches.list(workflow_id).await? {
            for spec in self.branches.specs(workflow_id, &branch_id).await? {
                let payload = match self.prepare_payload(&spec).await? {
                    Ok(payload) => payload,
                    Err(err) => {
                        tracing::warn!(
                            workflow_id,
                            branch_id = %branch_id,
                            template = %spec.template_id,
                            error = %err,
                            "skipping job spec"
                        );
                        continue;
                    }
                };

                let job_id = self
                    .jobs
                    .create(NewJob {
                        user_id: workflow.owner_user_id.clone(),
                        workflow_id: workflow_id.to_string(),
                        run_id,
                        branch_id: branch_id.clone(),
                        template_id: spec.template_id.clone(),
                        input_payload: payload,
                    })
                    .await?;

                self.store
                    .push_back(
                        &keys::workflow_run_jobs(workflow_id, &run_id.to_string()),
                        &job_id.to_string(),
                    )
                    .await?;
                self.store
                    .push_back(keys::SCHEDULER_PENDING_JOBS, &job_id.to_string())
                    .await?;

                tracing::debug!(job_id = %job_id, template = %spec.template_id, "queued job");
                job_ids.push(job_id);
            }
        }

        tracing::info!(
            workflow_id,
            run_id = %run_id,
            jobs = job_ids.len(),
            "workflow execution queued"
        );

        Ok(ExecutionReceipt {
            workflow_id: workflow_id.to_string(),
            run_id,
            job_ids,
        })
    }

    /// Derives the final input payload for one spec. Slide-initialization
    /// templates get `slide_path` and tiling defaults merged in; everything
    /// else passes through unchanged.
    async fn prepare_payload(
        &self,
        spec: &JobSpec,
    ) -> Result<Result<Map<String, Value>, SpecError>, StoreError> {
        if !SLIDE_INIT_TEMPLATES.contains(&spec.template_id.as_str()) {
            return Ok(Ok(spec.input_payload.clone()));
        }

        let Some(slide_id) = spec.input_payload.get("slide_id").and_then(Value::as_str) else {
            return Ok(Err(SpecError::MissingSlideId {
                template_id: spec.template_id.clone(),
            }));
        };

        let Some(slide) = self.slides.get(slide_id).await? else {
            return Ok(Err(SpecError::SlideNotFound {
                slide_id: slide_id.to_string(),
            }));
        };

        let mut payload = spec.input_payload.clone();
        payload.insert(
            "slide_path".to_string(),
            Value::String(slide.slide_path.clone()),
        );
        for (key, value) in TILING_DEFAULTS {
            payload
                .entry(key.to_string())
                .or_insert_with(|| Value::from(value));
        }

        Ok(Ok(payload))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::JobStatus;
    use crate::slide::SlideRecord;
    use crate::workflow::DEFAULT_BRANCH;
    use fairway_store::{MemoryStore, StateStore};
    use serde_json::json;
    use std::sync::Arc;

    struct Fixture {
        store: Arc<MemoryStore>,
        executions: ExecutionManager,
        workflows: WorkflowManager,
        branches: BranchManager,
        slides: SlideManager,
        jobs: JobManager,
    }

    fn fixture() -> Fixture {
        let store = Arc::new(MemoryStore::new());
        Fixture {
            executions: ExecutionManager::new(store.clone()),
            workflows: WorkflowManager::new(store.clone()),
            branches: BranchManager::new(store.clone()),
            slides: SlideManager::new(store.clone()),
            jobs: JobManager::new(store.clone()),
            store,
        }
    }

    #[tokio::test]
    async fn unknown_workflow_is_not_found() {
        let f = fixture();
        let err = f.executions.execute("ghost").await.unwrap_err();
        assert_eq!(
            err,
            ExecutionError::WorkflowNotFound {
                workflow_id: "ghost".to_string()
            }
        );
    }

    #[tokio::test]
    async fn execute_creates_pending_jobs_in_branch_order() {
        let f = fixture();
        f.workflows.create("wf", "demo", "u1").await.unwrap();
        for name in ["step_a", "step_b"] {
            f.branches
                .append_spec("wf", DEFAULT_BRANCH, &JobSpec::new(name, Map::new()))
                .await
                .unwrap();
        }

        let receipt = f.executions.execute("wf").await.unwrap();
        assert_eq!(receipt.job_ids.len(), 2);

        // Pending queue holds the ids in branch order.
        let pending = f.store.list_range(keys::SCHEDULER_PENDING_JOBS).await.unwrap();
        let expected: Vec<String> = receipt.job_ids.iter().map(ToString::to_string).collect();
        assert_eq!(pending, expected);

        // Run bookkeeping matches.
        let run_jobs = f
            .store
            .list_range(&keys::workflow_run_jobs("wf", &receipt.run_id.to_string()))
            .await
            .unwrap();
        assert_eq!(run_jobs, expected);

        // All jobs are PENDING with the owner's user id and correct templates.
        let first = f.jobs.get(&receipt.job_ids[0]).await.unwrap().unwrap();
        assert_eq!(first.status, JobStatus::Pending);
        assert_eq!(first.user_id, "u1");
        assert_eq!(first.template_id, "step_a");
        let second = f.jobs.get(&receipt.job_ids[1]).await.unwrap().unwrap();
        assert_eq!(second.template_id, "step_b");
    }

    #[tokio::test]
    async fn slide_init_payload_is_hydrated() {
        let f = fixture();
        f.workflows.create("wf", "demo", "u1").await.unwrap();
        f.slides
            .register(&SlideRecord {
                slide_id: "s1".to_string(),
                user_id: "u1".to_string(),
                slide_path: "/data/slides/s1.svs".to_string(),
                size_bytes: 7,
            })
            .await
            .unwrap();

        let mut payload = Map::new();
        payload.insert("slide_id".to_string(), json!("s1"));
        payload.insert("tile_size".to_string(), json!(2048));
        f.branches
            .append_spec("wf", DEFAULT_BRANCH, &JobSpec::new("init_wsi", payload))
            .await
            .unwrap();

        let receipt = f.executions.execute("wf").await.unwrap();
        let job = f.jobs.get(&receipt.job_ids[0]).await.unwrap().unwrap();

        assert_eq!(
            job.input_payload.get("slide_path"),
            Some(&json!("/data/slides/s1.svs"))
        );
        // Explicit override is preserved; other defaults are filled in.
        assert_eq!(job.input_payload.get("tile_size"), Some(&json!(2048)));
        assert_eq!(job.input_payload.get("overlap"), Some(&json!(128)));
        assert_eq!(job.input_payload.get("min_tile"), Some(&json!(512)));
        assert_eq!(job.input_payload.get("max_tile"), Some(&json!(1536)));
    }

    #[tokio::test]
    async fn bad_slide_spec_is_skipped_not_fatal() {
        let f = fixture();
        f.workflows.create("wf", "demo", "u1").await.unwrap();

        // Missing slide_id entirely.
        f.branches
            .append_spec("wf", DEFAULT_BRANCH, &JobSpec::new("init_wsi", Map::new()))
            .await
            .unwrap();
        // References a slide that was never registered.
        let mut payload = Map::new();
        payload.insert("slide_id".to_string(), json!("ghost"));
        f.branches
            .append_spec("wf", DEFAULT_BRANCH, &JobSpec::new("wsi_initialize", payload))
            .await
            .unwrap();
        // A healthy spec after the bad ones.
        f.branches
            .append_spec("wf", DEFAULT_BRANCH, &JobSpec::new("fake_sleep", Map::new()))
            .await
            .unwrap();

        let receipt = f.executions.execute("wf").await.unwrap();

        assert_eq!(receipt.job_ids.len(), 1);
        let job = f.jobs.get(&receipt.job_ids[0]).await.unwrap().unwrap();
        assert_eq!(job.template_id, "fake_sleep");
        assert_eq!(
            f.store.list_len(keys::SCHEDULER_PENDING_JOBS).await.unwrap(),
            1
        );
    }

    #[tokio::test]
    async fn run_is_registered_in_workflow_runs() {
        let f = fixture();
        f.workflows.create("wf", "demo", "u1").await.unwrap();

        let receipt = f.executions.execute("wf").await.unwrap();

        assert!(
            f.store
                .set_contains(&keys::workflow_runs("wf"), &receipt.run_id.to_string())
                .await
                .unwrap()
        );
    }
}
