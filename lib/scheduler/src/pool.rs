//! Worker pool: one worker task per registered user.
//!
//! Workers are spawned for every registered user at startup and lazily when
//! a user registers at runtime. Spawning is idempotent per user; the pool
//! never spawns a second worker for the same queue.

use crate::config::SchedulerConfig;
use crate::worker::UserWorker;
use fairway_store::{SharedStore, StoreError, keys};
use fairway_workflow::JobRegistry;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::task::JoinHandle;

/// Spawns and tracks per-user worker tasks.
pub struct WorkerPool {
    store: SharedStore,
    registry: Arc<JobRegistry>,
    config: SchedulerConfig,
    workers: Mutex<HashMap<String, JoinHandle<()>>>,
}

impl WorkerPool {
    /// Creates an empty pool.
    #[must_use]
    pub fn new(store: SharedStore, registry: Arc<JobRegistry>, config: SchedulerConfig) -> Self {
        Self {
            store,
            registry,
            config,
            workers: Mutex::new(HashMap::new()),
        }
    }

    /// Spawns a worker for the user unless one is already running.
    /// Returns true if a worker was spawned.
    pub fn ensure_worker(&self, user_id: &str) -> bool {
        let mut workers = self.workers.lock().expect("pool lock poisoned");
        if workers.contains_key(user_id) {
            return false;
        }

        let worker = UserWorker::new(
            user_id,
            self.store.clone(),
            Arc::clone(&self.registry),
            self.config.clone(),
        );
        workers.insert(user_id.to_string(), tokio::spawn(worker.run()));
        true
    }

    /// Spawns workers for every registered user. Returns how many were newly
    /// spawned.
    ///
    /// # Errors
    ///
    /// Returns an error if the user set cannot be read.
    pub async fn spawn_registered(&self) -> Result<usize, StoreError> {
        let mut spawned = 0;
        for user_id in self.store.set_members(keys::USERS).await? {
            if self.ensure_worker(&user_id) {
                spawned += 1;
            }
        }
        tracing::info!(spawned, "worker pool started");
        Ok(spawned)
    }

    /// Number of workers currently tracked.
    #[must_use]
    pub fn worker_count(&self) -> usize {
        self.workers.lock().expect("pool lock poisoned").len()
    }

    /// Aborts all worker tasks.
    pub fn shutdown(&self) {
        let mut workers = self.workers.lock().expect("pool lock poisoned");
        for (user_id, handle) in workers.drain() {
            tracing::debug!(user_id = %user_id, "stopping worker");
            handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::control::{self, SchedulerState};
    use crate::scheduler::Scheduler;
    use async_trait::async_trait;
    use fairway_core::JobId;
    use fairway_store::{MemoryStore, StateStore};
    use fairway_workflow::handlers::register_builtin;
    use fairway_workflow::{
        BranchManager, ExecutionManager, HandlerError, JobContext, JobHandler, JobManager,
        JobSpec, JobStatus, ProgressRecord, ProgressUpdate, UserManager, WorkflowManager,
        DEFAULT_BRANCH,
    };
    use serde_json::{Map, Value, json};
    use std::time::Duration;

    /// Handler that reports step-based progress, lingers, and succeeds.
    struct SteppedHandler;

    #[async_trait]
    impl JobHandler for SteppedHandler {
        async fn run(
            &self,
            ctx: &JobContext,
            _payload: Map<String, Value>,
        ) -> Result<Map<String, Value>, HandlerError> {
            ctx.update_progress(
                ProgressUpdate::new(0, "processing tiles")
                    .with_stage("tiles")
                    .with_steps(3, 10),
            )
            .await
            .map_err(|e| HandlerError::new("StoreError", e.to_string()))?;
            tokio::time::sleep(Duration::from_secs(2)).await;
            Ok(Map::new())
        }
    }

    struct Harness {
        store: Arc<MemoryStore>,
        users: UserManager,
        workflows: WorkflowManager,
        branches: BranchManager,
        executions: ExecutionManager,
        jobs: JobManager,
        pool: WorkerPool,
        scheduler: Option<JoinHandle<()>>,
    }

    impl Harness {
        fn new() -> Self {
            let store = Arc::new(MemoryStore::new());
            let shared: SharedStore = store.clone();
            let registry = Arc::new(
                register_builtin(JobRegistry::builder())
                    .register("stepped", Arc::new(SteppedHandler))
                    .build(),
            );
            let config = SchedulerConfig {
                pop_timeout_ms: 100,
                defer_sleep_ms: 50,
                worker_idle_sleep_ms: 50,
                paused_sleep_ms: 50,
                ..SchedulerConfig::default()
            };
            Self {
                users: UserManager::new(shared.clone()),
                workflows: WorkflowManager::new(shared.clone()),
                branches: BranchManager::new(shared.clone()),
                executions: ExecutionManager::new(shared.clone()),
                jobs: JobManager::new(shared.clone()),
                pool: WorkerPool::new(shared, registry, config),
                store,
                scheduler: None,
            }
        }

        async fn start_scheduler(&mut self) {
            control::set_state(self.store.as_ref(), SchedulerState::Running)
                .await
                .unwrap();
            let scheduler = Scheduler::new(
                self.store.clone(),
                SchedulerConfig {
                    pop_timeout_ms: 100,
                    defer_sleep_ms: 50,
                    paused_sleep_ms: 50,
                    ..SchedulerConfig::default()
                },
            );
            self.scheduler = Some(tokio::spawn(scheduler.run()));
        }

        /// Registers a user with one single-spec workflow and a worker.
        async fn seed_user(&self, user_id: &str, template: &str, payload: Map<String, Value>) {
            self.users.register(user_id).await.unwrap();
            let workflow_id = format!("wf-{user_id}");
            self.workflows
                .create(&workflow_id, "demo", user_id)
                .await
                .unwrap();
            self.branches
                .append_spec(&workflow_id, DEFAULT_BRANCH, &JobSpec::new(template, payload))
                .await
                .unwrap();
            self.pool.ensure_worker(user_id);
        }

        async fn status_of(&self, job_id: &JobId) -> Option<JobStatus> {
            self.jobs
                .get(job_id)
                .await
                .unwrap()
                .map(|job| job.status)
        }

        /// Waits until the job reaches the status, asserting the active-user
        /// cap at every sample along the way.
        async fn wait_for_status(&self, job_id: &JobId, status: JobStatus) {
            let deadline = tokio::time::Instant::now() + Duration::from_secs(60);
            loop {
                assert!(
                    self.store
                        .set_size(keys::SCHEDULER_ACTIVE_USERS)
                        .await
                        .unwrap()
                        <= 3,
                    "active-user cap violated"
                );
                if self.status_of(job_id).await == Some(status) {
                    return;
                }
                assert!(
                    tokio::time::Instant::now() < deadline,
                    "timed out waiting for {status}"
                );
                tokio::time::sleep(Duration::from_millis(20)).await;
            }
        }

        async fn progress_record(&self, job_id: &JobId) -> ProgressRecord {
            let raw = self
                .store
                .hash_get(keys::SCHEDULER_JOB_PROGRESS, &job_id.to_string())
                .await
                .unwrap()
                .expect("progress record present");
            ProgressRecord::decode(&raw).expect("progress record decodes")
        }

        fn teardown(&mut self) {
            if let Some(handle) = self.scheduler.take() {
                handle.abort();
            }
            self.pool.shutdown();
        }
    }

    #[tokio::test(start_paused = true)]
    async fn single_job_runs_to_success() {
        let mut h = Harness::new();
        h.seed_user("u1", "fake_sleep", Map::new()).await;
        h.start_scheduler().await;

        let receipt = h.executions.execute("wf-u1").await.unwrap();
        assert_eq!(receipt.job_ids.len(), 1);
        let job_id = receipt.job_ids[0];

        h.wait_for_status(&job_id, JobStatus::Success).await;

        let job = h.jobs.get(&job_id).await.unwrap().unwrap();
        assert_eq!(
            job.output_payload.get("result"),
            Some(&json!("fake job success!"))
        );
        let record = h.progress_record(&job_id).await;
        assert_eq!(record.status, JobStatus::Success);
        assert!((record.percent - 1.0).abs() < f64::EPSILON);

        h.teardown();
    }

    #[tokio::test(start_paused = true)]
    async fn fourth_user_waits_for_a_free_slot() {
        let mut h = Harness::new();
        let mut payload = Map::new();
        payload.insert("seconds".to_string(), json!(5));
        for user in ["u1", "u2", "u3", "u4"] {
            h.seed_user(user, "sleep_for", payload.clone()).await;
        }
        h.start_scheduler().await;

        // Three users saturate the cap.
        let mut first_three = Vec::new();
        for user in ["u1", "u2", "u3"] {
            let receipt = h.executions.execute(&format!("wf-{user}")).await.unwrap();
            first_three.push(receipt.job_ids[0]);
        }
        let deadline = tokio::time::Instant::now() + Duration::from_secs(30);
        loop {
            let mut running = 0;
            for job_id in &first_three {
                if h.status_of(job_id).await == Some(JobStatus::Running) {
                    running += 1;
                }
            }
            if running == 3 {
                break;
            }
            assert!(tokio::time::Instant::now() < deadline, "cap never saturated");
            tokio::time::sleep(Duration::from_millis(20)).await;
        }

        // The fourth user's job stays pending while the cap is full.
        let receipt = h.executions.execute("wf-u4").await.unwrap();
        let fourth = receipt.job_ids[0];
        tokio::time::sleep(Duration::from_millis(600)).await;
        assert_eq!(h.status_of(&fourth).await, Some(JobStatus::Pending));
        assert_eq!(
            h.store.set_size(keys::SCHEDULER_ACTIVE_USERS).await.unwrap(),
            3
        );
        // Deferred, not duplicated: at most one pending entry, and never on
        // the user queue while the cap is full.
        let pending = h
            .store
            .list_range(keys::SCHEDULER_PENDING_JOBS)
            .await
            .unwrap();
        assert!(pending.len() <= 1);
        if let Some(entry) = pending.first() {
            assert_eq!(entry, &fourth.to_string());
        }
        assert!(
            h.store
                .list_range(&keys::user_queue("u4"))
                .await
                .unwrap()
                .is_empty()
        );

        // Everyone finishes eventually, and the fourth job only started after
        // a slot freed up.
        for job_id in &first_three {
            h.wait_for_status(job_id, JobStatus::Success).await;
        }
        h.wait_for_status(&fourth, JobStatus::Success).await;

        let mut earliest_finish = None;
        for job_id in &first_three {
            let finished = h.jobs.get(job_id).await.unwrap().unwrap().finished_at.unwrap();
            if earliest_finish.is_none_or(|t| finished < t) {
                earliest_finish = Some(finished);
            }
        }
        let fourth_started = h
            .jobs
            .get(&fourth)
            .await
            .unwrap()
            .unwrap()
            .started_at
            .unwrap();
        assert!(fourth_started >= earliest_finish.unwrap());

        h.teardown();
    }

    #[tokio::test(start_paused = true)]
    async fn unregistered_template_fails_job() {
        let mut h = Harness::new();
        h.seed_user("u1", "not_a_template", Map::new()).await;
        h.start_scheduler().await;

        let receipt = h.executions.execute("wf-u1").await.unwrap();
        let job_id = receipt.job_ids[0];

        h.wait_for_status(&job_id, JobStatus::Failed).await;

        let job = h.jobs.get(&job_id).await.unwrap().unwrap();
        assert!(job.progress_message.contains("not_a_template"));
        let error = job.output_payload.get("error").and_then(Value::as_str);
        assert!(error.is_some_and(|e| e.contains("not_a_template")));

        h.teardown();
    }

    #[tokio::test(start_paused = true)]
    async fn same_branch_jobs_run_in_order() {
        let mut h = Harness::new();
        h.seed_user("u1", "fake_sleep", Map::new()).await;
        // seed_user appended the first spec; add a second one behind it.
        h.branches
            .append_spec("wf-u1", DEFAULT_BRANCH, &JobSpec::new("fake_sleep", Map::new()))
            .await
            .unwrap();
        h.start_scheduler().await;

        let receipt = h.executions.execute("wf-u1").await.unwrap();
        assert_eq!(receipt.job_ids.len(), 2);
        let (a, b) = (receipt.job_ids[0], receipt.job_ids[1]);

        h.wait_for_status(&a, JobStatus::Success).await;
        h.wait_for_status(&b, JobStatus::Success).await;

        let a = h.jobs.get(&a).await.unwrap().unwrap();
        let b = h.jobs.get(&b).await.unwrap().unwrap();
        assert!(a.started_at.unwrap() <= b.started_at.unwrap());

        h.teardown();
    }

    #[tokio::test(start_paused = true)]
    async fn paused_scheduler_holds_jobs_pending() {
        let mut h = Harness::new();
        h.seed_user("u1", "fake_sleep", Map::new()).await;
        h.branches
            .append_spec("wf-u1", DEFAULT_BRANCH, &JobSpec::new("fake_sleep", Map::new()))
            .await
            .unwrap();

        // Scheduler running but paused.
        control::set_state(h.store.as_ref(), SchedulerState::Paused)
            .await
            .unwrap();
        let scheduler = Scheduler::new(
            h.store.clone(),
            SchedulerConfig {
                pop_timeout_ms: 100,
                paused_sleep_ms: 50,
                ..SchedulerConfig::default()
            },
        );
        h.scheduler = Some(tokio::spawn(scheduler.run()));

        let receipt = h.executions.execute("wf-u1").await.unwrap();
        tokio::time::sleep(Duration::from_secs(2)).await;

        // Nothing moved.
        assert_eq!(
            h.store.list_len(keys::SCHEDULER_PENDING_JOBS).await.unwrap(),
            receipt.job_ids.len()
        );
        for job_id in &receipt.job_ids {
            assert_eq!(h.status_of(job_id).await, Some(JobStatus::Pending));
        }

        // Resume: everything drains to SUCCESS.
        control::set_state(h.store.as_ref(), SchedulerState::Running)
            .await
            .unwrap();
        for job_id in &receipt.job_ids {
            h.wait_for_status(job_id, JobStatus::Success).await;
        }

        h.teardown();
    }

    #[tokio::test(start_paused = true)]
    async fn step_progress_is_globally_visible() {
        let mut h = Harness::new();
        h.seed_user("u1", "stepped", Map::new()).await;
        h.start_scheduler().await;

        let receipt = h.executions.execute("wf-u1").await.unwrap();
        let job_id = receipt.job_ids[0];

        // While the handler lingers, the record shows the step-derived
        // percent.
        let deadline = tokio::time::Instant::now() + Duration::from_secs(30);
        loop {
            if let Some(raw) = h
                .store
                .hash_get(keys::SCHEDULER_JOB_PROGRESS, &job_id.to_string())
                .await
                .unwrap()
            {
                let record = ProgressRecord::decode(&raw).unwrap();
                if record.status == JobStatus::Running && record.percent > 0.0 {
                    assert!((record.percent - 0.3).abs() < f64::EPSILON);
                    assert_eq!(record.stage, "tiles");
                    break;
                }
            }
            assert!(
                tokio::time::Instant::now() < deadline,
                "never observed running progress"
            );
            tokio::time::sleep(Duration::from_millis(10)).await;
        }

        h.wait_for_status(&job_id, JobStatus::Success).await;
        let record = h.progress_record(&job_id).await;
        assert_eq!(record.status, JobStatus::Success);
        assert!((record.percent - 1.0).abs() < f64::EPSILON);

        h.teardown();
    }

    #[tokio::test]
    async fn ensure_worker_is_idempotent() {
        let store: SharedStore = Arc::new(MemoryStore::new());
        let registry = Arc::new(register_builtin(JobRegistry::builder()).build());
        let pool = WorkerPool::new(store, registry, SchedulerConfig::default());

        assert!(pool.ensure_worker("u1"));
        assert!(!pool.ensure_worker("u1"));
        assert_eq!(pool.worker_count(), 1);

        pool.shutdown();
        assert_eq!(pool.worker_count(), 0);
    }

    #[tokio::test]
    async fn spawn_registered_covers_all_users() {
        let store = Arc::new(MemoryStore::new());
        let users = UserManager::new(store.clone());
        users.register("u1").await.unwrap();
        users.register("u2").await.unwrap();

        let registry = Arc::new(register_builtin(JobRegistry::builder()).build());
        let pool = WorkerPool::new(store.clone(), registry, SchedulerConfig::default());

        assert_eq!(pool.spawn_registered().await.unwrap(), 2);
        assert_eq!(pool.worker_count(), 2);
        // Re-running spawns nothing new.
        assert_eq!(pool.spawn_registered().await.unwrap(), 0);

        pool.shutdown();
    }
}
