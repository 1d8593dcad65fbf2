//! Per-user worker loop.
//!
//! Each registered user gets one worker that drains that user's queue one
//! job at a time. The worker owns the lifecycle of every job it picks: it
//! marks the job RUNNING, maintains the running-job and active-user sets,
//! invokes the handler, and records the terminal state. A picked job always
//! ends in SUCCESS or FAILED.
//!
//! Workers never die on handler errors. Store failures are logged and the
//! loop retries after a short sleep; the picked job is pushed back onto the
//! user's queue first so it is not lost.

use crate::config::SchedulerConfig;
use fairway_core::JobId;
use fairway_store::{SharedStore, StoreError, keys};
use fairway_workflow::{JobContext, JobInstance, JobManager, JobRegistry, JobStatus};
use std::sync::Arc;

/// The worker loop for one user's queue.
pub struct UserWorker {
    user_id: String,
    store: SharedStore,
    registry: Arc<JobRegistry>,
    jobs: JobManager,
    config: SchedulerConfig,
}

impl UserWorker {
    /// Creates a worker for one user.
    #[must_use]
    pub fn new(
        user_id: impl Into<String>,
        store: SharedStore,
        registry: Arc<JobRegistry>,
        config: SchedulerConfig,
    ) -> Self {
        let jobs = JobManager::new(store.clone());
        Self {
            user_id: user_id.into(),
            store,
            registry,
            jobs,
            config,
        }
    }

    /// The user this worker serves.
    #[must_use]
    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    /// Runs the worker loop forever.
    pub async fn run(self) {
        tracing::info!(user_id = %self.user_id, "worker started");
        loop {
            match self.iterate().await {
                Ok(true) => {}
                Ok(false) => {
                    tokio::time::sleep(self.config.worker_idle_sleep()).await;
                }
                Err(err) => {
                    tracing::warn!(
                        user_id = %self.user_id,
                        error = %err,
                        "worker iteration failed; backing off"
                    );
                    tokio::time::sleep(self.config.worker_idle_sleep()).await;
                }
            }
        }
    }

    /// Pops and processes one job. Returns false if the queue was empty.
    pub(crate) async fn iterate(&self) -> Result<bool, StoreError> {
        let queue = keys::user_queue(&self.user_id);
        let Some(raw_id) = self.store.pop_front(&queue).await? else {
            return Ok(false);
        };

        let Ok(job_id) = raw_id.parse::<JobId>() else {
            tracing::warn!(user_id = %self.user_id, raw_id = %raw_id, "unparseable job id; dropping");
            return Ok(true);
        };

        let Some(job) = self.jobs.get(&job_id).await? else {
            tracing::warn!(user_id = %self.user_id, job_id = %job_id, "job metadata missing; dropping");
            return Ok(true);
        };

        tracing::debug!(user_id = %self.user_id, job_id = %job_id, "picked job");
        self.process(&job).await?;
        Ok(true)
    }

    /// Drives one job through RUNNING to a terminal state, then cleans up the
    /// running/active bookkeeping regardless of the outcome.
    async fn process(&self, job: &JobInstance) -> Result<(), StoreError> {
        if let Err(err) = self.start(job).await {
            // The job was popped but never started; push it back so a
            // transient store failure cannot lose it.
            if let Err(requeue_err) = self
                .store
                .push_back(&keys::user_queue(&self.user_id), &job.job_id.to_string())
                .await
            {
                tracing::error!(
                    job_id = %job.job_id,
                    error = %requeue_err,
                    "failed to requeue job after start error"
                );
            }
            return Err(err);
        }

        let executed = self.execute(job).await;
        let finished = self.finish(job).await;
        executed.and(finished)
    }

    /// Marks the job RUNNING and claims the running/active bookkeeping.
    async fn start(&self, job: &JobInstance) -> Result<(), StoreError> {
        self.jobs.mark_running(&job.job_id).await?;
        self.store
            .set_add(keys::SCHEDULER_RUNNING_JOBS, &job.job_id.to_string())
            .await?;
        self.store
            .set_add(keys::SCHEDULER_ACTIVE_USERS, &self.user_id)
            .await?;
        // Legacy mirror; kept write-only for older read-side consumers.
        self.store.set_add(keys::ACTIVE_USERS, &self.user_id).await?;
        self.store
            .hash_set(&keys::user(&self.user_id), "status", "running")
            .await?;
        self.jobs
            .write_progress_record(
                &job.job_id,
                &self.user_id,
                JobStatus::Running,
                0.0,
                "",
                "",
                None,
            )
            .await
    }

    /// Resolves the handler and records the terminal state.
    async fn execute(&self, job: &JobInstance) -> Result<(), StoreError> {
        let Some(handler) = self.registry.get(&job.template_id) else {
            let message = format!("NotRegistered: unknown template '{}'", job.template_id);
            tracing::error!(job_id = %job.job_id, template = %job.template_id, "no handler registered");
            self.jobs.mark_failed(&job.job_id, &message).await?;
            return self
                .jobs
                .write_progress_record(
                    &job.job_id,
                    &self.user_id,
                    JobStatus::Failed,
                    1.0,
                    &message,
                    "failed",
                    None,
                )
                .await;
        };

        let ctx = JobContext::new(job.job_id, self.user_id.clone(), self.jobs.clone());
        match handler.run(&ctx, job.input_payload.clone()).await {
            Ok(output) => {
                tracing::info!(job_id = %job.job_id, "job completed");
                self.jobs.mark_success(&job.job_id, &output).await?;
                self.jobs
                    .write_progress_record(
                        &job.job_id,
                        &self.user_id,
                        JobStatus::Success,
                        1.0,
                        "",
                        "completed",
                        None,
                    )
                    .await
            }
            Err(err) => {
                let message = err.to_string();
                tracing::warn!(job_id = %job.job_id, error = %message, "job failed");
                self.jobs.mark_failed(&job.job_id, &message).await?;
                self.jobs
                    .write_progress_record(
                        &job.job_id,
                        &self.user_id,
                        JobStatus::Failed,
                        1.0,
                        &message,
                        "failed",
                        None,
                    )
                    .await
            }
        }
    }

    /// Releases the running/active bookkeeping once the job is terminal.
    async fn finish(&self, job: &JobInstance) -> Result<(), StoreError> {
        self.store
            .set_remove(keys::SCHEDULER_RUNNING_JOBS, &job.job_id.to_string())
            .await?;

        // Only drop the user from the active set once no running job of
        // theirs remains anywhere.
        let mut still_active = false;
        for running_id in self.store.set_members(keys::SCHEDULER_RUNNING_JOBS).await? {
            let owner = self
                .store
                .hash_get(&keys::job_data(&running_id), "user_id")
                .await?;
            if owner.as_deref() == Some(self.user_id.as_str()) {
                still_active = true;
                break;
            }
        }

        if !still_active {
            self.store
                .set_remove(keys::SCHEDULER_ACTIVE_USERS, &self.user_id)
                .await?;
            self.store.set_remove(keys::ACTIVE_USERS, &self.user_id).await?;
            self.store
                .hash_set(&keys::user(&self.user_id), "status", "idle")
                .await?;
        }
        Ok(())
    }
}
