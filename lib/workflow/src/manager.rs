//! Job lifecycle manager.
//!
//! Owns every write to job hashes and the global progress hash. The state
//! machine it enforces:
//!
//! ```text
//! PENDING --(worker picks)---------> RUNNING
//! RUNNING --(handler returns)------> SUCCESS  (terminal)
//! RUNNING --(handler error)--------> FAILED   (terminal)
//! ```
//!
//! Concurrent writers for the same job (handler progress calls plus worker
//! lifecycle transitions) are fine: each field write is atomic and the last
//! writer wins per field, never across fields.

use crate::job::{JobInstance, JobStatus, NewJob, encode_payload, format_timestamp};
use crate::progress::{ProgressRecord, ProgressUpdate};
use chrono::Utc;
use fairway_core::JobId;
use fairway_store::{SharedStore, StoreError, keys};
use serde_json::{Map, Value};

/// Manages job instance state in the store.
#[derive(Clone)]
pub struct JobManager {
    store: SharedStore,
}

impl JobManager {
    /// Creates a manager over the shared store.
    #[must_use]
    pub fn new(store: SharedStore) -> Self {
        Self { store }
    }

    /// Persists a fresh job instance in PENDING state and returns its id.
    ///
    /// # Errors
    ///
    /// Returns an error if the store write fails.
    pub async fn create(&self, new_job: NewJob) -> Result<JobId, StoreError> {
        let job_id = JobId::new();
        let now = format_timestamp(Utc::now());

        self.store
            .hash_set_many(
                &keys::job_data(&job_id.to_string()),
                &[
                    ("job_id", job_id.to_string()),
                    ("workflow_id", new_job.workflow_id),
                    ("run_id", new_job.run_id.to_string()),
                    ("branch_id", new_job.branch_id),
                    ("template_id", new_job.template_id),
                    ("user_id", new_job.user_id),
                    ("status", JobStatus::Pending.as_str().to_string()),
                    ("created_at", now),
                    ("scheduled_at", String::new()),
                    ("started_at", String::new()),
                    ("finished_at", String::new()),
                    ("input_payload", encode_payload(&new_job.input_payload)),
                    ("output_payload", String::new()),
                    ("progress", "0".to_string()),
                    ("progress_message", String::new()),
                    ("stage", String::new()),
                ],
            )
            .await?;

        Ok(job_id)
    }

    /// Fetches a job instance, or None if it does not exist or is corrupt.
    ///
    /// # Errors
    ///
    /// Returns an error if the store read fails.
    pub async fn get(&self, job_id: &JobId) -> Result<Option<JobInstance>, StoreError> {
        let fields = self
            .store
            .hash_get_all(&keys::job_data(&job_id.to_string()))
            .await?;
        Ok(JobInstance::from_fields(&fields))
    }

    /// Transitions the job to RUNNING, stamping its scheduling timestamps.
    ///
    /// # Errors
    ///
    /// Returns an error if the store write fails.
    pub async fn mark_running(&self, job_id: &JobId) -> Result<(), StoreError> {
        let now = format_timestamp(Utc::now());
        self.store
            .hash_set_many(
                &keys::job_data(&job_id.to_string()),
                &[
                    ("status", JobStatus::Running.as_str().to_string()),
                    ("scheduled_at", now.clone()),
                    ("started_at", now),
                ],
            )
            .await
    }

    /// Transitions the job to SUCCESS with the handler's output (terminal).
    ///
    /// # Errors
    ///
    /// Returns an error if the store write fails.
    pub async fn mark_success(
        &self,
        job_id: &JobId,
        output: &Map<String, Value>,
    ) -> Result<(), StoreError> {
        self.store
            .hash_set_many(
                &keys::job_data(&job_id.to_string()),
                &[
                    ("status", JobStatus::Success.as_str().to_string()),
                    ("finished_at", format_timestamp(Utc::now())),
                    ("output_payload", encode_payload(output)),
                    ("progress", "100".to_string()),
                    ("stage", "completed".to_string()),
                ],
            )
            .await
    }

    /// Transitions the job to FAILED with the error text (terminal).
    ///
    /// # Errors
    ///
    /// Returns an error if the store write fails.
    pub async fn mark_failed(&self, job_id: &JobId, error: &str) -> Result<(), StoreError> {
        let mut output = Map::new();
        output.insert("error".to_string(), Value::String(error.to_string()));

        self.store
            .hash_set_many(
                &keys::job_data(&job_id.to_string()),
                &[
                    ("status", JobStatus::Failed.as_str().to_string()),
                    ("finished_at", format_timestamp(Utc::now())),
                    ("progress_message", error.to_string()),
                    ("output_payload", encode_payload(&output)),
                    ("progress", "100".to_string()),
                    ("stage", "failed".to_string()),
                ],
            )
            .await
    }

    /// Records a progress update: local fields on the job hash plus a RUNNING
    /// record in the global progress hash.
    ///
    /// # Errors
    ///
    /// Returns an error if a store write fails.
    pub async fn update_progress(
        &self,
        job_id: &JobId,
        update: ProgressUpdate,
    ) -> Result<(), StoreError> {
        let job_key = keys::job_data(&job_id.to_string());

        let mut fields = vec![
            ("progress", update.progress.to_string()),
            ("progress_message", update.message.clone()),
        ];
        if let Some(stage) = &update.stage {
            fields.push(("stage", stage.clone()));
        }
        if let Some(eta) = update.eta_seconds {
            fields.push(("eta_seconds", eta.to_string()));
        }
        self.store.hash_set_many(&job_key, &fields).await?;

        let user_id = self
            .store
            .hash_get(&job_key, "user_id")
            .await?
            .unwrap_or_default();

        self.write_progress_record(
            job_id,
            &user_id,
            JobStatus::Running,
            update.percent(),
            &update.message,
            update.stage.as_deref().unwrap_or(""),
            update.eta_seconds,
        )
        .await
    }

    /// Writes the globally visible progress record for a job.
    ///
    /// # Errors
    ///
    /// Returns an error if the store write fails.
    #[allow(clippy::too_many_arguments)]
    pub async fn write_progress_record(
        &self,
        job_id: &JobId,
        user_id: &str,
        status: JobStatus,
        percent: f64,
        message: &str,
        stage: &str,
        eta_seconds: Option<i64>,
    ) -> Result<(), StoreError> {
        let record = ProgressRecord {
            job_id: job_id.to_string(),
            user_id: user_id.to_string(),
            status,
            percent,
            message: message.to_string(),
            stage: stage.to_string(),
            eta_seconds,
            updated_at: Utc::now(),
        };

        self.store
            .hash_set(
                keys::SCHEDULER_JOB_PROGRESS,
                &job_id.to_string(),
                &record.encode(),
            )
            .await
    }
}
