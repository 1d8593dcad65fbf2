//! Read-only global status aggregation.

use fairway_store::{StateStore, StoreError, keys};
use fairway_workflow::ProgressRecord;
use serde::Serialize;
use std::collections::HashMap;

/// Snapshot of everything the scheduling runtime is doing.
#[derive(Debug, Clone, Default, Serialize)]
pub struct GlobalStatus {
    /// Job ids currently RUNNING.
    pub running_jobs: Vec<String>,
    /// Users currently owning RUNNING jobs.
    pub active_users: Vec<String>,
    /// Job ids awaiting admission, head first.
    pub pending_jobs: Vec<String>,
    /// Latest progress record per job.
    pub progress: HashMap<String, ProgressRecord>,
}

impl GlobalStatus {
    /// Reads a status snapshot from the store.
    ///
    /// The reads are not one atomic cut; a job finishing mid-snapshot can
    /// appear in none of the collections. Consumers poll, so that resolves on
    /// the next read.
    ///
    /// # Errors
    ///
    /// Returns an error if a store read fails.
    pub async fn snapshot(store: &dyn StateStore) -> Result<Self, StoreError> {
        let mut running_jobs = store.set_members(keys::SCHEDULER_RUNNING_JOBS).await?;
        running_jobs.sort();
        let mut active_users = store.set_members(keys::SCHEDULER_ACTIVE_USERS).await?;
        active_users.sort();
        let pending_jobs = store.list_range(keys::SCHEDULER_PENDING_JOBS).await?;

        let mut progress = HashMap::new();
        for (job_id, raw) in store.hash_get_all(keys::SCHEDULER_JOB_PROGRESS).await? {
            if let Some(record) = ProgressRecord::decode(&raw) {
                progress.insert(job_id, record);
            }
        }

        Ok(Self {
            running_jobs,
            active_users,
            pending_jobs,
            progress,
        })
    }
}
