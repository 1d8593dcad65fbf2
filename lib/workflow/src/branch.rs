//! Branches: ordered job-spec lists within a workflow.
//!
//! A branch is a linear stream of job specs. Specs are stored JSON-encoded in
//! an ordered list; insertion order is execution order. Older deployments
//! stored bare template names instead of encoded specs, so decoding accepts
//! both shapes.

use crate::job::JobStatus;
use fairway_store::{SharedStore, StoreError, keys};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One entry in a branch: a template name plus its default input payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobSpec {
    pub template_id: String,
    #[serde(default)]
    pub input_payload: Map<String, Value>,
}

impl JobSpec {
    /// Creates a spec.
    #[must_use]
    pub fn new(template_id: impl Into<String>, input_payload: Map<String, Value>) -> Self {
        Self {
            template_id: template_id.into(),
            input_payload,
        }
    }

    /// Encodes the spec for storage.
    #[must_use]
    pub fn encode(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| String::from("{}"))
    }

    /// Decodes a stored entry.
    ///
    /// Legacy entries are bare template names (sometimes JSON-quoted); they
    /// decode to a spec with an empty payload.
    #[must_use]
    pub fn decode(raw: &str) -> Self {
        if let Ok(spec) = serde_json::from_str::<JobSpec>(raw) {
            return spec;
        }
        if let Ok(Value::String(template_id)) = serde_json::from_str::<Value>(raw) {
            return Self::new(template_id, Map::new());
        }
        Self::new(raw, Map::new())
    }
}

/// Manages a workflow's branches and their job-spec lists.
#[derive(Clone)]
pub struct BranchManager {
    store: SharedStore,
}

impl BranchManager {
    /// Creates a manager over the shared store.
    #[must_use]
    pub fn new(store: SharedStore) -> Self {
        Self { store }
    }

    /// Creates a branch. Returns false if it already exists. The job-spec
    /// list itself is created lazily by the first append.
    ///
    /// # Errors
    ///
    /// Returns an error if a store operation fails.
    pub async fn create(&self, workflow_id: &str, branch_id: &str) -> Result<bool, StoreError> {
        let branches_key = keys::workflow_branches(workflow_id);
        if self.store.set_contains(&branches_key, branch_id).await? {
            return Ok(false);
        }
        self.store.set_add(&branches_key, branch_id).await?;
        Ok(true)
    }

    /// Appends a job spec to the branch's ordered list. Returns false if the
    /// branch does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if a store operation fails.
    pub async fn append_spec(
        &self,
        workflow_id: &str,
        branch_id: &str,
        spec: &JobSpec,
    ) -> Result<bool, StoreError> {
        let exists = self
            .store
            .set_contains(&keys::workflow_branches(workflow_id), branch_id)
            .await?;
        if !exists {
            return Ok(false);
        }

        self.store
            .push_back(&keys::workflow_branch(workflow_id, branch_id), &spec.encode())
            .await?;
        Ok(true)
    }

    /// Returns the ordered job specs of a branch.
    ///
    /// # Errors
    ///
    /// Returns an error if a store operation fails.
    pub async fn specs(
        &self,
        workflow_id: &str,
        branch_id: &str,
    ) -> Result<Vec<JobSpec>, StoreError> {
        let raw = self
            .store
            .list_range(&keys::workflow_branch(workflow_id, branch_id))
            .await?;
        Ok(raw.iter().map(|entry| JobSpec::decode(entry)).collect())
    }

    /// Returns the branch ids of a workflow (unordered).
    ///
    /// # Errors
    ///
    /// Returns an error if a store operation fails.
    pub async fn list(&self, workflow_id: &str) -> Result<Vec<String>, StoreError> {
        self.store
            .set_members(&keys::workflow_branches(workflow_id))
            .await
    }

    /// Returns true if the branch exists.
    ///
    /// # Errors
    ///
    /// Returns an error if a store operation fails.
    pub async fn exists(&self, workflow_id: &str, branch_id: &str) -> Result<bool, StoreError> {
        self.store
            .set_contains(&keys::workflow_branches(workflow_id), branch_id)
            .await
    }

    /// Removes the job spec at `index`. Returns false if the index is out of
    /// range.
    ///
    /// # Errors
    ///
    /// Returns an error if a store operation fails.
    pub async fn remove_spec(
        &self,
        workflow_id: &str,
        branch_id: &str,
        index: usize,
    ) -> Result<bool, StoreError> {
        let key = keys::workflow_branch(workflow_id, branch_id);
        let entries = self.store.list_range(&key).await?;
        let Some(entry) = entries.get(index) else {
            return Ok(false);
        };
        self.store.list_remove(&key, entry).await
    }

    /// Deletes a branch: removes it from the workflow's branch set, destroys
    /// its spec list, and deletes the executed job instances it produced.
    /// Returns false if the branch did not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if a store operation fails.
    pub async fn delete(&self, workflow_id: &str, branch_id: &str) -> Result<bool, StoreError> {
        let removed = self
            .store
            .set_remove(&keys::workflow_branches(workflow_id), branch_id)
            .await?;
        if !removed {
            return Ok(false);
        }

        self.store
            .delete(&keys::workflow_branch(workflow_id, branch_id))
            .await?;
        self.delete_executed_jobs(workflow_id, branch_id).await?;
        Ok(true)
    }

    /// Deletes all executed job instances belonging to one branch, walking
    /// the workflow's tracked runs rather than scanning the key space.
    pub(crate) async fn delete_executed_jobs(
        &self,
        workflow_id: &str,
        branch_id: &str,
    ) -> Result<(), StoreError> {
        let runs = self
            .store
            .set_members(&keys::workflow_runs(workflow_id))
            .await?;

        for run_id in runs {
            let run_jobs_key = keys::workflow_run_jobs(workflow_id, &run_id);
            for job_id in self.store.list_range(&run_jobs_key).await? {
                let owned_branch = self
                    .store
                    .hash_get(&keys::job_data(&job_id), "branch_id")
                    .await?;
                if owned_branch.as_deref() != Some(branch_id) {
                    continue;
                }

                // Refuse to delete a job that is mid-flight; its worker still
                // owns the hash.
                let status = self
                    .store
                    .hash_get(&keys::job_data(&job_id), "status")
                    .await?;
                if status.as_deref() == Some(JobStatus::Running.as_str()) {
                    tracing::warn!(job_id = %job_id, "skipping delete of running job");
                    continue;
                }

                self.store.delete(&keys::job_data(&job_id)).await?;
                self.store
                    .hash_delete(keys::SCHEDULER_JOB_PROGRESS, &job_id)
                    .await?;
                self.store.list_remove(&run_jobs_key, &job_id).await?;
            }
        }
        Ok(())
    }
}
