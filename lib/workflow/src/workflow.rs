//! Workflow metadata management.
//!
//! A workflow is a named collection of branches owned by one user. Creating a
//! workflow auto-creates its default branch; deleting one cascades through
//! branches, runs, and the job instances those runs produced.

use crate::branch::BranchManager;
use fairway_store::{SharedStore, StoreError, keys};
use serde::Serialize;
use std::collections::HashMap;

/// Branch every workflow starts with.
pub const DEFAULT_BRANCH: &str = "default";

/// Workflow metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WorkflowRecord {
    pub workflow_id: String,
    pub name: String,
    pub owner_user_id: String,
    pub entry_branch: String,
}

impl WorkflowRecord {
    fn from_fields(workflow_id: &str, fields: &HashMap<String, String>) -> Option<Self> {
        if fields.is_empty() {
            return None;
        }
        let text = |field: &str| fields.get(field).cloned().unwrap_or_default();
        Some(Self {
            workflow_id: workflow_id.to_string(),
            name: text("name"),
            owner_user_id: text("owner_user_id"),
            entry_branch: text("entry_branch"),
        })
    }
}

/// Manages workflow metadata in the store.
#[derive(Clone)]
pub struct WorkflowManager {
    store: SharedStore,
    branches: BranchManager,
}

impl WorkflowManager {
    /// Creates a manager over the shared store.
    #[must_use]
    pub fn new(store: SharedStore) -> Self {
        let branches = BranchManager::new(store.clone());
        Self { store, branches }
    }

    /// Creates a workflow with its default branch. Returns false if the id is
    /// already taken.
    ///
    /// # Errors
    ///
    /// Returns an error if a store operation fails.
    pub async fn create(
        &self,
        workflow_id: &str,
        name: &str,
        owner_user_id: &str,
    ) -> Result<bool, StoreError> {
        if self.store.exists(&keys::workflow(workflow_id)).await? {
            return Ok(false);
        }

        self.store
            .hash_set_many(
                &keys::workflow(workflow_id),
                &[
                    ("workflow_id", workflow_id.to_string()),
                    ("name", name.to_string()),
                    ("owner_user_id", owner_user_id.to_string()),
                    ("entry_branch", DEFAULT_BRANCH.to_string()),
                ],
            )
            .await?;
        self.store.set_add(keys::WORKFLOWS, workflow_id).await?;
        self.branches.create(workflow_id, DEFAULT_BRANCH).await?;

        tracing::info!(workflow_id, owner = owner_user_id, "created workflow");
        Ok(true)
    }

    /// Returns true if the workflow exists.
    ///
    /// # Errors
    ///
    /// Returns an error if a store operation fails.
    pub async fn exists(&self, workflow_id: &str) -> Result<bool, StoreError> {
        self.store.set_contains(keys::WORKFLOWS, workflow_id).await
    }

    /// Fetches workflow metadata.
    ///
    /// # Errors
    ///
    /// Returns an error if a store operation fails.
    pub async fn get(&self, workflow_id: &str) -> Result<Option<WorkflowRecord>, StoreError> {
        let fields = self.store.hash_get_all(&keys::workflow(workflow_id)).await?;
        Ok(WorkflowRecord::from_fields(workflow_id, &fields))
    }

    /// Lists all workflows.
    ///
    /// # Errors
    ///
    /// Returns an error if a store operation fails.
    pub async fn list(&self) -> Result<Vec<WorkflowRecord>, StoreError> {
        let mut records = Vec::new();
        for workflow_id in self.store.set_members(keys::WORKFLOWS).await? {
            if let Some(record) = self.get(&workflow_id).await? {
                records.push(record);
            }
        }
        Ok(records)
    }

    /// Lists the workflows owned by one user.
    ///
    /// # Errors
    ///
    /// Returns an error if a store operation fails.
    pub async fn list_by_user(&self, user_id: &str) -> Result<Vec<WorkflowRecord>, StoreError> {
        let all = self.list().await?;
        Ok(all
            .into_iter()
            .filter(|record| record.owner_user_id == user_id)
            .collect())
    }

    /// Deletes a workflow and everything under it: branches with their spec
    /// lists and executed jobs, run bookkeeping, and the metadata hash.
    /// Returns false if the workflow did not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if a store operation fails.
    pub async fn delete(&self, workflow_id: &str) -> Result<bool, StoreError> {
        let removed = self.store.set_remove(keys::WORKFLOWS, workflow_id).await?;
        if !removed {
            return Ok(false);
        }

        for branch_id in self.branches.list(workflow_id).await? {
            self.branches.delete(workflow_id, &branch_id).await?;
        }

        // Branch cascade removes the jobs; drop what is left of the run
        // bookkeeping afterwards.
        for run_id in self.store.set_members(&keys::workflow_runs(workflow_id)).await? {
            self.store
                .delete(&keys::workflow_run_jobs(workflow_id, &run_id))
                .await?;
        }
        self.store.delete(&keys::workflow_runs(workflow_id)).await?;
        self.store.delete(&keys::workflow_branches(workflow_id)).await?;
        self.store.delete(&keys::workflow(workflow_id)).await?;

        tracing::info!(workflow_id, "deleted workflow");
        Ok(true)
    }
}
