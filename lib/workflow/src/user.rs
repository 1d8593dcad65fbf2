//! User registration and cascade deletion.
//!
//! Users are opaque client-supplied ids. Registration is idempotent; deletion
//! tears down everything the user owns: workflows (with their branches, runs,
//! and executed jobs), the per-user queue, slide metadata, and any scheduler
//! bookkeeping entries.

use crate::slide::SlideManager;
use crate::workflow::WorkflowManager;
use fairway_store::{SharedStore, StoreError, keys};

/// Manages user registration in the store.
#[derive(Clone)]
pub struct UserManager {
    store: SharedStore,
    workflows: WorkflowManager,
    slides: SlideManager,
}

impl UserManager {
    /// Creates a manager over the shared store.
    #[must_use]
    pub fn new(store: SharedStore) -> Self {
        let workflows = WorkflowManager::new(store.clone());
        let slides = SlideManager::new(store.clone());
        Self {
            store,
            workflows,
            slides,
        }
    }

    /// Registers a user. Returns false if the user already existed. The
    /// status field is only seeded when absent so re-registration cannot
    /// clobber a running user's state.
    ///
    /// # Errors
    ///
    /// Returns an error if a store operation fails.
    pub async fn register(&self, user_id: &str) -> Result<bool, StoreError> {
        let added = self.store.set_add(keys::USERS, user_id).await?;

        let user_key = keys::user(user_id);
        if self.store.hash_get(&user_key, "status").await?.is_none() {
            self.store.hash_set(&user_key, "status", "idle").await?;
        }

        if added {
            tracing::info!(user_id, "registered user");
        }
        Ok(added)
    }

    /// Returns true if the user is registered.
    ///
    /// # Errors
    ///
    /// Returns an error if a store operation fails.
    pub async fn is_registered(&self, user_id: &str) -> Result<bool, StoreError> {
        self.store.set_contains(keys::USERS, user_id).await
    }

    /// Lists all registered user ids.
    ///
    /// # Errors
    ///
    /// Returns an error if a store operation fails.
    pub async fn list(&self) -> Result<Vec<String>, StoreError> {
        self.store.set_members(keys::USERS).await
    }

    /// Returns the user's status (`idle` or `running`), if registered.
    ///
    /// # Errors
    ///
    /// Returns an error if a store operation fails.
    pub async fn status(&self, user_id: &str) -> Result<Option<String>, StoreError> {
        self.store.hash_get(&keys::user(user_id), "status").await
    }

    /// Deletes a user and cascades through everything they own. Returns false
    /// if the user was not registered.
    ///
    /// # Errors
    ///
    /// Returns an error if a store operation fails.
    pub async fn delete(&self, user_id: &str) -> Result<bool, StoreError> {
        let removed = self.store.set_remove(keys::USERS, user_id).await?;
        if !removed {
            return Ok(false);
        }

        for workflow in self.workflows.list_by_user(user_id).await? {
            self.workflows.delete(&workflow.workflow_id).await?;
        }

        for slide in self.slides.list_for_user(user_id).await? {
            self.slides.delete(&slide.slide_id).await?;
        }
        self.store.delete(&keys::user_slides(user_id)).await?;

        self.store.delete(&keys::user_queue(user_id)).await?;
        self.store
            .set_remove(keys::SCHEDULER_ACTIVE_USERS, user_id)
            .await?;
        self.store.set_remove(keys::ACTIVE_USERS, user_id).await?;
        self.store.delete(&keys::user(user_id)).await?;

        tracing::info!(user_id, "deleted user");
        Ok(true)
    }
}
