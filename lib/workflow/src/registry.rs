//! Job template registry and handler protocol.
//!
//! A handler is the unit of reusable work: an async routine invoked with the
//! job's context and decoded payload. The registry is assembled once during
//! startup and immutable afterwards; workers resolve templates by name at
//! dispatch time, and an unknown template fails the job permanently.

use crate::manager::JobManager;
use crate::progress::ProgressUpdate;
use async_trait::async_trait;
use fairway_core::JobId;
use fairway_store::StoreError;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Error raised by a job handler.
///
/// Formats as `<kind>: <message>`, which is what lands in the job's
/// `progress_message` and error output when the handler fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandlerError {
    kind: String,
    message: String,
}

impl HandlerError {
    /// Creates an error with an explicit kind.
    #[must_use]
    pub fn new(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            message: message.into(),
        }
    }

    /// A payload that is missing required keys or holds the wrong shapes.
    #[must_use]
    pub fn invalid_payload(message: impl Into<String>) -> Self {
        Self::new("InvalidPayload", message)
    }

    /// Returns the error kind.
    #[must_use]
    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// Returns the error message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for HandlerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

impl std::error::Error for HandlerError {}

/// Context a handler runs under.
///
/// Carries the job identity and the progress interface, so handlers report
/// progress through the engine instead of reaching for module globals.
/// Cloneable so CPU-bound handlers can hand it to background work.
#[derive(Clone)]
pub struct JobContext {
    job_id: JobId,
    user_id: String,
    jobs: JobManager,
}

impl JobContext {
    /// Creates a context for one job invocation.
    #[must_use]
    pub fn new(job_id: JobId, user_id: impl Into<String>, jobs: JobManager) -> Self {
        Self {
            job_id,
            user_id: user_id.into(),
            jobs,
        }
    }

    /// The job being executed.
    #[must_use]
    pub fn job_id(&self) -> JobId {
        self.job_id
    }

    /// The user owning the job.
    #[must_use]
    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    /// Records a progress update for this job.
    ///
    /// Safe to call concurrently from within the handler; each call writes
    /// its fields independently and the last writer wins per field.
    ///
    /// # Errors
    ///
    /// Returns an error if the store write fails.
    pub async fn update_progress(&self, update: ProgressUpdate) -> Result<(), StoreError> {
        self.jobs.update_progress(&self.job_id, update).await
    }
}

/// An async job template implementation.
///
/// Handlers are invoked concurrently from different user workers and must not
/// share implicit state. CPU- or IO-heavy inner loops should offload to a
/// blocking thread and report progress back through the (thread-safe) context.
#[async_trait]
pub trait JobHandler: Send + Sync {
    /// Executes the job. The returned object becomes the job's output payload.
    async fn run(
        &self,
        ctx: &JobContext,
        payload: Map<String, Value>,
    ) -> Result<Map<String, Value>, HandlerError>;
}

/// Write-once table from template name to handler.
pub struct JobRegistry {
    handlers: HashMap<String, Arc<dyn JobHandler>>,
}

impl JobRegistry {
    /// Starts building a registry.
    #[must_use]
    pub fn builder() -> JobRegistryBuilder {
        JobRegistryBuilder {
            handlers: HashMap::new(),
        }
    }

    /// Resolves a template by name.
    #[must_use]
    pub fn get(&self, template_id: &str) -> Option<Arc<dyn JobHandler>> {
        self.handlers.get(template_id).cloned()
    }

    /// Returns true if the template is registered.
    #[must_use]
    pub fn contains(&self, template_id: &str) -> bool {
        self.handlers.contains_key(template_id)
    }

    /// Returns the registered template names, sorted.
    #[must_use]
    pub fn template_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.handlers.keys().cloned().collect();
        names.sort();
        names
    }
}

/// Builder consumed into an immutable [`JobRegistry`] at startup.
pub struct JobRegistryBuilder {
    handlers: HashMap<String, Arc<dyn JobHandler>>,
}

impl JobRegistryBuilder {
    /// Registers a handler under a template name. Re-registering a name
    /// replaces the earlier handler.
    #[must_use]
    pub fn register(mut self, template_id: impl Into<String>, handler: Arc<dyn JobHandler>) -> Self {
        let template_id = template_id.into();
        tracing::info!(template = %template_id, "registered job template");
        self.handlers.insert(template_id, handler);
        self
    }

    /// Finalizes the registry.
    #[must_use]
    pub fn build(self) -> JobRegistry {
        JobRegistry {
            handlers: self.handlers,
        }
    }
}
