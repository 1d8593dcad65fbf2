//! Progress reporting types.
//!
//! Handlers report local progress (0–100 on the job hash) and the engine
//! mirrors each update into the global progress hash as a self-describing
//! record the status surface can read without touching job hashes.

use crate::job::JobStatus;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One progress update emitted by a handler (or the worker lifecycle).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressUpdate {
    /// Local progress in percent (0–100).
    pub progress: u8,
    /// Human-readable message.
    pub message: String,
    /// Optional processing stage label.
    pub stage: Option<String>,
    /// Optional estimated seconds remaining.
    pub eta_seconds: Option<i64>,
    /// Optional step counts `(current, total)`; when present they take
    /// precedence over `progress` for the global percent.
    pub steps: Option<(u64, u64)>,
}

impl ProgressUpdate {
    /// Creates an update with progress and message.
    #[must_use]
    pub fn new(progress: u8, message: impl Into<String>) -> Self {
        Self {
            progress,
            message: message.into(),
            stage: None,
            eta_seconds: None,
            steps: None,
        }
    }

    /// Attaches a stage label.
    #[must_use]
    pub fn with_stage(mut self, stage: impl Into<String>) -> Self {
        self.stage = Some(stage.into());
        self
    }

    /// Attaches an ETA in seconds.
    #[must_use]
    pub fn with_eta(mut self, eta_seconds: i64) -> Self {
        self.eta_seconds = Some(eta_seconds);
        self
    }

    /// Attaches step counts.
    #[must_use]
    pub fn with_steps(mut self, current: u64, total: u64) -> Self {
        self.steps = Some((current, total));
        self
    }

    /// The global percent in `[0, 1]` this update resolves to.
    #[must_use]
    pub fn percent(&self) -> f64 {
        match self.steps {
            Some((current, total)) if total > 0 => current as f64 / total as f64,
            _ => f64::from(self.progress) / 100.0,
        }
    }
}

/// The globally visible progress record for one job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressRecord {
    pub job_id: String,
    pub user_id: String,
    pub status: JobStatus,
    /// Fraction complete in `[0, 1]`.
    pub percent: f64,
    pub message: String,
    pub stage: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub eta_seconds: Option<i64>,
    pub updated_at: DateTime<Utc>,
}

impl ProgressRecord {
    /// Encodes the record for the progress hash.
    #[must_use]
    pub fn encode(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| String::from("{}"))
    }

    /// Decodes a record from the progress hash.
    #[must_use]
    pub fn decode(raw: &str) -> Option<Self> {
        serde_json::from_str(raw).ok()
    }
}
