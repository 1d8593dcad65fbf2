//! Error types for the workflow crate.
//!
//! Per-job problems during workflow expansion (bad payload, missing slide
//! metadata) are tolerated and logged where they occur; only failures that
//! abort a whole operation surface here.

use fairway_store::StoreError;
use std::fmt;

/// Errors from workflow execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutionError {
    /// The workflow to execute does not exist.
    WorkflowNotFound { workflow_id: String },
    /// A state store operation failed.
    Store(StoreError),
}

impl fmt::Display for ExecutionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::WorkflowNotFound { workflow_id } => {
                write!(f, "workflow not found: {workflow_id}")
            }
            Self::Store(e) => write!(f, "store error: {e}"),
        }
    }
}

impl std::error::Error for ExecutionError {}

impl From<StoreError> for ExecutionError {
    fn from(e: StoreError) -> Self {
        Self::Store(e)
    }
}
