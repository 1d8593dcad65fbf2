//! Scheduler control state.
//!
//! A single store key toggles admission. Pausing stops the scheduler from
//! pulling new work; workers keep draining their queues until empty, and
//! in-flight jobs are never interrupted.

use fairway_store::{StateStore, StoreError, keys};
use std::fmt;

/// Admission state of the scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    /// Admitting jobs from the global pending queue.
    Running,
    /// Holding admission; queued work stays pending.
    Paused,
}

impl SchedulerState {
    /// Returns the wire form of the state.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Paused => "paused",
        }
    }

    /// Parses the wire form. Anything unrecognized reads as paused, the safe
    /// direction.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s {
            "running" => Self::Running,
            _ => Self::Paused,
        }
    }
}

impl fmt::Display for SchedulerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Reads the current scheduler state. An absent key reads as paused.
///
/// # Errors
///
/// Returns an error if the store read fails.
pub async fn current_state(store: &dyn StateStore) -> Result<SchedulerState, StoreError> {
    Ok(store
        .get(keys::SCHEDULER_STATE)
        .await?
        .map_or(SchedulerState::Paused, |raw| SchedulerState::parse(&raw)))
}

/// Writes the scheduler state.
///
/// # Errors
///
/// Returns an error if the store write fails.
pub async fn set_state(store: &dyn StateStore, state: SchedulerState) -> Result<(), StoreError> {
    store.put(keys::SCHEDULER_STATE, state.as_str()).await?;
    tracing::info!(state = %state, "scheduler state changed");
    Ok(())
}
