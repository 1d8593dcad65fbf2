//! Scheduling runtime configuration.

use serde::Deserialize;
use std::time::Duration;

/// Tunables for the scheduler loop and the user workers.
#[derive(Debug, Clone, Deserialize)]
pub struct SchedulerConfig {
    /// Maximum number of distinct users owning RUNNING jobs at once.
    #[serde(default = "default_max_active_users")]
    pub max_active_users: usize,

    /// Blocking-pop timeout on the global pending queue, in milliseconds.
    /// Bounds how quickly the scheduler notices a pause request.
    #[serde(default = "default_pop_timeout_ms")]
    pub pop_timeout_ms: u64,

    /// Sleep after deferring a job, in milliseconds. Avoids tight cycling
    /// when the head of the queue keeps hitting the cap.
    #[serde(default = "default_defer_sleep_ms")]
    pub defer_sleep_ms: u64,

    /// Worker sleep when its queue is empty, in milliseconds.
    #[serde(default = "default_worker_idle_sleep_ms")]
    pub worker_idle_sleep_ms: u64,

    /// Scheduler sleep while paused, in milliseconds.
    #[serde(default = "default_paused_sleep_ms")]
    pub paused_sleep_ms: u64,
}

fn default_max_active_users() -> usize {
    3
}

fn default_pop_timeout_ms() -> u64 {
    1_000
}

fn default_defer_sleep_ms() -> u64 {
    200
}

fn default_worker_idle_sleep_ms() -> u64 {
    500
}

fn default_paused_sleep_ms() -> u64 {
    500
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            max_active_users: default_max_active_users(),
            pop_timeout_ms: default_pop_timeout_ms(),
            defer_sleep_ms: default_defer_sleep_ms(),
            worker_idle_sleep_ms: default_worker_idle_sleep_ms(),
            paused_sleep_ms: default_paused_sleep_ms(),
        }
    }
}

impl SchedulerConfig {
    /// Blocking-pop timeout on the pending queue.
    #[must_use]
    pub fn pop_timeout(&self) -> Duration {
        Duration::from_millis(self.pop_timeout_ms)
    }

    /// Sleep after deferring a job.
    #[must_use]
    pub fn defer_sleep(&self) -> Duration {
        Duration::from_millis(self.defer_sleep_ms)
    }

    /// Worker sleep on an empty queue.
    #[must_use]
    pub fn worker_idle_sleep(&self) -> Duration {
        Duration::from_millis(self.worker_idle_sleep_ms)
    }

    /// Scheduler sleep while paused.
    #[must_use]
    pub fn paused_sleep(&self) -> Duration {
        Duration::from_millis(self.paused_sleep_ms)
    }
}
