//! Fair-share scheduling runtime for the fairway workflow engine.
//!
//! One process runs a single admission [`Scheduler`] plus one [`UserWorker`]
//! per registered user, all coordinating exclusively through the state store:
//!
//! 1. The scheduler drains the global pending queue, admitting each job onto
//!    its owner's queue while capping the number of distinct users with
//!    running work, and deferring the rest back to the queue tail.
//! 2. Each user's worker drains that user's queue one job at a time, drives
//!    the job through its lifecycle, and maintains the running-job and
//!    active-user sets.
//! 3. [`status`] exposes a read-only aggregate of the whole picture.

pub mod config;
pub mod control;
pub mod pool;
pub mod scheduler;
pub mod status;
pub mod worker;

pub use config::SchedulerConfig;
pub use control::SchedulerState;
pub use pool::WorkerPool;
pub use scheduler::Scheduler;
pub use status::GlobalStatus;
pub use worker::UserWorker;
