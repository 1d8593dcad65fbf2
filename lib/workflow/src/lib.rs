//! Domain model and services for the fairway workflow engine.
//!
//! This crate provides everything between the raw state store and the
//! scheduling runtime:
//!
//! - **Job model**: [`JobStatus`], [`JobInstance`], hash encoding/decoding
//! - **Branches**: ordered [`JobSpec`] lists managed by [`BranchManager`]
//! - **Registry**: the [`JobHandler`] trait and the write-once [`JobRegistry`]
//! - **Lifecycle**: [`JobManager`] owns job state transitions and progress
//! - **Expansion**: [`ExecutionManager`] materializes workflows into jobs
//! - **Tenancy**: [`UserManager`], [`WorkflowManager`], [`SlideManager`]

pub mod branch;
pub mod error;
pub mod execution;
pub mod handlers;
pub mod job;
pub mod manager;
pub mod progress;
pub mod registry;
pub mod slide;
pub mod user;
pub mod workflow;

pub use branch::{BranchManager, JobSpec};
pub use error::ExecutionError;
pub use execution::{ExecutionManager, ExecutionReceipt};
pub use job::{JobInstance, JobStatus, NewJob};
pub use manager::JobManager;
pub use progress::{ProgressRecord, ProgressUpdate};
pub use registry::{HandlerError, JobContext, JobHandler, JobRegistry, JobRegistryBuilder};
pub use slide::{SlideManager, SlideRecord};
pub use user::UserManager;
pub use workflow::{WorkflowManager, WorkflowRecord, DEFAULT_BRANCH};
