//! Core domain types for the fairway workflow engine.
//!
//! This crate provides the strongly-typed identifiers the engine generates
//! itself (job instances and workflow runs). Tenant-supplied identifiers
//! (users, workflows, branches, slides) stay opaque strings and never pass
//! through here.

pub mod id;

pub use id::{InvalidId, JobId, RunId};
