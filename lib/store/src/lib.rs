//! State store for the fairway workflow engine.
//!
//! All cross-component coordination (pending queue, per-user queues, running
//! and active sets, job hashes, progress records) flows through a single
//! key/value store with atomic string, list, set, and hash primitives.
//!
//! This crate provides:
//! - [`StateStore`]: the primitive operations every backend must offer
//! - [`MemoryStore`]: in-process backend for tests and single-node deployments
//! - [`RedisStore`]: Redis-backed production backend
//! - [`keys`]: the shared key layout
//! - [`schema`]: boot-time schema initialization

pub mod error;
pub mod keys;
pub mod memory;
pub mod redis;
pub mod schema;
pub mod store;

pub use error::StoreError;
pub use memory::MemoryStore;
pub use self::redis::RedisStore;
pub use store::{SharedStore, StateStore};
