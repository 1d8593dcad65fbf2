//! HTTP surface for the fairway workflow engine.
//!
//! The server wires the store, registry, managers, scheduler loop, and
//! worker pool together and exposes CRUD plus control endpoints over axum.

pub mod config;
pub mod error;
pub mod routes;
pub mod state;
