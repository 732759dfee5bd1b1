//! Shared foundation for the workflow-builder backend.
//!
//! Carries the cross-cutting stack used by `abac-core` and
//! `workflow-core`: error and result types, configuration, the database
//! service, domain entities, repository contracts and their PostgreSQL
//! implementations.

pub mod config;
pub mod domain;
pub mod infrastructure;
pub mod shared;

#[cfg(test)]
pub mod testing;

pub use config::Settings;
pub use shared::*;
