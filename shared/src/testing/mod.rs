//! Test support: entity factories with realistic defaults.

pub mod factories;

pub use factories::{PolicyFactory, ProfileFactory, SubjectFactory};
