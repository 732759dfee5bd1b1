//! PostgreSQL database service and helpers.

pub mod db_service;
pub mod repository_ext;

pub use db_service::{create_pool, create_pool_with_options, DatabaseService, MIGRATOR};
pub use repository_ext::RepositoryErrorExt;
