//! Environment-driven configuration.

mod settings;

pub use settings::{DatabaseConfig, LoggingConfig, ServerConfig, Settings};
