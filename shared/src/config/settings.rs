use serde::{Deserialize, Serialize};
use std::env;

use crate::shared::{AppError, AppResult};

/// Top-level settings assembled from the process environment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Server binding settings.
    pub server: ServerConfig,
    /// Database pool settings.
    pub database: DatabaseConfig,
    /// Logging settings.
    pub logging: LoggingConfig,
}

/// Server binding settings (consumed by the transport layer).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Bind host.
    pub host: String,
    /// Bind port.
    pub port: u16,
}

/// Database connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL.
    pub url: String,
    /// Maximum pool size.
    pub max_connections: u32,
    /// Minimum pool size.
    pub min_connections: u32,
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default tracing level when `RUST_LOG` is unset.
    pub level: String,
}

impl Settings {
    /// Load settings from the environment, applying `.env` first.
    pub fn from_env() -> Result<Self, config::ConfigError> {
        dotenv::dotenv().ok();

        let server = ServerConfig {
            host: env::var("SERVER_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: env::var("SERVER_PORT")
                .unwrap_or_else(|_| "4200".to_string())
                .parse()
                .unwrap_or(4200),
        };

        let database = DatabaseConfig {
            url: env::var("DATABASE_URL").map_err(|_| {
                config::ConfigError::NotFound("DATABASE_URL".to_string())
            })?,
            max_connections: env::var("DATABASE_MAX_CONNECTIONS")
                .unwrap_or_else(|_| "5".to_string())
                .parse()
                .unwrap_or(5),
            min_connections: env::var("DATABASE_MIN_CONNECTIONS")
                .unwrap_or_else(|_| "1".to_string())
                .parse()
                .unwrap_or(1),
        };

        let logging = LoggingConfig {
            level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
        };

        Ok(Settings {
            server,
            database,
            logging,
        })
    }

    /// Load settings, mapping failures into the application error type.
    pub fn load() -> AppResult<Self> {
        Self::from_env().map_err(|e| AppError::Configuration(e.to_string()))
    }
}
