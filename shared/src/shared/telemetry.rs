//! Tracing initialization.

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use crate::config::LoggingConfig;

/// Build a filter from a configured level string.
pub fn filter_from_level(level: &str) -> EnvFilter {
    EnvFilter::new(level)
}

/// Build the log filter: `RUST_LOG` wins when set, otherwise the
/// configured level applies.
pub fn build_filter(config: &LoggingConfig) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| filter_from_level(&config.level))
}

/// Install the global tracing subscriber.
///
/// JSON output is used when `json` is true (service deployments); plain
/// formatting otherwise.
pub fn init_tracing(config: &LoggingConfig, json: bool) {
    let registry = tracing_subscriber::registry().with(build_filter(config));
    if json {
        registry
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}
