//! Error types shared across subsystems.
//!
//! Each concern owns one enum. None of them ever crosses the request path:
//! probe failures collapse into a `HealthResult`, logging failures are
//! swallowed by the subscriber, and configuration errors only surface at
//! startup.

use std::time::Duration;

use crate::config::validation::ValidationError;

/// Error type for configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid value for {var}: {value:?} ({reason})")]
    InvalidEnv {
        var: &'static str,
        value: String,
        reason: String,
    },

    #[error("Validation failed: {}", join(.0))]
    Validation(Vec<ValidationError>),
}

fn join(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Error type for metrics aggregator construction.
#[derive(Debug, thiserror::Error)]
pub enum MetricsError {
    #[error("Invalid histogram buckets: {0}")]
    Buckets(String),
}

/// Error type for a single liveness probe.
#[derive(Debug, thiserror::Error)]
pub enum ProbeError {
    #[error("connection unavailable: {0}")]
    Connect(String),

    #[error("liveness query failed: {0}")]
    Query(String),

    #[error("probe timed out after {0:?}")]
    Timeout(Duration),
}

/// Error type for the HTTP server.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("Failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Server error: {0}")]
    Serve(#[from] std::io::Error),
}

/// Error type for subsystem initialization.
#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error(transparent)]
    Metrics(#[from] MetricsError),

    #[error("Invalid database configuration: {0}")]
    Database(#[from] sqlx::Error),
}
