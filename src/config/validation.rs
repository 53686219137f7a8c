//! Configuration validation.
//!
//! Semantic checks only; serde already rejected malformed input. Every
//! problem is reported, not just the first.

use std::fmt;

use crate::config::schema::AppConfig;

/// A single semantic problem in a loaded configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Validate a configuration, collecting every error found.
pub fn validate_config(config: &AppConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.server.port == 0 {
        errors.push(ValidationError::new("server.port", "must be non-zero"));
    }
    if config.server.request_timeout_secs == 0 {
        errors.push(ValidationError::new(
            "server.request_timeout_secs",
            "must be non-zero",
        ));
    }
    if config.database.url.trim().is_empty() {
        errors.push(ValidationError::new("database.url", "must not be empty"));
    }
    if config.database.max_connections == 0 {
        errors.push(ValidationError::new(
            "database.max_connections",
            "must be non-zero",
        ));
    }
    if config.database.acquire_timeout_ms == 0 {
        errors.push(ValidationError::new(
            "database.acquire_timeout_ms",
            "must be non-zero",
        ));
    }
    if let Err(message) = check_buckets(&config.observability.latency_buckets) {
        errors.push(ValidationError::new("observability.latency_buckets", message));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Histogram bounds must be finite, positive and strictly increasing.
pub fn check_buckets(buckets: &[f64]) -> Result<(), String> {
    if buckets.is_empty() {
        return Err("must contain at least one bound".to_string());
    }
    if let Some(bad) = buckets.iter().find(|b| !b.is_finite() || **b <= 0.0) {
        return Err(format!("bound {bad} is not a positive finite number"));
    }
    if buckets.windows(2).any(|w| w[0] >= w[1]) {
        return Err("bounds must be strictly increasing".to_string());
    }
    Ok(())
}
