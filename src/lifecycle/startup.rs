//! Subsystem initialization.

use std::sync::Arc;

use crate::config::AppConfig;
use crate::error::StartupError;
use crate::health::{database, HealthProbe};
use crate::http::AppState;
use crate::observability::MetricsAggregator;

/// Build the shared application state from a validated configuration.
///
/// Must be called inside a Tokio runtime; the database pool is created
/// lazily and no connection is attempted here.
pub fn build_state(config: &AppConfig) -> Result<AppState, StartupError> {
    let metrics = Arc::new(MetricsAggregator::new(
        &config.observability.latency_buckets,
    )?);

    let pool = database::lazy_pool(&config.database)?;
    let probe = HealthProbe::new(Arc::new(pool), config.database.probe_timeout());

    tracing::debug!(
        max_connections = config.database.max_connections,
        probe_timeout_ms = config.database.probe_timeout().as_millis() as u64,
        "Subsystems initialized"
    );

    Ok(AppState::new(metrics, probe))
}
