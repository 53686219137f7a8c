//! PostgreSQL liveness target.

use std::time::Duration;

use async_trait::async_trait;
use sqlx::postgres::{PgPool, PgPoolOptions};

use crate::config::DatabaseConfig;
use crate::error::ProbeError;
use crate::health::probe::LivenessTarget;

/// Build the connection pool without connecting.
///
/// The service must come up even while the database is down, so no
/// connection is attempted until the first probe.
pub fn lazy_pool(config: &DatabaseConfig) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(config.max_connections)
        .acquire_timeout(Duration::from_millis(config.acquire_timeout_ms))
        .connect_lazy(&config.url)
}

#[async_trait]
impl LivenessTarget for PgPool {
    async fn ping(&self) -> Result<(), ProbeError> {
        // Returned to the pool when dropped, on every path out of here.
        let mut conn = self
            .acquire()
            .await
            .map_err(|e| ProbeError::Connect(e.to_string()))?;

        sqlx::query("SELECT 1")
            .execute(&mut *conn)
            .await
            .map_err(|e| ProbeError::Query(e.to_string()))?;

        Ok(())
    }

    fn name(&self) -> &'static str {
        "postgres"
    }
}
