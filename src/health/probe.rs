//! Dependency liveness probe.
//!
//! # Responsibilities
//! - Exercise a live dependency with a trivial query on demand
//! - Collapse every failure into a `HealthResult` and log it at ERROR
//!
//! # Design Decisions
//! - The dependency sits behind [`LivenessTarget`] so the probe can be
//!   driven by fakes in tests
//! - Each check is bounded by a timeout; dropping the in-flight ping
//!   releases whatever connection it held

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;

use crate::error::ProbeError;

/// A dependency that can be pinged for liveness.
#[async_trait]
pub trait LivenessTarget: Send + Sync {
    /// Acquire a scoped connection, run a trivial query, release it.
    async fn ping(&self) -> Result<(), ProbeError>;

    /// Short name used in log records.
    fn name(&self) -> &'static str {
        "dependency"
    }
}

/// Outcome of one probe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HealthResult {
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl HealthResult {
    pub fn healthy() -> Self {
        Self { ok: true, detail: None }
    }

    pub fn unhealthy(detail: impl Into<String>) -> Self {
        Self {
            ok: false,
            detail: Some(detail.into()),
        }
    }
}

/// On-demand liveness probe over one dependency.
#[derive(Clone)]
pub struct HealthProbe {
    target: Arc<dyn LivenessTarget>,
    timeout: Duration,
}

impl HealthProbe {
    pub fn new(target: Arc<dyn LivenessTarget>, timeout: Duration) -> Self {
        Self { target, timeout }
    }

    /// Run one fresh liveness check.
    pub async fn check(&self) -> HealthResult {
        let outcome = match tokio::time::timeout(self.timeout, self.target.ping()).await {
            Ok(result) => result,
            Err(_) => Err(ProbeError::Timeout(self.timeout)),
        };

        match outcome {
            Ok(()) => {
                tracing::info!(dependency = self.target.name(), "Health check OK");
                HealthResult::healthy()
            }
            Err(e) => {
                tracing::error!(
                    dependency = self.target.name(),
                    error = %e,
                    "Health check failed"
                );
                HealthResult::unhealthy(e.to_string())
            }
        }
    }
}

impl std::fmt::Debug for HealthProbe {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HealthProbe")
            .field("target", &self.target.name())
            .field("timeout", &self.timeout)
            .finish()
    }
}
