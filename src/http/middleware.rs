//! Request instrumentation middleware.
//!
//! # State Machine (per request)
//! ```text
//! Started   → context created, start instant captured
//! Handling  → downstream handler runs inside the context scope
//! Completed → status code and elapsed time known
//! Recorded  → MetricsAggregator updated (terminal)
//! ```
//!
//! # Design Decisions
//! - Recording happens in `Drop` of [`PendingRecord`], so it runs exactly
//!   once whether the handler returns, panics, or the request future is
//!   dropped mid-flight
//! - An unfinished request is recorded as 500
//! - The completion log line is emitted inside the context scope so it is
//!   enriched like any handler log

use std::sync::Arc;

use axum::{
    extract::{MatchedPath, Request, State},
    http::{HeaderValue, StatusCode},
    middleware::Next,
    response::Response,
};

use crate::http::X_REQUEST_ID;
use crate::observability::context::CorrelationContext;
use crate::observability::metrics::{MetricsAggregator, UNKNOWN_ENDPOINT};

/// Endpoint label for a request: the matched route template, or the
/// `unknown` sentinel.
pub fn endpoint_label(request: &Request) -> String {
    request
        .extensions()
        .get::<MatchedPath>()
        .map(|path| path.as_str().to_string())
        .unwrap_or_else(|| UNKNOWN_ENDPOINT.to_string())
}

/// Middleware function wrapping every request with correlation, logging
/// enrichment and metrics.
pub async fn instrument_request(
    State(metrics): State<Arc<MetricsAggregator>>,
    request: Request,
    next: Next,
) -> Response {
    let ctx = Arc::new(CorrelationContext::begin(&request));
    let endpoint = endpoint_label(&request);
    let pending = PendingRecord::new(metrics, ctx.clone(), endpoint);

    CorrelationContext::scope(ctx.clone(), async move {
        tracing::debug!("Request started");

        let mut response = next.run(request).await;
        pending.finish(response.status());

        if let Ok(value) = HeaderValue::from_str(&ctx.id().to_string()) {
            response.headers_mut().insert(X_REQUEST_ID, value);
        }
        response
    })
    .await
}

/// Metrics owed for one request, settled when dropped.
pub struct PendingRecord {
    metrics: Arc<MetricsAggregator>,
    ctx: Arc<CorrelationContext>,
    endpoint: String,
    status: Option<StatusCode>,
}

impl PendingRecord {
    pub fn new(metrics: Arc<MetricsAggregator>, ctx: Arc<CorrelationContext>, endpoint: String) -> Self {
        Self {
            metrics,
            ctx,
            endpoint,
            status: None,
        }
    }

    /// Settle with the observed response status.
    pub fn finish(mut self, status: StatusCode) {
        self.status = Some(status);
    }
}

impl Drop for PendingRecord {
    fn drop(&mut self) {
        let latency = self.ctx.elapsed();
        let completed = self.status.is_some();
        let status = self
            .status
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
            .as_u16();

        self.metrics
            .record_request(self.ctx.method(), &self.endpoint, status);
        self.metrics
            .record_latency(&self.endpoint, latency.as_secs_f64());
        if status >= 400 {
            self.metrics.record_error(&self.endpoint, status);
        }

        let latency_ms = latency.as_secs_f64() * 1_000.0;
        if !completed {
            tracing::warn!(
                endpoint = %self.endpoint,
                status,
                latency_ms,
                "Request aborted before completion"
            );
        } else if status >= 500 {
            tracing::error!(endpoint = %self.endpoint, status, latency_ms, "Request completed");
        } else {
            tracing::info!(endpoint = %self.endpoint, status, latency_ms, "Request completed");
        }
    }
}
