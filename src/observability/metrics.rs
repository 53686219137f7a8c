//! Metrics collection and exposition.
//!
//! # Responsibilities
//! - Count requests, errors and latency per logical endpoint
//! - Expose Prometheus-compatible text for the `/metrics` endpoint
//!
//! # Metrics
//! - `http_requests_total` (counter): requests by method, endpoint, status
//! - `http_request_latency_seconds` (histogram): latency by endpoint
//! - `http_error_total` (counter): responses with status >= 400 by endpoint, status
//!
//! # Design Decisions
//! - Low-overhead metric updates (atomic operations in the exporter's storage)
//! - The recorder is owned by one aggregator instance, not installed
//!   globally, and shared by `Arc`
//! - Endpoint labels are route templates; unmatched paths collapse into
//!   [`UNKNOWN_ENDPOINT`] to keep label cardinality bounded

use metrics::{counter, describe_counter, describe_histogram, histogram, Unit};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle, PrometheusRecorder};

use crate::config::validation::check_buckets;
use crate::error::MetricsError;

pub const REQUESTS_TOTAL: &str = "http_requests_total";
pub const REQUEST_LATENCY_SECONDS: &str = "http_request_latency_seconds";
pub const ERRORS_TOTAL: &str = "http_error_total";

/// Endpoint label used when no route matched the request.
pub const UNKNOWN_ENDPOINT: &str = "unknown";

/// Process-wide request metrics.
pub struct MetricsAggregator {
    recorder: PrometheusRecorder,
    handle: PrometheusHandle,
}

impl MetricsAggregator {
    /// Create an aggregator whose latency histogram uses `buckets` (seconds).
    pub fn new(buckets: &[f64]) -> Result<Self, MetricsError> {
        check_buckets(buckets).map_err(MetricsError::Buckets)?;

        let recorder = PrometheusBuilder::new()
            .set_buckets_for_metric(Matcher::Full(REQUEST_LATENCY_SECONDS.to_string()), buckets)
            .map_err(|e| MetricsError::Buckets(e.to_string()))?
            .build_recorder();

        Ok(Self::from_recorder(recorder))
    }

    fn from_recorder(recorder: PrometheusRecorder) -> Self {
        metrics::with_local_recorder(&recorder, || {
            describe_counter!(REQUESTS_TOTAL, "Total HTTP requests");
            describe_histogram!(
                REQUEST_LATENCY_SECONDS,
                Unit::Seconds,
                "Latency of HTTP requests"
            );
            describe_counter!(ERRORS_TOTAL, "Total HTTP errors");
        });

        let handle = recorder.handle();
        Self { recorder, handle }
    }

    /// Count one completed request.
    pub fn record_request(&self, method: &str, endpoint: &str, status: u16) {
        metrics::with_local_recorder(&self.recorder, || {
            counter!(
                REQUESTS_TOTAL,
                "method" => method.to_owned(),
                "endpoint" => endpoint.to_owned(),
                "status" => status.to_string()
            )
            .increment(1);
        });
    }

    /// Add one latency observation.
    pub fn record_latency(&self, endpoint: &str, seconds: f64) {
        metrics::with_local_recorder(&self.recorder, || {
            histogram!(REQUEST_LATENCY_SECONDS, "endpoint" => endpoint.to_owned()).record(seconds);
        });
    }

    /// Count one error response. Statuses below 400 are ignored.
    pub fn record_error(&self, endpoint: &str, status: u16) {
        if status < 400 {
            return;
        }
        metrics::with_local_recorder(&self.recorder, || {
            counter!(
                ERRORS_TOTAL,
                "endpoint" => endpoint.to_owned(),
                "status" => status.to_string()
            )
            .increment(1);
        });
    }

    /// Render all families in the Prometheus text exposition format.
    pub fn snapshot(&self) -> String {
        self.handle.render()
    }
}

impl std::fmt::Debug for MetricsAggregator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MetricsAggregator").finish_non_exhaustive()
    }
}
