//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Inbound request
//!     → context.rs (correlation token + start instant, task-local)
//!     → logging.rs (every event enriched from the ambient context)
//!     → metrics.rs (count, latency, errors recorded once per request)
//!
//! Consumers:
//!     → stdout (one JSON object per line)
//!     → GET /metrics (Prometheus scrape)
//! ```
//!
//! # Design Decisions
//! - Structured logging (JSON) for machine parsing
//! - Request ID flows through every log line of a request
//! - Metrics are cheap (atomic increments)

pub mod context;
pub mod logging;
pub mod metrics;

pub use context::CorrelationContext;
pub use logging::{JsonLogFormat, LogRecord};
pub use metrics::MetricsAggregator;
