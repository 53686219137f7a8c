//! Health checking subsystem.
//!
//! # Data Flow
//! ```text
//! GET /health
//!     → probe.rs (HealthProbe::check)
//!     → LivenessTarget::ping (database.rs: pooled connection + SELECT 1)
//!     → HealthResult { ok, detail }
//!     → handler maps ok to 200 / 500
//! ```
//!
//! # Design Decisions
//! - Every check is fresh; nothing is cached between calls
//! - The probe never produces HTTP responses itself
//! - Failure detail is logged, never returned to clients

pub mod database;
pub mod probe;

pub use probe::{HealthProbe, HealthResult, LivenessTarget};
