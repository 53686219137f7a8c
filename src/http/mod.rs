//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, layers)
//!     → middleware.rs (correlation context, metrics, completion log)
//!     → handlers.rs (/health, /metrics) or caller-supplied routes
//!     → response (x-request-id attached)
//! ```

pub mod handlers;
pub mod middleware;
pub mod server;

pub use server::{AppState, HttpServer};

/// Response header carrying the correlation token.
pub const X_REQUEST_ID: &str = "x-request-id";
