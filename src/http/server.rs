//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum Router with the operational endpoints
//! - Merge in the domain routes supplied by the caller
//! - Wire up middleware (instrumentation, timeout, panic capture)
//! - Bind server to listener and serve until shutdown

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{http::StatusCode, middleware, routing::get, Router};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{catch_panic::CatchPanicLayer, timeout::TimeoutLayer};

use crate::config::{AppConfig, ServerConfig};
use crate::error::ServerError;
use crate::health::HealthProbe;
use crate::http::{handlers, middleware::instrument_request};
use crate::observability::MetricsAggregator;

/// Application state injected into handlers.
#[derive(Clone, Debug)]
pub struct AppState {
    pub metrics: Arc<MetricsAggregator>,
    pub probe: HealthProbe,
}

impl AppState {
    pub fn new(metrics: Arc<MetricsAggregator>, probe: HealthProbe) -> Self {
        Self { metrics, probe }
    }
}

/// HTTP server for the loan service.
pub struct HttpServer {
    router: Router,
    config: AppConfig,
}

impl HttpServer {
    /// Create a server exposing only the operational endpoints.
    pub fn new(config: AppConfig, state: AppState) -> Self {
        Self::with_routes(config, state, Router::new())
    }

    /// Create a server that also serves `routes`.
    ///
    /// `routes` carry their full paths (e.g. `/api/loans`) and are
    /// instrumented exactly like the built-in endpoints.
    pub fn with_routes(config: AppConfig, state: AppState, routes: Router) -> Self {
        let router = Self::build_router(&config.server, state, routes);
        Self { router, config }
    }

    /// Build the Axum router with all middleware layers.
    ///
    /// Layer order, outermost first: instrumentation, timeout, panic capture.
    pub fn build_router(config: &ServerConfig, state: AppState, routes: Router) -> Router {
        let metrics = state.metrics.clone();

        Router::new()
            .route("/health", get(handlers::health))
            .route("/metrics", get(handlers::metrics))
            .with_state(state)
            .merge(routes)
            .layer(CatchPanicLayer::new())
            .layer(TimeoutLayer::with_status_code(
                StatusCode::REQUEST_TIMEOUT,
                Duration::from_secs(config.request_timeout_secs),
            ))
            .layer(middleware::from_fn_with_state(metrics, instrument_request))
    }

    /// Bind a listener on the configured address.
    pub async fn bind(config: &ServerConfig) -> Result<TcpListener, ServerError> {
        let addr = config.bind_address();
        TcpListener::bind(&addr)
            .await
            .map_err(|source| ServerError::Bind { addr, source })
    }

    /// Run the server until `shutdown` fires.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), ServerError> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("HTTP server received shutdown signal");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// A clone of the fully layered router.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &AppConfig {
        &self.config
    }
}
