//! Branch loan service.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client Request
//!     ──────────────▶ listener ──▶ instrumentation ──▶ timeout ──▶ handler
//!                                   │  correlation context (task-local)
//!                                   │  JSON logs enriched with request_id
//!                                   ▼
//!                              MetricsAggregator ──▶ GET /metrics
//!
//!     GET /health ──▶ HealthProbe ──▶ PgPool (SELECT 1)
//! ```
//!
//! Configuration comes from an optional TOML file overlaid with the
//! `ENV`, `LOG_LEVEL`, `PORT` and `DATABASE_URL` environment variables.

use std::path::PathBuf;

use clap::Parser;

use branch_loans::config::load_config;
use branch_loans::lifecycle::startup::build_state;
use branch_loans::observability::logging;
use branch_loans::{HttpServer, Shutdown};

#[derive(Parser)]
#[command(name = "branch-loans")]
#[command(about = "Branch loan service", long_about = None)]
struct Args {
    /// Optional TOML configuration file.
    #[arg(short, long, env = "CONFIG_PATH")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config = load_config(args.config.as_deref())?;
    logging::init(config.observability.log_level)?;

    tracing::info!(
        environment = %config.environment,
        bind_address = %config.server.bind_address(),
        log_level = %config.observability.log_level,
        "branch-loans v{} starting",
        env!("CARGO_PKG_VERSION")
    );

    let state = build_state(&config)?;
    let listener = HttpServer::bind(&config.server).await?;

    let shutdown = Shutdown::new();
    shutdown.trigger_on_signal();

    let server = HttpServer::new(config, state);
    server.run(listener, shutdown.subscribe()).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
