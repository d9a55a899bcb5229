//! FastPaze server binary.
//!
//! # Architecture Overview
//!
//! ```text
//!     Client Request
//!     ──────────────▶ net::Listener ──▶ http::server ──▶ middleware pipeline
//!                     (concurrency,     (request ID,     (logging, cors,
//!                      keep-alive)       timeouts)        rate_limiter)
//!                                                               │
//!                                                               ▼
//!     Client Response                                    http::dispatcher
//!     ◀────────────── JSON envelope ◀── template ◀──── routing::registry
//! ```
//!
//! Usage: `fastpaze --config fastpaze.toml [--port 8080] [--log-level debug]`

use std::path::PathBuf;

use clap::Parser;

use fastpaze::config::{load_config, EngineConfig, ServerConfigUpdate};
use fastpaze::observability::{logging, metrics, LogLevel};
use fastpaze::Engine;

#[derive(Parser)]
#[command(name = "fastpaze")]
#[command(about = "Declarative HTTP routing engine", long_about = None)]
struct Cli {
    /// TOML config file with server settings, routes, middleware and dependencies
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Listen port (`8080`, `:8080` or `host:port`); overrides the config file
    #[arg(short, long)]
    port: Option<String>,

    /// Log level (debug, info, warn, error); overrides the config file
    #[arg(short, long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => EngineConfig::default(),
    };

    let level_name = cli
        .log_level
        .as_deref()
        .unwrap_or(&config.observability.log_level);
    let level = level_name.parse::<LogLevel>().unwrap_or_default();
    logging::init(level);
    config.observability.log_level = level.to_string();

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        filter = logging::active_filter().as_deref().unwrap_or("none"),
        "fastpaze starting"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let engine = Engine::from_config(&config);
    if let Some(port) = cli.port {
        engine.set_server_config(ServerConfigUpdate {
            port: Some(port),
            ..Default::default()
        });
    }

    if engine.registry().is_empty() {
        tracing::warn!("No routes registered, every request will return 404");
    }

    engine.start_server().await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
