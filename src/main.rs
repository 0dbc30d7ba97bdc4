//! Card-scanning API gateway.
//!
//! # Architecture Overview
//!
//! ```text
//!     Device request
//!     ─────────────▶ TraceLayer + request id
//!                        │
//!                        ▼
//!                  attestation ── 403 ──▶
//!                        │
//!                        ▼
//!                  rate limiter ── 429 / 500 ──▶      ┌──────────────────┐
//!                        │                         ┌─▶│ Upstash / memory │
//!                        ▼                         │  └──────────────────┘
//!                  body validation ── 400 ──▶      │
//!                        │                         │
//!                        ▼                         │
//!                  handler ── website? ──▶ SafeFetcher (SSRF guard, DNS pinning)
//!                        │
//!                        ▼
//!                  completion backend ── 500 ──▶
//!                        │
//!     ◀──────────── JSON response
//! ```

use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use cardscan_gateway::config::loader::{load_config, load_default};
use cardscan_gateway::observability::{logging, metrics};
use cardscan_gateway::{HttpServer, Shutdown};

#[derive(Parser)]
#[command(name = "cardscan-gateway", version)]
#[command(about = "Attestation and abuse-control gateway for the card scanning API")]
struct Args {
    /// TOML configuration file. Defaults plus environment when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => load_config(path)?,
        None => load_default()?,
    };

    logging::init(&config.observability);
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "cardscan-gateway starting");

    tracing::info!(
        bind_address = %config.listener.bind_address,
        attestation_mode = ?config.attestation.mode,
        rate_limit = config.rate_limit.limit,
        window_secs = config.rate_limit.window_secs,
        request_timeout_secs = config.timeouts.request_secs,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(e) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                error = %e,
                "Failed to parse metrics address"
            ),
        }
    }

    let shutdown = Shutdown::new();
    let tls = config.listener.tls.clone();
    let bind_address = config.listener.bind_address.clone();
    let server = HttpServer::new(config)?;

    match tls {
        Some(tls) => {
            let addr = bind_address.parse()?;
            server.run_tls(addr, &tls, shutdown.subscribe()).await?;
        }
        None => {
            let listener = TcpListener::bind(&bind_address).await?;
            tracing::info!(address = %listener.local_addr()?, "Listening for connections");
            server.run(listener, shutdown.subscribe()).await?;
        }
    }

    // Stops background tasks still holding a receiver.
    shutdown.trigger();
    tracing::info!("Shutdown complete");
    Ok(())
}
