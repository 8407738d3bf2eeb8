//! docgate
//!
//! An HTTP gateway exposing a document database's resources as REST
//! endpoints, built with Tokio and Axum.
//!
//! # Architecture Overview
//!
//! ```text
//!                      ┌───────────────────────────────────────────────────┐
//!                      │                      DOCGATE                      │
//!                      │                                                   │
//!   Client Request     │  ┌─────────┐   ┌──────────────┐   ┌────────────┐  │
//!   ───────────────────┼─▶│  http   │──▶│   security   │──▶│    body    │  │
//!                      │  │ server  │   │  dispatcher  │   │  injector  │  │
//!                      │  └─────────┘   └──────────────┘   └─────┬──────┘  │
//!                      │                                        │         │
//!                      │                                        ▼         │
//!   Client Response    │  ┌─────────┐   ┌──────────────┐   ┌────────────┐  │
//!   ◀──────────────────┼──│exchange │◀──│  put / patch │◀──│  db props  │  │
//!                      │  │         │   │  / get db    │   │ + cache    │  │
//!                      │  └─────────┘   └──────┬───────┘   └────────────┘  │
//!                      │                       │                          │
//!                      │                       ▼                          │
//!                      │                ┌──────────────┐                  │
//!                      │                │   database   │                  │
//!                      │                └──────────────┘                  │
//!                      │                                                   │
//!                      │  Cross-cutting: config, observability, lifecycle  │
//!                      └───────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio::net::TcpListener;

use docgate::lifecycle::signals::shutdown_on_signal;
use docgate::lifecycle::startup::load_startup_config;
use docgate::observability::{logging, metrics};
use docgate::{HttpServer, InMemoryDatabase, Shutdown};

#[derive(Parser, Debug)]
#[command(name = "docgate", version, about = "HTTP gateway for document database resources")]
struct Args {
    /// Path to the TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config = load_startup_config(args.config.as_deref())?;
    logging::init_logging(&config.observability.log_level);

    tracing::info!("docgate v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        bind_address = %config.listener.bind_address,
        request_timeout_secs = config.timeouts.request_secs,
        users = config.security.users.len(),
        permissions = config.security.permissions.len(),
        "Configuration loaded"
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

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Arc::new(Shutdown::new());
    let server = HttpServer::new(config, Arc::new(InMemoryDatabase::new()));
    let server_shutdown = shutdown.subscribe();

    let signals = Arc::clone(&shutdown);
    tokio::spawn(async move { shutdown_on_signal(&signals).await });

    server.run(listener, server_shutdown).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
