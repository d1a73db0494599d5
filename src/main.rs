//! hfwd: single-destination HTTP/HTTPS forward proxy.
//!
//! # Architecture Overview
//!
//! ```text
//!                    ┌──────────────────────────────────────────────────┐
//!                    │                      HFWD                        │
//!   Client Request   │  ┌────────┐   ┌──────────┐   ┌──────────────┐    │
//!   ─────────────────┼─▶│  http  │──▶│ headers  │──▶│   rewrite    │    │
//!                    │  │ server │   │  policy  │   │ + compose    │    │
//!                    │  └────────┘   └──────────┘   └──────┬───────┘    │
//!                    │                                     ▼            │
//!   Client Response  │  ┌────────┐   ┌──────────┐   ┌──────────────┐    │
//!   ◀────────────────┼──│ relay  │◀──│transport │◀──│ net (rustls) │◀───┼── Destination
//!                    │  └────────┘   │ [+ dump] │   └──────────────┘    │
//!                    │               └──────────┘                       │
//!                    └──────────────────────────────────────────────────┘
//! ```

use clap::Parser;
use tokio::net::TcpListener;

use hfwd::cli::Cli;
use hfwd::config::{load_parameters, ConfigErrors, Parameters};
use hfwd::http::HttpServer;
use hfwd::lifecycle::{wait_for_signal, Shutdown};
use hfwd::observability;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    observability::init(cli.verbose);

    tracing::info!("hfwd v{} starting", env!("CARGO_PKG_VERSION"));

    let mut errors = ConfigErrors::new();
    let mut params = match &cli.config {
        Some(path) => errors.absorb(load_parameters(path)).unwrap_or_default(),
        None => Parameters::default(),
    };
    errors.absorb(cli.apply(&mut params));

    let config = match params.load() {
        Ok(config) if errors.is_empty() => config,
        result => {
            if let Err(load_errors) = result {
                errors.extend(load_errors);
            }
            tracing::error!("Failed to load configuration:\n{}", errors);
            return Err(errors.into());
        }
    };

    tracing::info!("Configuration loaded\n{}", params);

    let listener = TcpListener::bind(config.listen()).await?;
    tracing::info!(
        address = %listener.local_addr()?,
        destination = %config.destination(),
        rewrite_rules = config.rewrites().len(),
        "Listening for connections"
    );

    let shutdown = Shutdown::new();
    let signal_shutdown = shutdown.clone();
    tokio::spawn(async move {
        wait_for_signal().await;
        signal_shutdown.trigger();
    });

    let server = HttpServer::new(&config);
    server.run(listener, shutdown.subscribe()).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
