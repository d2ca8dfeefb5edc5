//! Webhook proxy
//!
//! Holds webhook calls open until a poll consumer behind a firewall picks
//! them up and posts a reply.
//!
//! # Architecture Overview
//!
//! ```text
//!                        ┌──────────────────────────────────────────────┐
//!                        │                WEBHOOK PROXY                 │
//!                        │                                              │
//!   Webhook caller       │  ┌──────────┐   ┌─────────┐   ┌──────────┐  │
//!   ─────────────────────┼─▶│ security │──▶│ ingress │──▶│  queue   │  │
//!                        │  │allow list│   └────┬────┘   └────┬─────┘  │
//!                        │  └──────────┘        │             │        │
//!                        │                 ┌────▼─────┐  ┌────▼─────┐  │   Poll consumer
//!                        │                 │ registry │  │  egress  │──┼──────────────▶
//!                        │                 └────▲─────┘  └──────────┘  │
//!                        │                      │        ┌──────────┐  │
//!                        │                      └────────│  reply   │◀─┼───────────────
//!                        │                               └──────────┘  │
//!                        │  ┌────────┐ ┌──────────────┐ ┌───────────┐  │
//!                        │  │ config │ │observability │ │ lifecycle │  │
//!                        │  └────────┘ └──────────────┘ └───────────┘  │
//!                        └──────────────────────────────────────────────┘
//! ```

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use webhook_proxy::config::{load_config, ProxyConfig};
use webhook_proxy::net::tls::load_tls_config;
use webhook_proxy::observability::{logging, metrics};
use webhook_proxy::{HttpServer, Shutdown};

#[derive(Parser, Debug)]
#[command(author, version, about = "Webhook to long-poll broker")]
struct Args {
    /// Path to the TOML configuration file. Defaults are used when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => load_config(path)?,
        None => ProxyConfig::default(),
    };

    logging::init_logging(&config.observability);

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "webhook-proxy starting");
    tracing::info!(
        bind_address = %config.listener.bind_address,
        long_poll_wait_ms = config.broker.long_poll_wait_ms,
        max_payload_bytes = config.broker.max_payload_bytes,
        max_pending = config.broker.max_pending,
        backlog = config.broker.backlog,
        autoreply = config.broker.autoreply,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse::<SocketAddr>() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let shutdown = Shutdown::new();
    shutdown.trigger_on_signal();

    let server = HttpServer::new(&config);
    match &config.listener.tls {
        Some(tls) => {
            let addr: SocketAddr = config.listener.bind_address.parse()?;
            let rustls = load_tls_config(tls).await?;
            server.run_tls(addr, rustls, shutdown.subscribe()).await?;
        }
        None => {
            let listener = TcpListener::bind(&config.listener.bind_address).await?;
            tracing::info!(address = %listener.local_addr()?, "Listening for connections");
            server.run(listener, shutdown.subscribe()).await?;
        }
    }

    tracing::info!("Shutdown complete");
    Ok(())
}
