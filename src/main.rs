//! HTTP bus channel server (v1)
//!
//! Serves one channel on the configured listener, backed by an in-process
//! bus with a few demo handlers.
//!
//! # Architecture Overview
//!
//! ```text
//!                        ┌──────────────────────────────────────────────────┐
//!                        │                 CHANNEL SERVER                   │
//!                        │                                                  │
//!   GET /handshake       │  ┌─────────┐      ┌────────────────┐             │
//!   ─────────────────────┼─▶│  http   │─────▶│ handshake log  │             │
//!                        │  │ server  │      └───────▲────────┘             │
//!   POST /message        │  │         │              │ handler_registered   │
//!   ─────────────────────┼─▶│         │──┐   ┌───────┴────────┐   ┌──────┐  │
//!                        │  └─────────┘  │   │ channel::send  │◀──│ bus  │  │
//!   200 correlated reply │       ▲       │   └───────┬────────┘   └──▲───┘  │
//!   ◀────────────────────┼───────┘       │           │ response/error  │     │
//!                        │               │   ┌───────▼────────┐      │      │
//!                        │               └──▶│ pending table  │──────┘      │
//!                        │                   └────────────────┘ forward     │
//!                        └──────────────────────────────────────────────────┘
//! ```

use clap::Parser;
use serde_json::{json, Value};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;

use bus_http_channel::bus::{self, local::LocalBus};
use bus_http_channel::config::loader::load_config;
use bus_http_channel::config::ServerConfig;
use bus_http_channel::lifecycle::{signals, Shutdown};
use bus_http_channel::observability::{logging, metrics};
use bus_http_channel::{HttpServer, HttpServerChannel};

#[derive(Parser)]
#[command(name = "bus-http-channel")]
#[command(about = "Serve a message bus over request/response HTTP", long_about = None)]
struct Args {
    /// Path to a TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override `listener.bind_address`.
    #[arg(short, long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => load_config(path)?,
        None => ServerConfig::default(),
    };
    if let Some(bind) = args.bind {
        config.listener.bind_address = bind;
    }

    logging::init(&config.observability.log_level);
    tracing::info!("bus-http-channel v{} starting", env!("CARGO_PKG_VERSION"));

    tracing::info!(
        bind_address = %config.listener.bind_address,
        pending_timeout_secs = config.channel.pending_timeout_secs,
        static_files = config.static_files.is_some(),
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        if let Ok(addr) = config.observability.metrics_address.parse() {
            metrics::init_metrics(addr);
        } else {
            tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            );
        }
    }

    // Channel first: it announces `connected` to the bus on construction.
    let (link, events) = bus::link();
    let channel = Arc::new(HttpServerChannel::new(config.channel.clone(), link));
    let bus_task = demo_bus().spawn(channel.clone(), events);

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    tokio::spawn(async move {
        signals::wait_for_signal().await;
        shutdown.trigger();
    });

    let server = HttpServer::new(config, channel);
    server.run(listener, server_shutdown).await?;

    bus_task.abort();
    tracing::info!("Shutdown complete");
    Ok(())
}

fn demo_bus() -> LocalBus {
    LocalBus::new()
        .handler("ping", |_| Ok(json!("pong")))
        .handler("echo", |payload| Ok(payload))
        .handler("sum", |payload| {
            let numbers = payload
                .as_array()
                .ok_or_else(|| "sum expects an array of numbers".to_string())?;
            numbers
                .iter()
                .map(|n| n.as_f64().ok_or_else(|| format!("not a number: {n}")))
                .sum::<Result<f64, String>>()
                .map(Value::from)
        })
}
