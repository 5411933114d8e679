//! Forward HTTP proxy (v1)
//!
//! # Architecture Overview
//!
//! ```text
//!                          ┌───────────────────────────────────────────────┐
//!                          │                 FORWARD PROXY                  │
//!                          │                                                │
//!   Client connection      │  ┌──────────┐   ┌──────────┐   ┌───────────┐  │
//!   ───────────────────────┼─▶│   net    │──▶│  http    │──▶│  http     │  │
//!                          │  │ listener │   │  parser  │   │  target   │  │
//!                          │  └──────────┘   └──────────┘   └─────┬─────┘  │
//!                          │                                      │        │
//!                          │                                      ▼        │
//!                          │  ┌──────────┐   ┌──────────┐   ┌───────────┐  │
//!   ◀──────────────────────┼──│  proxy   │◀──│  proxy   │◀──│   net     │◀─┼──── Origin
//!                          │  │  relay   │   │handshake │   │ connector │  │
//!                          │  └──────────┘   └──────────┘   └───────────┘  │
//!                          └───────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;

use clap::Parser;
use forward_proxy::config::loader::load_config;
use forward_proxy::config::validation::validate_config;
use forward_proxy::net::listener::Listener;
use forward_proxy::observability::{logging, metrics};
use forward_proxy::{ProxyConfig, ProxyServer, Shutdown};

#[derive(Parser)]
#[command(name = "forward-proxy")]
#[command(about = "HTTP forward proxy with CONNECT tunneling", long_about = None)]
struct Cli {
    /// Port for the proxy to listen on
    port: u16,

    /// Interface to bind
    #[arg(long)]
    host: Option<String>,

    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Bytes read per call while parsing and relaying
    #[arg(long)]
    buffer_size: Option<usize>,

    /// Largest accepted request head in bytes
    #[arg(long)]
    max_head_bytes: Option<usize>,

    /// Origin connect timeout in seconds (0 disables)
    #[arg(long)]
    connect_timeout: Option<u64>,

    /// Maximum concurrent sessions
    #[arg(long)]
    max_connections: Option<usize>,

    /// Log level (overridden by RUST_LOG)
    #[arg(long)]
    log_level: Option<String>,

    /// Prometheus scrape address, e.g. 127.0.0.1:9090
    #[arg(long)]
    metrics_address: Option<String>,
}

impl Cli {
    fn apply(self, config: &mut ProxyConfig) {
        config.listener.port = self.port;
        if let Some(host) = self.host {
            config.listener.host = host;
        }
        if let Some(size) = self.buffer_size {
            config.relay.buffer_size = size;
        }
        if let Some(limit) = self.max_head_bytes {
            config.relay.max_head_bytes = limit;
        }
        if let Some(secs) = self.connect_timeout {
            config.timeouts.connect_secs = secs;
        }
        if let Some(max) = self.max_connections {
            config.listener.max_connections = Some(max);
        }
        if let Some(level) = self.log_level {
            config.observability.log_level = level;
        }
        if let Some(addr) = self.metrics_address {
            config.observability.metrics_address = Some(addr);
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => ProxyConfig::default(),
    };
    cli.apply(&mut config);
    if let Err(errors) = validate_config(&config) {
        for error in &errors {
            eprintln!("config error: {}", error);
        }
        return Err(format!("{} configuration error(s)", errors.len()).into());
    }

    logging::init(&config.observability.log_level);
    tracing::info!("forward-proxy v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        host = %config.listener.host,
        port = config.listener.port,
        buffer_size = config.relay.buffer_size,
        connect_timeout_secs = config.timeouts.connect_secs,
        "Configuration loaded"
    );

    if let Some(addr) = &config.observability.metrics_address {
        metrics::init_metrics(addr.parse()?)?;
    }

    let listener = Listener::bind(&config.listener).await?;

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    tokio::spawn(async move { shutdown.trigger_on_ctrl_c().await });

    ProxyServer::new(config).run(listener, server_shutdown).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
