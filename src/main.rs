//! snapproxy: proxymap-driven request router for an automated rendering
//! environment.
//!
//! # Architecture Overview
//!
//! ```text
//!                        ┌────────────────────────────────────────────┐
//!                        │                 SNAPPROXY                  │
//!                        │                                            │
//!   Rendering client     │  ┌────────┐   ┌──────────────────────┐    │
//!   (absolute-form) ─────┼─▶│  http  │──▶│       routing        │    │
//!                        │  │ server │   │ classifier ▸ proxymap │    │
//!                        │  └────────┘   │ blacklist ▸ decision  │    │
//!                        │       │       └──────────┬───────────┘    │
//!                        │       │                  │                │
//!                        │       ▼                  ▼                │
//!   Response with    ◀───┼─ rewrite (mimetype,   upstream ───────────┼──▶ Fixture server
//!   footer injected      │  CORS, footer)        (retrying client)   │    or live internet
//!                        │                                            │
//!                        └────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use snapproxy::config::{load_config, ProxyConfig};
use snapproxy::http::HttpServer;
use snapproxy::observability::{logging, metrics};
use snapproxy::routing::ProxyMap;

#[derive(Parser)]
#[command(name = "snapproxy")]
#[command(about = "Request router for rendering snapshot environments", long_about = None)]
struct Args {
    /// Path to the TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Listen port (keeps the configured bind host).
    #[arg(short, long)]
    port: Option<u16>,

    /// Path to the proxymap JSON file.
    #[arg(long)]
    proxymap: Option<PathBuf>,

    /// Hostname local requests are rewritten onto.
    #[arg(long)]
    proxyme: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => load_config(path)?,
        None => ProxyConfig::default(),
    };
    if let Some(port) = args.port {
        let host = config
            .listener
            .bind_address
            .rsplit_once(':')
            .map(|(host, _)| host.to_string())
            .unwrap_or_else(|| "127.0.0.1".to_string());
        config.listener.bind_address = format!("{}:{}", host, port);
    }
    if let Some(path) = args.proxymap {
        config.proxymap.path = path;
    }
    if let Some(proxyme) = args.proxyme {
        config.routing.proxyme_hostname = proxyme;
    }

    logging::init_logging(&config.observability.log_level);
    tracing::info!("snapproxy v0.1.0 starting");

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

    // The proxymap must load completely before any traffic is served.
    let proxymap = ProxyMap::from_file(&config.proxymap.path)?;
    tracing::info!(
        entries = proxymap.len(),
        path = %config.proxymap.path.display(),
        proxyme = %config.routing.proxyme_hostname,
        "proxymap loaded"
    );

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    let local_addr = listener.local_addr()?;
    tracing::info!(address = %local_addr, "Listening for connections");

    let server = HttpServer::new(config, proxymap);
    server.run(listener).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
