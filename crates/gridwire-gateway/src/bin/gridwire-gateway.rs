//! gridwire Gateway Binary
//!
//! Serves shared grids over HTTP with live WebSocket updates.
//!
//! # Usage
//! ```bash
//! gridwire-gateway [--port 8787] [--host 127.0.0.1] [--data-dir ./grids] [--verbose]
//! ```

use anyhow::Context;
use clap::Parser;
use gridwire_gateway::{Gateway, GatewayConfig};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// gridwire Gateway - shared grids with live updates
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// JSON configuration file; flags below override it
    #[arg(short, long)]
    config: Option<String>,

    /// Port to listen on
    #[arg(short, long)]
    port: Option<u16>,

    /// Host to bind to
    #[arg(long)]
    host: Option<String>,

    /// Directory for grid databases (in-memory when omitted)
    #[arg(long)]
    data_dir: Option<PathBuf>,

    /// Grid width
    #[arg(long)]
    width: Option<u32>,

    /// Grid height
    #[arg(long)]
    height: Option<u32>,

    /// Grid served by the unnamed /api/grid routes
    #[arg(long)]
    default_grid: Option<String>,

    /// Maximum number of grids open at once
    #[arg(long)]
    max_grids: Option<usize>,

    /// Enable verbose debug logging
    #[arg(short, long)]
    verbose: bool,
}

impl Args {
    fn into_config(self) -> anyhow::Result<GatewayConfig> {
        let mut config = match &self.config {
            Some(path) => GatewayConfig::from_file(path)
                .with_context(|| format!("loading config '{}'", path))?,
            None => GatewayConfig::default(),
        };

        if let Some(host) = self.host {
            config = config.with_host(host);
        }
        if let Some(port) = self.port {
            config = config.with_port(port);
        }
        if let Some(dir) = self.data_dir {
            config = config.with_data_dir(dir);
        }
        let width = self.width.unwrap_or(config.width);
        let height = self.height.unwrap_or(config.height);
        config = config.with_dimensions(width, height);
        if let Some(name) = self.default_grid {
            config = config.with_default_grid(name);
        }
        if let Some(max_grids) = self.max_grids {
            config = config.with_max_grids(max_grids);
        }

        config.validate()?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let verbose = args.verbose;

    // Initialize logging; RUST_LOG wins over --verbose
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(if verbose { "debug" } else { "info" }));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(verbose)
        .with_thread_ids(verbose)
        .init();

    let config = args.into_config()?;
    print_banner(&config);

    let gateway = Gateway::new(config)?;

    let signal_gateway = gateway.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            signal_gateway.shutdown();
        }
    });

    gateway.start().await?;
    Ok(())
}

fn print_banner(config: &GatewayConfig) {
    let base = format!("{}:{}", config.host, config.port);
    println!();
    println!("gridwire gateway {}", gridwire_gateway::VERSION);
    println!("   grid     {}x{}", config.width, config.height);
    match &config.data_dir {
        Some(dir) => println!("   storage  {}", dir.display()),
        None => println!("   storage  in-memory"),
    }
    println!();
    println!("HTTP Endpoints");
    println!("   ├─ GET  http://{}/api/grid", base);
    println!("   ├─ GET  http://{}/api/grid/cell?x=&y=", base);
    println!("   ├─ POST http://{}/api/grid/cell", base);
    println!("   ├─ POST http://{}/api/grid/clear", base);
    println!("   ├─ GET  http://{}/health", base);
    println!("   └─ GET  http://{}/status", base);
    println!();
    println!("WebSocket");
    println!("   └─ ws://{}/api/grid/ws", base);
    println!();
    println!("Press Ctrl+C to stop the gateway");
    println!();
}
