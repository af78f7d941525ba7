//! Demonstration service: a small Axum app with every route wrapped by the
//! request memory observer.

use clap::Parser;
use std::path::PathBuf;
use tokio::net::TcpListener;

use request_memory_observer::config::validation::validate_config;
use request_memory_observer::config::{load_config, AppConfig, ConfigError};
use request_memory_observer::observability::init_logging;
use request_memory_observer::{CountingAllocator, HttpServer, Shutdown};

#[global_allocator]
static GLOBAL: CountingAllocator = CountingAllocator;

#[derive(Parser)]
#[command(name = "request-memory-observer")]
#[command(about = "Demo HTTP service with per-request memory telemetry", long_about = None)]
struct Cli {
    /// TOML configuration file. Defaults are used when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override listener.bind_address.
    #[arg(short, long)]
    bind: Option<String>,

    /// Override observer.threshold_mb.
    #[arg(long)]
    threshold_mb: Option<f64>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => AppConfig::default(),
    };
    if let Some(bind) = cli.bind {
        config.listener.bind_address = bind;
    }
    if let Some(threshold) = cli.threshold_mb {
        config.observer.threshold_mb = threshold;
    }
    validate_config(&config).map_err(ConfigError::Validation)?;

    init_logging(&config.observability);
    tracing::info!("request-memory-observer v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        bind_address = %config.listener.bind_address,
        threshold_mb = config.observer.threshold_mb,
        threshold_unit = ?config.observer.threshold_unit,
        sink = ?config.observer.sink,
        log_destination = %config.observer.log_destination.display(),
        "Configuration loaded"
    );

    let server = HttpServer::from_config(&config.observer)?;

    let mut shutdown = Shutdown::new();
    shutdown.flush_on_exit(server.sink());

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    server.run(listener, shutdown.subscribe()).await?;

    shutdown.finish();
    tracing::info!("Shutdown complete");
    Ok(())
}
