use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio::signal;
use tracing::info;
use tracing_subscriber::EnvFilter;

use formgate::config::{FormgateConfig, LogFormat};
use formgate::http::HttpServer;
use formgate::ratelimit::{
    Clock, CounterStore, LimiterRegistry, RateLimiter, StoreSweeper, SystemClock,
};

/// Fixed-window rate limiting service for website forms and APIs.
#[derive(Parser, Debug)]
#[command(name = "formgate", version, about)]
struct Args {
    /// Path to the YAML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Address for the HTTP decision API
    #[arg(long)]
    http_addr: Option<SocketAddr>,

    /// Path to a YAML file with limiter definitions
    #[arg(long)]
    limiters: Option<String>,

    /// Default log filter, overridden by RUST_LOG
    #[arg(long)]
    log_level: Option<String>,

    /// Log output format
    #[arg(long, value_enum)]
    log_format: Option<LogFormat>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => FormgateConfig::from_file(path)?,
        None => FormgateConfig::default(),
    };
    if let Some(addr) = args.http_addr {
        config.server.http_addr = addr;
    }
    if let Some(path) = args.limiters {
        config.rate_limiting.limiters_path = Some(path);
    }
    if let Some(level) = args.log_level {
        config.logging.level = level;
    }
    if let Some(format) = args.log_format {
        config.logging.format = format;
    }

    // Initialize tracing
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.level));
    match config.logging.format {
        LogFormat::Json => tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .json()
            .init(),
        LogFormat::Text => tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .init(),
    }

    info!("Starting Formgate Rate Limiting Service");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));
    info!(http_addr = %config.server.http_addr, "Configuration loaded");

    let registry = match &config.rate_limiting.limiters_path {
        Some(path) => LimiterRegistry::from_file(path)?,
        None => LimiterRegistry::with_presets(),
    };
    info!(limiters = ?registry.names(), "Rate limiters registered");

    let store = Arc::new(CounterStore::new());
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let rate_limiter = Arc::new(RateLimiter::with_parts(
        Arc::new(registry),
        Arc::clone(&store),
        Arc::clone(&clock),
    ));

    let mut sweeper = StoreSweeper::new(store, clock)
        .with_interval(config.rate_limiting.sweep_interval());
    sweeper.start();

    let http_server = HttpServer::new(config.server.http_addr, rate_limiter);

    // Run the server with graceful shutdown on Ctrl+C
    let served = http_server.serve_with_shutdown(shutdown_signal()).await;

    sweeper.stop().await;
    served?;

    info!("Formgate Rate Limiting Service stopped");
    Ok(())
}

/// Wait for a shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating graceful shutdown");
        }
    }
}
