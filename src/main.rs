//! Unigraph API server
//!
//! Serves the health, login and chat endpoints behind the shared access gate.

use clap::Parser;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};
use unigraph_api::{
    AppState,
    config::{LogFormat, load_config, request_provider, runtime_mode},
    server,
};

/// Unigraph API - auth and chat proxy with origin and allow-list gating
#[derive(Parser, Debug)]
#[command(name = "unigraph-api")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, env = "UNIGRAPH_CONFIG")]
    config: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "UNIGRAPH_LOG_LEVEL")]
    log_level: Option<String>,

    /// HTTP server host
    #[arg(long, env = "UNIGRAPH_HOST")]
    host: Option<String>,

    /// HTTP server port
    #[arg(long, env = "UNIGRAPH_PORT")]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Local .env files are optional
    let dotenv = dotenvy::dotenv().ok();

    let config = load_config(args.config.as_deref())?;

    // Initialize logging
    let level = args
        .log_level
        .clone()
        .unwrap_or_else(|| config.logging.level.clone());
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&level));

    match config.logging.format {
        LogFormat::Json => tracing_subscriber::registry()
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .with(filter)
            .init(),
        LogFormat::Pretty => tracing_subscriber::registry()
            .with(fmt::layer().with_writer(std::io::stderr))
            .with(filter)
            .init(),
    }

    info!(
        version = env!("CARGO_PKG_VERSION"),
        mode = %config.access.mode,
        "Starting Unigraph API"
    );
    if let Some(path) = dotenv {
        info!(path = %path.display(), "Loaded environment file");
    }

    if config.access.mode.is_development() {
        warn!("Development mode: identity verification and allow-list are bypassed");
    }

    let provider = request_provider(&config);
    let request_mode = runtime_mode(&provider);
    if request_mode != config.access.mode {
        anyhow::bail!(
            "runtime mode mismatch: configuration resolved to {} but the environment resolves to {}",
            config.access.mode,
            request_mode
        );
    }

    let state = AppState::from_config(&config, Arc::new(provider))
        .inspect_err(|e| error!(error = %e, "Failed to initialize application state"))?;

    let host = args.host.unwrap_or_else(|| config.server.host.clone());
    let port = args.port.unwrap_or(config.server.port);
    let bind: SocketAddr = format!("{}:{}", host, port).parse()?;

    server::run(bind, state).await
}
