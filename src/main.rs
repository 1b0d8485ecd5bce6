use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use clap::Parser;
use tokio::signal;
use tracing::{info, Level};

use tollgate::config::TollgateConfig;
use tollgate::http::HttpServer;
use tollgate::ratelimit::RateLimiter;

/// Command-line options. Each one overrides the corresponding value from
/// the configuration file.
#[derive(Parser, Debug)]
#[command(name = "tollgate")]
#[command(about = "HTTP rate-limiting admission-control service")]
struct Args {
    /// Path to a YAML configuration file
    #[arg(short, long)]
    config: Option<String>,

    /// HTTP listen address
    #[arg(short, long)]
    listen: Option<SocketAddr>,

    /// Requests per window for keys without a token override
    #[arg(long)]
    default_limit: Option<u32>,

    /// Window length in milliseconds
    #[arg(long)]
    window_ms: Option<u64>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_max_level(Level::INFO)
        .with_target(false)
        .with_thread_ids(true)
        .init();

    info!("Starting Tollgate Rate Limiting Service");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    let args = Args::parse();
    let mut config = match &args.config {
        Some(path) => TollgateConfig::from_file(path)?,
        None => TollgateConfig::default(),
    };
    if let Some(listen) = args.listen {
        config.server.listen_addr = listen;
    }
    if let Some(limit) = args.default_limit {
        config.limits.default_limit = limit;
    }
    if let Some(window_ms) = args.window_ms {
        config.limits.window_ms = window_ms;
    }
    config.validate()?;

    info!(
        listen = %config.server.listen_addr,
        default_limit = config.limits.default_limit,
        window_ms = config.limits.window_ms,
        token_overrides = config.limits.token_overrides.len(),
        "Configuration loaded"
    );

    // Initialize the rate limiter
    let limiter = Arc::new(RateLimiter::from_config(&config.limits));
    info!("Rate limiter initialized");

    // Periodically drop counters whose window has fully elapsed.
    let sweeper = Arc::clone(&limiter);
    let window = config.limits.window();
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(window);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            sweeper.store().sweep_expired(window, Instant::now());
        }
    });

    // Create and start the HTTP server
    let server = HttpServer::new(config.server.listen_addr, limiter);

    // Run the server with graceful shutdown on Ctrl+C
    server.serve_with_shutdown(shutdown_signal()).await?;

    info!("Tollgate Rate Limiting Service stopped");
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
