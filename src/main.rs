use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tokio::signal;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use slidegate::config::SlidegateConfig;
use slidegate::http::{AppState, HttpServer};
use slidegate::metrics::DecisionStats;
use slidegate::ratelimit::AdmissionController;

#[derive(Debug, Parser)]
#[command(name = "slidegate", version, about = "Per-client request admission service")]
struct Args {
    /// Path to a YAML configuration file
    #[arg(long)]
    config: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .init();

    info!("Starting Slidegate Admission Service");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    let args = Args::parse();
    let config = match args.config {
        Some(path) => SlidegateConfig::from_file(&path)?,
        None => SlidegateConfig::default(),
    };
    info!(listen_addr = %config.server.listen_addr, "Configuration loaded");

    // Initialize the admission controller
    let controller = Arc::new(AdmissionController::new());
    if let Some(rule) = &config.limiter.rule {
        controller.set_rule(rule.max_requests, rule.unit.duration())?;
    } else {
        info!("No initial rule configured, admitting all requests until one is set");
    }

    let stats = Arc::new(DecisionStats::new());

    // Periodic sweep of idle client window state
    let sweep_interval = Duration::from_secs(config.limiter.eviction_interval_secs);
    if !sweep_interval.is_zero() {
        let stale_windows = config.limiter.stale_windows;
        let sweeper = Arc::clone(&controller);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(sweep_interval);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let evicted = sweeper.evict_stale(stale_windows);
                if evicted > 0 {
                    debug!(evicted, "Evicted stale client window state");
                }
            }
        });
    }

    // Run the server with graceful shutdown on Ctrl+C
    let server = HttpServer::new(config.server.listen_addr, AppState { controller, stats });
    server.serve_with_shutdown(shutdown_signal()).await?;

    info!("Slidegate Admission Service stopped");
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
