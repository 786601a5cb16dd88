//! Orchestrator manager node
//!
//! The manager is the control plane: it accepts task submissions over its
//! REST API, schedules them onto workers round-robin, keeps its task
//! database converged with what the workers report, and restarts unhealthy
//! tasks within a bounded budget.
// This is the main entry point for the manager binary. It is responsible for:
// - Initializing logging and configuration.
// - Spawning the scheduler, state-sync, and health-monitor loops.
// - Running the HTTP server and handling graceful shutdown.

// Use jemalloc as the global allocator for better performance
#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

use anyhow::{Context, Result};
use clap::Parser;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, Mutex};
use tracing::{error, info, warn};

mod api;
mod config;
mod health;
mod manager;
mod scheduler;
mod sync;

#[cfg(test)]
mod tests;

use config::ManagerConfig;
use health::HealthMonitor;
use manager::Manager;
use scheduler::Scheduler;
use shared::defaults::{
    HEALTH_CHECK_INTERVAL_SECS, PROCESS_TASKS_INTERVAL_SECS, UPDATE_TASKS_INTERVAL_SECS,
};
use sync::StateSync;

/// Command-line arguments for the manager
#[derive(Parser, Debug)]
#[command(name = "manager")]
#[command(about = "Control-plane node that schedules tasks onto workers", long_about = None)]
struct CliArgs {
    /// Override the bind host from the environment
    #[arg(long = "host", value_name = "HOST")]
    host: Option<String>,

    /// Override the bind port from the environment
    #[arg(long = "port", value_name = "PORT")]
    port: Option<u16>,

    /// Override the worker list from the environment (comma-separated host:port)
    #[arg(long = "workers", value_name = "ADDRESSES")]
    workers: Option<String>,
}

/// Spawns the periodic loops and runs the HTTP server until shutdown.
async fn run(config: ManagerConfig) -> Result<()> {
    let listen_address = config.listen_address();
    let manager = Arc::new(Mutex::new(Manager::new(config.workers.clone())));

    // Create shutdown broadcast channel
    let (shutdown_tx, _) = broadcast::channel(1);

    // Scheduler loop: one pending event per tick.
    let scheduler = Scheduler::new(Arc::clone(&manager))?;
    let mut scheduler_shutdown_rx = shutdown_tx.subscribe();
    let scheduler_task = tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(PROCESS_TASKS_INTERVAL_SECS));
        loop {
            tokio::select! {
                _ = interval.tick() => {
                    if let Err(e) = scheduler.process_pending().await {
                        error!("Error dispatching task: {}", e);
                    }
                }
                _ = scheduler_shutdown_rx.recv() => {
                    info!("Scheduler received shutdown signal");
                    break;
                }
            }
        }
    });

    // State-sync loop: fold worker reports into the task database.
    let state_sync = StateSync::new(Arc::clone(&manager))?;
    let mut sync_shutdown_rx = shutdown_tx.subscribe();
    let sync_task = tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(UPDATE_TASKS_INTERVAL_SECS));
        loop {
            tokio::select! {
                _ = interval.tick() => {
                    state_sync.update_tasks().await;
                }
                _ = sync_shutdown_rx.recv() => {
                    info!("State sync received shutdown signal");
                    break;
                }
            }
        }
    });

    // Health-monitor loop: probe running tasks, restart within budget.
    let health_monitor = HealthMonitor::new(Arc::clone(&manager))?;
    let mut health_shutdown_rx = shutdown_tx.subscribe();
    let health_task = tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(HEALTH_CHECK_INTERVAL_SECS));
        loop {
            tokio::select! {
                _ = interval.tick() => {
                    health_monitor.check_tasks().await;
                }
                _ = health_shutdown_rx.recv() => {
                    info!("Health monitor received shutdown signal");
                    break;
                }
            }
        }
    });

    // HTTP surface.
    let app = api::create_router(api::AppState {
        manager: Arc::clone(&manager),
    });

    info!("Starting HTTP server on {}", listen_address);
    let listener = tokio::net::TcpListener::bind(&listen_address)
        .await
        .with_context(|| format!("Failed to bind TCP listener to {}", listen_address))?;

    let shutdown_signal = {
        let shutdown_tx = shutdown_tx.clone();
        async move {
            setup_shutdown_signal().await;
            info!("Shutdown signal received, stopping background loops");
            let _ = shutdown_tx.send(());
        }
    };

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal)
        .await
        .map_err(|e| anyhow::anyhow!("Server error: {}", e))?;

    // The HTTP server is down and the loops have been signalled; wait for
    // them to drain.
    let _ = scheduler_task.await;
    let _ = sync_task.await;
    let _ = health_task.await;

    info!("Manager shutdown complete");
    Ok(())
}

/// Sets up signal handlers for graceful shutdown.
/// Returns a future that completes when a shutdown signal is received.
async fn setup_shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let sigterm = signal(SignalKind::terminate());
        let sigint = signal(SignalKind::interrupt());

        match (sigterm, sigint) {
            (Ok(mut sigterm), Ok(mut sigint)) => {
                tokio::select! {
                    _ = sigterm.recv() => info!("Received SIGTERM"),
                    _ = sigint.recv() => info!("Received SIGINT"),
                }
            }
            (Err(e), _) | (_, Err(e)) => {
                error!("Failed to register signal handlers: {}", e);
                if let Err(e) = tokio::signal::ctrl_c().await {
                    error!("Failed to wait for Ctrl+C: {}", e);
                } else {
                    info!("Received Ctrl+C");
                }
            }
        }
    }

    #[cfg(not(unix))]
    {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to receive Ctrl+C signal: {}", e);
        } else {
            info!("Received Ctrl+C");
        }
    }
}

/// Manager entry point
///
/// Initializes logging, resolves configuration, and runs until a shutdown
/// signal is received.
#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging.
    let file_appender = tracing_appender::rolling::daily("./logs", "manager.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    // Configure logging with proper RUST_LOG environment variable handling
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("manager=info,shared=info"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .json()
        .with_current_span(false)
        .with_span_list(false)
        .with_writer(non_blocking)
        .init();

    let cli_args = CliArgs::parse();

    info!("Orchestrator manager starting up");

    let mut config = match ManagerConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load manager configuration: {}", e);
            std::process::exit(1);
        }
    };

    // Apply command-line overrides if provided
    if let Some(host) = cli_args.host {
        config.host = host;
    }
    if let Some(port) = cli_args.port {
        config.port = port;
    }
    if let Some(workers) = cli_args.workers {
        config.workers = config::parse_workers(&workers);
    }

    if config.workers.is_empty() {
        warn!("No workers configured; submitted tasks will be dropped at dispatch time");
    }

    info!(
        listen_address = %config.listen_address(),
        workers = ?config.workers,
        "Manager configuration loaded"
    );

    run(config).await
}
