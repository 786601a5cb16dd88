//! Orchestrator worker node
//!
//! The worker is the node agent: it receives task events from the manager,
//! drives the container runtime to honor them, watches the containers it
//! started for drift, and reports observed task state and host telemetry
//! over its REST API.
// This is the main entry point for the worker binary. It is responsible for:
// - Initializing logging and configuration.
// - Connecting to the container runtime.
// - Spawning the executor, reconciler, and stats collection loops.
// - Running the HTTP server and handling graceful shutdown.

// Use jemalloc as the global allocator for better performance
#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

use anyhow::{Context, Result};
use clap::Parser;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, Mutex};
use tracing::{error, info};

mod api;
mod config;
mod docker;
mod driver;
mod executor;
mod reconciler;
mod stats;
mod worker;

#[cfg(test)]
mod tests;

use config::WorkerConfig;
use driver::ContainerDriver;
use executor::Executor;
use reconciler::Reconciler;
use shared::defaults::{
    COLLECT_STATS_INTERVAL_SECS, RUN_TASKS_INTERVAL_SECS, UPDATE_TASKS_INTERVAL_SECS,
};
use stats::StatsCollector;
use worker::Worker;

/// Command-line arguments for the worker
#[derive(Parser, Debug)]
#[command(name = "worker")]
#[command(about = "Worker node agent that executes container lifecycle operations", long_about = None)]
struct CliArgs {
    /// Override the worker name from the environment
    #[arg(long = "name", value_name = "NAME")]
    name: Option<String>,

    /// Override the bind host from the environment
    #[arg(long = "host", value_name = "HOST")]
    host: Option<String>,

    /// Override the bind port from the environment
    #[arg(long = "port", value_name = "PORT")]
    port: Option<u16>,
}

/// Spawns the periodic loops and runs the HTTP server until shutdown.
async fn run(config: WorkerConfig, driver: Arc<dyn ContainerDriver>) -> Result<()> {
    let listen_address = config.listen_address();
    let worker = Arc::new(Mutex::new(Worker::new(config.name.clone())));

    // Create shutdown broadcast channel
    let (shutdown_tx, _) = broadcast::channel(1);

    // Executor loop: one queued event per tick.
    let executor = Executor::new(Arc::clone(&worker), Arc::clone(&driver));
    let mut executor_shutdown_rx = shutdown_tx.subscribe();
    let executor_task = tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(RUN_TASKS_INTERVAL_SECS));
        loop {
            tokio::select! {
                _ = interval.tick() => {
                    if let Err(e) = executor.run_next_task().await {
                        error!("Error running task: {}", e);
                    }
                }
                _ = executor_shutdown_rx.recv() => {
                    info!("Executor received shutdown signal");
                    break;
                }
            }
        }
    });

    // Reconciler loop: inspect running containers for drift.
    let reconciler = Reconciler::new(Arc::clone(&worker), Arc::clone(&driver));
    let mut reconciler_shutdown_rx = shutdown_tx.subscribe();
    let reconciler_task = tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(UPDATE_TASKS_INTERVAL_SECS));
        loop {
            tokio::select! {
                _ = interval.tick() => {
                    reconciler.update_tasks().await;
                }
                _ = reconciler_shutdown_rx.recv() => {
                    info!("Reconciler received shutdown signal");
                    break;
                }
            }
        }
    });

    // Stats collection loop.
    let stats_worker = Arc::clone(&worker);
    let mut stats_shutdown_rx = shutdown_tx.subscribe();
    let stats_task = tokio::spawn(async move {
        let mut collector = StatsCollector::new();
        let mut interval = tokio::time::interval(Duration::from_secs(COLLECT_STATS_INTERVAL_SECS));
        loop {
            tokio::select! {
                _ = interval.tick() => {
                    let mut guard = stats_worker.lock().await;
                    let snapshot = collector.collect(guard.task_count());
                    guard.set_stats(snapshot);
                }
                _ = stats_shutdown_rx.recv() => {
                    info!("Stats collector received shutdown signal");
                    break;
                }
            }
        }
    });

    // HTTP surface.
    let app = api::create_router(api::AppState {
        worker: Arc::clone(&worker),
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
    let _ = executor_task.await;
    let _ = reconciler_task.await;
    let _ = stats_task.await;

    info!("Worker shutdown complete");
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

/// Worker entry point
///
/// Initializes logging, resolves configuration, connects to the container
/// runtime, and runs until a shutdown signal is received.
#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging.
    let file_appender = tracing_appender::rolling::daily("./logs", "worker.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    // Configure logging with proper RUST_LOG environment variable handling
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("worker=info,shared=info"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .json()
        .with_current_span(false)
        .with_span_list(false)
        .with_writer(non_blocking)
        .init();

    let cli_args = CliArgs::parse();

    info!("Orchestrator worker starting up");

    let mut config = match WorkerConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("Failed to load worker configuration: {}", e);
            std::process::exit(1);
        }
    };

    // Apply command-line overrides if provided
    if let Some(name) = cli_args.name {
        config.name = name;
    }
    if let Some(host) = cli_args.host {
        config.host = host;
    }
    if let Some(port) = cli_args.port {
        config.port = port;
    }

    info!(
        name = %config.name,
        listen_address = %config.listen_address(),
        "Worker configuration loaded"
    );

    let driver: Arc<dyn ContainerDriver> = match docker::Docker::new() {
        Ok(driver) => Arc::new(driver),
        Err(e) => {
            error!("Failed to connect to container runtime: {}", e);
            std::process::exit(1);
        }
    };
    info!("Connected to container runtime");

    run(config, driver).await
}
