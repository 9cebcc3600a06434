//! Campaign Automation worker: hosts the background job layer.
//!
//! Main entry point that wires the task queue, the job service and the
//! worker runner together and runs until a shutdown signal arrives.

mod jobs;

use std::sync::Arc;

use tokio::sync::watch;
use tracing;
use tracing_subscriber::{EnvFilter, fmt};

use campaign_core::config::AppConfig;
use campaign_core::error::AppError;
use campaign_jobs::{JobRegistry, JobService};
use campaign_queue::InMemoryTaskQueue;
use campaign_worker::WorkerRunner;

#[tokio::main]
async fn main() {
    let config = match load_configuration() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    init_logging(&config);

    if let Err(e) = run(config).await {
        tracing::error!("Worker error: {}", e);
        std::process::exit(1);
    }
}

/// Load configuration from files and environment
fn load_configuration() -> Result<AppConfig, AppError> {
    let env = std::env::var("CAMPAIGN_ENV").unwrap_or_else(|_| "development".to_string());
    AppConfig::load(&env)
}

/// Initialize tracing/logging
fn init_logging(config: &AppConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    match config.logging.format.as_str() {
        "json" => {
            fmt()
                .json()
                .with_env_filter(filter)
                .with_target(true)
                .with_thread_ids(true)
                .init();
        }
        _ => {
            fmt()
                .pretty()
                .with_env_filter(filter)
                .with_target(true)
                .init();
        }
    }
}

/// Main worker run function
async fn run(config: AppConfig) -> Result<(), AppError> {
    tracing::info!(
        "Starting Campaign Automation worker v{} (timezone: {})",
        env!("CARGO_PKG_VERSION"),
        config.site.timezone
    );

    // ── Step 1: Task queue ───────────────────────────────────────
    let queue = Arc::new(InMemoryTaskQueue::new(&config.queue));

    // ── Step 2: Job registry + service ───────────────────────────
    let hosted = Arc::clone(&queue);
    let registry = Arc::new(JobRegistry::new(move || jobs::all(&hosted)));
    let service = Arc::new(JobService::new(queue.clone(), Arc::clone(&registry), &config)?);

    let report = service.init().await?;
    tracing::info!(
        "Jobs ready: {:?} ({} recurring schedule(s) active)",
        registry.names(),
        report.scheduled + report.already_scheduled
    );
    if report.failed > 0 {
        tracing::warn!("{} job(s) failed to initialize, see errors above", report.failed);
    }

    if !config.worker.enabled {
        tracing::info!("Background worker disabled, nothing to do");
        return Ok(());
    }

    // ── Step 3: Shutdown channel ─────────────────────────────────
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    // ── Step 4: Start worker ─────────────────────────────────────
    let worker_id = format!("worker-{}", std::process::id());
    let runner = WorkerRunner::new(
        Arc::clone(&queue),
        Arc::clone(&service),
        config.worker.clone(),
        worker_id,
    );
    let worker_handle = tokio::spawn(async move {
        runner.run(shutdown_rx).await;
    });
    tracing::info!("Background worker started");

    // ── Step 5: Graceful shutdown ────────────────────────────────
    shutdown_signal().await;
    tracing::info!("Shutdown signal received, stopping worker...");

    if shutdown_tx.send(true).is_err() {
        tracing::warn!("Worker already stopped");
    }

    let grace = std::time::Duration::from_secs(config.worker.shutdown_grace_seconds + 5);
    if tokio::time::timeout(grace, worker_handle).await.is_err() {
        tracing::warn!("Worker did not stop within {}s", grace.as_secs());
    }

    service.deactivate().await?;
    tracing::info!("Campaign Automation worker shut down gracefully");
    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
