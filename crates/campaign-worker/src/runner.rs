//! Worker runner: main loop that polls for due tasks and executes them.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::{Semaphore, watch};
use tokio::time;
use tracing;

use campaign_core::config::WorkerConfig;
use campaign_jobs::JobService;
use campaign_queue::InMemoryTaskQueue;

use crate::executor::{TaskExecutor, TaskOutcome};

/// Main worker runner that polls the queue and executes tasks
#[derive(Debug)]
pub struct WorkerRunner {
    /// Task queue for polling
    queue: Arc<InMemoryTaskQueue>,
    /// Task executor
    executor: TaskExecutor,
    /// Worker configuration
    config: WorkerConfig,
    /// Worker identifier
    worker_id: String,
}

impl WorkerRunner {
    /// Create a new worker runner
    pub fn new(
        queue: Arc<InMemoryTaskQueue>,
        service: Arc<JobService>,
        config: WorkerConfig,
        worker_id: String,
    ) -> Self {
        let executor = TaskExecutor::new(Arc::clone(&queue), service);
        Self {
            queue,
            executor,
            config,
            worker_id,
        }
    }

    /// Worker identifier
    pub fn worker_id(&self) -> &str {
        &self.worker_id
    }

    /// Start the worker runner, running until the cancel signal is received
    pub async fn run(&self, mut cancel: watch::Receiver<bool>) {
        tracing::info!(
            "Worker '{}' started with concurrency={}, poll_interval={}s, claim_limit={}",
            self.worker_id,
            self.config.concurrency,
            self.config.poll_interval_seconds,
            self.config.claim_limit
        );

        let concurrency = self.config.concurrency.max(1);
        let semaphore = Arc::new(Semaphore::new(concurrency));
        let poll_interval = Duration::from_secs(self.config.poll_interval_seconds);

        loop {
            tokio::select! {
                changed = cancel.changed() => {
                    if changed.is_err() {
                        tracing::warn!("Worker '{}' lost its shutdown channel, stopping", self.worker_id);
                        break;
                    }
                    if *cancel.borrow() {
                        tracing::info!("Worker '{}' received shutdown signal", self.worker_id);
                        break;
                    }
                }
                _ = self.poll_and_execute(&semaphore) => {
                    tokio::select! {
                        changed = cancel.changed() => {
                            if changed.is_err() {
                                tracing::warn!("Worker '{}' lost its shutdown channel, stopping", self.worker_id);
                                break;
                            }
                            if *cancel.borrow() {
                                tracing::info!("Worker '{}' shutting down", self.worker_id);
                                break;
                            }
                        }
                        _ = time::sleep(poll_interval) => {}
                    }
                }
            }
        }

        tracing::info!(
            "Worker '{}' waiting for in-flight tasks to complete...",
            self.worker_id
        );

        let grace = Duration::from_secs(self.config.shutdown_grace_seconds);
        if time::timeout(grace, semaphore.acquire_many(concurrency as u32))
            .await
            .is_err()
        {
            tracing::warn!(
                "Worker '{}' gave up waiting for in-flight tasks after {}s",
                self.worker_id,
                grace.as_secs()
            );
        }

        tracing::info!("Worker '{}' shut down complete", self.worker_id);
    }

    /// Claim and execute every task due now, one after another.
    ///
    /// Returns the number of tasks executed.
    pub async fn run_once(&self) -> usize {
        self.run_once_at(Utc::now()).await
    }

    /// Claim and execute every task due at `now`, one after another.
    pub async fn run_once_at(&self, now: DateTime<Utc>) -> usize {
        let tasks = self.queue.claim_due(now, self.config.claim_limit).await;
        let count = tasks.len();
        for task in tasks {
            self.executor.execute(&task).await;
        }
        count
    }

    /// Keep running passes until the queue has nothing due, or `max_passes`
    /// is reached. Returns the total number of tasks executed.
    pub async fn drain(&self, max_passes: usize) -> usize {
        let mut total = 0;
        for _ in 0..max_passes {
            let executed = self.run_once().await;
            if executed == 0 {
                break;
            }
            total += executed;
        }
        total
    }

    /// Claim as many due tasks as there are free slots and spawn them
    async fn poll_and_execute(&self, semaphore: &Arc<Semaphore>) {
        let free = semaphore.available_permits().min(self.config.claim_limit);
        if free == 0 {
            tracing::trace!("All worker slots occupied, waiting...");
            return;
        }

        let tasks = self.queue.claim_due(Utc::now(), free).await;
        if tasks.is_empty() {
            tracing::trace!("No tasks due");
            return;
        }

        for task in tasks {
            let permit = match Arc::clone(semaphore).acquire_owned().await {
                Ok(p) => p,
                Err(e) => {
                    tracing::error!("Worker semaphore closed: {}", e);
                    return;
                }
            };
            let executor = self.executor.clone();
            let worker_id = self.worker_id.clone();

            tokio::spawn(async move {
                let _permit = permit;
                if let TaskOutcome::Failed(_) = executor.execute(&task).await {
                    tracing::debug!("Worker '{}' recorded failure of task {}", worker_id, task.id);
                }
            });
        }
    }
}
