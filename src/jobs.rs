//! Jobs hosted by the worker binary.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Duration;
use tracing;

use campaign_core::result::AppResult;
use campaign_jobs::{Job, RecurringJob, RunnableJob};
use campaign_queue::InMemoryTaskQueue;

/// Periodically logs task counts per status.
#[derive(Debug)]
pub struct QueueStatsJob {
    /// Queue being reported on
    queue: Arc<InMemoryTaskQueue>,
}

impl QueueStatsJob {
    /// Create a new queue stats job
    pub fn new(queue: Arc<InMemoryTaskQueue>) -> Self {
        Self { queue }
    }
}

impl Job for QueueStatsJob {
    fn name(&self) -> &str {
        "queue_stats"
    }

    fn as_runnable(&self) -> Option<&dyn RunnableJob> {
        Some(self)
    }

    fn as_recurring(&self) -> Option<&dyn RecurringJob> {
        Some(self)
    }
}

#[async_trait]
impl RunnableJob for QueueStatsJob {
    async fn run(&self) -> AppResult<()> {
        let stats = self.queue.stats().await;
        tracing::info!(
            pending = stats.pending,
            running = stats.running,
            complete = stats.complete,
            failed = stats.failed,
            canceled = stats.canceled,
            "Task queue stats"
        );
        Ok(())
    }
}

impl RecurringJob for QueueStatsJob {
    fn interval(&self) -> Duration {
        Duration::minutes(15)
    }
}

/// Every job this binary hosts.
pub fn all(queue: &Arc<InMemoryTaskQueue>) -> Vec<Arc<dyn Job>> {
    vec![Arc::new(QueueStatsJob::new(Arc::clone(queue)))]
}
