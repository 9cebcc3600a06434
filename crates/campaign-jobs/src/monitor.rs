//! Failure-rate circuit breaker.

use std::sync::Arc;

use chrono::{Duration, Utc};
use tracing;

use campaign_core::config::JobsConfig;
use campaign_core::error::AppError;
use campaign_core::result::AppResult;
use campaign_queue::{TaskFilter, TaskQueue, TaskStatus};

use crate::hooks;

/// Watches task history for jobs whose items keep failing.
///
/// Failures are counted per job name across all run args, so every run of
/// a job shares one failure budget.
#[derive(Debug, Clone)]
pub struct JobMonitor {
    /// Queue whose history is inspected.
    queue: Arc<dyn TaskQueue>,
    /// Failures within the window that trip the breaker.
    threshold: usize,
    /// Trailing window.
    window: Duration,
}

impl JobMonitor {
    /// Create a monitor from the jobs configuration.
    pub fn new(queue: Arc<dyn TaskQueue>, config: &JobsConfig) -> AppResult<Self> {
        let window = Duration::try_seconds(config.failure_window_seconds).ok_or_else(|| {
            AppError::configuration("jobs.failure_window_seconds is out of range")
        })?;
        Ok(Self {
            queue,
            threshold: config.failure_threshold,
            window,
        })
    }

    /// Failure threshold.
    pub fn threshold(&self) -> usize {
        self.threshold
    }

    /// Count failed item executions of `job_name` within the window, capped
    /// at the threshold.
    pub async fn recent_failures(&self, job_name: &str) -> AppResult<usize> {
        let filter = TaskFilter::hook(hooks::process_item(job_name))
            .with_status(TaskStatus::Failed)
            .updated_after(Utc::now() - self.window)
            .limit(self.threshold);

        Ok(self.queue.search(&filter).await?.len())
    }

    /// Fail with `stopped_due_to_high_failure_rate` if the job has reached
    /// the failure threshold.
    pub async fn validate_failure_rate(&self, job_name: &str) -> AppResult<()> {
        let failures = self.recent_failures(job_name).await?;
        if failures >= self.threshold {
            tracing::error!(
                job = %job_name,
                failures,
                window_seconds = self.window.num_seconds(),
                "Job stopped due to high failure rate"
            );
            return Err(AppError::high_failure_rate(job_name));
        }
        Ok(())
    }
}
