//! Batched and one-time run control.
//!
//! A batched run is a chain of `create_batch` tasks. Each one fetches a page,
//! enqueues one `process_item` task per item and then enqueues the next
//! `create_batch`, so batch N+1 is only scheduled once every item of batch N
//! has been enqueued. The chain ends when a page comes back empty.

use std::sync::Arc;

use serde_json::Value;
use tracing;

use campaign_core::config::JobsConfig;
use campaign_core::error::AppError;
use campaign_core::result::AppResult;
use campaign_core::types::{Item, JobArgs};
use campaign_queue::TaskQueue;

use crate::hooks;
use crate::job::{BatchPage, BatchedJob, OneTimeJob};
use crate::message::JobMessage;
use crate::monitor::JobMonitor;

/// Result of one `create_batch` step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchOutcome {
    /// Items were enqueued and the next batch was scheduled.
    Scheduled {
        /// Number of item tasks enqueued.
        items: usize,
        /// Batch number scheduled next.
        next_batch: u32,
    },
    /// The page was empty and the run completed.
    Completed {
        /// The batch number that came back empty.
        final_batch: u32,
    },
}

/// Drives batched and one-time jobs through the task queue.
#[derive(Debug, Clone)]
pub struct BatchController {
    /// Queue receiving batch and item tasks.
    queue: Arc<dyn TaskQueue>,
    /// Circuit breaker consulted before every batch.
    monitor: JobMonitor,
    /// Page size for jobs without their own.
    default_batch_size: usize,
}

impl BatchController {
    /// Create a new controller.
    pub fn new(queue: Arc<dyn TaskQueue>, monitor: JobMonitor, config: &JobsConfig) -> Self {
        Self {
            queue,
            monitor,
            default_batch_size: config.default_batch_size,
        }
    }

    /// The circuit breaker used by this controller.
    pub fn monitor(&self) -> &JobMonitor {
        &self.monitor
    }

    /// Page size used for `job`.
    pub fn batch_size_for(&self, job: &dyn BatchedJob) -> usize {
        job.batch_size()
            .filter(|size| *size > 0)
            .unwrap_or(self.default_batch_size)
    }

    /// Start a batched run.
    ///
    /// Invalid args are an error. When the job is already running, or its
    /// own precondition says there is nothing to do, this is a no-op and
    /// returns `Ok(false)`.
    pub async fn start(&self, job: &dyn BatchedJob, args: JobArgs) -> AppResult<bool> {
        job.validate_args(&args)?;

        if !self.can_start(job, &args).await? {
            tracing::debug!("Job '{}' not started: already running or nothing to do", job.name());
            return Ok(false);
        }

        self.schedule_batch(job.name(), 1, args).await?;
        tracing::info!("Started batched job '{}'", job.name());
        Ok(true)
    }

    /// Whether a run may start: nothing in flight, and the job agrees.
    pub async fn can_start(&self, job: &dyn BatchedJob, args: &JobArgs) -> AppResult<bool> {
        if self.is_running(job, args).await? {
            return Ok(false);
        }
        job.can_start(args).await
    }

    /// Whether a `create_batch` task is pending or executing for `job`.
    ///
    /// Concurrent jobs only consider runs with the same args.
    pub async fn is_running(&self, job: &dyn BatchedJob, args: &JobArgs) -> AppResult<bool> {
        let scope = job
            .allow_concurrent()
            .then(|| Value::Object(args.clone()));
        let next = self
            .queue
            .next_scheduled(&hooks::create_batch(job.name()), scope.as_ref())
            .await?;
        Ok(next.is_some())
    }

    /// Handle a `create_batch` task.
    pub async fn handle_create_batch(
        &self,
        job: &dyn BatchedJob,
        batch_number: u32,
        args: JobArgs,
    ) -> AppResult<BatchOutcome> {
        if batch_number == 0 {
            return Err(AppError::invalid_argument("Batch numbers start at 1"));
        }
        job.validate_args(&args)?;
        self.monitor.validate_failure_rate(job.name()).await?;

        let page = BatchPage::new(batch_number, self.batch_size_for(job));
        let items = job.get_batch(page, &args).await?;

        if items.is_empty() {
            job.handle_complete(batch_number, &args).await?;
            tracing::info!(
                "Batched job '{}' complete after {} batch(es)",
                job.name(),
                batch_number - 1
            );
            return Ok(BatchOutcome::Completed {
                final_batch: batch_number,
            });
        }

        // All or nothing: one invalid item keeps the whole page unscheduled.
        for item in &items {
            job.validate_item(item)?;
        }

        let count = items.len();
        let hook = hooks::process_item(job.name());
        for item in items {
            let message = JobMessage::ProcessItem {
                item,
                args: args.clone(),
            };
            self.queue
                .schedule_immediate(&hook, message.into_task_args())
                .await?;
        }

        let next_batch = batch_number + 1;
        self.schedule_batch(job.name(), next_batch, args).await?;

        tracing::debug!(
            "Job '{}' batch {} enqueued {} item(s)",
            job.name(),
            batch_number,
            count
        );
        Ok(BatchOutcome::Scheduled {
            items: count,
            next_batch,
        })
    }

    /// Handle a `process_item` task of a batched job.
    pub async fn handle_process_item(
        &self,
        job: &dyn BatchedJob,
        item: &Item,
        args: &JobArgs,
    ) -> AppResult<()> {
        job.validate_args(args)?;
        job.validate_item(item)?;
        job.process_item(item, args).await
    }

    /// Start a one-time job over `items`.
    ///
    /// Every item is validated before any task is scheduled. Returns the
    /// number of item tasks enqueued.
    pub async fn start_one_time(&self, job: &dyn OneTimeJob, items: Vec<Item>) -> AppResult<usize> {
        for item in &items {
            job.validate_item(item)?;
        }

        let hook = hooks::process_item(job.name());
        let count = items.len();
        for item in items {
            let message = JobMessage::ProcessItem {
                item,
                args: JobArgs::new(),
            };
            self.queue
                .schedule_immediate(&hook, message.into_task_args())
                .await?;
        }

        tracing::info!("Started one-time job '{}' with {} item(s)", job.name(), count);
        Ok(count)
    }

    /// Handle a `process_item` task of a one-time job.
    pub async fn handle_one_time_item(&self, job: &dyn OneTimeJob, item: &Item) -> AppResult<()> {
        job.validate_item(item)?;
        job.process_item(item).await
    }

    async fn schedule_batch(&self, job_name: &str, batch_number: u32, args: JobArgs) -> AppResult<()> {
        let message = JobMessage::CreateBatch { batch_number, args };
        self.queue
            .schedule_immediate(&hooks::create_batch(job_name), message.into_task_args())
            .await?;
        Ok(())
    }
}
