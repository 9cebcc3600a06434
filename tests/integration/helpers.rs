//! Shared test helpers for integration tests.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::Duration;
use serde_json::{Value, json};

use campaign_core::config::{AppConfig, WorkerConfig};
use campaign_core::error::AppError;
use campaign_core::result::AppResult;
use campaign_core::types::{Item, JobArgs, item_id, require_id_arg};
use campaign_jobs::{
    BatchPage, BatchedJob, Job, JobRegistry, JobService, OneTimeJob, RecurringJob, RunnableJob,
    ScheduleAnchor,
};
use campaign_queue::{InMemoryTaskQueue, TaskFilter, TaskStatus};
use campaign_worker::WorkerRunner;

/// Test application context
pub struct TestApp {
    /// Queue shared by the service and the worker
    pub queue: Arc<InMemoryTaskQueue>,
    /// Job service under test
    pub service: Arc<JobService>,
    /// Worker executing queued tasks
    pub runner: WorkerRunner,
}

impl TestApp {
    /// Create a test application hosting `jobs` with default settings
    pub async fn new(jobs: Vec<Arc<dyn Job>>) -> Self {
        Self::with_config(jobs, AppConfig::default()).await
    }

    /// Create a test application hosting `jobs`
    pub async fn with_config(jobs: Vec<Arc<dyn Job>>, config: AppConfig) -> Self {
        let queue = Arc::new(InMemoryTaskQueue::new(&config.queue));
        let registry = JobRegistry::new(move || jobs.clone());
        let service = Arc::new(
            JobService::new(queue.clone(), Arc::new(registry), &config)
                .expect("Failed to build job service"),
        );
        service.init().await.expect("Failed to init job service");

        let runner = WorkerRunner::new(
            Arc::clone(&queue),
            Arc::clone(&service),
            WorkerConfig {
                claim_limit: 100,
                ..WorkerConfig::default()
            },
            "test-worker".to_string(),
        );

        Self {
            queue,
            service,
            runner,
        }
    }

    /// Run the worker until nothing is due
    pub async fn drain(&self) -> usize {
        self.runner.drain(100).await
    }

    /// Number of tasks on `hook` with `status`
    pub async fn count(&self, hook: &str, status: TaskStatus) -> usize {
        self.queue
            .records(&TaskFilter::hook(hook).with_status(status))
            .await
            .len()
    }

    /// Error messages of failed tasks on `hook`
    pub async fn failures(&self, hook: &str) -> Vec<String> {
        self.queue
            .records(&TaskFilter::hook(hook).with_status(TaskStatus::Failed))
            .await
            .into_iter()
            .filter_map(|task| task.last_error)
            .collect()
    }
}

/// Build job args from a JSON object
pub fn args(value: Value) -> JobArgs {
    match value {
        Value::Object(map) => map,
        other => panic!("job args must be an object, got {other}"),
    }
}

/// Sort item IDs for order-independent comparison
pub fn sorted_ids(items: &[Item]) -> Vec<u64> {
    let mut ids: Vec<u64> = items.iter().map(|i| item_id(i).expect("id")).collect();
    ids.sort_unstable();
    ids
}

/// Batched job over a list of abandoned cart IDs
#[derive(Debug)]
pub struct AbandonedCartJob {
    carts: Vec<u64>,
    batch_size: usize,
    failing: HashSet<u64>,
    deleted: HashSet<u64>,
    interval: Option<Duration>,
    processed: Mutex<Vec<Item>>,
    completions: Mutex<Vec<u32>>,
}

impl AbandonedCartJob {
    pub fn new(carts: Vec<u64>, batch_size: usize) -> Self {
        Self {
            carts,
            batch_size,
            failing: HashSet::new(),
            deleted: HashSet::new(),
            interval: None,
            processed: Mutex::new(Vec::new()),
            completions: Mutex::new(Vec::new()),
        }
    }

    /// Carts whose reminder email fails
    pub fn failing_on(mut self, ids: &[u64]) -> Self {
        self.failing = ids.iter().copied().collect();
        self
    }

    /// Carts deleted after being paged
    pub fn deleted(mut self, ids: &[u64]) -> Self {
        self.deleted = ids.iter().copied().collect();
        self
    }

    /// Re-run on an interval
    pub fn every(mut self, interval: Duration) -> Self {
        self.interval = Some(interval);
        self
    }

    pub fn processed(&self) -> Vec<Item> {
        self.processed.lock().expect("lock").clone()
    }

    pub fn completions(&self) -> Vec<u32> {
        self.completions.lock().expect("lock").clone()
    }
}

impl Job for AbandonedCartJob {
    fn name(&self) -> &str {
        "abandoned_cart"
    }

    fn as_batched(&self) -> Option<&dyn BatchedJob> {
        Some(self)
    }

    fn as_recurring(&self) -> Option<&dyn RecurringJob> {
        self.interval.map(|_| self as &dyn RecurringJob)
    }
}

#[async_trait]
impl BatchedJob for AbandonedCartJob {
    fn batch_size(&self) -> Option<usize> {
        Some(self.batch_size)
    }

    fn validate_item(&self, item: &Item) -> AppResult<()> {
        item_id(item).map(|_| ())
    }

    async fn get_batch(&self, page: BatchPage, _args: &JobArgs) -> AppResult<Vec<Item>> {
        Ok(self
            .carts
            .iter()
            .skip(page.offset())
            .take(page.size)
            .map(|id| json!(id))
            .collect())
    }

    async fn process_item(&self, item: &Item, _args: &JobArgs) -> AppResult<()> {
        let id = item_id(item)?;
        if self.deleted.contains(&id) {
            return Err(AppError::item_not_found(format!("Cart {id} no longer exists")));
        }
        if self.failing.contains(&id) {
            return Err(AppError::internal(format!("Mail delivery for cart {id} failed")));
        }
        self.processed.lock().expect("lock").push(item.clone());
        Ok(())
    }

    async fn handle_complete(&self, final_batch_number: u32, _args: &JobArgs) -> AppResult<()> {
        self.completions.lock().expect("lock").push(final_batch_number);
        Ok(())
    }
}

impl RecurringJob for AbandonedCartJob {
    fn interval(&self) -> Duration {
        self.interval.unwrap_or_else(|| Duration::hours(1))
    }
}

/// Batched job run once per workflow, several workflows at a time
#[derive(Debug, Default)]
pub struct WorkflowJob {
    processed: Mutex<Vec<(u64, Item)>>,
}

impl WorkflowJob {
    pub fn processed(&self) -> Vec<(u64, Item)> {
        self.processed.lock().expect("lock").clone()
    }
}

impl Job for WorkflowJob {
    fn name(&self) -> &str {
        "workflow_enrollment"
    }

    fn as_batched(&self) -> Option<&dyn BatchedJob> {
        Some(self)
    }
}

#[async_trait]
impl BatchedJob for WorkflowJob {
    fn allow_concurrent(&self) -> bool {
        true
    }

    fn validate_args(&self, args: &JobArgs) -> AppResult<()> {
        require_id_arg(args, "workflow_id").map(|_| ())
    }

    fn validate_item(&self, item: &Item) -> AppResult<()> {
        item_id(item).map(|_| ())
    }

    async fn get_batch(&self, page: BatchPage, args: &JobArgs) -> AppResult<Vec<Item>> {
        let workflow = require_id_arg(args, "workflow_id")?;
        // Each workflow enrolls three contacts.
        let contacts: Vec<Item> = (1..=3).map(|c| json!(workflow * 100 + c)).collect();
        Ok(contacts
            .into_iter()
            .skip(page.offset())
            .take(page.size)
            .collect())
    }

    async fn process_item(&self, item: &Item, args: &JobArgs) -> AppResult<()> {
        let workflow = require_id_arg(args, "workflow_id")?;
        self.processed
            .lock()
            .expect("lock")
            .push((workflow, item.clone()));
        Ok(())
    }
}

/// One-time job resending receipts for explicit order IDs
#[derive(Debug, Default)]
pub struct ResendReceiptsJob {
    processed: Mutex<Vec<Item>>,
}

impl ResendReceiptsJob {
    pub fn processed(&self) -> Vec<Item> {
        self.processed.lock().expect("lock").clone()
    }
}

impl Job for ResendReceiptsJob {
    fn name(&self) -> &str {
        "resend_receipts"
    }

    fn as_one_time(&self) -> Option<&dyn OneTimeJob> {
        Some(self)
    }
}

#[async_trait]
impl OneTimeJob for ResendReceiptsJob {
    fn validate_item(&self, item: &Item) -> AppResult<()> {
        item_id(item).map(|_| ())
    }

    async fn process_item(&self, item: &Item) -> AppResult<()> {
        self.processed.lock().expect("lock").push(item.clone());
        Ok(())
    }
}

/// Recurring single-task job
#[derive(Debug)]
pub struct DigestJob {
    name: &'static str,
    enabled: AtomicBool,
    anchor: ScheduleAnchor,
    runs: AtomicUsize,
}

impl DigestJob {
    pub fn hourly(name: &'static str) -> Self {
        Self {
            name,
            enabled: AtomicBool::new(true),
            anchor: ScheduleAnchor::Interval,
            runs: AtomicUsize::new(0),
        }
    }

    pub fn nightly(name: &'static str) -> Self {
        Self {
            anchor: ScheduleAnchor::LocalMidnight,
            ..Self::hourly(name)
        }
    }

    pub fn disabled(self) -> Self {
        self.set_enabled(false);
        self
    }

    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::SeqCst);
    }

    pub fn runs(&self) -> usize {
        self.runs.load(Ordering::SeqCst)
    }
}

impl Job for DigestJob {
    fn name(&self) -> &str {
        self.name
    }

    fn as_runnable(&self) -> Option<&dyn RunnableJob> {
        Some(self)
    }

    fn as_recurring(&self) -> Option<&dyn RecurringJob> {
        Some(self)
    }
}

#[async_trait]
impl RunnableJob for DigestJob {
    async fn run(&self) -> AppResult<()> {
        self.runs.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

impl RecurringJob for DigestJob {
    fn interval(&self) -> Duration {
        match self.anchor {
            ScheduleAnchor::Interval => Duration::hours(1),
            ScheduleAnchor::LocalMidnight => Duration::days(1),
        }
    }

    fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    fn anchor(&self) -> ScheduleAnchor {
        self.anchor
    }
}
