//! Fake jobs for unit tests.

use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::Duration;

use campaign_core::error::AppError;
use campaign_core::result::AppResult;
use campaign_core::types::{Item, JobArgs, item_id};

use crate::job::{
    BatchPage, BatchedJob, Job, OneTimeJob, RecurringJob, RunnableJob, ScheduleAnchor, StartOnHook,
};

/// Batched job paging over a fixed item list.
#[derive(Debug)]
pub(crate) struct ListJob {
    name: String,
    items: Vec<Item>,
    batch_size: Option<usize>,
    concurrent: bool,
    startable: bool,
    failing: Vec<u64>,
    interval: Option<Duration>,
    pages: Mutex<Vec<BatchPage>>,
    processed: Mutex<Vec<Item>>,
    completions: Mutex<Vec<u32>>,
}

impl ListJob {
    pub(crate) fn new(name: &str, items: Vec<Item>) -> Self {
        Self {
            name: name.to_string(),
            items,
            batch_size: None,
            concurrent: false,
            startable: true,
            failing: Vec::new(),
            interval: None,
            pages: Mutex::new(Vec::new()),
            processed: Mutex::new(Vec::new()),
            completions: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn with_batch_size(mut self, size: usize) -> Self {
        self.batch_size = Some(size);
        self
    }

    pub(crate) fn concurrent(mut self) -> Self {
        self.concurrent = true;
        self
    }

    pub(crate) fn not_startable(mut self) -> Self {
        self.startable = false;
        self
    }

    pub(crate) fn failing_on(mut self, ids: &[u64]) -> Self {
        self.failing = ids.to_vec();
        self
    }

    pub(crate) fn every(mut self, interval: Duration) -> Self {
        self.interval = Some(interval);
        self
    }

    pub(crate) fn processed(&self) -> Vec<Item> {
        self.processed.lock().expect("lock").clone()
    }

    pub(crate) fn completions(&self) -> Vec<u32> {
        self.completions.lock().expect("lock").clone()
    }

    pub(crate) fn pages(&self) -> Vec<BatchPage> {
        self.pages.lock().expect("lock").clone()
    }
}

impl Job for ListJob {
    fn name(&self) -> &str {
        &self.name
    }

    fn as_batched(&self) -> Option<&dyn BatchedJob> {
        Some(self)
    }

    fn as_recurring(&self) -> Option<&dyn RecurringJob> {
        self.interval.map(|_| self as &dyn RecurringJob)
    }
}

#[async_trait]
impl BatchedJob for ListJob {
    fn batch_size(&self) -> Option<usize> {
        self.batch_size
    }

    fn allow_concurrent(&self) -> bool {
        self.concurrent
    }

    fn validate_item(&self, item: &Item) -> AppResult<()> {
        item_id(item).map(|_| ())
    }

    async fn can_start(&self, _args: &JobArgs) -> AppResult<bool> {
        Ok(self.startable)
    }

    async fn get_batch(&self, page: BatchPage, _args: &JobArgs) -> AppResult<Vec<Item>> {
        self.pages.lock().expect("lock").push(page);
        Ok(self
            .items
            .iter()
            .skip(page.offset())
            .take(page.size)
            .cloned()
            .collect())
    }

    async fn process_item(&self, item: &Item, _args: &JobArgs) -> AppResult<()> {
        let id = item_id(item)?;
        if self.failing.contains(&id) {
            return Err(AppError::internal(format!("item {id} failed")));
        }
        self.processed.lock().expect("lock").push(item.clone());
        Ok(())
    }

    async fn handle_complete(&self, final_batch_number: u32, _args: &JobArgs) -> AppResult<()> {
        self.completions.lock().expect("lock").push(final_batch_number);
        Ok(())
    }
}

impl RecurringJob for ListJob {
    fn interval(&self) -> Duration {
        self.interval.unwrap_or_else(|| Duration::hours(1))
    }
}

/// One-time job recording the items it processed.
#[derive(Debug)]
pub(crate) struct IdsJob {
    name: String,
    processed: Mutex<Vec<Item>>,
}

impl IdsJob {
    pub(crate) fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            processed: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn processed(&self) -> Vec<Item> {
        self.processed.lock().expect("lock").clone()
    }
}

impl Job for IdsJob {
    fn name(&self) -> &str {
        &self.name
    }

    fn as_one_time(&self) -> Option<&dyn OneTimeJob> {
        Some(self)
    }
}

#[async_trait]
impl OneTimeJob for IdsJob {
    fn validate_item(&self, item: &Item) -> AppResult<()> {
        item_id(item).map(|_| ())
    }

    async fn process_item(&self, item: &Item) -> AppResult<()> {
        self.processed.lock().expect("lock").push(item.clone());
        Ok(())
    }
}

/// Recurring single-task job counting its runs.
#[derive(Debug)]
pub(crate) struct TickJob {
    name: String,
    enabled: AtomicBool,
    anchor: ScheduleAnchor,
    interval: Duration,
    start_hook: Option<String>,
    runs: AtomicUsize,
}

impl TickJob {
    pub(crate) fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            enabled: AtomicBool::new(true),
            anchor: ScheduleAnchor::Interval,
            interval: Duration::hours(1),
            start_hook: None,
            runs: AtomicUsize::new(0),
        }
    }

    pub(crate) fn disabled(self) -> Self {
        self.set_enabled(false);
        self
    }

    pub(crate) fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::SeqCst);
    }

    pub(crate) fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub(crate) fn at_midnight(mut self) -> Self {
        self.anchor = ScheduleAnchor::LocalMidnight;
        self.interval = Duration::days(1);
        self
    }

    pub(crate) fn on_hook(mut self, hook: &str) -> Self {
        self.start_hook = Some(hook.to_string());
        self
    }

    pub(crate) fn runs(&self) -> usize {
        self.runs.load(Ordering::SeqCst)
    }
}

impl Job for TickJob {
    fn name(&self) -> &str {
        &self.name
    }

    fn as_recurring(&self) -> Option<&dyn RecurringJob> {
        Some(self)
    }

    fn as_runnable(&self) -> Option<&dyn RunnableJob> {
        Some(self)
    }

    fn as_start_on_hook(&self) -> Option<&dyn StartOnHook> {
        self.start_hook.as_ref().map(|_| self as &dyn StartOnHook)
    }
}

#[async_trait]
impl RunnableJob for TickJob {
    async fn run(&self) -> AppResult<()> {
        self.runs.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

impl RecurringJob for TickJob {
    fn interval(&self) -> Duration {
        self.interval
    }

    fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    fn anchor(&self) -> ScheduleAnchor {
        self.anchor
    }
}

impl StartOnHook for TickJob {
    fn start_hook(&self) -> String {
        self.start_hook.clone().unwrap_or_default()
    }
}
