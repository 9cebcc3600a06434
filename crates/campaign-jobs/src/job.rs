//! Job capability traits.
//!
//! A concrete job is a plain struct implementing [`Job`] plus whichever
//! capabilities it needs. The service discovers capabilities through the
//! `as_*` accessors instead of a class hierarchy:
//!
//! - [`BatchedJob`]: pulls items page by page until a page comes back empty
//! - [`OneTimeJob`]: receives the complete item list up front
//! - [`RecurringJob`]: re-triggered by the queue on an interval
//! - [`RunnableJob`]: does all its work in a single task on `jobs/{name}`
//! - [`StartOnHook`]: started when an extra, externally fired hook runs
//!
//! Jobs own no mutable run state. Everything about a run lives in the task
//! queue, so every handler may be invoked concurrently and more than once.

use std::fmt::Debug;

use async_trait::async_trait;
use chrono::Duration;
use serde_json::Value;

use campaign_core::result::AppResult;
use campaign_core::types::{Item, JobArgs};

use crate::hooks;
use crate::router::HookRoutes;

/// Base contract shared by every job.
pub trait Job: Send + Sync + Debug + 'static {
    /// Unique, stable job name (lowercase snake_case).
    fn name(&self) -> &str;

    /// Register additional hook routes.
    ///
    /// Capability hooks are wired by the service before this is called.
    fn init(&self, _routes: &HookRoutes) -> AppResult<()> {
        Ok(())
    }

    /// Batched capability.
    fn as_batched(&self) -> Option<&dyn BatchedJob> {
        None
    }

    /// One-time capability.
    fn as_one_time(&self) -> Option<&dyn OneTimeJob> {
        None
    }

    /// Recurring capability.
    fn as_recurring(&self) -> Option<&dyn RecurringJob> {
        None
    }

    /// Single-task capability.
    fn as_runnable(&self) -> Option<&dyn RunnableJob> {
        None
    }

    /// Start-on-hook capability.
    fn as_start_on_hook(&self) -> Option<&dyn StartOnHook> {
        None
    }
}

/// One page of a batched run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchPage {
    /// One-based batch number.
    pub number: u32,
    /// Maximum number of items in the page.
    pub size: usize,
}

impl BatchPage {
    /// Create a page descriptor.
    pub fn new(number: u32, size: usize) -> Self {
        Self { number, size }
    }

    /// Query offset for paginated sources: `size * (number - 1)`.
    pub fn offset(&self) -> usize {
        self.size * (self.number.saturating_sub(1) as usize)
    }
}

/// A job that processes an unbounded item set in pages.
///
/// The run ends only when [`BatchedJob::get_batch`] returns an empty page.
/// Sources that change while a run is in flight should be ordered by an
/// immutable ascending key (e.g. creation order); ordering by "last
/// modified" lets items shift between pages and be skipped or repeated.
#[async_trait]
pub trait BatchedJob: Job {
    /// Page size, or `None` for `jobs.default_batch_size`.
    fn batch_size(&self) -> Option<usize> {
        None
    }

    /// Whether several runs with different args may be in flight at once.
    ///
    /// When true, the "already running" guard only considers runs with
    /// identical args.
    fn allow_concurrent(&self) -> bool {
        false
    }

    /// Validate run args. Invalid args are a hard error.
    fn validate_args(&self, _args: &JobArgs) -> AppResult<()> {
        Ok(())
    }

    /// Validate an item before it is scheduled or processed.
    fn validate_item(&self, item: &Item) -> AppResult<()>;

    /// Job-specific precondition for starting a run.
    async fn can_start(&self, _args: &JobArgs) -> AppResult<bool> {
        Ok(true)
    }

    /// Fetch the items of `page`. An empty result ends the run.
    async fn get_batch(&self, page: BatchPage, args: &JobArgs) -> AppResult<Vec<Item>>;

    /// Process one item.
    async fn process_item(&self, item: &Item, args: &JobArgs) -> AppResult<()>;

    /// Called once when `final_batch_number` came back empty.
    async fn handle_complete(&self, _final_batch_number: u32, _args: &JobArgs) -> AppResult<()> {
        Ok(())
    }
}

/// A job that receives its complete item list when started.
#[async_trait]
pub trait OneTimeJob: Job {
    /// Validate an item before it is scheduled or processed.
    fn validate_item(&self, item: &Item) -> AppResult<()>;

    /// Process one item.
    async fn process_item(&self, item: &Item) -> AppResult<()>;
}

/// A job doing all its work in a single task on `jobs/{name}`.
#[async_trait]
pub trait RunnableJob: Job {
    /// Do the work.
    async fn run(&self) -> AppResult<()>;
}

/// How the first run of a recurring schedule is placed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScheduleAnchor {
    /// First run one interval from now.
    #[default]
    Interval,
    /// First run at the next local midnight in the site timezone.
    LocalMidnight,
}

/// A job re-triggered by the queue on a fixed interval.
pub trait RecurringJob: Job {
    /// Time between runs.
    fn interval(&self) -> Duration;

    /// Whether the schedule should exist at all. Disabled jobs have their
    /// schedule canceled.
    fn is_enabled(&self) -> bool {
        true
    }

    /// Placement of the first run.
    fn anchor(&self) -> ScheduleAnchor {
        ScheduleAnchor::Interval
    }

    /// Hook fired by the recurrence: the start hook for batched jobs,
    /// `jobs/{name}` otherwise.
    fn schedule_hook(&self) -> String {
        if self.as_batched().is_some() {
            hooks::start(self.name())
        } else {
            hooks::run(self.name())
        }
    }

    /// Positional args carried by every recurring task.
    fn schedule_args(&self) -> Vec<Value> {
        Vec::new()
    }
}

/// A job started whenever an extra hook fires.
///
/// The task's first positional argument, if any, becomes the run args.
pub trait StartOnHook: Job {
    /// Name of the hook that starts the job.
    fn start_hook(&self) -> String;
}
