//! Task queue contract.
//!
//! Scheduling calls return as soon as the task is stored; execution happens
//! later on a worker, possibly concurrently with other tasks. Immediate tasks
//! run in FIFO-ish order at best.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde_json::Value;

use campaign_core::result::AppResult;

use crate::task::{NextRun, Task, TaskFilter, TaskId};

/// Durable store of scheduled tasks.
#[async_trait]
pub trait TaskQueue: Send + Sync + std::fmt::Debug + 'static {
    /// Schedule a task to run once, as soon as a worker is free.
    async fn schedule_immediate(&self, hook: &str, args: Vec<Value>) -> AppResult<TaskId>;

    /// Schedule a task to run once at `run_at`.
    async fn schedule_single(
        &self,
        hook: &str,
        args: Vec<Value>,
        run_at: DateTime<Utc>,
    ) -> AppResult<TaskId>;

    /// Schedule a task that first runs at `first_run` and then every `interval`.
    async fn schedule_recurring(
        &self,
        hook: &str,
        args: Vec<Value>,
        first_run: DateTime<Utc>,
        interval: Duration,
    ) -> AppResult<TaskId>;

    /// Cancel every pending task for `hook`. Running tasks are not touched.
    ///
    /// Returns the number of tasks canceled.
    async fn cancel(&self, hook: &str) -> AppResult<usize>;

    /// Look up when `hook` next runs.
    ///
    /// With `args_scope`, only tasks carrying that positional argument count.
    /// Returns `None` when nothing is pending or running.
    async fn next_scheduled(&self, hook: &str, args_scope: Option<&Value>)
    -> AppResult<Option<NextRun>>;

    /// Search task history.
    async fn search(&self, filter: &TaskFilter) -> AppResult<Vec<TaskId>>;

    /// Fetch a single task record.
    async fn get(&self, id: TaskId) -> AppResult<Option<Task>>;
}
