//! In-memory task queue implementation.
//!
//! Suitable for development, tests and single-process deployments. Tasks do
//! not survive a restart.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde_json::Value;
use tokio::sync::Mutex;
use tracing;

use campaign_core::config::QueueConfig;
use campaign_core::error::AppError;
use campaign_core::result::AppResult;

use crate::queue::TaskQueue;
use crate::task::{NextRun, QueueStats, Task, TaskFilter, TaskId, TaskStatus};

/// In-memory task queue.
///
/// Pending and running tasks are always retained. Terminal records are kept
/// as history for [`TaskQueue::search`], bounded by `history_limit`; the
/// oldest terminal records are discarded first.
#[derive(Debug, Clone)]
pub struct InMemoryTaskQueue {
    /// Tasks in insertion order.
    tasks: Arc<Mutex<Vec<Task>>>,
    /// Maximum number of terminal records retained.
    history_limit: usize,
}

impl InMemoryTaskQueue {
    /// Create a new in-memory queue.
    pub fn new(config: &QueueConfig) -> Self {
        Self {
            tasks: Arc::new(Mutex::new(Vec::new())),
            history_limit: config.history_limit,
        }
    }

    /// Claim up to `limit` tasks that are due at `now`.
    ///
    /// Claimed tasks move to `Running`, earliest scheduled first and in
    /// insertion order for equal times. Claiming a recurring task enqueues
    /// its next occurrence, skipping occurrences that are already in the past.
    pub async fn claim_due(&self, now: DateTime<Utc>, limit: usize) -> Vec<Task> {
        let mut tasks = self.tasks.lock().await;

        let mut due: Vec<usize> = tasks
            .iter()
            .enumerate()
            .filter(|(_, t)| t.status == TaskStatus::Pending && t.scheduled_at <= now)
            .map(|(i, _)| i)
            .collect();
        due.sort_by_key(|&i| tasks[i].scheduled_at);
        due.truncate(limit);

        let mut claimed = Vec::with_capacity(due.len());
        let mut successors = Vec::new();

        for i in due {
            let task = &mut tasks[i];
            task.status = TaskStatus::Running;
            task.attempts += 1;
            task.updated_at = Utc::now();

            if let Some(interval) = task.interval_seconds {
                let next = next_occurrence(task.scheduled_at, interval, now);
                tracing::debug!(
                    "Recurring task '{}' next occurrence at {}",
                    task.hook,
                    next
                );
                successors.push(Task::new(
                    task.hook.clone(),
                    task.args.clone(),
                    next,
                    Some(interval),
                ));
            }

            claimed.push(task.clone());
        }

        tasks.extend(successors);
        claimed
    }

    /// Mark a running task as completed.
    pub async fn mark_complete(&self, id: TaskId) -> AppResult<()> {
        self.finish(id, TaskStatus::Complete, None).await
    }

    /// Mark a running task as failed, recording the error message.
    pub async fn mark_failed(&self, id: TaskId, error: &str) -> AppResult<()> {
        self.finish(id, TaskStatus::Failed, Some(error.to_string()))
            .await
    }

    /// Snapshot every retained task matching `filter`, in insertion order.
    pub async fn records(&self, filter: &TaskFilter) -> Vec<Task> {
        let tasks = self.tasks.lock().await;
        let matching = tasks.iter().filter(|t| filter.matches(t)).cloned();
        match filter.limit {
            Some(limit) => matching.take(limit).collect(),
            None => matching.collect(),
        }
    }

    /// Count retained tasks per status.
    pub async fn stats(&self) -> QueueStats {
        let tasks = self.tasks.lock().await;
        let mut stats = QueueStats::default();
        for task in tasks.iter() {
            match task.status {
                TaskStatus::Pending => stats.pending += 1,
                TaskStatus::Running => stats.running += 1,
                TaskStatus::Complete => stats.complete += 1,
                TaskStatus::Failed => stats.failed += 1,
                TaskStatus::Canceled => stats.canceled += 1,
            }
        }
        stats
    }

    async fn finish(&self, id: TaskId, status: TaskStatus, error: Option<String>) -> AppResult<()> {
        let mut tasks = self.tasks.lock().await;

        let task = tasks
            .iter_mut()
            .find(|t| t.id == id)
            .ok_or_else(|| AppError::queue(format!("Task {id} not found")))?;

        if task.status != TaskStatus::Running {
            return Err(AppError::queue(format!(
                "Task {id} is {}, expected running",
                task.status
            )));
        }

        task.status = status;
        task.last_error = error;
        task.updated_at = Utc::now();

        Self::prune_history(&mut tasks, self.history_limit);
        Ok(())
    }

    async fn insert(&self, task: Task) -> TaskId {
        let id = task.id;
        tracing::debug!(
            "Scheduled task: id={}, hook='{}', at={}",
            id,
            task.hook,
            task.scheduled_at
        );
        self.tasks.lock().await.push(task);
        id
    }

    /// Drop the oldest terminal records beyond `limit`.
    fn prune_history(tasks: &mut Vec<Task>, limit: usize) {
        let terminal = tasks.iter().filter(|t| t.status.is_terminal()).count();
        if terminal <= limit {
            return;
        }

        let mut excess = terminal - limit;
        tasks.retain(|t| {
            if excess > 0 && t.status.is_terminal() {
                excess -= 1;
                false
            } else {
                true
            }
        });
    }
}

impl Default for InMemoryTaskQueue {
    fn default() -> Self {
        Self::new(&QueueConfig::default())
    }
}

#[async_trait]
impl TaskQueue for InMemoryTaskQueue {
    async fn schedule_immediate(&self, hook: &str, args: Vec<Value>) -> AppResult<TaskId> {
        Ok(self.insert(Task::new(hook, args, Utc::now(), None)).await)
    }

    async fn schedule_single(
        &self,
        hook: &str,
        args: Vec<Value>,
        run_at: DateTime<Utc>,
    ) -> AppResult<TaskId> {
        Ok(self.insert(Task::new(hook, args, run_at, None)).await)
    }

    async fn schedule_recurring(
        &self,
        hook: &str,
        args: Vec<Value>,
        first_run: DateTime<Utc>,
        interval: Duration,
    ) -> AppResult<TaskId> {
        let seconds = interval.num_seconds();
        if seconds <= 0 {
            return Err(AppError::invalid_argument(format!(
                "Recurring interval for '{hook}' must be positive, got {seconds}s"
            )));
        }
        Ok(self
            .insert(Task::new(hook, args, first_run, Some(seconds)))
            .await)
    }

    async fn cancel(&self, hook: &str) -> AppResult<usize> {
        let mut tasks = self.tasks.lock().await;
        let now = Utc::now();
        let mut canceled = 0;

        for task in tasks
            .iter_mut()
            .filter(|t| t.hook == hook && t.status == TaskStatus::Pending)
        {
            task.status = TaskStatus::Canceled;
            task.updated_at = now;
            canceled += 1;
        }

        Self::prune_history(&mut tasks, self.history_limit);

        if canceled > 0 {
            tracing::debug!("Canceled {} pending task(s) for hook '{}'", canceled, hook);
        }
        Ok(canceled)
    }

    async fn next_scheduled(
        &self,
        hook: &str,
        args_scope: Option<&Value>,
    ) -> AppResult<Option<NextRun>> {
        let tasks = self.tasks.lock().await;
        let in_scope = |t: &&Task| t.hook == hook && args_scope.is_none_or(|a| t.carries(a));

        let pending = tasks
            .iter()
            .filter(in_scope)
            .filter(|t| t.status == TaskStatus::Pending)
            .map(|t| t.scheduled_at)
            .min();

        if let Some(at) = pending {
            return Ok(Some(NextRun::At(at)));
        }

        let running = tasks
            .iter()
            .filter(in_scope)
            .any(|t| t.status == TaskStatus::Running);

        Ok(running.then_some(NextRun::InProgress))
    }

    async fn search(&self, filter: &TaskFilter) -> AppResult<Vec<TaskId>> {
        Ok(self.records(filter).await.into_iter().map(|t| t.id).collect())
    }

    async fn get(&self, id: TaskId) -> AppResult<Option<Task>> {
        let tasks = self.tasks.lock().await;
        Ok(tasks.iter().find(|t| t.id == id).cloned())
    }
}

/// First occurrence after `now` of a schedule anchored at `scheduled`.
fn next_occurrence(scheduled: DateTime<Utc>, interval_seconds: i64, now: DateTime<Utc>) -> DateTime<Utc> {
    let interval = Duration::seconds(interval_seconds);
    let mut next = scheduled + interval;
    if next <= now {
        let behind = (now - next).num_seconds() / interval_seconds + 1;
        next += interval * behind as i32;
    }
    next
}
