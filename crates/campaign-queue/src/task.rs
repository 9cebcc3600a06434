//! Task records, statuses and search filters.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Identifier of a scheduled task.
pub type TaskId = Uuid;

/// Status of a scheduled task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    /// Waiting for its scheduled time or for a worker.
    Pending,
    /// Claimed by a worker and currently executing.
    Running,
    /// Handler returned successfully.
    Complete,
    /// Handler returned an error.
    Failed,
    /// Removed from the schedule before it ran.
    Canceled,
}

impl TaskStatus {
    /// Check if the task is in a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Complete | Self::Failed | Self::Canceled)
    }

    /// Return the status as a lowercase string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Complete => "complete",
            Self::Failed => "failed",
            Self::Canceled => "canceled",
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A task stored in the queue.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    /// Unique task identifier.
    pub id: TaskId,
    /// Hook the task is dispatched to.
    pub hook: String,
    /// Positional arguments handed to the hook's handler.
    pub args: Vec<Value>,
    /// Current status.
    pub status: TaskStatus,
    /// Earliest time the task may run.
    pub scheduled_at: DateTime<Utc>,
    /// Recurrence interval in seconds, for recurring schedules.
    pub interval_seconds: Option<i64>,
    /// Number of times a worker has claimed this task.
    pub attempts: u32,
    /// Error message recorded by the last failed execution.
    pub last_error: Option<String>,
    /// When the task was created.
    pub created_at: DateTime<Utc>,
    /// When the task last changed status.
    pub updated_at: DateTime<Utc>,
}

impl Task {
    /// Create a new pending task.
    pub fn new(
        hook: impl Into<String>,
        args: Vec<Value>,
        scheduled_at: DateTime<Utc>,
        interval_seconds: Option<i64>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::now_v7(),
            hook: hook.into(),
            args,
            status: TaskStatus::Pending,
            scheduled_at,
            interval_seconds,
            attempts: 0,
            last_error: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Whether this task belongs to a recurring schedule.
    pub fn is_recurring(&self) -> bool {
        self.interval_seconds.is_some()
    }

    /// Whether any positional argument equals `value`.
    pub fn carries(&self, value: &Value) -> bool {
        self.args.iter().any(|arg| arg == value)
    }
}

/// Result of a "next scheduled" lookup for a hook.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NextRun {
    /// The earliest pending task runs at this time.
    At(DateTime<Utc>),
    /// Nothing is pending but a task is executing right now.
    InProgress,
}

/// Filter for searching task history.
#[derive(Debug, Clone, Default)]
pub struct TaskFilter {
    /// Exact hook name.
    pub hook: Option<String>,
    /// Task status.
    pub status: Option<TaskStatus>,
    /// A positional argument the task must carry.
    pub args: Option<Value>,
    /// Only tasks updated at or after this time.
    pub updated_after: Option<DateTime<Utc>>,
    /// Only tasks updated at or before this time.
    pub updated_before: Option<DateTime<Utc>>,
    /// Maximum number of results.
    pub limit: Option<usize>,
}

impl TaskFilter {
    /// Filter on a hook name.
    pub fn hook(hook: impl Into<String>) -> Self {
        Self {
            hook: Some(hook.into()),
            ..Default::default()
        }
    }

    /// Restrict to a status.
    pub fn with_status(mut self, status: TaskStatus) -> Self {
        self.status = Some(status);
        self
    }

    /// Restrict to tasks carrying a positional argument.
    pub fn with_args(mut self, args: Value) -> Self {
        self.args = Some(args);
        self
    }

    /// Restrict to tasks updated at or after `since`.
    pub fn updated_after(mut self, since: DateTime<Utc>) -> Self {
        self.updated_after = Some(since);
        self
    }

    /// Restrict to tasks updated at or before `until`.
    pub fn updated_before(mut self, until: DateTime<Utc>) -> Self {
        self.updated_before = Some(until);
        self
    }

    /// Cap the number of results.
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Check whether a task satisfies every set criterion.
    pub fn matches(&self, task: &Task) -> bool {
        if let Some(hook) = &self.hook {
            if &task.hook != hook {
                return false;
            }
        }
        if let Some(status) = self.status {
            if task.status != status {
                return false;
            }
        }
        if let Some(args) = &self.args {
            if !task.carries(args) {
                return false;
            }
        }
        if let Some(after) = self.updated_after {
            if task.updated_at < after {
                return false;
            }
        }
        if let Some(before) = self.updated_before {
            if task.updated_at > before {
                return false;
            }
        }
        true
    }
}

/// Queue statistics.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueStats {
    /// Number of pending tasks.
    pub pending: usize,
    /// Number of running tasks.
    pub running: usize,
    /// Number of completed tasks retained in history.
    pub complete: usize,
    /// Number of failed tasks retained in history.
    pub failed: usize,
    /// Number of canceled tasks retained in history.
    pub canceled: usize,
}
