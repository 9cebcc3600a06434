//! Task executor: hands claimed tasks to the job service.

use std::sync::Arc;

use tracing;

use campaign_jobs::JobService;
use campaign_queue::{InMemoryTaskQueue, Task};

/// Outcome of executing one task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskOutcome {
    /// The handler returned successfully.
    Completed,
    /// The handler failed with this message.
    Failed(String),
}

/// Executes claimed tasks and records their outcome in the queue.
#[derive(Debug, Clone)]
pub struct TaskExecutor {
    /// Queue the tasks were claimed from.
    queue: Arc<InMemoryTaskQueue>,
    /// Job service routing tasks to jobs.
    service: Arc<JobService>,
}

impl TaskExecutor {
    /// Create a new executor.
    pub fn new(queue: Arc<InMemoryTaskQueue>, service: Arc<JobService>) -> Self {
        Self { queue, service }
    }

    /// Execute a claimed task.
    ///
    /// Handler errors never escape: they are logged and stored on the task
    /// so a failing item does not affect anything else in the queue.
    pub async fn execute(&self, task: &Task) -> TaskOutcome {
        tracing::debug!(
            "Executing task: id={}, hook='{}', attempt={}",
            task.id,
            task.hook,
            task.attempts
        );

        match self.service.dispatch(&task.hook, &task.args).await {
            Ok(()) => {
                if let Err(e) = self.queue.mark_complete(task.id).await {
                    tracing::error!("Failed to mark task {} as completed: {}", task.id, e);
                }
                TaskOutcome::Completed
            }
            Err(err) => {
                let message = err.to_string();
                if err.kind.is_job_exception() {
                    tracing::warn!(
                        task_id = %task.id,
                        hook = %task.hook,
                        code = err.kind.code(),
                        "Task failed: {}",
                        message
                    );
                } else {
                    tracing::error!(
                        task_id = %task.id,
                        hook = %task.hook,
                        code = err.kind.code(),
                        "Task failed: {}",
                        message
                    );
                }

                if let Err(e) = self.queue.mark_failed(task.id, &message).await {
                    tracing::error!("Failed to mark task {} as failed: {}", task.id, e);
                }
                TaskOutcome::Failed(message)
            }
        }
    }
}
