//! Task queue contract consumed by the job layer.
//!
//! This crate provides:
//! - The [`TaskQueue`] trait: immediate, delayed and recurring scheduling,
//!   cancellation, "next scheduled" lookup and history search
//! - Task records, statuses and search filters
//! - [`InMemoryTaskQueue`], a reference backend used by the bundled worker
//!   and by tests

pub mod memory;
pub mod queue;
pub mod task;

pub use memory::InMemoryTaskQueue;
pub use queue::TaskQueue;
pub use task::{NextRun, QueueStats, Task, TaskFilter, TaskId, TaskStatus};
