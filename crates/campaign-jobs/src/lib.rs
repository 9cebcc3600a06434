//! Background job orchestration for campaign automation.
//!
//! Jobs never own run state: every run is a chain of tasks in a
//! [`campaign_queue::TaskQueue`], addressed by hook names under `jobs/`.
//!
//! - [`job`] defines the capability traits a concrete job implements
//! - [`batch`] drives batched and one-time runs
//! - [`recurrence`] keeps recurring schedules in place
//! - [`monitor`] stops jobs whose items keep failing
//! - [`registry`] holds the fixed job set of the process
//! - [`service`] wires everything together for the worker

pub mod batch;
pub mod hooks;
pub mod job;
pub mod message;
pub mod monitor;
pub mod recurrence;
pub mod registry;
pub mod router;
pub mod service;

#[cfg(test)]
pub(crate) mod testing;

pub use batch::{BatchController, BatchOutcome};
pub use hooks::HookAction;
pub use job::{
    BatchPage, BatchedJob, Job, OneTimeJob, RecurringJob, RunnableJob, ScheduleAnchor, StartOnHook,
};
pub use message::JobMessage;
pub use monitor::JobMonitor;
pub use recurrence::{Recurrence, ScheduleOutcome};
pub use registry::JobRegistry;
pub use router::{HookRoutes, JobRouter, Route};
pub use service::{InitReport, JobService};
