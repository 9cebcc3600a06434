//! Hook naming.
//!
//! Hook names are the addresses the task queue dispatches on:
//! `jobs/{job}/start`, `jobs/{job}/create_batch`, `jobs/{job}/process_item`
//! and plain `jobs/{job}` for simple recurring jobs.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Prefix shared by every job hook.
pub const HOOK_PREFIX: &str = "jobs";

/// Job name reserved for the midnight schedule self-check.
pub const MIDNIGHT_CHECK_JOB: &str = "midnight_schedule_check";

/// Per-job hook kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HookAction {
    /// Start a run of the job.
    Start,
    /// Create one batch of a batched run.
    CreateBatch,
    /// Process a single item.
    ProcessItem,
    /// Run a simple job in one go.
    Run,
}

impl HookAction {
    /// Path segment appended to `jobs/{job}`, if any.
    pub fn suffix(&self) -> Option<&'static str> {
        match self {
            Self::Start => Some("start"),
            Self::CreateBatch => Some("create_batch"),
            Self::ProcessItem => Some("process_item"),
            Self::Run => None,
        }
    }
}

impl fmt::Display for HookAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.suffix().unwrap_or("run"))
    }
}

/// Build the hook name for `job` and `action`.
pub fn hook_name(job: &str, action: HookAction) -> String {
    match action.suffix() {
        Some(suffix) => format!("{HOOK_PREFIX}/{job}/{suffix}"),
        None => format!("{HOOK_PREFIX}/{job}"),
    }
}

/// `jobs/{job}/start`
pub fn start(job: &str) -> String {
    hook_name(job, HookAction::Start)
}

/// `jobs/{job}/create_batch`
pub fn create_batch(job: &str) -> String {
    hook_name(job, HookAction::CreateBatch)
}

/// `jobs/{job}/process_item`
pub fn process_item(job: &str) -> String {
    hook_name(job, HookAction::ProcessItem)
}

/// `jobs/{job}`
pub fn run(job: &str) -> String {
    hook_name(job, HookAction::Run)
}

/// Hook of the midnight schedule self-check.
pub fn midnight_check() -> String {
    run(MIDNIGHT_CHECK_JOB)
}

/// Job names are lowercase snake_case so they embed cleanly in hook names.
pub fn is_valid_job_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
}
