//! Typed job messages and their positional task encoding.
//!
//! Tasks in the queue only carry positional JSON arguments. Each hook kind
//! decodes them into a [`JobMessage`] before anything reaches a job:
//!
//! | hook kind      | positional args      |
//! |----------------|----------------------|
//! | `start`        | `[args?]`            |
//! | `create_batch` | `[batch_number, args]` |
//! | `process_item` | `[item, args?]`      |
//! | run            | `[]`                 |

use serde_json::Value;

use campaign_core::error::AppError;
use campaign_core::result::AppResult;
use campaign_core::types::{Item, JobArgs};

use crate::hooks::HookAction;

/// A message addressed to one job.
#[derive(Debug, Clone, PartialEq)]
pub enum JobMessage {
    /// Start a run with these args.
    Start {
        /// Run arguments.
        args: JobArgs,
    },
    /// Create batch `batch_number` of a run.
    CreateBatch {
        /// One-based batch number.
        batch_number: u32,
        /// Run arguments.
        args: JobArgs,
    },
    /// Process one item.
    ProcessItem {
        /// The item.
        item: Item,
        /// Run arguments (empty for one-time jobs).
        args: JobArgs,
    },
    /// Run a simple job.
    Run,
}

impl JobMessage {
    /// The hook kind this message is sent on.
    pub fn action(&self) -> HookAction {
        match self {
            Self::Start { .. } => HookAction::Start,
            Self::CreateBatch { .. } => HookAction::CreateBatch,
            Self::ProcessItem { .. } => HookAction::ProcessItem,
            Self::Run => HookAction::Run,
        }
    }

    /// Encode as positional task arguments.
    pub fn into_task_args(self) -> Vec<Value> {
        match self {
            Self::Start { args } => vec![Value::Object(args)],
            Self::CreateBatch { batch_number, args } => {
                vec![Value::from(batch_number), Value::Object(args)]
            }
            Self::ProcessItem { item, args } if args.is_empty() => vec![item],
            Self::ProcessItem { item, args } => vec![item, Value::Object(args)],
            Self::Run => Vec::new(),
        }
    }

    /// Decode positional task arguments received on a hook of kind `action`.
    pub fn decode(action: HookAction, task_args: &[Value]) -> AppResult<Self> {
        match action {
            HookAction::Start => Ok(Self::Start {
                args: optional_args(task_args.first())?,
            }),
            HookAction::CreateBatch => {
                let batch_number = task_args
                    .first()
                    .and_then(Value::as_u64)
                    .and_then(|n| u32::try_from(n).ok())
                    .filter(|n| *n > 0)
                    .ok_or_else(|| {
                        AppError::invalid_argument("create_batch requires a positive batch number")
                    })?;
                let args = task_args
                    .get(1)
                    .ok_or_else(|| AppError::invalid_argument("create_batch requires args"))
                    .and_then(|v| optional_args(Some(v)))?;
                Ok(Self::CreateBatch { batch_number, args })
            }
            HookAction::ProcessItem => {
                let item = task_args
                    .first()
                    .cloned()
                    .ok_or_else(|| AppError::invalid_argument("process_item requires an item"))?;
                Ok(Self::ProcessItem {
                    item,
                    args: optional_args(task_args.get(1))?,
                })
            }
            HookAction::Run => Ok(Self::Run),
        }
    }
}

fn optional_args(value: Option<&Value>) -> AppResult<JobArgs> {
    match value {
        None | Some(Value::Null) => Ok(JobArgs::new()),
        Some(Value::Object(map)) => Ok(map.clone()),
        Some(other) => Err(AppError::invalid_argument(format!(
            "Job args must be a key/value map, got {other}"
        ))),
    }
}
