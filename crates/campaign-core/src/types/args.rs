//! Job arguments and batch items.
//!
//! Both are plain JSON values so they can be stored verbatim in the queue's
//! durable storage. A live handle can never end up in a task payload because
//! there is no way to put one into a [`serde_json::Value`].

use serde_json::{Map, Value};

use crate::error::AppError;
use crate::result::AppResult;

/// Key/value arguments passed to a job run.
pub type JobArgs = Map<String, Value>;

/// A single unit of work yielded by a batch or handed to a one-time job.
pub type Item = Value;

/// An empty argument map, used by jobs that take no arguments.
pub fn empty_args() -> JobArgs {
    Map::new()
}

/// Interpret an item as a positive integer ID.
///
/// Accepts JSON numbers and numeric strings, which is what most paging
/// sources yield.
pub fn item_id(item: &Item) -> AppResult<u64> {
    let id = match item {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.parse::<u64>().ok(),
        _ => None,
    };

    match id {
        Some(id) if id > 0 => Ok(id),
        _ => Err(AppError::invalid_argument(format!(
            "Item must be a positive integer ID, got {item}"
        ))),
    }
}

/// Read a required positive integer argument.
pub fn require_id_arg(args: &JobArgs, key: &str) -> AppResult<u64> {
    let value = args
        .get(key)
        .ok_or_else(|| AppError::invalid_argument(format!("Missing required arg '{key}'")))?;
    item_id(value).map_err(|_| {
        AppError::invalid_argument(format!("Arg '{key}' must be a positive integer ID"))
    })
}

/// Read a required non-empty string argument.
pub fn require_str_arg<'a>(args: &'a JobArgs, key: &str) -> AppResult<&'a str> {
    match args.get(key).and_then(Value::as_str) {
        Some(s) if !s.is_empty() => Ok(s),
        Some(_) => Err(AppError::invalid_argument(format!(
            "Arg '{key}' must not be empty"
        ))),
        None => Err(AppError::invalid_argument(format!(
            "Missing required string arg '{key}'"
        ))),
    }
}
