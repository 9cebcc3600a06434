//! Argument and item types carried through the task queue.

pub mod args;

pub use args::{Item, JobArgs, empty_args, item_id, require_id_arg, require_str_arg};
