//! Background worker for Campaign Automation.
//!
//! This crate provides:
//! - A task executor that hands queue tasks to the job service and records
//!   the outcome
//! - A worker runner that polls the queue for due tasks and executes them
//!   with bounded concurrency

pub mod executor;
pub mod runner;

pub use executor::{TaskExecutor, TaskOutcome};
pub use runner::WorkerRunner;
