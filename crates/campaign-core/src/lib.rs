//! # campaign-core
//!
//! Core crate for the Campaign Automation job layer. Contains the unified
//! error system, configuration schemas, and the argument/item types that
//! travel through the task queue.
//!
//! This crate has **no** internal dependencies on other workspace crates.

pub mod config;
pub mod error;
pub mod result;
pub mod types;

pub use error::{AppError, ErrorKind};
pub use result::AppResult;
pub use types::{Item, JobArgs};
