//! Unified error types for the job orchestration layer.
//!
//! Every crate maps its failures into [`AppError`] so handlers can use the
//! `?` operator all the way up to the worker's exception boundary.

use std::fmt;
use thiserror::Error;

/// Error kind categorization used across the workspace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum ErrorKind {
    /// Job args or an item failed validation.
    InvalidArgument,
    /// The entity an item refers to no longer exists.
    ItemNotFound,
    /// The failure-rate circuit breaker tripped.
    HighFailureRate,
    /// No job is registered under the requested name.
    JobNotFound,
    /// A conflicting registration or state transition.
    Conflict,
    /// The task queue rejected or failed an operation.
    Queue,
    /// A serialization/deserialization error occurred.
    Serialization,
    /// A configuration error occurred.
    Configuration,
    /// An internal error occurred.
    Internal,
}

impl ErrorKind {
    /// Stable code for job exceptions, as recorded in task failure logs.
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidArgument => "invalid_argument",
            Self::ItemNotFound => "item_not_found",
            Self::HighFailureRate => "stopped_due_to_high_failure_rate",
            Self::JobNotFound => "job_does_not_exist",
            Self::Conflict => "conflict",
            Self::Queue => "queue_error",
            Self::Serialization => "serialization_error",
            Self::Configuration => "configuration_error",
            Self::Internal => "internal_error",
        }
    }

    /// Whether this kind is one of the expected job exceptions rather than
    /// a programming or infrastructure fault.
    pub fn is_job_exception(&self) -> bool {
        matches!(
            self,
            Self::ItemNotFound | Self::HighFailureRate | Self::JobNotFound
        )
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidArgument => write!(f, "INVALID_ARGUMENT"),
            Self::ItemNotFound => write!(f, "ITEM_NOT_FOUND"),
            Self::HighFailureRate => write!(f, "HIGH_FAILURE_RATE"),
            Self::JobNotFound => write!(f, "JOB_NOT_FOUND"),
            Self::Conflict => write!(f, "CONFLICT"),
            Self::Queue => write!(f, "QUEUE"),
            Self::Serialization => write!(f, "SERIALIZATION"),
            Self::Configuration => write!(f, "CONFIGURATION"),
            Self::Internal => write!(f, "INTERNAL"),
        }
    }
}

/// The unified error used throughout the workspace.
#[derive(Debug, Error)]
#[error("{kind}: {message}")]
pub struct AppError {
    /// The category of error.
    pub kind: ErrorKind,
    /// A human-readable error message.
    pub message: String,
    /// Optional underlying cause.
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl AppError {
    /// Create a new error.
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            source: None,
        }
    }

    /// Create a new error with an underlying cause.
    pub fn with_source(
        kind: ErrorKind,
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            kind,
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create an invalid-argument error.
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidArgument, message)
    }

    /// Create an item-not-found job exception.
    pub fn item_not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::ItemNotFound, message)
    }

    /// Create the circuit-breaker job exception for `job_name`.
    pub fn high_failure_rate(job_name: &str) -> Self {
        Self::new(
            ErrorKind::HighFailureRate,
            format!("Job '{job_name}' stopped due to high failure rate"),
        )
    }

    /// Create the lookup-miss job exception for `job_name`.
    pub fn job_not_found(job_name: &str) -> Self {
        Self::new(
            ErrorKind::JobNotFound,
            format!("Job '{job_name}' does not exist"),
        )
    }

    /// Create a conflict error.
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Conflict, message)
    }

    /// Create a queue error.
    pub fn queue(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Queue, message)
    }

    /// Create a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Configuration, message)
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Internal, message)
    }

    /// Check whether this error is of the given kind.
    pub fn is(&self, kind: ErrorKind) -> bool {
        self.kind == kind
    }
}

impl Clone for AppError {
    fn clone(&self) -> Self {
        Self {
            kind: self.kind,
            message: self.message.clone(),
            source: None,
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        Self::with_source(
            ErrorKind::Serialization,
            format!("JSON serialization error: {err}"),
            err,
        )
    }
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        Self::with_source(
            ErrorKind::Configuration,
            format!("Configuration error: {err}"),
            err,
        )
    }
}
