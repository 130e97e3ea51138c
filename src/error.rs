//! # Task Error Taxonomy
//!
//! Structured error handling for the task execution core using thiserror.
//! Every error carries a discrete [`ErrorKind`] so the API adapter layer can
//! map failures onto response codes without string matching, and validation
//! failures carry per-field [`FieldViolation`] causes.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::messaging::MessagingError;

/// Discriminant consumed by the API adapter to pick a response status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    NotFound,
    Timeout,
    BadRequest,
    Internal,
}

/// A single field-level validation failure with a stable tag
/// (`required`, `url`, `http-method`, ...).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldViolation {
    pub field: String,
    pub tag: String,
    pub message: String,
}

impl FieldViolation {
    pub fn new(
        field: impl Into<String>,
        tag: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            field: field.into(),
            tag: tag.into(),
            message: message.into(),
        }
    }

    /// Violation for a missing required field.
    pub fn required(field: impl Into<String>) -> Self {
        Self::new(field, "required", "is a required field")
    }
}

impl std::fmt::Display for FieldViolation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "field {}: {}", self.field, self.message)
    }
}

/// Task-level error type covering the full failure taxonomy.
#[derive(Error, Debug)]
pub enum TaskError {
    #[error("task not found: {id}")]
    NotFound { id: i64 },

    #[error("operation timed out: {operation}")]
    Timeout { operation: String },

    #[error("validation failed: {}", format_violations(violations))]
    Validation { violations: Vec<FieldViolation> },

    #[error("database error: {operation}: {message}")]
    Database { operation: String, message: String },

    #[error("queue error: {0}")]
    Queue(#[from] MessagingError),

    #[error("internal error: {message}")]
    Internal { message: String },
}

fn format_violations(violations: &[FieldViolation]) -> String {
    violations
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

impl TaskError {
    /// Classify this error for the API adapter.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::Timeout { .. } => ErrorKind::Timeout,
            Self::Validation { .. } => ErrorKind::BadRequest,
            Self::Database { .. } | Self::Queue(_) | Self::Internal { .. } => ErrorKind::Internal,
        }
    }

    /// Field-level causes, present only for validation errors.
    pub fn violations(&self) -> Option<&[FieldViolation]> {
        match self {
            Self::Validation { violations } => Some(violations),
            _ => None,
        }
    }

    pub fn validation(violations: Vec<FieldViolation>) -> Self {
        Self::Validation { violations }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Wrap a database failure with the store operation that produced it.
    /// Pool timeouts keep their timeout classification; everything else is
    /// reported as a database error under the given operation name.
    pub fn wrap_db(operation: impl Into<String>, err: sqlx::Error) -> Self {
        let operation = operation.into();
        match err {
            sqlx::Error::PoolTimedOut => Self::Timeout { operation },
            other => Self::Database {
                operation,
                message: other.to_string(),
            },
        }
    }
}

/// Result type alias for task operations.
pub type Result<T> = std::result::Result<T, TaskError>;
