// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Error types for jobtrack-core.
//!
//! Provides a unified error type with a stable error-code mapping, plus the
//! structured error payload persisted into failed tracker records.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Result type using TrackerError
pub type Result<T> = std::result::Result<T, TrackerError>;

/// Errors that can occur during tracker operations.
#[derive(Debug, Clone)]
#[non_exhaustive]
pub enum TrackerError {
    /// Input validation failed.
    ValidationError {
        /// The field that failed validation.
        field: String,
        /// The validation error message.
        message: String,
    },

    /// No handler is registered for the requested job kind.
    UnknownKind {
        /// The kind that has no registered handler.
        kind: String,
    },

    /// Two handlers were registered for the same job kind.
    DuplicateKind {
        /// The kind registered more than once.
        kind: String,
    },

    /// The worker pool refused the job; the enqueue was rolled back.
    QueueRejected {
        /// The owner whose enqueue was rejected.
        owner_id: String,
        /// Why the pool refused the submission.
        reason: String,
    },

    /// Engine shutdown did not complete cleanly.
    ShutdownFailed {
        /// The reason shutdown failed.
        reason: String,
    },

    /// Database operation failed.
    DatabaseError {
        /// The operation that failed.
        operation: String,
        /// Error details.
        details: String,
    },
}

impl TrackerError {
    /// Get the error code string for this error type.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::ValidationError { .. } => "VALIDATION_ERROR",
            Self::UnknownKind { .. } => "UNKNOWN_KIND",
            Self::DuplicateKind { .. } => "DUPLICATE_KIND",
            Self::QueueRejected { .. } => "QUEUE_REJECTED",
            Self::ShutdownFailed { .. } => "SHUTDOWN_FAILED",
            Self::DatabaseError { .. } => "DATABASE_ERROR",
        }
    }

    /// Whether the caller may retry the operation that produced this error.
    ///
    /// Only queue rejections are retryable: the partial state was rolled
    /// back, so a later call starts from a clean slate.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::QueueRejected { .. })
    }
}

impl fmt::Display for TrackerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ValidationError { field, message } => {
                write!(f, "Validation error for '{}': {}", field, message)
            }
            Self::UnknownKind { kind } => {
                write!(f, "No handler registered for job kind '{}'", kind)
            }
            Self::DuplicateKind { kind } => {
                write!(f, "Job kind '{}' registered more than once", kind)
            }
            Self::QueueRejected { owner_id, reason } => {
                write!(
                    f,
                    "Could not queue job for owner '{}': {}; retry later",
                    owner_id, reason
                )
            }
            Self::ShutdownFailed { reason } => {
                write!(f, "Engine shutdown failed: {}", reason)
            }
            Self::DatabaseError { operation, details } => {
                write!(f, "Database error during '{}': {}", operation, details)
            }
        }
    }
}

impl std::error::Error for TrackerError {}

impl From<sqlx::Error> for TrackerError {
    fn from(err: sqlx::Error) -> Self {
        TrackerError::DatabaseError {
            operation: "query".to_string(),
            details: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for TrackerError {
    fn from(err: serde_json::Error) -> Self {
        TrackerError::DatabaseError {
            operation: "json".to_string(),
            details: err.to_string(),
        }
    }
}

/// Structured error payload persisted into a tracker record when a job
/// fails. This is what pollers see in `response_payload` for `error`
/// records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorDetail {
    /// Machine-readable error code (e.g. "JOB_FAILED").
    pub code: String,
    /// Human-readable error message.
    pub message: String,
}

impl ErrorDetail {
    /// Build the persisted error payload from a handler failure.
    ///
    /// Handlers that fail with a [`JobFailure`] keep their specific code;
    /// any other error is captured under the generic `JOB_FAILED` code with
    /// the full error chain as the message.
    pub fn from_job_error(err: &anyhow::Error) -> Self {
        match err.downcast_ref::<JobFailure>() {
            Some(failure) => Self {
                code: failure.code.clone(),
                message: failure.message.clone(),
            },
            None => Self {
                code: "JOB_FAILED".to_string(),
                message: format!("{:#}", err),
            },
        }
    }
}

/// A typed failure a job handler can return to control the error code
/// recorded in its tracker record.
///
/// Handlers are free to fail with any `anyhow::Error`; this type exists for
/// the cases where a stable, machine-readable code matters to pollers.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{code}: {message}")]
pub struct JobFailure {
    /// Machine-readable error code.
    pub code: String,
    /// Human-readable error message.
    pub message: String,
}

impl JobFailure {
    /// Create a new job failure with the given code and message.
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }
}
