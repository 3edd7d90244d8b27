//! Wait error types

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::probe::ProbeError;
use crate::status::Status;

/// Result type alias for wait operations
pub type Result<T> = std::result::Result<T, WaitError>;

/// Why a wait did not complete successfully
#[derive(Debug, Clone, Error)]
pub enum WaitError {
    /// The probe reported a status from the error set
    #[error("{operation} failed with status: {status}")]
    OperationFailed { operation: String, status: Status },

    /// The attempt budget ran out before a terminal status
    #[error("{operation} timed out after {attempts} attempts (last status: {last_status})")]
    Timeout {
        operation: String,
        attempts: u32,
        last_status: Status,
    },

    /// The probe call itself failed; not retried
    #[error("error checking status of {operation}: {source}")]
    TransientCallFailure {
        operation: String,
        #[source]
        source: ProbeError,
    },

    /// The wait was cancelled by the caller
    #[error("{operation} wait cancelled (last status: {last_status})")]
    Cancelled {
        operation: String,
        last_status: Status,
    },
}

/// Coarse classification of a [`WaitError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    OperationFailed,
    Timeout,
    TransientCallFailure,
    Cancelled,
}

impl FailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureKind::OperationFailed => "operation_failed",
            FailureKind::Timeout => "timeout",
            FailureKind::TransientCallFailure => "transient_call_failure",
            FailureKind::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl WaitError {
    pub fn kind(&self) -> FailureKind {
        match self {
            WaitError::OperationFailed { .. } => FailureKind::OperationFailed,
            WaitError::Timeout { .. } => FailureKind::Timeout,
            WaitError::TransientCallFailure { .. } => FailureKind::TransientCallFailure,
            WaitError::Cancelled { .. } => FailureKind::Cancelled,
        }
    }

    /// Name of the operation that was being waited on
    pub fn operation(&self) -> &str {
        match self {
            WaitError::OperationFailed { operation, .. }
            | WaitError::Timeout { operation, .. }
            | WaitError::TransientCallFailure { operation, .. }
            | WaitError::Cancelled { operation, .. } => operation,
        }
    }

    /// Last status observed before the wait ended, when one was observed
    pub fn last_status(&self) -> Option<&Status> {
        match self {
            WaitError::OperationFailed { status, .. } => Some(status),
            WaitError::Timeout { last_status, .. } | WaitError::Cancelled { last_status, .. } => {
                Some(last_status)
            }
            WaitError::TransientCallFailure { .. } => None,
        }
    }
}
