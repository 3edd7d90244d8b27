//! Terminal outcome of one polling session

use serde::Serialize;
use serde_json::Value;

use crate::error::{FailureKind, WaitError};
use crate::probe::ProbeError;
use crate::status::Status;

/// How a polling session ended
///
/// `wait` returns this instead of raising so callers can branch on the
/// outcome; [`PollOutcome::into_result`] converts it for callers that only
/// care about success.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum PollOutcome {
    /// Status reached a completion state
    Completed {
        response: Value,
        status: Status,
        attempts: u32,
    },

    /// Status reached an error state
    OperationFailed {
        response: Value,
        status: Status,
        attempts: u32,
    },

    /// Attempt budget exhausted while pending
    TimedOut { last_status: Status, attempts: u32 },

    /// The probe call failed
    CallFailed { error: ProbeError, attempts: u32 },

    /// Cancelled by the caller between polls
    Cancelled { last_status: Status, attempts: u32 },
}

impl PollOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, PollOutcome::Completed { .. })
    }

    /// Number of probe invocations made
    pub fn attempts(&self) -> u32 {
        match self {
            PollOutcome::Completed { attempts, .. }
            | PollOutcome::OperationFailed { attempts, .. }
            | PollOutcome::TimedOut { attempts, .. }
            | PollOutcome::CallFailed { attempts, .. }
            | PollOutcome::Cancelled { attempts, .. } => *attempts,
        }
    }

    /// Last status observed, if the session got as far as reading one
    pub fn last_status(&self) -> Option<&Status> {
        match self {
            PollOutcome::Completed { status, .. } | PollOutcome::OperationFailed { status, .. } => {
                Some(status)
            }
            PollOutcome::TimedOut { last_status, .. }
            | PollOutcome::Cancelled { last_status, .. } => Some(last_status),
            PollOutcome::CallFailed { .. } => None,
        }
    }

    /// Final probe response, for outcomes that have one
    pub fn response(&self) -> Option<&Value> {
        match self {
            PollOutcome::Completed { response, .. }
            | PollOutcome::OperationFailed { response, .. } => Some(response),
            _ => None,
        }
    }

    /// Failure classification; `None` for a completed session
    pub fn failure_kind(&self) -> Option<FailureKind> {
        match self {
            PollOutcome::Completed { .. } => None,
            PollOutcome::OperationFailed { .. } => Some(FailureKind::OperationFailed),
            PollOutcome::TimedOut { .. } => Some(FailureKind::Timeout),
            PollOutcome::CallFailed { .. } => Some(FailureKind::TransientCallFailure),
            PollOutcome::Cancelled { .. } => Some(FailureKind::Cancelled),
        }
    }

    /// Convert into the final response or a [`WaitError`] naming `operation`
    pub fn into_result(self, operation: impl Into<String>) -> Result<Value, WaitError> {
        let operation = operation.into();
        match self {
            PollOutcome::Completed { response, .. } => Ok(response),
            PollOutcome::OperationFailed { status, .. } => {
                Err(WaitError::OperationFailed { operation, status })
            }
            PollOutcome::TimedOut {
                last_status,
                attempts,
            } => Err(WaitError::Timeout {
                operation,
                attempts,
                last_status,
            }),
            PollOutcome::CallFailed { error, .. } => Err(WaitError::TransientCallFailure {
                operation,
                source: error,
            }),
            PollOutcome::Cancelled { last_status, .. } => Err(WaitError::Cancelled {
                operation,
                last_status,
            }),
        }
    }
}
