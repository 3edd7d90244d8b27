//! Progress reporting for polling sessions
//!
//! The waiter never logs on its own; every poll is reported to a
//! [`WaitObserver`]. [`TracingObserver`] is the default.

use std::time::Duration;

use tracing::{debug, info, warn};

use crate::probe::ProbeError;
use crate::status::Status;

/// Per-session context passed to every observer callback
#[derive(Debug, Clone, Copy)]
pub struct PollContext<'a> {
    /// Operation being waited on
    pub operation: &'a str,
    /// Attempt budget
    pub max_attempts: u32,
    /// Per-poll verbosity requested by the policy
    pub verbose: bool,
}

/// Callbacks fired as a session progresses
///
/// All methods default to doing nothing.
pub trait WaitObserver: Send + Sync {
    /// A probe returned and its status was extracted (1-based attempt)
    fn on_attempt(&self, _ctx: &PollContext<'_>, _attempt: u32, _status: &Status) {}

    /// The status was pending and the session is about to sleep
    fn on_pending(&self, _ctx: &PollContext<'_>, _attempt: u32, _status: &Status, _delay: Duration) {
    }

    fn on_completed(&self, _ctx: &PollContext<'_>, _attempts: u32, _status: &Status) {}

    fn on_operation_failed(&self, _ctx: &PollContext<'_>, _attempts: u32, _status: &Status) {}

    fn on_timed_out(&self, _ctx: &PollContext<'_>, _attempts: u32, _last_status: &Status) {}

    fn on_call_failed(&self, _ctx: &PollContext<'_>, _attempts: u32, _error: &ProbeError) {}

    fn on_cancelled(&self, _ctx: &PollContext<'_>, _attempts: u32, _last_status: &Status) {}
}

/// Observer that ignores everything
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl WaitObserver for NoopObserver {}

/// Observer that emits `tracing` events
///
/// Pending polls are logged at info level when the policy is verbose and at
/// debug level otherwise. Terminal failures are always warnings.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObserver;

impl WaitObserver for TracingObserver {
    fn on_attempt(&self, ctx: &PollContext<'_>, attempt: u32, status: &Status) {
        debug!(
            operation = ctx.operation,
            attempt,
            max_attempts = ctx.max_attempts,
            %status,
            "Polled status"
        );
    }

    fn on_pending(&self, ctx: &PollContext<'_>, attempt: u32, status: &Status, delay: Duration) {
        if ctx.verbose {
            info!(
                operation = ctx.operation,
                attempt,
                max_attempts = ctx.max_attempts,
                %status,
                delay_ms = delay.as_millis() as u64,
                "Current status: {}. Waiting...",
                status
            );
        } else {
            debug!(
                operation = ctx.operation,
                attempt,
                %status,
                delay_ms = delay.as_millis() as u64,
                "Status pending"
            );
        }
    }

    fn on_completed(&self, ctx: &PollContext<'_>, attempts: u32, status: &Status) {
        if ctx.verbose {
            info!(
                operation = ctx.operation,
                attempts,
                %status,
                "Operation completed successfully with status: {}",
                status
            );
        } else {
            debug!(operation = ctx.operation, attempts, %status, "Operation completed");
        }
    }

    fn on_operation_failed(&self, ctx: &PollContext<'_>, attempts: u32, status: &Status) {
        warn!(
            operation = ctx.operation,
            attempts,
            %status,
            "Operation failed with status: {}",
            status
        );
    }

    fn on_timed_out(&self, ctx: &PollContext<'_>, attempts: u32, last_status: &Status) {
        warn!(
            operation = ctx.operation,
            attempts,
            %last_status,
            "Operation timed out after {} attempts",
            attempts
        );
    }

    fn on_call_failed(&self, ctx: &PollContext<'_>, attempts: u32, error: &ProbeError) {
        warn!(
            operation = ctx.operation,
            attempts,
            error_type = error.error_type.as_deref(),
            "Error checking status: {}",
            error
        );
    }

    fn on_cancelled(&self, ctx: &PollContext<'_>, attempts: u32, last_status: &Status) {
        info!(
            operation = ctx.operation,
            attempts,
            %last_status,
            "Wait cancelled"
        );
    }
}
