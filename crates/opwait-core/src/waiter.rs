//! The polling loop
//!
//! Probes at a fixed interval until the extracted status is in the
//! completion set, is in the error set, or the attempt budget is spent.

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tracing::instrument;

use crate::error::WaitError;
use crate::observer::{PollContext, TracingObserver, WaitObserver};
use crate::outcome::PollOutcome;
use crate::request::PollRequest;
use crate::status::Status;

/// Waits for long-running asynchronous operations to finish
///
/// The waiter holds no client and no per-session state, so one instance can
/// drive any number of concurrent sessions.
///
/// # Example
///
/// ```
/// use opwait_core::{probe_fn, AsyncOperationWaiter, PollRequest, ProbeError, StatusPath};
/// use serde_json::json;
/// use std::time::Duration;
///
/// # tokio_test_runtime(async {
/// let request = PollRequest::new(
///     "get_knowledge_base",
///     probe_fn(|| async { Ok::<_, ProbeError>(json!({"knowledgeBase": {"status": "ACTIVE"}})) }),
///     StatusPath::parse("knowledgeBase.status").unwrap(),
/// )
/// .with_completion_states(["ACTIVE"])
/// .with_error_states(["FAILED"])
/// .with_max_attempts(10)
/// .with_interval(Duration::from_secs(10));
///
/// let response = AsyncOperationWaiter::new().wait_for(&request).await.unwrap();
/// assert_eq!(response["knowledgeBase"]["status"], "ACTIVE");
/// # });
/// # fn tokio_test_runtime<F: std::future::Future>(f: F) -> F::Output {
/// #     tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap().block_on(f)
/// # }
/// ```
#[derive(Clone)]
pub struct AsyncOperationWaiter {
    observer: Arc<dyn WaitObserver>,
}

impl Default for AsyncOperationWaiter {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for AsyncOperationWaiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AsyncOperationWaiter").finish_non_exhaustive()
    }
}

impl AsyncOperationWaiter {
    /// Create a waiter that reports progress through `tracing`
    pub fn new() -> Self {
        Self {
            observer: Arc::new(TracingObserver),
        }
    }

    /// Create a waiter with a custom observer
    pub fn with_observer(observer: impl WaitObserver + 'static) -> Self {
        Self {
            observer: Arc::new(observer),
        }
    }

    /// Create a waiter sharing an existing observer
    pub fn with_shared_observer(observer: Arc<dyn WaitObserver>) -> Self {
        Self { observer }
    }

    /// Poll until a terminal outcome. Never raises.
    pub async fn wait(&self, request: &PollRequest) -> PollOutcome {
        self.run(request, None).await
    }

    /// Like [`wait`](Self::wait), but ends early with
    /// [`PollOutcome::Cancelled`] once `token` is cancelled
    pub async fn wait_with_cancel(
        &self,
        request: &PollRequest,
        token: &CancellationToken,
    ) -> PollOutcome {
        self.run(request, Some(token)).await
    }

    /// Poll until a terminal outcome and raise anything but success
    pub async fn wait_for(&self, request: &PollRequest) -> Result<Value, WaitError> {
        self.wait(request).await.into_result(request.operation.as_str())
    }

    /// Cancellable variant of [`wait_for`](Self::wait_for)
    pub async fn wait_for_with_cancel(
        &self,
        request: &PollRequest,
        token: &CancellationToken,
    ) -> Result<Value, WaitError> {
        self.wait_with_cancel(request, token)
            .await
            .into_result(request.operation.as_str())
    }

    #[instrument(
        skip_all,
        fields(operation = %request.operation, max_attempts = request.policy.max_attempts)
    )]
    async fn run(&self, request: &PollRequest, cancel: Option<&CancellationToken>) -> PollOutcome {
        let policy = &request.policy;
        let ctx = PollContext {
            operation: &request.operation,
            max_attempts: policy.max_attempts,
            verbose: policy.verbose,
        };
        let mut last_status = Status::Unknown;

        if cancel.is_some_and(CancellationToken::is_cancelled) {
            self.observer.on_cancelled(&ctx, 0, &last_status);
            return PollOutcome::Cancelled {
                last_status,
                attempts: 0,
            };
        }

        for attempt in 1..=policy.max_attempts {
            let response = match request.probe.probe().await {
                Ok(response) => response,
                Err(error) => {
                    self.observer.on_call_failed(&ctx, attempt, &error);
                    return PollOutcome::CallFailed {
                        error,
                        attempts: attempt,
                    };
                }
            };

            let status = request.extractor.extract(&response);
            self.observer.on_attempt(&ctx, attempt, &status);

            // Completion is checked first when a status is in both sets
            if policy.completion_states.contains(&status) {
                self.observer.on_completed(&ctx, attempt, &status);
                return PollOutcome::Completed {
                    response,
                    status,
                    attempts: attempt,
                };
            }

            if policy.error_states.contains(&status) {
                self.observer.on_operation_failed(&ctx, attempt, &status);
                return PollOutcome::OperationFailed {
                    response,
                    status,
                    attempts: attempt,
                };
            }

            last_status = status;

            if attempt == policy.max_attempts {
                break;
            }

            self.observer
                .on_pending(&ctx, attempt, &last_status, policy.interval);

            if pause(policy.interval, cancel).await {
                self.observer.on_cancelled(&ctx, attempt, &last_status);
                return PollOutcome::Cancelled {
                    last_status,
                    attempts: attempt,
                };
            }
        }

        self.observer
            .on_timed_out(&ctx, policy.max_attempts, &last_status);
        PollOutcome::TimedOut {
            last_status,
            attempts: policy.max_attempts,
        }
    }
}

/// Sleep for `interval`. Returns true if cancelled first.
async fn pause(interval: Duration, cancel: Option<&CancellationToken>) -> bool {
    match cancel {
        Some(token) => tokio::select! {
            biased;
            _ = token.cancelled() => true,
            _ = tokio::time::sleep(interval) => false,
        },
        None => {
            tokio::time::sleep(interval).await;
            false
        }
    }
}
