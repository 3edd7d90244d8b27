//! Status probe abstraction
//!
//! A probe performs one status check against an external system. The waiter
//! calls it repeatedly and never constructs or holds the client behind it.

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Error raised by a status probe call
///
/// Any probe error ends the wait immediately; the probe call is never
/// retried by the waiter.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProbeError {
    /// Error message
    pub message: String,

    /// Error type/code reported by the client (e.g. an HTTP status or an
    /// SDK error code such as `ThrottlingException`)
    pub error_type: Option<String>,

    /// Additional error details (for debugging)
    pub details: Option<Value>,
}

impl ProbeError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            error_type: None,
            details: None,
        }
    }

    /// Set the error type
    pub fn with_type(mut self, error_type: impl Into<String>) -> Self {
        self.error_type = Some(error_type.into());
        self
    }

    /// Add error details
    pub fn with_details(mut self, details: Value) -> Self {
        self.details = Some(details);
        self
    }
}

impl std::fmt::Display for ProbeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.error_type {
            Some(error_type) => write!(f, "{} ({})", self.message, error_type),
            None => write!(f, "{}", self.message),
        }
    }
}

impl std::error::Error for ProbeError {}

impl From<anyhow::Error> for ProbeError {
    fn from(err: anyhow::Error) -> Self {
        Self::new(format!("{:#}", err))
    }
}

/// One status check against an external system
///
/// Implementations must be safe to call repeatedly and must not mutate
/// remote state.
#[async_trait]
pub trait StatusProbe: Send + Sync {
    async fn probe(&self) -> Result<Value, ProbeError>;
}

#[async_trait]
impl<P: StatusProbe + ?Sized> StatusProbe for Arc<P> {
    async fn probe(&self) -> Result<Value, ProbeError> {
        (**self).probe().await
    }
}

type ProbeFuture = BoxFuture<'static, Result<Value, ProbeError>>;

/// Probe backed by a closure returning a future
pub struct FnProbe {
    f: Box<dyn Fn() -> ProbeFuture + Send + Sync>,
}

#[async_trait]
impl StatusProbe for FnProbe {
    async fn probe(&self) -> Result<Value, ProbeError> {
        (self.f)().await
    }
}

/// Adapt an async closure into a [`StatusProbe`]
///
/// ```
/// use opwait_core::{probe_fn, ProbeError};
/// use serde_json::json;
///
/// let probe = probe_fn(|| async { Ok::<_, ProbeError>(json!({"status": "Success"})) });
/// # let _ = probe;
/// ```
pub fn probe_fn<F, Fut>(f: F) -> FnProbe
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Value, ProbeError>> + Send + 'static,
{
    FnProbe {
        f: Box::new(move || Box::pin(f())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn test_probe_fn_is_called_each_time() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();
        let probe = probe_fn(move || {
            let n = counter.fetch_add(1, Ordering::SeqCst) + 1;
            async move { Ok::<_, ProbeError>(json!({ "n": n })) }
        });

        assert_eq!(probe.probe().await.unwrap(), json!({"n": 1}));
        assert_eq!(probe.probe().await.unwrap(), json!({"n": 2}));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_arc_probe_delegates() {
        let probe: Arc<dyn StatusProbe> =
            Arc::new(probe_fn(|| async { Err::<serde_json::Value, _>(ProbeError::new("denied")) }));
        let err = probe.probe().await.unwrap_err();
        assert_eq!(err.message, "denied");
    }

    #[test]
    fn test_probe_error_display() {
        let err = ProbeError::new("rate exceeded").with_type("ThrottlingException");
        assert_eq!(err.to_string(), "rate exceeded (ThrottlingException)");
        assert_eq!(ProbeError::new("boom").to_string(), "boom");
    }

    #[test]
    fn test_from_anyhow_keeps_context() {
        let err: ProbeError = anyhow::anyhow!("connection reset")
            .context("GetDataAutomationStatus")
            .into();
        assert_eq!(err.message, "GetDataAutomationStatus: connection reset");
        assert!(err.error_type.is_none());
    }
}
