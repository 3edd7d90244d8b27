//! Poll policies and requests

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::path::StatusPath;
use crate::probe::StatusProbe;
use crate::status::{Status, StatusSet};

/// How a session decides it is finished and how long it may take
///
/// The interval is fixed for the whole session (no backoff).
///
/// # Example
///
/// ```
/// use opwait_core::PollPolicy;
/// use std::time::Duration;
///
/// let policy = PollPolicy::new()
///     .with_completion_states(["ACTIVE"])
///     .with_error_states(["FAILED"])
///     .with_max_attempts(10)
///     .with_interval(Duration::from_secs(10));
///
/// assert_eq!(policy.worst_case_wait(), Duration::from_secs(90));
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PollPolicy {
    /// Statuses that end the session successfully
    #[serde(default)]
    pub completion_states: StatusSet,

    /// Statuses that end the session with a failure
    #[serde(default)]
    pub error_states: StatusSet,

    /// Maximum number of probe invocations
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Wait between polls
    #[serde(with = "duration_millis", default = "default_interval")]
    pub interval: Duration,

    /// Log every poll at info level instead of debug
    #[serde(default = "default_verbose")]
    pub verbose: bool,
}

fn default_max_attempts() -> u32 {
    60
}

fn default_interval() -> Duration {
    Duration::from_secs(10)
}

fn default_verbose() -> bool {
    true
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            completion_states: StatusSet::new(),
            error_states: StatusSet::new(),
            max_attempts: default_max_attempts(),
            interval: default_interval(),
            verbose: default_verbose(),
        }
    }
}

impl PollPolicy {
    /// Create a policy with the default budget (60 attempts, 10s apart)
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the completion states
    pub fn with_completion_states(mut self, states: impl Into<StatusSet>) -> Self {
        self.completion_states = states.into();
        self
    }

    /// Set the error states
    pub fn with_error_states(mut self, states: impl Into<StatusSet>) -> Self {
        self.error_states = states.into();
        self
    }

    /// Set the maximum number of probe invocations
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    /// Set the interval between polls
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Set per-poll verbosity
    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Total sleep time if every attempt comes back pending
    pub fn worst_case_wait(&self) -> Duration {
        self.interval * self.max_attempts.saturating_sub(1)
    }
}

/// Pulls the status out of a probe response
#[derive(Clone)]
pub enum StatusExtractor {
    /// Walk a dot/bracket path
    Path(StatusPath),
    /// Arbitrary pure accessor
    Custom(Arc<dyn Fn(&Value) -> Status + Send + Sync>),
}

impl StatusExtractor {
    pub fn extract(&self, response: &Value) -> Status {
        match self {
            StatusExtractor::Path(path) => Status::from_extracted(path.extract(response)),
            StatusExtractor::Custom(f) => f(response),
        }
    }
}

impl fmt::Debug for StatusExtractor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatusExtractor::Path(path) => f.debug_tuple("Path").field(&path.as_str()).finish(),
            StatusExtractor::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}

impl From<StatusPath> for StatusExtractor {
    fn from(path: StatusPath) -> Self {
        StatusExtractor::Path(path)
    }
}

/// One polling session: what to call, how to read it, when to stop
#[derive(Clone)]
pub struct PollRequest {
    /// Operation name used in logs and error messages
    pub operation: String,

    /// Status probe
    pub probe: Arc<dyn StatusProbe>,

    /// Status accessor
    pub extractor: StatusExtractor,

    /// Terminal states and budget
    pub policy: PollPolicy,
}

impl PollRequest {
    /// Create a request reading the status at `status_path`
    pub fn new(
        operation: impl Into<String>,
        probe: impl StatusProbe + 'static,
        status_path: StatusPath,
    ) -> Self {
        Self::from_arc(operation, Arc::new(probe), status_path)
    }

    /// Create a request from a shared probe
    pub fn from_arc(
        operation: impl Into<String>,
        probe: Arc<dyn StatusProbe>,
        status_path: StatusPath,
    ) -> Self {
        Self {
            operation: operation.into(),
            probe,
            extractor: StatusExtractor::Path(status_path),
            policy: PollPolicy::default(),
        }
    }

    /// Replace the policy
    pub fn with_policy(mut self, policy: PollPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Use a custom status accessor instead of a path
    pub fn with_extractor<F>(mut self, f: F) -> Self
    where
        F: Fn(&Value) -> Status + Send + Sync + 'static,
    {
        self.extractor = StatusExtractor::Custom(Arc::new(f));
        self
    }

    /// Set the completion states
    pub fn with_completion_states(mut self, states: impl Into<StatusSet>) -> Self {
        self.policy.completion_states = states.into();
        self
    }

    /// Set the error states
    pub fn with_error_states(mut self, states: impl Into<StatusSet>) -> Self {
        self.policy.error_states = states.into();
        self
    }

    /// Set the maximum number of probe invocations
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.policy.max_attempts = max_attempts;
        self
    }

    /// Set the interval between polls
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.policy.interval = interval;
        self
    }

    /// Set per-poll verbosity
    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.policy.verbose = verbose;
        self
    }
}

impl fmt::Debug for PollRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PollRequest")
            .field("operation", &self.operation)
            .field("extractor", &self.extractor)
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

/// Serde support for Duration as milliseconds
mod duration_millis {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        duration.as_millis().serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}
