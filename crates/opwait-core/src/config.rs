// Waiter Configuration
//
// Process-wide polling defaults, loaded from environment variables.

use std::env;
use std::time::Duration;

use crate::fanout::{FanoutConfig, FanoutMode};
use crate::request::PollPolicy;

const DEFAULT_MAX_ATTEMPTS: u32 = 60;
const DEFAULT_INTERVAL_SECS: u64 = 10;
const DEFAULT_MAX_CONCURRENCY: usize = 8;

/// Defaults applied to requests that do not carry their own budget
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WaiterConfig {
    /// Maximum probe invocations per session
    pub max_attempts: u32,

    /// Delay between probes
    pub interval: Duration,

    /// Log every pending poll at info level
    pub verbose: bool,

    /// Maximum sessions polling at once in a fan-out
    pub max_concurrency: usize,
}

impl Default for WaiterConfig {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            interval: Duration::from_secs(DEFAULT_INTERVAL_SECS),
            verbose: true,
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
        }
    }
}

impl WaiterConfig {
    /// Create configuration from environment variables
    ///
    /// Environment variables:
    /// - `OPWAIT_MAX_ATTEMPTS`: Probe budget per session (default: 60)
    /// - `OPWAIT_INTERVAL_SECS`: Seconds between probes (default: 10)
    /// - `OPWAIT_VERBOSE`: Log each pending poll, `true`/`1` or `false`/`0` (default: true)
    /// - `OPWAIT_MAX_CONCURRENCY`: Fan-out concurrency limit (default: 8)
    ///
    /// Values that fail to parse fall back to their defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) with a custom variable source
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let max_attempts = lookup("OPWAIT_MAX_ATTEMPTS")
            .and_then(|v| v.trim().parse().ok())
            .unwrap_or(DEFAULT_MAX_ATTEMPTS);

        let interval = lookup("OPWAIT_INTERVAL_SECS")
            .and_then(|v| v.trim().parse().ok())
            .map(Duration::from_secs)
            .unwrap_or(Duration::from_secs(DEFAULT_INTERVAL_SECS));

        let verbose = lookup("OPWAIT_VERBOSE")
            .and_then(|v| parse_bool(&v))
            .unwrap_or(true);

        let max_concurrency = lookup("OPWAIT_MAX_CONCURRENCY")
            .and_then(|v| v.trim().parse::<usize>().ok())
            .unwrap_or(DEFAULT_MAX_CONCURRENCY)
            .max(1);

        Self {
            max_attempts,
            interval,
            verbose,
            max_concurrency,
        }
    }

    /// Policy with these defaults and no terminal states
    pub fn default_policy(&self) -> PollPolicy {
        PollPolicy::new()
            .with_max_attempts(self.max_attempts)
            .with_interval(self.interval)
            .with_verbose(self.verbose)
    }

    pub fn fanout_config(&self, mode: FanoutMode) -> FanoutConfig {
        FanoutConfig::new()
            .with_max_concurrency(self.max_concurrency)
            .with_mode(mode)
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "true" | "1" => Some(true),
        "false" | "0" => Some(false),
        _ => None,
    }
}
