// Subcommands and the wait options they share

pub mod batch;
pub mod poll;
pub mod presets;

use std::time::Duration;

use anyhow::{bail, Result};
use clap::Args;
use opwait_core::{OperationKind, PollPolicy, StatusPath, WaiterConfig};
use tokio_util::sync::CancellationToken;

/// How to read the status and when to stop
#[derive(Args, Debug, Clone)]
pub struct WaitArgs {
    /// Use a named preset (see `opwait presets`)
    #[arg(long, short)]
    pub preset: Option<OperationKind>,

    /// Path to the status in the response body, e.g. `documentDetails[0].status`
    #[arg(long, short = 's')]
    pub status_path: Option<StatusPath>,

    /// Status meaning the operation succeeded (repeatable)
    #[arg(long = "complete", short = 'c')]
    pub completion_states: Vec<String>,

    /// Status meaning the operation failed (repeatable)
    #[arg(long = "error", short = 'e')]
    pub error_states: Vec<String>,

    /// Maximum number of status checks [default: preset or OPWAIT_MAX_ATTEMPTS]
    #[arg(long)]
    pub max_attempts: Option<u32>,

    /// Seconds between status checks [default: preset or OPWAIT_INTERVAL_SECS]
    #[arg(long)]
    pub interval: Option<u64>,

    /// Operation name used in logs and errors
    #[arg(long)]
    pub operation: Option<String>,

    /// Per-request HTTP timeout in seconds
    #[arg(long, env = "OPWAIT_REQUEST_TIMEOUT_SECS", default_value = "30")]
    pub request_timeout: u64,
}

impl WaitArgs {
    /// Resolve path and policy from the preset, the environment and flags,
    /// in increasing order of precedence
    pub fn resolve(&self, config: &WaiterConfig, quiet: bool) -> Result<(StatusPath, PollPolicy)> {
        let path = match (&self.status_path, self.preset) {
            (Some(path), _) => path.clone(),
            (None, Some(kind)) => kind.status_path(),
            (None, None) => bail!("--status-path is required unless --preset is given"),
        };

        let mut policy = match self.preset {
            Some(kind) => kind.policy(),
            None => config.default_policy(),
        };

        if !self.completion_states.is_empty() {
            policy = policy.with_completion_states(self.completion_states.clone());
        }
        if !self.error_states.is_empty() {
            policy = policy.with_error_states(self.error_states.clone());
        }
        if let Some(max_attempts) = self.max_attempts {
            policy = policy.with_max_attempts(max_attempts);
        }
        if let Some(interval) = self.interval {
            policy = policy.with_interval(Duration::from_secs(interval));
        }
        if quiet {
            policy = policy.with_verbose(false);
        }

        if policy.completion_states.is_empty() {
            bail!("at least one --complete status is required unless --preset is given");
        }

        Ok((path, policy))
    }

    pub fn operation_name(&self) -> String {
        match (&self.operation, self.preset) {
            (Some(name), _) => name.clone(),
            (None, Some(kind)) => kind.operation_name().to_string(),
            (None, None) => "http_status".to_string(),
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout.max(1))
    }
}

/// Cancel `token` on Ctrl-C
pub fn cancel_on_ctrl_c(token: &CancellationToken) {
    let token = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Interrupted, cancelling wait");
            token.cancel();
        }
    });
}
