// Poll command - wait for one HTTP status endpoint to reach a terminal state

use anyhow::Result;
use chrono::{DateTime, Utc};
use opwait_core::{AsyncOperationWaiter, PollOutcome, PollRequest, WaiterConfig};
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use super::{cancel_on_ctrl_c, WaitArgs};
use crate::client::HttpStatusProbe;
use crate::output::{print_field, OutputFormat};

/// Structured result of one wait
#[derive(Debug, Serialize)]
pub struct WaitReport {
    pub session_id: Uuid,
    pub operation: String,
    pub url: String,
    pub status_path: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    #[serde(flatten)]
    pub outcome: PollOutcome,
}

pub async fn run(
    args: WaitArgs,
    url: String,
    config: &WaiterConfig,
    output: OutputFormat,
    quiet: bool,
) -> Result<()> {
    let (path, policy) = args.resolve(config, quiet)?;
    let operation = args.operation_name();
    let probe = HttpStatusProbe::new(&url, args.request_timeout())?;
    let request = PollRequest::new(operation.clone(), probe, path.clone()).with_policy(policy);

    let token = CancellationToken::new();
    cancel_on_ctrl_c(&token);

    let session_id = Uuid::now_v7();
    tracing::debug!(%session_id, %operation, %url, "Starting wait");

    let started_at = Utc::now();
    let outcome = AsyncOperationWaiter::new()
        .wait_with_cancel(&request, &token)
        .await;
    let finished_at = Utc::now();

    let report = WaitReport {
        session_id,
        operation,
        url,
        status_path: path.to_string(),
        started_at,
        finished_at,
        outcome,
    };

    if output.is_text() {
        if !quiet {
            print_text(&report);
        }
    } else {
        output.print_value(&report)?;
    }

    report.outcome.into_result(report.operation)?;
    Ok(())
}

fn print_text(report: &WaitReport) {
    let result = report
        .outcome
        .failure_kind()
        .map_or("completed", |kind| kind.as_str());
    let status = report
        .outcome
        .last_status()
        .map(|status| status.to_string())
        .unwrap_or_else(|| "-".to_string());
    let elapsed = report.finished_at - report.started_at;

    print_field("Operation", &report.operation);
    print_field("Result", result);
    print_field("Status", &status);
    print_field("Attempts", &report.outcome.attempts().to_string());
    print_field(
        "Elapsed",
        &format!("{:.1}s", elapsed.num_milliseconds() as f64 / 1000.0),
    );
}
