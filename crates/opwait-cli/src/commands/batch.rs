// Batch command - wait for many HTTP status endpoints at once

use anyhow::{bail, Result};
use chrono::{DateTime, Utc};
use opwait_core::{
    AsyncOperationWaiter, FailureKind, FanoutError, FanoutItem, FanoutMode, FanoutWaiter,
    ItemResult, PollRequest, WaiterConfig,
};
use serde::Serialize;
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use super::{cancel_on_ctrl_c, WaitArgs};
use crate::client::HttpStatusProbe;
use crate::output::{print_table_header, print_table_row, OutputFormat};

/// Result of one item in a batch
#[derive(Debug, Serialize)]
pub struct BatchItemReport {
    pub url: String,
    pub completed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<FailureKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response: Option<Value>,
}

impl From<ItemResult> for BatchItemReport {
    fn from((url, result): ItemResult) -> Self {
        match result {
            Ok(response) => Self {
                url,
                completed: true,
                failure: None,
                error: None,
                response: Some(response),
            },
            Err(err) => Self {
                url,
                completed: false,
                failure: Some(err.kind()),
                error: Some(err.to_string()),
                response: None,
            },
        }
    }
}

#[derive(Debug, Serialize)]
pub struct BatchReport {
    pub session_id: Uuid,
    pub operation: String,
    pub mode: FanoutMode,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub items: Vec<BatchItemReport>,
}

pub async fn run(
    args: WaitArgs,
    urls: Vec<String>,
    concurrency: usize,
    collect: bool,
    config: &WaiterConfig,
    output: OutputFormat,
    quiet: bool,
) -> Result<()> {
    let token = CancellationToken::new();
    cancel_on_ctrl_c(&token);

    let (report, aborted) =
        wait_batch(&args, &urls, concurrency, collect, config, quiet, &token).await?;

    if output.is_text() {
        if !quiet {
            print_text(&report);
        }
    } else {
        output.print_value(&report)?;
    }

    if let Some(err) = aborted {
        return Err(err.into());
    }

    let failed = report.items.iter().filter(|item| !item.completed).count();
    if failed > 0 {
        bail!("{} of {} operations did not complete", failed, report.items.len());
    }
    Ok(())
}

/// Run the batch and build its report
///
/// When fail-fast stops the batch, the report holds only the failing item
/// and the stopping error is returned alongside it.
async fn wait_batch(
    args: &WaitArgs,
    urls: &[String],
    concurrency: usize,
    collect: bool,
    config: &WaiterConfig,
    quiet: bool,
    token: &CancellationToken,
) -> Result<(BatchReport, Option<FanoutError>)> {
    let (path, policy) = args.resolve(config, quiet)?;
    let operation = args.operation_name();
    let mode = if collect {
        FanoutMode::CollectAll
    } else {
        FanoutMode::FailFast
    };

    // One connection pool for every probe in the batch
    let http = reqwest::Client::builder()
        .timeout(args.request_timeout())
        .build()?;

    let items: Vec<FanoutItem> = urls
        .iter()
        .map(|url| {
            let probe = HttpStatusProbe::with_client(http.clone(), url);
            let request = PollRequest::new(operation.clone(), probe, path.clone())
                .with_policy(policy.clone());
            FanoutItem::new(url.clone(), request)
        })
        .collect();

    let fanout = FanoutWaiter::new(
        AsyncOperationWaiter::new(),
        WaiterConfig {
            max_concurrency: concurrency,
            ..config.clone()
        }
        .fanout_config(mode),
    );

    let session_id = Uuid::now_v7();
    tracing::debug!(%session_id, %operation, items = items.len(), "Starting batch wait");

    let started_at = Utc::now();
    let (results, aborted) = match fanout.run_with_cancel(items, token).await {
        Ok(results) => (results, None),
        Err(err) => {
            let failing: ItemResult = (err.key().to_string(), Err(err.wait_error().clone()));
            (vec![failing], Some(err))
        }
    };
    let finished_at = Utc::now();

    let report = BatchReport {
        session_id,
        operation,
        mode,
        started_at,
        finished_at,
        items: results.into_iter().map(BatchItemReport::from).collect(),
    };
    Ok((report, aborted))
}

fn print_text(report: &BatchReport) {
    print_table_header(&[("URL", 48), ("RESULT", 22), ("DETAIL", 40)]);

    for item in &report.items {
        let result = item.failure.map_or("completed", |kind| kind.as_str());
        let detail = item.error.as_deref().unwrap_or("-");
        print_table_row(&[(&item.url, 48), (result, 22), (detail, 40)]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use opwait_core::{OperationKind, ProbeError, Status, WaitError};
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn ingestion_args() -> WaitArgs {
        WaitArgs {
            preset: Some(OperationKind::DocumentIngestion),
            status_path: None,
            completion_states: vec![],
            error_states: vec![],
            max_attempts: None,
            interval: None,
            operation: None,
            request_timeout: 5,
        }
    }

    async fn mount_document(server: &MockServer, id: &str, status: &str) -> String {
        let route = format!("/documents/{}", id);
        Mock::given(method("GET"))
            .and(path(route.as_str()))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"documentDetails": [{"status": status}]})),
            )
            .mount(server)
            .await;
        format!("{}{}", server.uri(), route)
    }

    async fn indexed_and_failed() -> (MockServer, Vec<String>) {
        let server = MockServer::start().await;
        let indexed = mount_document(&server, "doc-1", "INDEXED").await;
        let failed = mount_document(&server, "doc-2", "FAILED").await;
        (server, vec![indexed, failed])
    }

    async fn run_batch(urls: Vec<String>, collect: bool) -> Result<()> {
        run(
            ingestion_args(),
            urls,
            2,
            collect,
            &WaiterConfig::default(),
            OutputFormat::Json,
            true,
        )
        .await
    }

    #[tokio::test]
    async fn test_batch_succeeds_when_all_complete() {
        let server = MockServer::start().await;
        let urls = vec![
            mount_document(&server, "doc-1", "INDEXED").await,
            mount_document(&server, "doc-3", "INDEXED").await,
        ];

        run_batch(urls.clone(), false).await.unwrap();
        run_batch(urls, true).await.unwrap();
    }

    #[tokio::test]
    async fn test_batch_fails_in_both_modes() {
        let (_server, urls) = indexed_and_failed().await;

        let err = run_batch(urls.clone(), false).await.unwrap_err();
        assert!(err
            .to_string()
            .ends_with("/documents/doc-2: get_knowledge_base_documents failed with status: FAILED"));

        let err = run_batch(urls, true).await.unwrap_err();
        assert_eq!(err.to_string(), "1 of 2 operations did not complete");
    }

    #[tokio::test]
    async fn test_fail_fast_report_names_failing_item() {
        let (_server, urls) = indexed_and_failed().await;
        let token = CancellationToken::new();

        let (report, aborted) = wait_batch(
            &ingestion_args(),
            &urls,
            2,
            false,
            &WaiterConfig::default(),
            true,
            &token,
        )
        .await
        .unwrap();

        assert_eq!(report.mode, FanoutMode::FailFast);
        assert_eq!(aborted.map(|err| err.key().to_string()), Some(urls[1].clone()));
        assert_eq!(report.items.len(), 1);
        assert_eq!(report.items[0].url, urls[1]);
        assert_eq!(report.items[0].failure, Some(FailureKind::OperationFailed));
    }

    #[tokio::test]
    async fn test_collect_reports_every_item_in_order() {
        let (_server, urls) = indexed_and_failed().await;
        let token = CancellationToken::new();

        let (report, aborted) = wait_batch(
            &ingestion_args(),
            &urls,
            2,
            true,
            &WaiterConfig::default(),
            true,
            &token,
        )
        .await
        .unwrap();

        assert!(aborted.is_none());
        assert_eq!(report.mode, FanoutMode::CollectAll);
        let reported: Vec<&str> = report.items.iter().map(|item| item.url.as_str()).collect();
        assert_eq!(reported, vec![urls[0].as_str(), urls[1].as_str()]);
        assert!(report.items[0].completed);
        assert_eq!(
            report.items[0].response,
            Some(json!({"documentDetails": [{"status": "INDEXED"}]}))
        );
        assert!(!report.items[1].completed);
        assert_eq!(report.items[1].failure, Some(FailureKind::OperationFailed));
    }

    #[test]
    fn test_item_report_from_success() {
        let item: ItemResult = ("http://jobs/1".to_string(), Ok(json!({"status": "INDEXED"})));
        let report = BatchItemReport::from(item);
        assert!(report.completed);
        assert_eq!(
            serde_json::to_value(&report).unwrap(),
            json!({"url": "http://jobs/1", "completed": true, "response": {"status": "INDEXED"}})
        );
    }

    #[test]
    fn test_item_report_from_failure() {
        let item: ItemResult = (
            "http://jobs/2".to_string(),
            Err(WaitError::TransientCallFailure {
                operation: "http_status".into(),
                source: ProbeError::new("API error (503): busy").with_type("503"),
            }),
        );
        let report = BatchItemReport::from(item);
        assert!(!report.completed);
        assert_eq!(report.failure, Some(FailureKind::TransientCallFailure));

        let item: ItemResult = (
            "http://jobs/3".to_string(),
            Err(WaitError::Timeout {
                operation: "http_status".into(),
                attempts: 5,
                last_status: Status::from("STARTING"),
            }),
        );
        let report = BatchItemReport::from(item);
        assert_eq!(
            report.error.as_deref(),
            Some("http_status timed out after 5 attempts (last status: STARTING)")
        );
    }
}
