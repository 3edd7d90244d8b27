// Integration tests for FanoutWaiter
//
// Run with: cargo test -p opwait-core --test fanout_test

use std::time::Duration;

use opwait_core::scripted::ScriptedProbe;
use opwait_core::{
    probe_fn, AsyncOperationWaiter, CancellationToken, FailureKind, FanoutConfig, FanoutItem,
    FanoutMode, FanoutWaiter, NoopObserver, PollRequest, ProbeError, StatusPath, WaitError,
};
use serde_json::{json, Value};
use tokio::time::Instant;

fn ingestion_request(probe: ScriptedProbe) -> PollRequest {
    PollRequest::new("get_knowledge_base_documents", probe, StatusPath::field("status"))
        .with_completion_states(["INDEXED"])
        .with_error_states(["FAILED"])
        .with_max_attempts(5)
        .with_interval(Duration::from_secs(5))
        .with_verbose(false)
}

fn fanout(mode: FanoutMode) -> FanoutWaiter {
    FanoutWaiter::new(
        AsyncOperationWaiter::with_observer(NoopObserver),
        FanoutConfig::new().with_mode(mode),
    )
}

#[tokio::test(start_paused = true)]
async fn test_wait_all_returns_results_in_input_order() {
    let items = vec![
        FanoutItem::new(
            "doc-slow",
            ingestion_request(ScriptedProbe::statuses(
                "status",
                ["STARTING", "IN_PROGRESS", "INDEXED"],
            )),
        ),
        FanoutItem::new(
            "doc-fast",
            ingestion_request(ScriptedProbe::statuses("status", ["INDEXED"])),
        ),
    ];

    let started = Instant::now();
    let results = fanout(FanoutMode::FailFast).wait_all(items).await.unwrap();

    let keys: Vec<&str> = results.iter().map(|(key, _)| key.as_str()).collect();
    assert_eq!(keys, vec!["doc-slow", "doc-fast"]);
    assert_eq!(results[0].1, json!({"status": "INDEXED"}));
    assert_eq!(started.elapsed(), Duration::from_secs(10));
}

#[tokio::test(start_paused = true)]
async fn test_fail_fast_cancels_remaining_items() {
    let failing = ScriptedProbe::statuses("status", ["STARTING", "FAILED"]);
    let pending = ScriptedProbe::repeating(json!({"status": "IN_PROGRESS"}));
    let pending_calls = pending.call_counter();

    let items = vec![
        FanoutItem::new("doc-a", ingestion_request(failing)),
        FanoutItem::new(
            "doc-b",
            ingestion_request(pending).with_max_attempts(100),
        ),
    ];

    let err = fanout(FanoutMode::FailFast)
        .wait_all(items)
        .await
        .unwrap_err();

    assert_eq!(err.key(), "doc-a");
    assert_eq!(err.wait_error().kind(), FailureKind::OperationFailed);
    assert_eq!(
        err.to_string(),
        "doc-a: get_knowledge_base_documents failed with status: FAILED"
    );

    let calls_at_failure = pending_calls.get();
    tokio::time::sleep(Duration::from_secs(60)).await;
    assert_eq!(pending_calls.get(), calls_at_failure);
}

#[tokio::test(start_paused = true)]
async fn test_collect_all_reports_every_item() {
    let items = vec![
        FanoutItem::new(
            "indexed",
            ingestion_request(ScriptedProbe::statuses("status", ["STARTING", "INDEXED"])),
        ),
        FanoutItem::new(
            "failed",
            ingestion_request(ScriptedProbe::statuses("status", ["FAILED"])),
        ),
        FanoutItem::new(
            "stuck",
            ingestion_request(ScriptedProbe::repeating(json!({"status": "STARTING"})))
                .with_max_attempts(3),
        ),
    ];

    let results = fanout(FanoutMode::CollectAll)
        .run(items)
        .await
        .unwrap();

    assert_eq!(results.len(), 3);
    assert_eq!(results[0].0, "indexed");
    assert!(results[0].1.is_ok());
    assert_eq!(
        results[1].1.as_ref().map_err(WaitError::kind),
        Err(FailureKind::OperationFailed)
    );
    assert_eq!(
        results[2].1.as_ref().map_err(WaitError::kind),
        Err(FailureKind::Timeout)
    );
}

#[tokio::test(start_paused = true)]
async fn test_wait_all_settled_ignores_configured_mode() {
    let items = vec![
        FanoutItem::new(
            "failed",
            ingestion_request(ScriptedProbe::statuses("status", ["FAILED"])),
        ),
        FanoutItem::new(
            "indexed",
            ingestion_request(ScriptedProbe::statuses("status", ["STARTING", "INDEXED"])),
        ),
    ];

    let results = fanout(FanoutMode::FailFast).wait_all_settled(items).await;

    assert!(results[0].1.is_err());
    assert!(results[1].1.is_ok());
}

#[tokio::test(start_paused = true)]
async fn test_concurrency_limit_is_respected() {
    let items: Vec<FanoutItem> = (0..4)
        .map(|i| {
            FanoutItem::new(
                format!("doc-{i}"),
                ingestion_request(ScriptedProbe::statuses("status", ["STARTING", "INDEXED"])),
            )
        })
        .collect();

    let waiter = FanoutWaiter::new(
        AsyncOperationWaiter::with_observer(NoopObserver),
        FanoutConfig::new().with_max_concurrency(2),
    );

    let started = Instant::now();
    let results = waiter.wait_all(items).await.unwrap();

    assert_eq!(results.len(), 4);
    // Two waves of one 5s interval each
    assert_eq!(started.elapsed(), Duration::from_secs(10));
}

#[tokio::test(start_paused = true)]
async fn test_external_cancellation_reaches_every_item() {
    let items: Vec<FanoutItem> = ["a", "b", "c"]
        .into_iter()
        .map(|key| {
            FanoutItem::new(
                key,
                ingestion_request(ScriptedProbe::repeating(json!({"status": "STARTING"}))),
            )
        })
        .collect();

    let token = CancellationToken::new();
    let canceller = token.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(7)).await;
        canceller.cancel();
    });

    let started = Instant::now();
    let results = fanout(FanoutMode::CollectAll)
        .run_with_cancel(items, &token)
        .await
        .unwrap();

    assert_eq!(started.elapsed(), Duration::from_secs(7));
    for (_, result) in &results {
        assert_eq!(
            result.as_ref().map_err(WaitError::kind),
            Err(FailureKind::Cancelled)
        );
    }
}

#[tokio::test(start_paused = true)]
#[should_panic(expected = "probe exploded")]
async fn test_panic_in_item_propagates() {
    let exploding = PollRequest::new(
        "exploding",
        probe_fn(|| async {
            if true {
                panic!("probe exploded");
            }
            Ok::<Value, ProbeError>(json!({}))
        }),
        StatusPath::field("status"),
    );

    let items = vec![
        FanoutItem::new(
            "fine",
            ingestion_request(ScriptedProbe::repeating(json!({"status": "STARTING"}))),
        ),
        FanoutItem::new("boom", exploding),
    ];

    let _ = fanout(FanoutMode::CollectAll).run(items).await;
}
