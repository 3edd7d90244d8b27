//! Concurrent waits over many independent operations
//!
//! Each item gets its own session on its own task. A semaphore bounds how
//! many sessions poll at the same time.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument, warn};

use crate::error::WaitError;
use crate::request::PollRequest;
use crate::status::Status;
use crate::waiter::AsyncOperationWaiter;

/// What to do when one item fails
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FanoutMode {
    /// Cancel the remaining items and return the first failure
    #[default]
    FailFast,
    /// Let every item finish and report each result
    CollectAll,
}

/// Fan-out configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FanoutConfig {
    /// Maximum sessions polling at once
    pub max_concurrency: usize,

    /// Failure handling
    #[serde(default)]
    pub mode: FanoutMode,
}

impl Default for FanoutConfig {
    fn default() -> Self {
        Self {
            max_concurrency: 8,
            mode: FanoutMode::FailFast,
        }
    }
}

impl FanoutConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set maximum concurrency
    pub fn with_max_concurrency(mut self, max: usize) -> Self {
        self.max_concurrency = max.max(1);
        self
    }

    /// Set failure handling
    pub fn with_mode(mut self, mode: FanoutMode) -> Self {
        self.mode = mode;
        self
    }
}

/// One keyed session in a fan-out
#[derive(Debug, Clone)]
pub struct FanoutItem {
    /// Caller's identifier for the item (e.g. a document id)
    pub key: String,
    pub request: PollRequest,
}

impl FanoutItem {
    pub fn new(key: impl Into<String>, request: PollRequest) -> Self {
        Self {
            key: key.into(),
            request,
        }
    }
}

/// Per-item result, in input order
pub type ItemResult = (String, Result<Value, WaitError>);

/// Fan-out errors
#[derive(Debug, Error)]
pub enum FanoutError {
    /// An item failed while running fail-fast
    #[error("{key}: {source}")]
    Item {
        key: String,
        #[source]
        source: WaitError,
    },
}

impl FanoutError {
    pub fn key(&self) -> &str {
        match self {
            FanoutError::Item { key, .. } => key,
        }
    }

    pub fn wait_error(&self) -> &WaitError {
        match self {
            FanoutError::Item { source, .. } => source,
        }
    }
}

/// Runs many independent waits with bounded concurrency
///
/// A panic inside any session is re-raised in the caller.
///
/// # Example
///
/// ```ignore
/// let fanout = FanoutWaiter::new(AsyncOperationWaiter::new(), FanoutConfig::new());
///
/// let items = documents
///     .iter()
///     .map(|doc| FanoutItem::new(&doc.id, OperationKind::DocumentIngestion.request(doc.probe())))
///     .collect();
///
/// let indexed = fanout.wait_all(items).await?;
/// ```
#[derive(Debug, Clone)]
pub struct FanoutWaiter {
    waiter: AsyncOperationWaiter,
    config: FanoutConfig,
}

impl FanoutWaiter {
    pub fn new(waiter: AsyncOperationWaiter, config: FanoutConfig) -> Self {
        Self { waiter, config }
    }

    pub fn config(&self) -> &FanoutConfig {
        &self.config
    }

    /// Wait for every item; the first failure cancels the rest
    pub async fn wait_all(
        &self,
        items: Vec<FanoutItem>,
    ) -> Result<Vec<(String, Value)>, FanoutError> {
        let results = self.drive(items, true, CancellationToken::new()).await?;
        Ok(results
            .into_iter()
            .filter_map(|(key, result)| result.ok().map(|value| (key, value)))
            .collect())
    }

    /// Wait for every item and report each result
    pub async fn wait_all_settled(&self, items: Vec<FanoutItem>) -> Vec<ItemResult> {
        self.collect(items, CancellationToken::new()).await
    }

    /// Wait according to the configured [`FanoutMode`]
    ///
    /// In fail-fast mode every returned result is `Ok`.
    pub async fn run(&self, items: Vec<FanoutItem>) -> Result<Vec<ItemResult>, FanoutError> {
        self.run_with_cancel(items, &CancellationToken::new()).await
    }

    /// [`run`](Self::run) tied to an external cancellation token
    pub async fn run_with_cancel(
        &self,
        items: Vec<FanoutItem>,
        token: &CancellationToken,
    ) -> Result<Vec<ItemResult>, FanoutError> {
        match self.config.mode {
            FanoutMode::FailFast => self.drive(items, true, token.child_token()).await,
            FanoutMode::CollectAll => Ok(self.collect(items, token.child_token()).await),
        }
    }

    async fn collect(&self, items: Vec<FanoutItem>, cancel: CancellationToken) -> Vec<ItemResult> {
        match self.drive(items, false, cancel).await {
            Ok(results) => results,
            // drive only returns Err when fail_fast is set
            Err(FanoutError::Item { key, source }) => vec![(key, Err(source))],
        }
    }

    #[instrument(
        skip_all,
        fields(items = items.len(), max_concurrency = self.config.max_concurrency, fail_fast = fail_fast)
    )]
    async fn drive(
        &self,
        items: Vec<FanoutItem>,
        fail_fast: bool,
        cancel: CancellationToken,
    ) -> Result<Vec<ItemResult>, FanoutError> {
        let total = items.len();
        let labels: Vec<(String, String)> = items
            .iter()
            .map(|item| (item.key.clone(), item.request.operation.clone()))
            .collect();
        let permits = Arc::new(Semaphore::new(self.config.max_concurrency.max(1)));
        let mut tasks = JoinSet::new();

        for (index, item) in items.into_iter().enumerate() {
            let waiter = self.waiter.clone();
            let permits = Arc::clone(&permits);
            let token = cancel.child_token();

            tasks.spawn(async move {
                // Semaphore is never closed, so the permit is always granted
                let _permit = permits.acquire_owned().await;
                let result = waiter.wait_for_with_cancel(&item.request, &token).await;
                (index, item.key, result)
            });
        }

        let mut slots: Vec<Option<ItemResult>> = (0..total).map(|_| None).collect();

        while let Some(joined) = tasks.join_next().await {
            let (index, key, result) = match joined {
                Ok(finished) => finished,
                Err(err) if err.is_panic() => std::panic::resume_unwind(err.into_panic()),
                Err(err) => {
                    warn!("Fan-out task ended without a result: {}", err);
                    continue;
                }
            };

            if fail_fast {
                if let Err(source) = result {
                    warn!(%key, "Fan-out item failed, cancelling remaining items: {}", source);
                    cancel.cancel();
                    tasks.abort_all();
                    return Err(FanoutError::Item { key, source });
                }
            }

            slots[index] = Some((key, result));
        }

        let results = fill_lost_slots(slots, labels);
        if fail_fast {
            if let Some((key, Err(source))) = results.iter().find(|(_, r)| r.is_err()) {
                cancel.cancel();
                return Err(FanoutError::Item {
                    key: key.clone(),
                    source: source.clone(),
                });
            }
        }

        let failed = results.iter().filter(|(_, r)| r.is_err()).count();
        info!(total, failed, "Fan-out complete");
        Ok(results)
    }
}

/// Pair every slot with a result; a task that never reported counts as cancelled
fn fill_lost_slots(
    slots: Vec<Option<ItemResult>>,
    labels: Vec<(String, String)>,
) -> Vec<ItemResult> {
    slots
        .into_iter()
        .zip(labels)
        .map(|(slot, (key, operation))| {
            slot.unwrap_or_else(|| {
                (
                    key,
                    Err(WaitError::Cancelled {
                        operation,
                        last_status: Status::Unknown,
                    }),
                )
            })
        })
        .collect()
}
