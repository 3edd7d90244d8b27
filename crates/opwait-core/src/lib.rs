// Async Operation Waiter
//
// Polls long-running managed-service operations (document automation jobs,
// agents, knowledge bases, ingestion) until they reach a terminal state.
//
// Key design decisions:
// - The caller supplies a StatusProbe; the crate never talks to a cloud SDK
// - Status is read through a StatusPath (`a.b[0].c`) or a custom accessor
// - Fixed interval, bounded attempts, no sleep after the final probe
// - Every session ends in exactly one PollOutcome; wait_for maps it to WaitError
// - Progress is reported through a WaitObserver (tracing by default)
// - FanoutWaiter runs many sessions on separate tasks with bounded concurrency

pub mod config;
pub mod error;
pub mod fanout;
pub mod observer;
pub mod outcome;
pub mod path;
pub mod presets;
pub mod probe;
pub mod request;
pub mod status;
pub mod waiter;

// Scripted probes for examples and testing
pub mod scripted;

pub use config::WaiterConfig;
pub use error::{FailureKind, Result, WaitError};
pub use fanout::{FanoutConfig, FanoutError, FanoutItem, FanoutMode, FanoutWaiter, ItemResult};
pub use observer::{NoopObserver, PollContext, TracingObserver, WaitObserver};
pub use outcome::PollOutcome;
pub use path::{PathError, PathSegment, StatusPath};
pub use presets::{OperationKind, OperationPreset, UnknownOperationKind};
pub use probe::{probe_fn, FnProbe, ProbeError, StatusProbe};
pub use request::{PollPolicy, PollRequest, StatusExtractor};
pub use status::{Status, StatusSet};
pub use waiter::AsyncOperationWaiter;

// Re-export for StatusProbe implementors
pub use async_trait::async_trait;
pub use tokio_util::sync::CancellationToken;

/// Everything needed to build and run a wait
pub mod prelude {
    pub use crate::{
        async_trait, AsyncOperationWaiter, CancellationToken, FanoutConfig, FanoutItem,
        FanoutMode, FanoutWaiter, OperationKind, PollOutcome, PollPolicy, PollRequest,
        ProbeError, Status, StatusPath, StatusProbe, WaitError,
    };
}
