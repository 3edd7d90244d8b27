//! Scripted probes for examples and testing
//!
//! A [`ScriptedProbe`] replays a fixed sequence of responses. The last step
//! repeats forever once the script is used up.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::probe::{ProbeError, StatusProbe};

#[derive(Debug, Clone)]
enum Step {
    Respond(Value),
    Fail(ProbeError),
}

/// Shared view of how many times a probe has been called
#[derive(Debug, Clone, Default)]
pub struct CallCounter(Arc<AtomicU32>);

impl CallCounter {
    pub fn get(&self) -> u32 {
        self.0.load(Ordering::SeqCst)
    }

    fn increment(&self) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }
}

/// Probe that replays a script of responses and errors
#[derive(Debug, Default)]
pub struct ScriptedProbe {
    steps: Mutex<VecDeque<Step>>,
    calls: CallCounter,
    latency: Duration,
}

impl ScriptedProbe {
    /// Empty script; add steps with the `then_*` builders
    pub fn new() -> Self {
        Self::default()
    }

    /// Probe that always returns `response`
    pub fn repeating(response: Value) -> Self {
        Self::new().then_response(response)
    }

    /// Probe returning `{ field: status }` for each status in turn
    pub fn statuses<I, S>(field: &str, statuses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        statuses
            .into_iter()
            .fold(Self::new(), |probe, status| probe.then_status(field, status))
    }

    /// Append a raw response
    pub fn then_response(self, response: Value) -> Self {
        self.push(Step::Respond(response))
    }

    /// Append a `{ field: status }` response
    pub fn then_status(self, field: &str, status: impl Into<String>) -> Self {
        let mut body = serde_json::Map::new();
        body.insert(field.to_string(), Value::String(status.into()));
        self.push(Step::Respond(Value::Object(body)))
    }

    /// Append a probe failure
    pub fn then_error(self, error: ProbeError) -> Self {
        self.push(Step::Fail(error))
    }

    /// Delay every call by `latency`
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Counter that keeps working after the probe is moved into a request
    pub fn call_counter(&self) -> CallCounter {
        self.calls.clone()
    }

    // A poisoned script is still a valid queue; keep replaying it
    fn push(mut self, step: Step) -> Self {
        self.steps
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(step);
        self
    }

    fn next_step(&self) -> Option<Step> {
        let mut steps = self.steps.lock().unwrap_or_else(PoisonError::into_inner);
        if steps.len() > 1 {
            steps.pop_front()
        } else {
            steps.front().cloned()
        }
    }
}

#[async_trait]
impl StatusProbe for ScriptedProbe {
    async fn probe(&self) -> Result<Value, ProbeError> {
        self.calls.increment();

        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }

        match self.next_step() {
            Some(Step::Respond(response)) => Ok(response),
            Some(Step::Fail(error)) => Err(error),
            None => Err(ProbeError::new("scripted probe has no steps")
                .with_details(json!({"calls": self.calls.get()}))),
        }
    }
}
