//! Status values and state sets

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A status extracted from a probe response
///
/// `Unknown` is the sentinel for "the status path did not resolve". It is
/// distinct from a JSON `null` at the path, which is a real value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Status {
    /// Value found at the status path
    Value(Value),
    /// Status path did not resolve
    Unknown,
}

impl Status {
    /// Build a status from an optional extracted value
    pub fn from_extracted(value: Option<&Value>) -> Self {
        match value {
            Some(v) => Status::Value(v.clone()),
            None => Status::Unknown,
        }
    }

    /// Returns true for the unknown sentinel
    pub fn is_unknown(&self) -> bool {
        matches!(self, Status::Unknown)
    }

    /// The raw JSON value, if any
    pub fn as_value(&self) -> Option<&Value> {
        match self {
            Status::Value(v) => Some(v),
            Status::Unknown => None,
        }
    }

    /// The status as a string slice when it is a JSON string
    pub fn as_str(&self) -> Option<&str> {
        self.as_value().and_then(Value::as_str)
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Status::Value(Value::String(s)) => f.write_str(s),
            Status::Value(other) => write!(f, "{}", other),
            Status::Unknown => f.write_str("<unknown>"),
        }
    }
}

impl From<&str> for Status {
    fn from(s: &str) -> Self {
        Status::Value(Value::String(s.to_string()))
    }
}

/// A set of status values compared by exact JSON equality
///
/// Most services report string statuses, so sets are usually built from
/// string slices:
///
/// ```
/// use opwait_core::{Status, StatusSet};
///
/// let done = StatusSet::from(["Success"]);
/// assert!(done.contains(&Status::from("Success")));
/// assert!(!done.contains(&Status::from("success")));
/// assert!(!done.contains(&Status::Unknown));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StatusSet(Vec<Value>);

impl StatusSet {
    /// Empty set
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a value to the set
    pub fn with(mut self, value: impl Into<Value>) -> Self {
        self.insert(value);
        self
    }

    /// Insert a value, ignoring duplicates
    pub fn insert(&mut self, value: impl Into<Value>) {
        let value = value.into();
        if !self.0.contains(&value) {
            self.0.push(value);
        }
    }

    /// Membership test. `Status::Unknown` is never a member.
    pub fn contains(&self, status: &Status) -> bool {
        match status {
            Status::Value(v) => self.0.contains(v),
            Status::Unknown => false,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Value> {
        self.0.iter()
    }
}

impl<S: Into<Value>, const N: usize> From<[S; N]> for StatusSet {
    fn from(values: [S; N]) -> Self {
        values.into_iter().collect()
    }
}

impl<S: Into<Value>> From<Vec<S>> for StatusSet {
    fn from(values: Vec<S>) -> Self {
        values.into_iter().collect()
    }
}

impl<S: Into<Value>> FromIterator<S> for StatusSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut set = StatusSet::new();
        for value in iter {
            set.insert(value);
        }
        set
    }
}

impl fmt::Display for StatusSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rendered: Vec<String> = self
            .0
            .iter()
            .map(|v| match v {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            })
            .collect();
        write!(f, "[{}]", rendered.join(", "))
    }
}
