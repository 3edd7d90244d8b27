//! Status path parsing and extraction
//!
//! A status path addresses a value inside a JSON probe response using dotted
//! field names and bracketed list indices, e.g. `agentAlias.agentAliasStatus`
//! or `documentDetails[0].status`.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use thiserror::Error;

/// Errors produced while parsing a status path
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PathError {
    /// The path string was empty
    #[error("status path is empty")]
    Empty,

    /// A segment between two dots was empty (`a..b`, leading or trailing dot)
    #[error("empty segment at position {position} in status path `{path}`")]
    EmptySegment { path: String, position: usize },

    /// A `[` without a matching `]`
    #[error("unterminated index at position {position} in status path `{path}`")]
    UnterminatedIndex { path: String, position: usize },

    /// Bracket contents were not a non-negative integer
    #[error("invalid index `{index}` at position {position} in status path `{path}`")]
    InvalidIndex {
        path: String,
        index: String,
        position: usize,
    },

    /// A field segment that is empty or contains `.`, `[` or `]`
    #[error("invalid field name `{field}` in status path segments")]
    InvalidField { field: String },

    /// A stray `]` or text directly after a closing bracket
    #[error("unexpected character `{found}` at position {position} in status path `{path}`")]
    UnexpectedCharacter {
        path: String,
        found: char,
        position: usize,
    },
}

/// One step of a status path
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PathSegment {
    /// Object field lookup
    Field(String),
    /// List index lookup
    Index(usize),
}

/// A parsed dot-and-bracket path into a JSON value
///
/// # Example
///
/// ```
/// use opwait_core::StatusPath;
/// use serde_json::json;
///
/// let path: StatusPath = "a.b[0].c".parse().unwrap();
/// let response = json!({"a": {"b": [{"c": "X"}]}});
///
/// assert_eq!(path.extract(&response), Some(&json!("X")));
/// assert_eq!("a.b[5].c".parse::<StatusPath>().unwrap().extract(&response), None);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StatusPath {
    raw: String,
    segments: Vec<PathSegment>,
}

impl StatusPath {
    /// Parse a path expression
    pub fn parse(raw: &str) -> Result<Self, PathError> {
        if raw.is_empty() {
            return Err(PathError::Empty);
        }

        let mut segments = Vec::new();
        let mut offset = 0;

        for part in raw.split('.') {
            if part.is_empty() {
                return Err(PathError::EmptySegment {
                    path: raw.to_string(),
                    position: offset,
                });
            }
            parse_segment(raw, part, offset, &mut segments)?;
            offset += part.len() + 1;
        }

        Ok(Self {
            raw: raw.to_string(),
            segments,
        })
    }

    /// Path consisting of a single top-level field
    pub fn field(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            raw: name.clone(),
            segments: vec![PathSegment::Field(name)],
        }
    }

    /// Build a path from already-split segments
    ///
    /// The expression is rendered back in dotted form, so
    /// `[Field("items"), Index(0), Field("name")]` becomes `items[0].name`.
    /// Rejects an empty list and field names that would not parse back to
    /// the same segment.
    pub fn from_segments(segments: Vec<PathSegment>) -> Result<Self, PathError> {
        if segments.is_empty() {
            return Err(PathError::Empty);
        }

        for segment in &segments {
            if let PathSegment::Field(name) = segment {
                if name.is_empty() || name.contains(['.', '[', ']']) {
                    return Err(PathError::InvalidField {
                        field: name.clone(),
                    });
                }
            }
        }

        Ok(Self::render(segments))
    }

    /// Build from segments known to be valid, such as the preset table
    pub(crate) fn from_trusted_segments(segments: Vec<PathSegment>) -> Self {
        debug_assert!(Self::from_segments(segments.clone()).is_ok());
        Self::render(segments)
    }

    fn render(segments: Vec<PathSegment>) -> Self {
        let mut raw = String::new();
        for segment in &segments {
            match segment {
                PathSegment::Field(name) => {
                    if !raw.is_empty() {
                        raw.push('.');
                    }
                    raw.push_str(name);
                }
                PathSegment::Index(index) => {
                    raw.push('[');
                    raw.push_str(&index.to_string());
                    raw.push(']');
                }
            }
        }
        Self { raw, segments }
    }

    /// The path expression as written
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// The parsed segments
    pub fn segments(&self) -> &[PathSegment] {
        &self.segments
    }

    /// Walk the path through `value`
    ///
    /// Returns `None` when a key is missing, an index is out of range, or a
    /// segment is applied to the wrong JSON type. Never panics.
    pub fn extract<'a>(&self, value: &'a Value) -> Option<&'a Value> {
        self.segments
            .iter()
            .try_fold(value, |current, segment| match segment {
                PathSegment::Field(name) => current.as_object()?.get(name),
                PathSegment::Index(index) => current.as_array()?.get(*index),
            })
    }
}

/// Parse one dot-delimited part such as `items`, `items[0]`, `[2]` or `m[0][1]`
fn parse_segment(
    raw: &str,
    part: &str,
    offset: usize,
    segments: &mut Vec<PathSegment>,
) -> Result<(), PathError> {
    let name_end = part.find(['[', ']']).unwrap_or(part.len());
    if name_end > 0 {
        segments.push(PathSegment::Field(part[..name_end].to_string()));
    }

    let mut rest = &part[name_end..];
    let mut position = offset + name_end;

    while !rest.is_empty() {
        if !rest.starts_with('[') {
            let found = rest.chars().next().unwrap_or(']');
            return Err(PathError::UnexpectedCharacter {
                path: raw.to_string(),
                found,
                position,
            });
        }

        let close = rest.find(']').ok_or_else(|| PathError::UnterminatedIndex {
            path: raw.to_string(),
            position,
        })?;

        let digits = &rest[1..close];
        let index = digits
            .parse::<usize>()
            .ok()
            .filter(|_| !digits.starts_with('+'))
            .ok_or_else(|| PathError::InvalidIndex {
                path: raw.to_string(),
                index: digits.to_string(),
                position,
            })?;

        segments.push(PathSegment::Index(index));
        rest = &rest[close + 1..];
        position += close + 1;
    }

    Ok(())
}

impl FromStr for StatusPath {
    type Err = PathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for StatusPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl Serialize for StatusPath {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.raw)
    }
}

impl<'de> Deserialize<'de> for StatusPath {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).map_err(serde::de::Error::custom)
    }
}
