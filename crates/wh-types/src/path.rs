//! Segmented paths into the warehouse state tree.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::TypeError;

/// Root key of the per-feed subscription records.
pub const SUBSCRIPTIONS_ROOT: &str = "_subscriptions";
/// Root key of the per-branch generation records.
pub const GENERATIONS_ROOT: &str = "_generations";
/// Root key of the in-flight creator records.
pub const CREATORS_ROOT: &str = "_creators";

/// A path into the state tree, e.g. `_subscriptions.feedA.branches.tests@1`.
///
/// Dotted strings are split on `.`; ids containing dots must be passed as
/// explicit segments.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StatePath(Vec<String>);

impl StatePath {
    /// Parse a dotted path. Empty segments are ignored.
    pub fn parse(path: &str) -> Result<Self, TypeError> {
        let segments: Vec<String> = path
            .split('.')
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect();
        Self::from_segments(segments)
    }

    /// Build a path from explicit segments.
    pub fn from_segments<I, S>(segments: I) -> Result<Self, TypeError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let segments: Vec<String> = segments.into_iter().map(Into::into).collect();
        if segments.is_empty() {
            return Err(TypeError::EmptyPath);
        }
        Ok(Self(segments))
    }

    /// The first segment.
    pub fn head(&self) -> &str {
        &self.0[0]
    }

    /// Every segment after the first.
    pub fn tail(&self) -> &[String] {
        &self.0[1..]
    }

    /// All segments.
    pub fn segments(&self) -> &[String] {
        &self.0
    }
}

impl fmt::Display for StatePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.join("."))
    }
}

/// Walk `segments` down a JSON value. Array elements are addressed by index.
pub fn walk<'a>(value: &'a Value, segments: &[String]) -> Option<&'a Value> {
    segments.iter().try_fold(value, |node, segment| match node {
        Value::Object(map) => map.get(segment),
        Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    })
}
