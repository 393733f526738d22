use std::borrow::Borrow;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// Generation stamp attached to a branch at creation time.
///
/// Generations make deletion acknowledgements order-safe: a stale
/// acknowledgement carrying an old generation never removes a branch that
/// was recreated under the same id.
pub type Generation = u64;

/// Separator between the type namespace and the instance part of an id.
pub const INSTANCE_SEPARATOR: char = '@';

/// Pseudo-parent marking a branch whose creation is still in flight.
pub const PENDING_PARENT: &str = "new";

/// Name of the internal feed used when an upsert names no feed.
pub const SYSTEM_FEED: &str = "system";

/// Identifier of a stored branch.
///
/// Non-singleton branches follow the `type@instance` convention. Ids without
/// an `@` are singletons: they are collected from feeds like any other
/// branch but are never purged from global state.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BranchId(String);

impl BranchId {
    /// Create a branch id from any string-like value.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Create a branch id, rejecting the empty string.
    pub fn parse(id: &str) -> Result<Self, TypeError> {
        if id.is_empty() {
            return Err(TypeError::EmptyId);
        }
        Ok(Self(id.to_string()))
    }

    /// The pseudo-parent used while a creation is in flight.
    pub fn pending() -> Self {
        Self(PENDING_PARENT.to_string())
    }

    /// The raw id.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns `true` when the id carries no `@` separator.
    pub fn is_singleton(&self) -> bool {
        !self.0.contains(INSTANCE_SEPARATOR)
    }

    /// Returns `true` for the `"new"` pseudo-parent.
    pub fn is_pending(&self) -> bool {
        self.0 == PENDING_PARENT
    }

    /// The type part of the id (`"desktop"` for `"desktop@main"`).
    ///
    /// Singletons are their own namespace.
    pub fn namespace(&self) -> &str {
        match self.0.split_once(INSTANCE_SEPARATOR) {
            Some((namespace, _)) => namespace,
            None => &self.0,
        }
    }

    /// The instance part of the id, if any.
    pub fn instance(&self) -> Option<&str> {
        self.0.split_once(INSTANCE_SEPARATOR).map(|(_, instance)| instance)
    }

    /// Returns `true` if the id belongs to the `type@` namespace.
    pub fn is_of_type(&self, ty: &str) -> bool {
        self.0
            .strip_prefix(ty)
            .is_some_and(|rest| rest.starts_with(INSTANCE_SEPARATOR))
    }

    /// Returns `true` if the id starts with `prefix`.
    pub fn has_prefix(&self, prefix: &str) -> bool {
        self.0.starts_with(prefix)
    }
}

impl fmt::Debug for BranchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BranchId({})", self.0)
    }
}

impl fmt::Display for BranchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for BranchId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for BranchId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for BranchId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl PartialEq<str> for BranchId {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for BranchId {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

/// Identifier of a subscription feed.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FeedId(String);

impl FeedId {
    /// Create a feed id from any string-like value.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The reserved internal feed.
    pub fn system() -> Self {
        Self(SYSTEM_FEED.to_string())
    }

    /// Returns `true` for the reserved internal feed.
    pub fn is_system(&self) -> bool {
        self.0 == SYSTEM_FEED
    }

    /// The raw id.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for FeedId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FeedId({})", self.0)
    }
}

impl fmt::Display for FeedId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for FeedId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for FeedId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for FeedId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl PartialEq<&str> for FeedId {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn singleton_detection() {
        assert!(BranchId::new("workshop").is_singleton());
        assert!(!BranchId::new("desktop@main").is_singleton());
    }

    #[test]
    fn namespace_and_instance() {
        let id = BranchId::new("desktop@main@1");
        assert_eq!(id.namespace(), "desktop");
        assert_eq!(id.instance(), Some("main@1"));

        let single = BranchId::new("workshop");
        assert_eq!(single.namespace(), "workshop");
        assert_eq!(single.instance(), None);
    }

    #[test]
    fn type_membership_requires_separator() {
        let id = BranchId::new("contact@42");
        assert!(id.is_of_type("contact"));
        assert!(!id.is_of_type("cont"));
        assert!(!BranchId::new("contacts").is_of_type("contact"));
    }

    #[test]
    fn pending_marker() {
        assert!(BranchId::pending().is_pending());
        assert!(!BranchId::new("news@1").is_pending());
    }

    #[test]
    fn parse_rejects_empty() {
        assert_eq!(BranchId::parse(""), Err(TypeError::EmptyId));
        assert!(BranchId::parse("a@b").is_ok());
    }

    #[test]
    fn system_feed() {
        assert!(FeedId::system().is_system());
        assert!(!FeedId::new("tests1").is_system());
    }

    #[test]
    fn serde_is_transparent() {
        let id = BranchId::new("tests@1");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"tests@1\"");
        let back: FeedId = serde_json::from_str("\"feedA\"").unwrap();
        assert_eq!(back, "feedA");
    }

    #[test]
    fn borrow_lookup_in_maps() {
        let mut map = std::collections::BTreeMap::new();
        map.insert(BranchId::new("a@1"), 1);
        assert_eq!(map.get("a@1"), Some(&1));
    }
}
