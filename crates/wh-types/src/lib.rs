//! Foundation types for the warehouse.
//!
//! Every other warehouse crate depends on `wh-types`.
//!
//! # Key Types
//!
//! - [`BranchId`]: identifier of a stored branch (`type@instance` or singleton)
//! - [`FeedId`]: identifier of a subscription feed
//! - [`Generation`]: per-branch creation stamp used for safe deletion
//! - [`View`]: `with`/`without` field projection
//! - [`StatePath`]: dotted path into the state tree
//! - [`IdPattern`]: shell-style wildcard over ids

pub mod error;
pub mod ids;
pub mod path;
pub mod pattern;
pub mod view;

pub use error::TypeError;
pub use ids::{BranchId, FeedId, Generation, PENDING_PARENT, SYSTEM_FEED};
pub use path::{StatePath, CREATORS_ROOT, GENERATIONS_ROOT, SUBSCRIPTIONS_ROOT};
pub use pattern::IdPattern;
pub use view::{project, View, ID_FIELD};

/// Arbitrary branch payload.
pub type Payload = serde_json::Value;
