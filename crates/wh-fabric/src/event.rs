use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;
use wh_diff::{FeedPatch, Projection};
use wh_types::{BranchId, FeedId, Generation};

/// Unique, time-ordered identifier of an event.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventId(Uuid);

impl EventId {
    /// A fresh id. UUIDv7 sorts by creation time.
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// The underlying UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }

    /// First 8 hex chars.
    pub fn short(&self) -> String {
        self.0.simple().to_string()[..8].to_string()
    }
}

impl Default for EventId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for EventId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "evt:{}", self.short())
    }
}

/// Classification of warehouse events.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EventKind {
    /// A feed's projection changed.
    Changed,
    /// Branches became unreferenced and were released.
    Released,
    /// A feed was created by a subscribe.
    FeedSubscribed,
    /// A feed was cancelled.
    FeedUnsubscribed,
    /// An existing feed gained branches.
    FeedSubscriptionsChanged,
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Changed => "changed",
            Self::Released => "released",
            Self::FeedSubscribed => "feed-subscribed",
            Self::FeedUnsubscribed => "feed-unsubscribed",
            Self::FeedSubscriptionsChanged => "subscriptions-changed",
        };
        f.write_str(s)
    }
}

/// Body of a change notification.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeBody {
    /// The whole projection.
    State(Projection),
    /// Branch-keyed changes since the previous emission.
    Patch(FeedPatch),
}

/// Payload of a `<feed>.changed` event.
///
/// Serialized as `{"state": {...}, "generation": n, "_xcraftPatch": false}`
/// or `{"patch": {...}, "generation": n, "_xcraftPatch": true}`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeMessage {
    #[serde(flatten)]
    pub body: ChangeBody,
    /// Per-feed sequence number, 0 on the first snapshot.
    pub generation: Generation,
    #[serde(rename = "_xcraftPatch")]
    pub is_patch: bool,
}

impl ChangeMessage {
    /// A full snapshot.
    pub fn snapshot(generation: Generation, state: Projection) -> Self {
        Self {
            body: ChangeBody::State(state),
            generation,
            is_patch: false,
        }
    }

    /// An incremental patch.
    pub fn patch(generation: Generation, patch: FeedPatch) -> Self {
        Self {
            body: ChangeBody::Patch(patch),
            generation,
            is_patch: true,
        }
    }
}

/// Payload data carried by an event.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum EventPayload {
    Changed {
        feed: FeedId,
        message: ChangeMessage,
    },
    /// Released branch ids with their last known generation.
    Released {
        branches: BTreeMap<BranchId, Option<Generation>>,
    },
    FeedSubscribed {
        feed: FeedId,
        branches: Vec<BranchId>,
    },
    FeedUnsubscribed {
        feed: FeedId,
    },
    FeedSubscriptionsChanged {
        feed: FeedId,
        branches: Vec<BranchId>,
    },
}

impl EventPayload {
    /// The kind of this payload.
    pub fn kind(&self) -> EventKind {
        match self {
            Self::Changed { .. } => EventKind::Changed,
            Self::Released { .. } => EventKind::Released,
            Self::FeedSubscribed { .. } => EventKind::FeedSubscribed,
            Self::FeedUnsubscribed { .. } => EventKind::FeedUnsubscribed,
            Self::FeedSubscriptionsChanged { .. } => EventKind::FeedSubscriptionsChanged,
        }
    }

    /// The feed the payload concerns, if any.
    pub fn feed(&self) -> Option<&FeedId> {
        match self {
            Self::Changed { feed, .. }
            | Self::FeedSubscribed { feed, .. }
            | Self::FeedUnsubscribed { feed }
            | Self::FeedSubscriptionsChanged { feed, .. } => Some(feed),
            Self::Released { .. } => None,
        }
    }
}

/// A single event flowing through the fabric.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WarehouseEvent {
    pub id: EventId,
    pub payload: EventPayload,
}

impl WarehouseEvent {
    /// Stamp a payload with a fresh id.
    pub fn new(payload: EventPayload) -> Self {
        Self {
            id: EventId::new(),
            payload,
        }
    }

    /// The kind of this event.
    pub fn kind(&self) -> EventKind {
        self.payload.kind()
    }

    /// The feed this event concerns, if any.
    pub fn feed(&self) -> Option<&FeedId> {
        self.payload.feed()
    }

    /// Topic name: `<feed>.changed`, `warehouse.released`,
    /// `<feed>.subscriptions-changed` or `warehouse.<kind>`.
    pub fn topic(&self) -> String {
        match &self.payload {
            EventPayload::Changed { feed, .. } => format!("{feed}.changed"),
            EventPayload::FeedSubscriptionsChanged { feed, .. } => {
                format!("{feed}.subscriptions-changed")
            }
            other => format!("warehouse.{}", other.kind()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn ids_are_unique() {
        let a = EventId::new();
        let b = EventId::new();
        assert_ne!(a, b);
        assert_eq!(a.short().len(), 8);
        assert!(a.to_string().starts_with("evt:"));
    }

    #[test]
    fn change_message_wire_shape() {
        let mut state = Projection::new();
        state.insert(BranchId::new("a@1"), json!({"id": "a@1"}));
        let message = ChangeMessage::snapshot(0, state);
        assert_eq!(
            serde_json::to_value(&message).unwrap(),
            json!({"state": {"a@1": {"id": "a@1"}}, "generation": 0, "_xcraftPatch": false})
        );

        let message = ChangeMessage::patch(3, FeedPatch::new());
        assert_eq!(
            serde_json::to_value(&message).unwrap(),
            json!({"patch": {}, "generation": 3, "_xcraftPatch": true})
        );
    }

    #[test]
    fn topics() {
        let feed = FeedId::new("feedA");
        let changed = WarehouseEvent::new(EventPayload::Changed {
            feed: feed.clone(),
            message: ChangeMessage::patch(1, FeedPatch::new()),
        });
        assert_eq!(changed.topic(), "feedA.changed");
        assert_eq!(changed.kind(), EventKind::Changed);
        assert_eq!(changed.feed(), Some(&feed));

        let released = WarehouseEvent::new(EventPayload::Released {
            branches: BTreeMap::new(),
        });
        assert_eq!(released.topic(), "warehouse.released");
        assert_eq!(released.feed(), None);

        let gone = WarehouseEvent::new(EventPayload::FeedUnsubscribed { feed });
        assert_eq!(gone.topic(), "warehouse.feed-unsubscribed");
    }

    #[test]
    fn released_serializes_generation_map() {
        let mut branches = BTreeMap::new();
        branches.insert(BranchId::new("a@1"), Some(4));
        branches.insert(BranchId::new("b@1"), None);
        let payload = EventPayload::Released { branches };
        assert_eq!(
            serde_json::to_value(&payload).unwrap(),
            json!({"type": "released", "branches": {"a@1": 4, "b@1": null}})
        );
    }
}
