use std::sync::{PoisonError, RwLock};

use tokio::sync::broadcast::{self, error::RecvError, error::TryRecvError};
use tracing::debug;

use wh_types::FeedId;

use crate::error::{FabricError, Result};
use crate::event::{EventKind, EventPayload, WarehouseEvent};

/// Filter for subscribing to a subset of warehouse events.
#[derive(Clone, Debug, Default)]
pub struct EventFilter {
    /// If set, only events about these feeds are delivered. Events with no
    /// feed (releases) always pass this check.
    pub feeds: Option<Vec<FeedId>>,
    /// If set, only events of these kinds are delivered.
    pub kinds: Option<Vec<EventKind>>,
}

impl EventFilter {
    /// Accept every event.
    pub fn all() -> Self {
        Self::default()
    }

    /// Events about one feed, plus releases.
    pub fn feed(feed: FeedId) -> Self {
        Self {
            feeds: Some(vec![feed]),
            kinds: None,
        }
    }

    /// Events of the given kinds.
    pub fn kinds(kinds: &[EventKind]) -> Self {
        Self {
            feeds: None,
            kinds: Some(kinds.to_vec()),
        }
    }

    /// Returns `true` if the given event matches this filter.
    pub fn matches(&self, event: &WarehouseEvent) -> bool {
        if let (Some(feeds), Some(feed)) = (&self.feeds, event.feed()) {
            if !feeds.contains(feed) {
                return false;
            }
        }
        if let Some(ref kinds) = self.kinds {
            if !kinds.contains(&event.kind()) {
                return false;
            }
        }
        true
    }
}

/// Receiving end of a subscription.
pub struct EventStream {
    receiver: broadcast::Receiver<WarehouseEvent>,
}

impl EventStream {
    /// Wait for the next event.
    pub async fn recv(&mut self) -> Result<WarehouseEvent> {
        self.receiver.recv().await.map_err(|e| match e {
            RecvError::Closed => FabricError::Closed,
            RecvError::Lagged(n) => FabricError::Lagged(n),
        })
    }

    /// Take the next event if one is already queued.
    pub fn try_recv(&mut self) -> Result<Option<WarehouseEvent>> {
        match self.receiver.try_recv() {
            Ok(event) => Ok(Some(event)),
            Err(TryRecvError::Empty) => Ok(None),
            Err(TryRecvError::Closed) => Err(FabricError::Closed),
            Err(TryRecvError::Lagged(n)) => Err(FabricError::Lagged(n)),
        }
    }

    /// Drain every queued event.
    pub fn drain(&mut self) -> Vec<WarehouseEvent> {
        let mut events = Vec::new();
        loop {
            match self.try_recv() {
                Ok(Some(event)) => events.push(event),
                Ok(None) | Err(FabricError::Closed) => break,
                Err(FabricError::Lagged(_)) => continue,
            }
        }
        events
    }
}

struct Subscriber {
    filter: EventFilter,
    sender: broadcast::Sender<WarehouseEvent>,
}

/// Fan-out bus delivering warehouse events to matching subscribers.
pub struct EventBus {
    subscribers: RwLock<Vec<Subscriber>>,
    capacity: usize,
}

impl EventBus {
    /// Create a bus whose per-subscriber channels hold `capacity` events.
    pub fn new(capacity: usize) -> Self {
        Self {
            subscribers: RwLock::new(Vec::new()),
            capacity: capacity.max(1),
        }
    }

    /// Register a subscriber with the given filter.
    pub fn subscribe(&self, filter: EventFilter) -> EventStream {
        let (sender, receiver) = broadcast::channel(self.capacity);
        self.subscribers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Subscriber { filter, sender });
        EventStream { receiver }
    }

    /// Stamp and route a payload. Returns the emitted event.
    ///
    /// Subscribers whose receivers were dropped are pruned.
    pub fn emit(&self, payload: EventPayload) -> WarehouseEvent {
        let event = WarehouseEvent::new(payload);
        let mut subscribers = self
            .subscribers
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        subscribers.retain(|sub| {
            if sub.filter.matches(&event) {
                sub.sender.send(event.clone()).is_ok()
            } else {
                sub.sender.receiver_count() > 0
            }
        });
        debug!(id = %event.id, topic = %event.topic(), "event emitted");
        event
    }

    /// Current number of active subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.subscribers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(1024)
    }
}
