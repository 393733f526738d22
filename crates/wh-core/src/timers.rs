//! Re-armable coalescing timers.
//!
//! A timer is a tokio task that sleeps for its window and then runs a
//! pass. Arming a key that is already armed does nothing: the pending pass
//! reads the state when it fires, so it covers every mutation made while
//! it was waiting.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::trace;
use wh_types::FeedId;

/// What a timer flushes.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum TimerKey {
    /// The change pass of one feed.
    Feed(FeedId),
    /// The release announcement.
    Release,
}

struct Armed {
    seq: u64,
    handle: JoinHandle<()>,
}

#[derive(Default)]
pub(crate) struct Timers {
    armed: Mutex<HashMap<TimerKey, Armed>>,
    seq: AtomicU64,
}

impl Timers {
    /// Arm `key` to call `fire` with the timer's sequence number after
    /// `delay`. Returns `false` when no tokio runtime is available, in which
    /// case the caller is responsible for running the pass.
    pub fn arm<F>(&self, key: TimerKey, delay: Duration, fire: F) -> bool
    where
        F: FnOnce(u64) + Send + 'static,
    {
        let Ok(runtime) = Handle::try_current() else {
            return false;
        };
        let mut armed = self.armed.lock().unwrap_or_else(PoisonError::into_inner);
        if armed.get(&key).is_some_and(|a| !a.handle.is_finished()) {
            return true;
        }
        let seq = self.seq.fetch_add(1, Ordering::Relaxed);
        trace!(?key, seq, ?delay, "timer armed");
        let handle = runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            fire(seq);
        });
        armed.insert(key, Armed { seq, handle });
        true
    }

    /// Forget the timer `seq` of `key` as it starts firing, so that arming
    /// during the pass schedules a new one.
    pub fn fired(&self, key: &TimerKey, seq: u64) {
        let mut armed = self.armed.lock().unwrap_or_else(PoisonError::into_inner);
        if armed.get(key).is_some_and(|a| a.seq == seq) {
            armed.remove(key);
        }
    }

    /// Abort a pending timer. Returns `true` if one was armed.
    pub fn cancel(&self, key: &TimerKey) -> bool {
        let removed = self
            .armed
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key);
        match removed {
            Some(armed) => {
                armed.handle.abort();
                true
            }
            None => false,
        }
    }

    /// Abort every pending timer.
    pub fn cancel_all(&self) {
        let drained: Vec<Armed> = self
            .armed
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .drain()
            .map(|(_, armed)| armed)
            .collect();
        for armed in drained {
            armed.handle.abort();
        }
    }

    pub fn is_armed(&self, key: &TimerKey) -> bool {
        self.armed
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .is_some_and(|a| !a.handle.is_finished())
    }
}

impl Drop for Timers {
    fn drop(&mut self) {
        self.cancel_all();
    }
}
