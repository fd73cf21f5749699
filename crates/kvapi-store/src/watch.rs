//! Event bus: fan-out of lifecycle events to independently paced watchers.
//!
//! Each watcher owns a bounded FIFO buffer and an open/closed flag behind
//! its own lock, separate from the store lock. Fan-out only ever tries to
//! enqueue: when a watcher's buffer is full the newest event is dropped for
//! that watcher and counted. Delivery is therefore at-most-once and lossy
//! under backpressure; mutators are never slowed down by a stalled reader.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, Weak};

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc::{self, error::TryRecvError, error::TrySendError};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Lifecycle transition carried by a [`WatchEvent`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventType {
    Added,
    Modified,
    Deleted,
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Added => "ADDED",
            Self::Modified => "MODIFIED",
            Self::Deleted => "DELETED",
        };
        write!(f, "{s}")
    }
}

/// One event as seen by a watcher. `object` is a private copy of the value
/// at the time the event was produced.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WatchEvent<T> {
    #[serde(rename = "type")]
    pub event_type: EventType,
    pub object: T,
}

/// Removes a closed watcher from whatever registry holds it.
pub(crate) trait WatchRelease: Send + Sync {
    fn release(&self, id: u64);
}

/// Registry-side half of a watcher.
pub(crate) struct WatchSlot<T> {
    id: u64,
    namespace: Option<String>,
    sender: Mutex<Option<mpsc::Sender<WatchEvent<T>>>>,
    token: CancellationToken,
    dropped: AtomicU64,
    release: Weak<dyn WatchRelease>,
}

impl<T> WatchSlot<T> {
    fn matches(&self, namespace: &str) -> bool {
        self.namespace.as_deref().map_or(true, |ns| ns == namespace)
    }

    fn is_open(&self) -> bool {
        !self.token.is_cancelled()
            && self
                .sender
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .is_some()
    }

    /// Try to enqueue without blocking. Returns `false` once the watcher can
    /// never receive again.
    fn offer(&self, event: WatchEvent<T>) -> bool {
        let guard = self.sender.lock().unwrap_or_else(PoisonError::into_inner);
        let Some(sender) = guard.as_ref() else {
            return false;
        };
        match sender.try_send(event) {
            Ok(()) => true,
            Err(TrySendError::Full(event)) => {
                let dropped = self.dropped.fetch_add(1, Ordering::Relaxed) + 1;
                warn!(
                    watcher = self.id,
                    event = %event.event_type,
                    dropped,
                    "watch buffer full; dropping event"
                );
                true
            }
            Err(TrySendError::Closed(_)) => false,
        }
    }

    /// Close the delivery channel and leave the registry. Idempotent.
    pub(crate) fn close(&self) {
        self.token.cancel();
        let was_open = self
            .sender
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
            .is_some();
        if was_open {
            if let Some(registry) = self.release.upgrade() {
                registry.release(self.id);
            }
            info!(watcher = self.id, "watch closed");
        }
    }
}

/// Subscriber table. Lives inside the store state so registration and
/// mutate-and-notify share one exclusivity domain.
pub(crate) struct WatchRegistry<T> {
    slots: HashMap<u64, Arc<WatchSlot<T>>>,
    next_id: u64,
}

impl<T> Default for WatchRegistry<T> {
    fn default() -> Self {
        Self {
            slots: HashMap::new(),
            next_id: 1,
        }
    }
}

impl<T: Clone + Send + 'static> WatchRegistry<T> {
    /// Register a watcher. The returned handle closes itself when `parent`
    /// is cancelled.
    pub(crate) fn register(
        &mut self,
        namespace: Option<String>,
        capacity: usize,
        parent: &CancellationToken,
        release: Weak<dyn WatchRelease>,
    ) -> Watcher<T> {
        let id = self.next_id;
        self.next_id += 1;

        let (tx, rx) = mpsc::channel(capacity.max(1));
        let slot = Arc::new(WatchSlot {
            id,
            namespace,
            sender: Mutex::new(Some(tx)),
            token: parent.child_token(),
            dropped: AtomicU64::new(0),
            release,
        });
        self.slots.insert(id, Arc::clone(&slot));

        // Without a runtime, cancellation is still observed by the next
        // broadcast and by the reader.
        if let Ok(handle) = tokio::runtime::Handle::try_current() {
            let slot = Arc::clone(&slot);
            handle.spawn(async move {
                slot.token.cancelled().await;
                slot.close();
            });
        }

        info!(watcher = id, namespace = ?slot.namespace, capacity, "watch opened");
        Watcher { slot, rx }
    }

    /// Enqueue an event for every open watcher in scope and prune the
    /// closed ones.
    pub(crate) fn broadcast(&mut self, event_type: EventType, namespace: &str, object: &T) {
        self.slots.retain(|id, slot| {
            if !slot.is_open() {
                debug!(watcher = id, "pruning closed watcher");
                return false;
            }
            if !slot.matches(namespace) {
                return true;
            }
            slot.offer(WatchEvent {
                event_type,
                object: object.clone(),
            })
        });
    }

    pub(crate) fn remove(&mut self, id: u64) -> bool {
        self.slots.remove(&id).is_some()
    }

    pub(crate) fn len(&self) -> usize {
        self.slots.len()
    }
}

/// A live, ordered feed of lifecycle events.
///
/// Dropping the watcher stops it.
pub struct Watcher<T> {
    slot: Arc<WatchSlot<T>>,
    rx: mpsc::Receiver<WatchEvent<T>>,
}

impl<T> Watcher<T> {
    /// Wait for the next event.
    ///
    /// Returns `None` once the watch is stopped or cancelled and every event
    /// buffered before that point has been read.
    pub async fn next(&mut self) -> Option<WatchEvent<T>> {
        tokio::select! {
            biased;
            event = self.rx.recv() => event,
            _ = self.slot.token.cancelled() => {
                self.slot.close();
                self.rx.recv().await
            }
        }
    }

    /// Take the next buffered event without waiting.
    pub fn try_next(&mut self) -> Option<WatchEvent<T>> {
        if self.slot.token.is_cancelled() {
            self.slot.close();
        }
        match self.rx.try_recv() {
            Ok(event) => Some(event),
            Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => None,
        }
    }

    /// Stop the watch. Safe to call any number of times.
    pub fn stop(&self) {
        self.slot.close();
    }

    pub fn is_stopped(&self) -> bool {
        !self.slot.is_open()
    }

    /// Events dropped because this watcher's buffer was full.
    pub fn dropped(&self) -> u64 {
        self.slot.dropped.load(Ordering::Relaxed)
    }

    pub fn id(&self) -> u64 {
        self.slot.id
    }
}

impl<T> Drop for Watcher<T> {
    fn drop(&mut self) {
        self.slot.close();
    }
}

impl<T> fmt::Debug for Watcher<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Watcher")
            .field("id", &self.slot.id)
            .field("namespace", &self.slot.namespace)
            .field("dropped", &self.dropped())
            .finish()
    }
}
