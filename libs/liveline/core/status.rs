//! Status snapshots and the subscriber fan-out
//!
//! After every state transition, queue mutation or registry change the
//! state machine builds a fresh [`StatusSnapshot`] and hands it to the
//! [`StatusPublisher`], which delivers it synchronously to every
//! subscriber. Consumers therefore always render the latest known truth;
//! there is no batching and no coalescing.

use crate::core::connection_state::ConnectionState;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

/// Read-only projection of the client's state
#[derive(Debug, Clone, Serialize)]
pub struct StatusSnapshot {
    pub state: ConnectionState,
    pub connected: bool,
    pub last_connected_at: Option<DateTime<Utc>>,
    /// Failed attempts since the last successful connection
    pub reconnect_attempts: u32,
    /// Handshakes started over the client's lifetime
    pub connect_attempts: u64,
    /// Server-issued connection id for the live session
    pub session_id: Option<String>,
    pub last_error: Option<String>,
    pub queued_messages: usize,
    pub circuit_breaker_open: bool,
    pub online_users: Vec<String>,
    pub typing_users: Vec<String>,
}

impl StatusSnapshot {
    /// Snapshot of a freshly constructed, never-connected client
    pub fn initial() -> Self {
        Self {
            state: ConnectionState::Disconnected,
            connected: false,
            last_connected_at: None,
            reconnect_attempts: 0,
            connect_attempts: 0,
            session_id: None,
            last_error: None,
            queued_messages: 0,
            circuit_breaker_open: false,
            online_users: Vec::new(),
            typing_users: Vec::new(),
        }
    }
}

type StatusCallback = Arc<dyn Fn(&StatusSnapshot) + Send + Sync>;

struct PublisherInner {
    next_id: AtomicU64,
    subscribers: RwLock<HashMap<u64, StatusCallback>>,
    latest: RwLock<StatusSnapshot>,
}

/// Multi-producer/multi-consumer snapshot fan-out
///
/// Cloning is cheap (shared inner); the state machine holds one clone for
/// publishing and consumers hold clones for subscribing and polling.
#[derive(Clone)]
pub struct StatusPublisher {
    inner: Arc<PublisherInner>,
}

impl StatusPublisher {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(PublisherInner {
                next_id: AtomicU64::new(0),
                subscribers: RwLock::new(HashMap::new()),
                latest: RwLock::new(StatusSnapshot::initial()),
            }),
        }
    }

    /// Register a callback invoked synchronously on every published snapshot
    ///
    /// Dropping the returned [`Subscription`] unsubscribes; other
    /// subscribers are unaffected.
    pub fn subscribe(
        &self,
        callback: impl Fn(&StatusSnapshot) + Send + Sync + 'static,
    ) -> Subscription {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        self.inner
            .subscribers
            .write()
            .insert(id, Arc::new(callback));
        Subscription {
            id,
            inner: Arc::downgrade(&self.inner),
        }
    }

    /// Store the snapshot and deliver it to every subscriber
    pub fn publish(&self, snapshot: StatusSnapshot) {
        *self.inner.latest.write() = snapshot.clone();

        // Snapshot the callback list first so a subscriber may
        // subscribe/unsubscribe from inside its callback.
        let callbacks: Vec<StatusCallback> =
            self.inner.subscribers.read().values().cloned().collect();
        for callback in callbacks {
            callback(&snapshot);
        }
    }

    /// Latest published snapshot (initial state before the first publish)
    pub fn latest(&self) -> StatusSnapshot {
        self.inner.latest.read().clone()
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner.subscribers.read().len()
    }
}

impl Default for StatusPublisher {
    fn default() -> Self {
        Self::new()
    }
}

/// Handle to an active subscription; unsubscribes on drop
pub struct Subscription {
    id: u64,
    inner: Weak<PublisherInner>,
}

impl Subscription {
    /// Explicit unsubscribe, equivalent to dropping the handle
    pub fn unsubscribe(self) {}
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(inner) = self.inner.upgrade() {
            inner.subscribers.write().remove(&self.id);
        }
    }
}
