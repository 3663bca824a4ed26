use crate::client::RealtimeClient;
use crate::core::connection_state::ConnectionState;
use crate::core::status::{StatusPublisher, StatusSnapshot, Subscription};
use crate::traits::{Envelope, LivelineError, Result};
use crate::ClientEvent;
use parking_lot::RwLock;
use std::sync::Arc;
use tracing::{info, warn};

/// The one connection the whole application shares
///
/// Many components (status panels, message composers, presence widgets)
/// observe and use a single socket. `SharedRealtime` wraps one
/// [`RealtimeClient`] behind a cheap-to-clone handle so the instance can be
/// passed down through constructors instead of living in a module global;
/// tests construct isolated instances the same way.
///
/// Lifecycle is explicit: construct once at startup, `shutdown().await`
/// once at teardown. Calls after shutdown are safe no-ops that log.
#[derive(Clone)]
pub struct SharedRealtime {
    inner: Arc<SharedInner>,
}

struct SharedInner {
    /// Kept alongside the client so subscriptions and snapshot reads keep
    /// working (with the final state) after shutdown.
    status: StatusPublisher,
    client: RwLock<Option<RealtimeClient>>,
}

impl SharedRealtime {
    /// Wrap a built client into the shared handle
    pub fn new(client: RealtimeClient) -> Self {
        let status = client.status_publisher();
        Self {
            inner: Arc::new(SharedInner {
                status,
                client: RwLock::new(Some(client)),
            }),
        }
    }

    /// Start connecting
    pub fn connect(&self) {
        self.with_client("connect", |client| client.connect());
    }

    /// Tear the connection down to Disconnected
    pub fn disconnect(&self) {
        self.with_client("disconnect", |client| client.disconnect());
    }

    /// Send a message, buffering while disconnected
    pub fn send(&self, envelope: Envelope) {
        self.with_client("send", |client| client.send(envelope));
    }

    /// Manual "retry now": resets retry state and breaker, reconnects
    pub fn force_reconnect(&self) {
        self.with_client("force_reconnect", |client| client.force_reconnect());
    }

    /// Register a snapshot callback; dropping the handle unsubscribes
    pub fn subscribe(
        &self,
        callback: impl Fn(&StatusSnapshot) + Send + Sync + 'static,
    ) -> Subscription {
        self.inner.status.subscribe(callback)
    }

    /// Latest published status snapshot
    pub fn snapshot(&self) -> StatusSnapshot {
        self.inner.status.latest()
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.snapshot().state
    }

    pub fn is_connected(&self) -> bool {
        self.snapshot().connected
    }

    /// Drain one pending event, if any
    pub fn try_recv_event(&self) -> Option<ClientEvent> {
        let guard = self.inner.client.read();
        guard.as_ref().and_then(|client| client.try_recv_event())
    }

    /// Check whether the instance is still live
    pub fn is_shut_down(&self) -> bool {
        self.inner.client.read().is_none()
    }

    /// Tear down the shared connection
    ///
    /// The first caller wins; later calls return an error so double
    /// teardowns surface during development instead of passing silently.
    pub async fn shutdown(&self) -> Result<()> {
        let client = self.inner.client.write().take();
        match client {
            Some(client) => {
                info!("shutting down shared realtime connection");
                client.shutdown().await
            }
            None => Err(LivelineError::Configuration(
                "shared realtime connection already shut down".to_string(),
            )),
        }
    }

    fn with_client(&self, operation: &str, f: impl FnOnce(&RealtimeClient)) {
        let guard = self.inner.client.read();
        match guard.as_ref() {
            Some(client) => f(client),
            None => warn!(%operation, "shared realtime connection used after shutdown"),
        }
    }
}
