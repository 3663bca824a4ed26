use crate::core::breaker::BreakerConfig;
use crate::traits::{BackoffPolicy, CredentialProvider, Envelope};
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::Duration;

/// Configuration for [`RealtimeClient`](crate::client::RealtimeClient)
///
/// Built via the type-state builder; consumed by the state machine task.
pub struct ClientConfig {
    /// WebSocket endpoint (wss:// or ws://)
    pub(crate) url: String,

    /// Optional handshake credential provider, called on every attempt
    pub(crate) credentials: Option<Arc<dyn CredentialProvider>>,

    /// Reconnection delay policy
    pub(crate) backoff: Box<dyn BackoffPolicy>,

    /// Circuit breaker tuning
    pub(crate) breaker: BreakerConfig,

    /// Outbound queue capacity (drop-oldest beyond this)
    pub(crate) queue_capacity: usize,

    /// Optional outbound keepalive (interval, payload)
    pub(crate) heartbeat: Option<(Duration, Envelope)>,

    /// How long a peer stays in the presence roster without a refresh
    pub(crate) heartbeat_timeout: Duration,

    /// How often expired presence/typing entries are swept while connected
    pub(crate) sweep_interval: Duration,

    /// Shutdown flag - when false, the client stops and will not reconnect
    pub(crate) shutdown_flag: Arc<AtomicBool>,
}

impl ClientConfig {
    /// Get a reference to the URL
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Check if a credential provider is configured
    pub fn has_credentials(&self) -> bool {
        self.credentials.is_some()
    }

    /// Check if an outbound keepalive is configured
    pub fn has_heartbeat(&self) -> bool {
        self.heartbeat.is_some()
    }

    /// Get the outbound queue capacity
    pub fn queue_capacity(&self) -> usize {
        self.queue_capacity
    }

    /// Get the presence heartbeat timeout
    pub fn heartbeat_timeout(&self) -> Duration {
        self.heartbeat_timeout
    }
}
