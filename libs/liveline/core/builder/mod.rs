pub mod states;

use crate::client::RealtimeClient;
use crate::config::ClientConfig;
use crate::core::breaker::BreakerConfig;
use crate::traits::*;
use states::*;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::Duration;

/// Default outbound queue capacity
const DEFAULT_QUEUE_CAPACITY: usize = 100;
/// Default presence heartbeat timeout
const DEFAULT_HEARTBEAT_TIMEOUT: Duration = Duration::from_secs(45);
/// Default presence/typing sweep interval
const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(5);

/// Type-state builder for [`RealtimeClient`]
///
/// This builder uses Rust's type system to enforce that the endpoint URL
/// is set before the client can be built. Everything else has defaults.
pub struct RealtimeClientBuilder<U>
where
    U: UrlState,
{
    _state: TypeState<U>,
    url: Option<String>,
    credentials: Option<Arc<dyn CredentialProvider>>,
    backoff: Option<Box<dyn BackoffPolicy>>,
    breaker: Option<BreakerConfig>,
    queue_capacity: usize,
    heartbeat: Option<(Duration, Envelope)>,
    heartbeat_timeout: Duration,
    sweep_interval: Duration,
    shutdown_flag: Option<Arc<AtomicBool>>,
}

impl RealtimeClientBuilder<NoUrl> {
    /// Create a new builder instance
    pub fn new() -> Self {
        Self {
            _state: TypeState::new(),
            url: None,
            credentials: None,
            backoff: None,
            breaker: None,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            heartbeat: None,
            heartbeat_timeout: DEFAULT_HEARTBEAT_TIMEOUT,
            sweep_interval: DEFAULT_SWEEP_INTERVAL,
            shutdown_flag: None,
        }
    }

    pub fn url(self, url: impl Into<String>) -> RealtimeClientBuilder<HasUrl> {
        RealtimeClientBuilder {
            _state: TypeState::new(),
            url: Some(url.into()),
            credentials: self.credentials,
            backoff: self.backoff,
            breaker: self.breaker,
            queue_capacity: self.queue_capacity,
            heartbeat: self.heartbeat,
            heartbeat_timeout: self.heartbeat_timeout,
            sweep_interval: self.sweep_interval,
            shutdown_flag: self.shutdown_flag,
        }
    }
}

impl Default for RealtimeClientBuilder<NoUrl> {
    fn default() -> Self {
        Self::new()
    }
}

// Optional configuration methods
impl<U> RealtimeClientBuilder<U>
where
    U: UrlState,
{
    /// Set the handshake credential provider
    pub fn credentials(mut self, provider: impl CredentialProvider + 'static) -> Self {
        self.credentials = Some(Arc::new(provider));
        self
    }

    /// Set the reconnection delay policy
    pub fn backoff(mut self, policy: impl BackoffPolicy + 'static) -> Self {
        self.backoff = Some(Box::new(policy));
        self
    }

    /// Tune the circuit breaker
    pub fn breaker(mut self, config: BreakerConfig) -> Self {
        self.breaker = Some(config);
        self
    }

    /// Set the outbound queue capacity (oldest entries are evicted beyond it)
    pub fn queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity;
        self
    }

    /// Send a keepalive envelope at the given interval while connected
    pub fn heartbeat(mut self, interval: Duration, payload: Envelope) -> Self {
        self.heartbeat = Some((interval, payload));
        self
    }

    /// Set how long a peer stays in the presence roster without a refresh
    pub fn heartbeat_timeout(mut self, timeout: Duration) -> Self {
        self.heartbeat_timeout = timeout;
        self
    }

    /// Set how often the presence/typing registry is swept while connected
    pub fn sweep_interval(mut self, interval: Duration) -> Self {
        self.sweep_interval = interval;
        self
    }

    /// Set a custom shutdown flag for coordinated shutdown across components
    ///
    /// By default the client creates an internal flag. When the flag is set
    /// to `false` the client stops reconnecting and shuts down gracefully.
    pub fn shutdown_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.shutdown_flag = Some(flag);
        self
    }
}

// Build method - only available once the URL is set
impl RealtimeClientBuilder<HasUrl> {
    pub async fn build(self) -> Result<RealtimeClient> {
        let url = self
            .url
            .ok_or_else(|| LivelineError::Configuration("endpoint URL must be set".into()))?;

        let backoff = self.backoff.unwrap_or_else(|| {
            Box::new(ExponentialBackoff::new(
                Duration::from_secs(1),
                Duration::from_secs(60),
                None,
            ))
        });

        let shutdown_flag = self
            .shutdown_flag
            .unwrap_or_else(|| Arc::new(AtomicBool::new(true)));

        let config = ClientConfig {
            url,
            credentials: self.credentials,
            backoff,
            breaker: self.breaker.unwrap_or_default(),
            queue_capacity: self.queue_capacity,
            heartbeat: self.heartbeat,
            heartbeat_timeout: self.heartbeat_timeout,
            sweep_interval: self.sweep_interval,
            shutdown_flag,
        };

        Ok(RealtimeClient::new(config))
    }
}
