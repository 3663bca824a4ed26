//! # Liveline core
//!
//! The connection state machine and the components it orchestrates.
//!
//! One tokio task owns the socket, the retry state, the outbound queue and
//! the presence registry. Commands flow in through a channel
//! (`connect`/`disconnect`/`send`/`force_reconnect`); state flows out as
//! [`StatusSnapshot`]s pushed to subscribers and as [`ClientEvent`]s on a
//! channel for synchronous consumers.
//!
//! ## Example
//!
//! ```rust,ignore
//! use liveline::{builder, Envelope, ExponentialBackoff};
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> liveline::Result<()> {
//!     let client = liveline::builder()
//!         .url("wss://rt.example.com/socket")
//!         .backoff(ExponentialBackoff::new(
//!             Duration::from_secs(1),
//!             Duration::from_secs(60),
//!             None,
//!         ))
//!         .heartbeat(Duration::from_secs(30), Envelope::ping())
//!         .build()
//!         .await?;
//!
//!     let _sub = client.subscribe(|snapshot| {
//!         println!("{} ({} queued)", snapshot.state, snapshot.queued_messages);
//!     });
//!
//!     client.connect();
//!     client.send(Envelope::new("hello", serde_json::json!({})));
//!
//!     client.shutdown().await
//! }
//! ```

pub mod breaker;
pub mod builder;
pub mod client;
pub mod config;
pub mod connection_state;
pub mod presence;
pub mod queue;
pub mod status;

// Re-export main types
pub use breaker::{BreakerConfig, CircuitBreaker};
pub use builder::{states, RealtimeClientBuilder};
pub use client::{ClientEvent, Metrics, RealtimeClient};
pub use config::ClientConfig;
pub use connection_state::{AtomicConnectionState, AtomicMetrics, ConnectionState};
pub use presence::PresenceRegistry;
pub use queue::{OutboundQueue, QueuedMessage};
pub use status::{StatusPublisher, StatusSnapshot, Subscription};

// Re-export traits for convenience
pub use crate::traits::*;

/// Create a new client builder
///
/// This is a convenience function for starting the builder pattern.
///
/// # Example
/// ```ignore
/// let client = liveline::builder()
///     .url("wss://rt.example.com/socket")
///     .credentials(StaticToken::new(token))
///     .build()
///     .await?;
/// ```
pub fn builder() -> RealtimeClientBuilder<builder::states::NoUrl> {
    RealtimeClientBuilder::new()
}
