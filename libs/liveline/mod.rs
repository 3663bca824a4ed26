//! # Liveline
//!
//! A resilient real-time connection client: one persistent WebSocket to a
//! server, kept alive across network interruptions.
//!
//! ## Features
//!
//! - **Single-owner state machine**: one task owns the socket, the retry
//!   state, the outbound queue and the presence registry; everything else
//!   observes through snapshots
//! - **Exponential backoff with jitter**: bounded reconnect frequency under
//!   sustained outage, no thundering herd on recovery
//! - **Circuit breaker**: repeated failures inside a sliding window suspend
//!   automatic reconnection until a cooldown elapses or a manual retry
//! - **Offline buffering**: sends while disconnected are queued (bounded,
//!   drop-oldest) and flushed FIFO on reconnect
//! - **Presence & typing feed**: inbound heartbeats become an expiring
//!   online/typing roster, republished to subscribers on every change

pub mod traits;
pub mod core;
pub mod shared;

// Re-export all traits
pub use traits::*;

// Re-export core client functionality
pub use self::core::{
    breaker, builder, client, config, connection_state, presence, queue, status,
    breaker::{BreakerConfig, CircuitBreaker},
    builder::{states, RealtimeClientBuilder},
    client::{ClientEvent, Metrics, RealtimeClient},
    config::ClientConfig,
    connection_state::{AtomicConnectionState, AtomicMetrics, ConnectionState},
    presence::PresenceRegistry,
    queue::{OutboundQueue, QueuedMessage},
    status::{StatusPublisher, StatusSnapshot, Subscription},
};

// Re-export the process-wide shared handle
pub use shared::SharedRealtime;

// Convenience function
pub use self::core::builder as client_builder;

/// Type alias for Result with LivelineError
pub type Result<T> = std::result::Result<T, traits::LivelineError>;
