use crate::error::{LivelineError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Well-known envelope types used by the connection core itself.
///
/// Any type not listed here is passed through to the application untouched.
pub mod kind {
    /// Server handshake acknowledgement carrying the connection id
    pub const CONNECTED: &str = "connected";
    /// Presence heartbeat for a peer (online/offline)
    pub const PRESENCE: &str = "presence";
    /// Typing indicator for a peer within a context
    pub const TYPING: &str = "typing";
    /// Server-reported error, possibly fatal
    pub const ERROR: &str = "error";
    /// Default outbound keepalive
    pub const PING: &str = "ping";
}

/// Structured wire message exchanged with the server
///
/// Every message on the socket is one of these, JSON-encoded. The `type`
/// field discriminates routing: presence and typing updates feed the
/// registry, `connected` carries the session id, `error` may tear the
/// connection down, and everything else is delivered to the application.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope {
    /// Message type discriminator
    #[serde(rename = "type")]
    pub kind: String,
    /// Type-specific payload
    #[serde(default)]
    pub payload: serde_json::Value,
    /// Sender-side wall-clock timestamp
    #[serde(default = "Utc::now")]
    pub timestamp: DateTime<Utc>,
}

impl Envelope {
    /// Create an envelope stamped with the current time
    pub fn new(kind: impl Into<String>, payload: serde_json::Value) -> Self {
        Self {
            kind: kind.into(),
            payload,
            timestamp: Utc::now(),
        }
    }

    /// Default keepalive envelope
    pub fn ping() -> Self {
        Self::new(kind::PING, serde_json::Value::Null)
    }

    /// Decode the payload as a presence update
    pub fn presence(&self) -> Result<PresenceUpdate> {
        serde_json::from_value(self.payload.clone())
            .map_err(|e| LivelineError::Envelope(e.to_string()))
    }

    /// Decode the payload as a typing update
    pub fn typing(&self) -> Result<TypingUpdate> {
        serde_json::from_value(self.payload.clone())
            .map_err(|e| LivelineError::Envelope(e.to_string()))
    }

    /// Decode the payload as a server error notice
    pub fn error_notice(&self) -> Result<ErrorNotice> {
        serde_json::from_value(self.payload.clone())
            .map_err(|e| LivelineError::Envelope(e.to_string()))
    }
}

/// Presence heartbeat payload
///
/// A bare `{user_id}` counts as an online refresh; `online: false` removes
/// the peer from the roster immediately.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PresenceUpdate {
    pub user_id: String,
    #[serde(default = "default_online")]
    pub online: bool,
}

fn default_online() -> bool {
    true
}

/// Typing indicator payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TypingUpdate {
    pub user_id: String,
    pub context_id: String,
    /// How long the indicator stays live without a refresh
    #[serde(default = "default_ttl_ms")]
    pub ttl_ms: u64,
}

fn default_ttl_ms() -> u64 {
    5_000
}

/// Server error payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorNotice {
    #[serde(default)]
    pub message: String,
    /// Fatal errors stop automatic reconnection
    #[serde(default)]
    pub fatal: bool,
}
