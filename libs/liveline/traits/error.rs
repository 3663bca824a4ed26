use thiserror::Error;

/// Main error type for liveline
#[derive(Error, Debug)]
pub enum LivelineError {
    /// WebSocket transport error
    #[error("transport error: {0}")]
    Transport(String),

    /// Connection closed unexpectedly
    #[error("connection closed: {0}")]
    ConnectionClosed(String),

    /// Authentication failed
    #[error("authentication failed: {0}")]
    AuthenticationFailed(String),

    /// Malformed wire envelope
    #[error("malformed envelope: {0}")]
    Envelope(String),

    /// Channel send error
    #[error("channel send error: {0}")]
    ChannelSend(String),

    /// Configuration error
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Automatic reconnection gave up
    #[error("retries exhausted after {attempts} attempts: {reason}")]
    RetriesExhausted { attempts: u32, reason: String },
}

/// Result type for liveline operations
pub type Result<T> = std::result::Result<T, LivelineError>;
