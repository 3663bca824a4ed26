//! # Liveline Traits
//!
//! Core traits and types for the Liveline connection client.
//!
//! These are the pluggable seams of the client:
//!
//! - **CredentialProvider**: supply the handshake credential
//! - **BackoffPolicy**: control the delay sequence between reconnect attempts
//! - **Envelope**: the structured wire message exchanged with the server

pub mod auth;
pub mod backoff;
pub mod envelope;
pub mod error;

// Re-export commonly used types
pub use auth::{CredentialProvider, NoCredential, StaticToken};
pub use backoff::{BackoffPolicy, ExponentialBackoff, FixedDelay, NeverRetry};
pub use envelope::{kind, Envelope, ErrorNotice, PresenceUpdate, TypingUpdate};
pub use error::{LivelineError, Result};
