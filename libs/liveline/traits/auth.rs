use crate::error::Result;
use async_trait::async_trait;

/// Trait for supplying the handshake credential
///
/// The credential is requested on every connection attempt (including
/// reconnections) and attached to the WebSocket upgrade request as a
/// bearer Authorization header, so rotated tokens are picked up without
/// restarting the client.
///
/// Token issuance itself lives outside the connection core; this trait is
/// the seam where the external auth collaborator plugs in.
#[async_trait]
pub trait CredentialProvider: Send + Sync {
    /// Produce the credential for the next handshake
    ///
    /// # Returns
    /// * `Ok(Some(token))` - Attach this token to the upgrade request
    /// * `Ok(None)` - Connect without a credential
    /// * `Err(LivelineError)` - Credential unavailable right now; the
    ///   attempt is treated as a transient failure and retried
    async fn credential(&self) -> Result<Option<String>>;
}

/// A no-op provider for servers that accept anonymous connections
pub struct NoCredential;

#[async_trait]
impl CredentialProvider for NoCredential {
    async fn credential(&self) -> Result<Option<String>> {
        Ok(None)
    }
}

/// Fixed token provider
///
/// Suitable for long-lived API tokens; use a custom provider when tokens
/// expire and need refreshing between reconnects.
pub struct StaticToken {
    token: String,
}

impl StaticToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }
}

#[async_trait]
impl CredentialProvider for StaticToken {
    async fn credential(&self) -> Result<Option<String>> {
        Ok(Some(self.token.clone()))
    }
}
