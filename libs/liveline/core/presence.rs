//! Presence and typing registry
//!
//! Derived entirely from inbound messages relayed by the state machine;
//! never writes to the transport. Presence entries expire when a peer's
//! heartbeat stops arriving; typing entries carry their own TTL.

use std::collections::HashMap;
use std::time::{Duration, Instant};

/// Expiring roster of online peers and live typing indicators
#[derive(Debug)]
pub struct PresenceRegistry {
    heartbeat_timeout: Duration,
    online: HashMap<String, Instant>,
    typing: HashMap<(String, String), Instant>,
}

impl PresenceRegistry {
    /// # Arguments
    /// * `heartbeat_timeout` - how long a peer stays online without a
    ///   refresh before being treated as disconnected
    pub fn new(heartbeat_timeout: Duration) -> Self {
        Self {
            heartbeat_timeout,
            online: HashMap::new(),
            typing: HashMap::new(),
        }
    }

    /// Insert or refresh a peer's presence
    ///
    /// Returns `true` when the visible roster changed (new peer).
    pub fn mark_online(&mut self, user_id: &str) -> bool {
        self.online
            .insert(user_id.to_string(), Instant::now())
            .is_none()
    }

    /// Remove a peer immediately (explicit offline message)
    pub fn mark_offline(&mut self, user_id: &str) -> bool {
        let removed = self.online.remove(user_id).is_some();
        let before = self.typing.len();
        self.typing.retain(|(user, _), _| user != user_id);
        removed || self.typing.len() != before
    }

    /// Insert or refresh a typing indicator with an absolute expiry
    ///
    /// Returns `true` when the visible typing set changed.
    pub fn mark_typing(&mut self, user_id: &str, context_id: &str, ttl: Duration) -> bool {
        self.typing
            .insert(
                (user_id.to_string(), context_id.to_string()),
                Instant::now() + ttl,
            )
            .is_none()
    }

    /// Remove expired entries from both maps
    ///
    /// Returns `true` when anything was removed. Run on a timer while
    /// connected; the read accessors also filter lazily, so a missed sweep
    /// never surfaces a stale peer.
    pub fn sweep(&mut self) -> bool {
        let now = Instant::now();
        let timeout = self.heartbeat_timeout;

        let online_before = self.online.len();
        self.online
            .retain(|_, last_seen| now.duration_since(*last_seen) < timeout);

        let typing_before = self.typing.len();
        self.typing.retain(|_, expires_at| *expires_at > now);

        self.online.len() != online_before || self.typing.len() != typing_before
    }

    /// Currently-online peer ids, sorted for stable snapshots
    pub fn online_users(&self) -> Vec<String> {
        let now = Instant::now();
        let mut users: Vec<String> = self
            .online
            .iter()
            .filter(|(_, last_seen)| now.duration_since(**last_seen) < self.heartbeat_timeout)
            .map(|(user, _)| user.clone())
            .collect();
        users.sort();
        users
    }

    /// Peers with at least one live typing indicator, sorted and deduplicated
    pub fn typing_users(&self) -> Vec<String> {
        let now = Instant::now();
        let mut users: Vec<String> = self
            .typing
            .iter()
            .filter(|(_, expires_at)| **expires_at > now)
            .map(|((user, _), _)| user.clone())
            .collect();
        users.sort();
        users.dedup();
        users
    }

    pub fn is_empty(&self) -> bool {
        self.online.is_empty() && self.typing.is_empty()
    }

    /// Drop everything
    ///
    /// Called when the connection is lost: heartbeats cannot arrive over a
    /// dead socket, so the roster would only go stale.
    pub fn clear(&mut self) {
        self.online.clear();
        self.typing.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread::sleep;

    #[test]
    fn test_online_roster_tracks_heartbeats() {
        let mut registry = PresenceRegistry::new(Duration::from_secs(45));

        assert!(registry.mark_online("alice"));
        assert!(registry.mark_online("bob"));
        // Refresh does not change the roster.
        assert!(!registry.mark_online("alice"));

        assert_eq!(registry.online_users(), vec!["alice", "bob"]);
    }

    #[test]
    fn test_presence_expires_without_refresh() {
        let mut registry = PresenceRegistry::new(Duration::from_millis(50));

        registry.mark_online("alice");
        sleep(Duration::from_millis(60));

        // Lazy read already hides the stale peer; sweep removes it.
        assert!(registry.online_users().is_empty());
        assert!(registry.sweep());
        assert!(registry.is_empty());
    }

    #[test]
    fn test_refresh_extends_presence() {
        let mut registry = PresenceRegistry::new(Duration::from_millis(80));

        registry.mark_online("alice");
        sleep(Duration::from_millis(50));
        registry.mark_online("alice");
        sleep(Duration::from_millis(50));

        assert_eq!(registry.online_users(), vec!["alice"]);
    }

    #[test]
    fn test_explicit_offline_removes_immediately() {
        let mut registry = PresenceRegistry::new(Duration::from_secs(45));

        registry.mark_online("alice");
        registry.mark_typing("alice", "listing-7", Duration::from_secs(5));

        assert!(registry.mark_offline("alice"));
        assert!(registry.online_users().is_empty());
        assert!(registry.typing_users().is_empty());
    }

    #[test]
    fn test_typing_expires_at_ttl() {
        let mut registry = PresenceRegistry::new(Duration::from_secs(45));

        registry.mark_typing("alice", "listing-7", Duration::from_millis(40));
        assert_eq!(registry.typing_users(), vec!["alice"]);

        sleep(Duration::from_millis(50));
        assert!(registry.typing_users().is_empty());
        assert!(registry.sweep());
    }

    #[test]
    fn test_typing_deduplicates_across_contexts() {
        let mut registry = PresenceRegistry::new(Duration::from_secs(45));

        registry.mark_typing("alice", "listing-1", Duration::from_secs(5));
        registry.mark_typing("alice", "listing-2", Duration::from_secs(5));

        assert_eq!(registry.typing_users(), vec!["alice"]);
    }

    #[test]
    fn test_clear_drops_everything() {
        let mut registry = PresenceRegistry::new(Duration::from_secs(45));

        registry.mark_online("alice");
        registry.mark_typing("bob", "listing-1", Duration::from_secs(5));

        registry.clear();
        assert!(registry.is_empty());
    }
}
