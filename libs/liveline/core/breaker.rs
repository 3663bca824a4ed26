//! Reconnection circuit breaker
//!
//! Tracks connection failures in a sliding time window. Once the window
//! holds `failure_threshold` failures the breaker opens and the state
//! machine stops scheduling automatic reconnects until the cooldown from
//! `opened_at` elapses, or until a manual retry resets it.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// Circuit breaker tuning
#[derive(Debug, Clone)]
pub struct BreakerConfig {
    /// Failures inside the window that open the breaker
    pub failure_threshold: usize,
    /// Width of the sliding failure window
    pub window: Duration,
    /// How long the breaker stays open after tripping
    pub cooldown: Duration,
}

impl Default for BreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            window: Duration::from_secs(60),
            cooldown: Duration::from_secs(30),
        }
    }
}

/// Sliding-window circuit breaker
///
/// Owned by the state machine task; not shared, not locked.
#[derive(Debug)]
pub struct CircuitBreaker {
    config: BreakerConfig,
    failures: VecDeque<Instant>,
    opened_at: Option<Instant>,
}

impl CircuitBreaker {
    pub fn new(config: BreakerConfig) -> Self {
        Self {
            config,
            failures: VecDeque::new(),
            opened_at: None,
        }
    }

    /// Record a connection failure
    ///
    /// Returns `true` when this failure tripped the breaker open.
    pub fn record_failure(&mut self) -> bool {
        let now = Instant::now();
        self.prune(now);
        self.failures.push_back(now);

        if self.opened_at.is_none() && self.failures.len() >= self.config.failure_threshold {
            self.opened_at = Some(now);
            return true;
        }
        false
    }

    /// Check whether the breaker currently forbids reconnecting
    ///
    /// The breaker reports closed once the cooldown has elapsed; the state
    /// machine then calls [`CircuitBreaker::reset`] before its next attempt.
    pub fn is_open(&self) -> bool {
        match self.opened_at {
            Some(opened_at) => opened_at.elapsed() < self.config.cooldown,
            None => false,
        }
    }

    /// Time left until the cooldown elapses, `None` while closed
    pub fn remaining_cooldown(&self) -> Option<Duration> {
        self.opened_at
            .map(|opened_at| self.config.cooldown.saturating_sub(opened_at.elapsed()))
    }

    /// Close the breaker and forget the failure history
    ///
    /// Called on every successful connection and on a manual retry.
    pub fn reset(&mut self) {
        self.failures.clear();
        self.opened_at = None;
    }

    /// Failures currently inside the window
    pub fn failure_count(&self) -> usize {
        let now = Instant::now();
        self.failures
            .iter()
            .filter(|at| now.duration_since(**at) < self.config.window)
            .count()
    }

    pub fn opened_at(&self) -> Option<Instant> {
        self.opened_at
    }

    fn prune(&mut self, now: Instant) {
        while let Some(front) = self.failures.front() {
            if now.duration_since(*front) >= self.config.window {
                self.failures.pop_front();
            } else {
                break;
            }
        }
    }
}
