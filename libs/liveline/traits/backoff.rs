use std::time::Duration;

/// Default jitter spread applied by [`ExponentialBackoff`] (±20%)
pub const DEFAULT_JITTER: f64 = 0.2;

/// Trait for computing reconnection delays
///
/// Implementations are pure: given the attempt number they return a delay.
/// Scheduling, cancelling and retry bookkeeping belong to the connection
/// state machine, never to the policy.
pub trait BackoffPolicy: Send + Sync {
    /// Get the delay before the next reconnection attempt
    ///
    /// # Arguments
    /// * `attempt` - The reconnection attempt number (0-indexed)
    ///
    /// # Returns
    /// * `Some(duration)` - Wait this long before reconnecting
    /// * `None` - Stop reconnecting
    fn delay_for(&self, attempt: u32) -> Option<Duration>;

    /// Check whether another attempt should be made at all
    fn should_retry(&self, attempt: u32) -> bool;
}

/// Exponential backoff reconnection policy
///
/// Delays grow as `base * 2^attempt`, capped at `max`, then spread by a
/// jitter factor so that a fleet of clients does not reconnect in lockstep
/// when a shared backend recovers.
#[derive(Debug, Clone)]
pub struct ExponentialBackoff {
    base: Duration,
    max: Duration,
    jitter: f64,
    max_attempts: Option<u32>,
}

impl ExponentialBackoff {
    /// Create a new exponential backoff policy with the default jitter
    ///
    /// # Arguments
    /// * `base` - The delay before the first retry
    /// * `max` - The cap on the computed delay
    /// * `max_attempts` - Maximum number of attempts (None = unlimited)
    pub fn new(base: Duration, max: Duration, max_attempts: Option<u32>) -> Self {
        Self {
            base,
            max,
            jitter: DEFAULT_JITTER,
            max_attempts,
        }
    }

    /// Override the jitter spread (0.0 disables jitter entirely)
    pub fn with_jitter(mut self, jitter: f64) -> Self {
        self.jitter = jitter.clamp(0.0, 1.0);
        self
    }
}

impl BackoffPolicy for ExponentialBackoff {
    fn delay_for(&self, attempt: u32) -> Option<Duration> {
        if !self.should_retry(attempt) {
            return None;
        }

        let factor = 2u64.saturating_pow(attempt.min(63));
        let capped = (self.base.as_millis() as u64)
            .saturating_mul(factor)
            .min(self.max.as_millis() as u64);

        let delay_ms = if self.jitter > 0.0 {
            let spread = (capped as f64 * self.jitter) as u64;
            let low = capped.saturating_sub(spread);
            let high = capped.saturating_add(spread);
            if high > low {
                fastrand::u64(low..=high)
            } else {
                capped
            }
        } else {
            capped
        };

        Some(Duration::from_millis(delay_ms))
    }

    fn should_retry(&self, attempt: u32) -> bool {
        self.max_attempts.map_or(true, |max| attempt < max)
    }
}

/// Fixed delay reconnection policy
///
/// Always waits the same amount of time between reconnection attempts
#[derive(Debug, Clone)]
pub struct FixedDelay {
    delay: Duration,
    max_attempts: Option<u32>,
}

impl FixedDelay {
    /// Create a new fixed delay policy
    ///
    /// # Arguments
    /// * `delay` - The fixed delay between reconnects
    /// * `max_attempts` - Maximum number of attempts (None = unlimited)
    pub fn new(delay: Duration, max_attempts: Option<u32>) -> Self {
        Self {
            delay,
            max_attempts,
        }
    }
}

impl BackoffPolicy for FixedDelay {
    fn delay_for(&self, attempt: u32) -> Option<Duration> {
        if !self.should_retry(attempt) {
            return None;
        }
        Some(self.delay)
    }

    fn should_retry(&self, attempt: u32) -> bool {
        self.max_attempts.map_or(true, |max| attempt < max)
    }
}

/// Never retry policy
///
/// The client will not attempt to reconnect after a failure
#[derive(Debug, Clone)]
pub struct NeverRetry;

impl BackoffPolicy for NeverRetry {
    fn delay_for(&self, _attempt: u32) -> Option<Duration> {
        None
    }

    fn should_retry(&self, _attempt: u32) -> bool {
        false
    }
}
