//! Integration tests for backoff policies, the circuit breaker and
//! reconnection behavior.

mod common;

use common::{wait_until, MockWsServer};
use liveline::{
    BackoffPolicy, BreakerConfig, ConnectionState, ExponentialBackoff, FixedDelay, NeverRetry,
    RealtimeClient,
};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;

/// Macro for verbose test output
macro_rules! verbose_println {
    ($($arg:tt)*) => {
        if std::env::var("TEST_VERBOSE").is_ok() {
            println!($($arg)*);
        }
    };
}

const WAIT: Duration = Duration::from_secs(3);

#[test]
fn test_exponential_backoff_full_sequence() {
    verbose_println!("Testing exponential backoff full sequence...");

    let policy = ExponentialBackoff::new(
        Duration::from_millis(100),
        Duration::from_secs(10),
        Some(5),
    )
    .with_jitter(0.0);

    let expected_delays = [100, 200, 400, 800, 1600];

    for (attempt, &expected_ms) in expected_delays.iter().enumerate() {
        let delay = policy.delay_for(attempt as u32).unwrap();
        verbose_println!("  Attempt {}: {:?}", attempt, delay);
        assert_eq!(
            delay.as_millis(),
            expected_ms,
            "Unexpected delay at attempt {}",
            attempt
        );
    }

    // Attempt 5 should return None (max_attempts = 5)
    assert!(
        policy.delay_for(5).is_none(),
        "Should return None after max attempts"
    );
}

#[test]
fn test_exponential_backoff_with_capping() {
    verbose_println!("Testing exponential backoff with capping...");

    let policy = ExponentialBackoff::new(
        Duration::from_millis(500),
        Duration::from_secs(2), // Cap at 2 seconds
        None,
    )
    .with_jitter(0.0);

    let delays: Vec<u64> = (0..6)
        .map(|i| policy.delay_for(i).unwrap().as_millis() as u64)
        .collect();

    verbose_println!("  Delays: {:?}", delays);

    assert_eq!(delays[0], 500);
    assert_eq!(delays[1], 1000);
    assert_eq!(delays[2], 2000);
    assert_eq!(delays[3], 2000); // Capped
    assert_eq!(delays[4], 2000); // Capped
    assert_eq!(delays[5], 2000); // Capped
}

#[test]
fn test_exponential_backoff_monotonic_without_jitter() {
    let policy = ExponentialBackoff::new(
        Duration::from_millis(250),
        Duration::from_secs(30),
        None,
    )
    .with_jitter(0.0);

    let mut previous = Duration::ZERO;
    for attempt in 0..16 {
        let delay = policy.delay_for(attempt).unwrap();
        assert!(
            delay >= previous,
            "delay must be non-decreasing in the attempt number"
        );
        assert!(delay <= Duration::from_secs(30));
        previous = delay;
    }
}

#[test]
fn test_exponential_backoff_jitter_stays_in_bounds() {
    verbose_println!("Testing jitter bounds...");

    let policy = ExponentialBackoff::new(
        Duration::from_millis(1000),
        Duration::from_secs(60),
        None,
    )
    .with_jitter(0.2);

    for _ in 0..200 {
        let delay = policy.delay_for(0).unwrap().as_millis() as u64;
        assert!(
            (800..=1200).contains(&delay),
            "jittered delay {} outside the +/-20% band",
            delay
        );
    }
}

#[test]
fn test_fixed_delay_consistency() {
    verbose_println!("Testing fixed delay consistency...");

    let policy = FixedDelay::new(Duration::from_millis(750), None);

    for attempt in 0..100 {
        let delay = policy.delay_for(attempt).unwrap();
        assert_eq!(
            delay,
            Duration::from_millis(750),
            "Fixed delay should be constant"
        );
    }

    verbose_println!("  All 100 attempts returned 750ms");
}

#[test]
fn test_fixed_delay_with_max_attempts() {
    verbose_println!("Testing fixed delay with max attempts...");

    let policy = FixedDelay::new(Duration::from_millis(500), Some(3));

    assert!(policy.delay_for(0).is_some());
    assert!(policy.delay_for(1).is_some());
    assert!(policy.delay_for(2).is_some());
    assert!(policy.delay_for(3).is_none()); // 4th attempt (0-indexed)

    verbose_println!("  Max attempts limit working correctly");
}

#[test]
fn test_never_retry_always_declines() {
    verbose_println!("Testing NeverRetry policy...");

    let policy = NeverRetry;

    for attempt in 0..10 {
        assert!(
            policy.delay_for(attempt).is_none(),
            "NeverRetry should always return None"
        );
        assert!(
            !policy.should_retry(attempt),
            "NeverRetry should never allow another attempt"
        );
    }
}

#[test]
fn test_exponential_backoff_overflow_safety() {
    verbose_println!("Testing exponential backoff overflow safety...");

    let policy = ExponentialBackoff::new(
        Duration::from_millis(100),
        Duration::from_secs(3600), // 1 hour max
        None,
    )
    .with_jitter(0.0);

    let delay = policy.delay_for(30).unwrap();
    verbose_println!("  Delay at attempt 30: {:?}", delay);
    assert!(delay <= Duration::from_secs(3600));

    // Even at extreme values, should not panic
    assert!(policy.delay_for(100).is_some());
    assert!(policy.delay_for(u32::MAX).is_some());
}

/// A URL on a port with no listener: connections are refused immediately.
async fn dead_endpoint() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("ws://{}", addr)
}

async fn failing_client(url: &str, threshold: usize, cooldown: Duration) -> RealtimeClient {
    liveline::builder()
        .url(url)
        .backoff(FixedDelay::new(Duration::from_millis(10), None))
        .breaker(BreakerConfig {
            failure_threshold: threshold,
            window: Duration::from_secs(60),
            cooldown,
        })
        .build()
        .await
        .unwrap()
}

#[tokio::test(flavor = "multi_thread")]
async fn test_repeated_failures_open_breaker_and_stop_attempts() {
    let url = dead_endpoint().await;
    let client = failing_client(&url, 3, Duration::from_secs(30)).await;

    client.connect();

    assert!(
        wait_until(|| client.snapshot().circuit_breaker_open, WAIT).await,
        "breaker should open after repeated failures"
    );
    assert_eq!(client.snapshot().state, ConnectionState::Error);
    assert!(client
        .snapshot()
        .last_error
        .unwrap()
        .contains("circuit breaker"));

    // While the breaker is open no further attempt may be scheduled.
    let attempts = client.metrics().connect_attempts;
    tokio::time::sleep(Duration::from_millis(300)).await;
    assert_eq!(
        client.metrics().connect_attempts,
        attempts,
        "no attempts may start while the breaker is open"
    );

    client.shutdown().await.unwrap();
}

#[tokio::test(flavor = "multi_thread")]
async fn test_force_reconnect_resets_breaker_and_attempt_count() {
    let url = dead_endpoint().await;
    let client = failing_client(&url, 3, Duration::from_secs(30)).await;

    client.connect();
    assert!(wait_until(|| client.snapshot().circuit_breaker_open, WAIT).await);

    // Record every snapshot from here on to observe the reset itself.
    let snapshots = Arc::new(Mutex::new(Vec::new()));
    let snapshots_clone = Arc::clone(&snapshots);
    let _sub = client.subscribe(move |snapshot| {
        snapshots_clone.lock().push(snapshot.clone());
    });

    let attempts_before = client.metrics().connect_attempts;
    client.force_reconnect();

    // The cooldown was 30s away, so any new attempt proves the bypass.
    assert!(
        wait_until(
            || client.metrics().connect_attempts > attempts_before,
            WAIT
        )
        .await,
        "force_reconnect must start a new attempt immediately"
    );

    let reset_seen = wait_until(
        || {
            snapshots.lock().iter().any(|s| {
                s.state == ConnectionState::Connecting
                    && s.reconnect_attempts == 0
                    && !s.circuit_breaker_open
            })
        },
        WAIT,
    )
    .await;
    assert!(
        reset_seen,
        "a Connecting snapshot with attempts=0 and a closed breaker must be published"
    );

    client.shutdown().await.unwrap();
}

#[tokio::test(flavor = "multi_thread")]
async fn test_breaker_cooldown_resumes_attempts() {
    let url = dead_endpoint().await;
    let client = failing_client(&url, 2, Duration::from_millis(400)).await;

    client.connect();
    assert!(wait_until(|| client.snapshot().circuit_breaker_open, WAIT).await);

    let held = client.metrics().connect_attempts;
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(client.metrics().connect_attempts, held);

    // After the cooldown the machine re-enters Connecting on its own.
    assert!(
        wait_until(|| client.metrics().connect_attempts > held, WAIT).await,
        "attempts should resume once the cooldown elapses"
    );

    client.shutdown().await.unwrap();
}

#[tokio::test(flavor = "multi_thread")]
async fn test_connection_drop_triggers_automatic_recovery() {
    let server = MockWsServer::start().await;
    let client = liveline::builder()
        .url(server.ws_url())
        .backoff(FixedDelay::new(Duration::from_millis(30), None))
        .build()
        .await
        .unwrap();

    client.connect();
    assert!(wait_until(|| client.is_connected(), WAIT).await);

    server.close_clients();
    assert!(
        wait_until(|| !client.is_connected(), WAIT).await,
        "the drop should be noticed"
    );

    // The client reconnects by itself and the attempt counter resets.
    assert!(
        wait_until(
            || client.is_connected() && client.snapshot().reconnect_attempts == 0,
            WAIT
        )
        .await,
        "client should recover without intervention"
    );
    assert!(client.metrics().reconnect_count >= 1);

    client.shutdown().await.unwrap();
}

#[tokio::test(flavor = "multi_thread")]
async fn test_exhausted_retries_end_in_error_state() {
    let url = dead_endpoint().await;
    let client = liveline::builder()
        .url(&url)
        .backoff(FixedDelay::new(Duration::from_millis(10), Some(2)))
        .build()
        .await
        .unwrap();

    client.connect();
    assert!(
        wait_until(|| client.snapshot().state == ConnectionState::Error, WAIT).await
    );
    assert!(client
        .snapshot()
        .last_error
        .unwrap()
        .contains("retries exhausted"));

    let attempts = client.metrics().connect_attempts;
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(client.metrics().connect_attempts, attempts);

    client.shutdown().await.unwrap();
}

#[tokio::test(flavor = "multi_thread")]
async fn test_disconnect_cancels_pending_reconnect() {
    let url = dead_endpoint().await;
    let client = liveline::builder()
        .url(&url)
        // Long enough that the backoff wait is certainly pending.
        .backoff(FixedDelay::new(Duration::from_secs(60), None))
        .build()
        .await
        .unwrap();

    client.connect();
    assert!(
        wait_until(
            || client.snapshot().state == ConnectionState::Reconnecting,
            WAIT
        )
        .await
    );

    client.disconnect();
    assert!(
        wait_until(
            || client.snapshot().state == ConnectionState::Disconnected,
            WAIT
        )
        .await,
        "disconnect must cancel the pending backoff timer"
    );

    let attempts = client.metrics().connect_attempts;
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(
        client.metrics().connect_attempts,
        attempts,
        "no further attempts after disconnect"
    );

    client.shutdown().await.unwrap();
}
