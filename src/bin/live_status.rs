//! Live connection status panel
//!
//! Connects to the real-time endpoint and renders a periodically refreshed
//! status panel: connection state, retry/breaker counters, queue depth and
//! the presence/typing roster.
//!
//! Usage:
//!   LIVELINE_URL=wss://rt.example.com/socket cargo run --bin live_status

use anyhow::Result;
use chrono::Utc;
use marketline::bin_common::{load_from_env, EnvSetting, ShutdownManager};
use marketline::liveline::{self, ConnectionState, Envelope, SharedRealtime, StaticToken};
use std::io::{self, Write};
use std::time::Duration;
use tokio::time::sleep;

/// Clear terminal and move cursor to top-left
fn clear_screen() {
    print!("\x1B[2J\x1B[1;1H");
    let _ = io::stdout().flush();
}

/// Format the connection state with color coding
fn format_state(state: ConnectionState) -> String {
    match state {
        ConnectionState::Connected => format!("\x1B[32m{:>12}\x1B[0m", "CONNECTED"),
        ConnectionState::Connecting => format!("\x1B[33m{:>12}\x1B[0m", "CONNECTING"),
        ConnectionState::Reconnecting => format!("\x1B[33m{:>12}\x1B[0m", "RECONNECTING"),
        ConnectionState::Error => format!("\x1B[31m{:>12}\x1B[0m", "ERROR"),
        ConnectionState::Disconnected => format!("\x1B[90m{:>12}\x1B[0m", "DISCONNECTED"),
    }
}

fn format_flag(active: bool, label: &str) -> String {
    if active {
        format!("\x1B[31m{}\x1B[0m", label)
    } else {
        format!("\x1B[90m{}\x1B[0m", "-")
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Minimal logging - only warnings/errors; the panel owns the screen
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::WARN)
        .init();
    dotenv::dotenv().ok();

    let url = load_from_env(EnvSetting::Endpoint);
    let token = load_from_env(EnvSetting::AuthToken);
    let refresh_ms: u64 = load_from_env(EnvSetting::RefreshMs).parse().unwrap_or(500);

    let shutdown = ShutdownManager::new();
    shutdown.spawn_signal_handler();

    let mut builder = liveline::builder()
        .url(&url)
        .heartbeat(Duration::from_secs(30), Envelope::ping())
        .shutdown_flag(shutdown.flag());
    if !token.is_empty() {
        builder = builder.credentials(StaticToken::new(token));
    }
    let realtime = SharedRealtime::new(builder.build().await?);
    realtime.connect();

    while shutdown.is_running() {
        let snapshot = realtime.snapshot();
        let now = Utc::now().format("%Y-%m-%d %H:%M:%S UTC");

        clear_screen();
        println!("════════════════════════════════════════════════════════════════════════");
        println!("  REAL-TIME CONNECTION STATUS");
        println!("════════════════════════════════════════════════════════════════════════");
        println!("  Time: {}    Endpoint: {}", now, url);
        println!("  Press Ctrl+C to stop");
        println!("════════════════════════════════════════════════════════════════════════");
        println!();
        println!("  State:            {}", format_state(snapshot.state));
        println!(
            "  Session:          {:>12}",
            snapshot.session_id.as_deref().unwrap_or("-")
        );
        println!(
            "  Last connected:   {:>12}",
            snapshot
                .last_connected_at
                .map(|at| at.format("%H:%M:%S").to_string())
                .unwrap_or_else(|| "-".to_string())
        );
        println!("  Retry attempts:   {:>12}", snapshot.reconnect_attempts);
        println!("  Total attempts:   {:>12}", snapshot.connect_attempts);
        println!(
            "  Circuit breaker:  {:>12}",
            format_flag(snapshot.circuit_breaker_open, "OPEN")
        );
        println!("  Queued messages:  {:>12}", snapshot.queued_messages);
        println!();
        println!("  Online  ({:>3}):   {}", snapshot.online_users.len(), snapshot.online_users.join(", "));
        println!("  Typing  ({:>3}):   {}", snapshot.typing_users.len(), snapshot.typing_users.join(", "));
        println!();
        if let Some(error) = &snapshot.last_error {
            println!("  \x1B[31mLast error: {}\x1B[0m", error);
        }

        sleep(Duration::from_millis(refresh_ms)).await;
    }

    clear_screen();
    realtime.shutdown().await?;
    println!("live_status stopped gracefully");
    Ok(())
}
