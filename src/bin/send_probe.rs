//! Offline buffering probe
//!
//! Enqueues a few messages before connecting, then connects and watches the
//! flush happen in order. Useful for eyeballing queue/flush behavior against
//! a real endpoint.
//!
//! Usage:
//!   LIVELINE_URL=ws://127.0.0.1:9001/socket cargo run --bin send_probe

use anyhow::Result;
use marketline::bin_common::{load_from_env, EnvSetting, RunConfig, ShutdownManager};
use marketline::liveline::{self, ClientEvent, Envelope};
use serde_json::json;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();
    dotenv::dotenv().ok();

    let config = RunConfig::new("send_probe");
    config.print_banner();

    let shutdown = ShutdownManager::new();
    shutdown.spawn_signal_handler();

    let url = load_from_env(EnvSetting::Endpoint);
    let client = liveline::builder()
        .url(&url)
        .shutdown_flag(shutdown.flag())
        .build()
        .await?;

    // Buffer a handful of messages while still disconnected.
    for seq in 1..=3u32 {
        client.send(Envelope::new("probe", json!({ "seq": seq })));
    }
    info!(
        queued = client.snapshot().queued_messages,
        "messages buffered while offline"
    );

    info!(%url, "connecting");
    client.connect();

    // Watch the lifecycle until the flush lands or the user gives up.
    let mut connected = false;
    while shutdown.is_running() {
        while let Some(event) = client.try_recv_event() {
            match event {
                ClientEvent::Connected => {
                    connected = true;
                    info!("connected, queue flushes now");
                }
                ClientEvent::Reconnecting(attempt) => {
                    warn!(attempt, "reconnecting");
                }
                ClientEvent::BreakerOpen => warn!("circuit breaker opened"),
                ClientEvent::Error(message) => warn!(%message, "client error"),
                ClientEvent::Disconnected => info!("disconnected"),
                ClientEvent::Message(envelope) => {
                    info!(kind = %envelope.kind, "server message");
                }
            }
        }

        if connected && client.snapshot().queued_messages == 0 {
            info!(
                sent = client.metrics().messages_sent,
                "flush complete, exiting"
            );
            break;
        }
        sleep(Duration::from_millis(100)).await;
    }

    client.shutdown().await?;
    config.print_shutdown(None);
    Ok(())
}
