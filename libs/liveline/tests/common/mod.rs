//! Common test utilities for Liveline integration tests
//!
//! This module provides a scriptable mock WebSocket server and polling
//! helpers shared by the integration tests.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::{broadcast, Notify};

/// Macro for verbose test output (controlled by TEST_VERBOSE env var)
#[macro_export]
macro_rules! verbose_println {
    ($($arg:tt)*) => {
        if std::env::var("TEST_VERBOSE").is_ok() {
            println!($($arg)*);
        }
    };
}

/// Connection id the mock server hands out in its handshake ack
pub const MOCK_SESSION_ID: &str = "mock-session";

#[derive(Clone, Debug)]
enum ServerCommand {
    /// Push a text frame to every live connection
    Send(String),
    /// Close every live connection (simulates a dropped link)
    Close,
}

/// A scriptable mock WebSocket server for testing
///
/// Every accepted connection receives a `connected` handshake ack, records
/// inbound text frames, and obeys pushed commands.
pub struct MockWsServer {
    pub addr: SocketAddr,
    shutdown: Arc<Notify>,
    control: broadcast::Sender<ServerCommand>,
    received: Arc<parking_lot::Mutex<Vec<String>>>,
}

impl MockWsServer {
    /// Create and start a new mock WebSocket server
    pub async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let shutdown = Arc::new(Notify::new());
        let (control, _) = broadcast::channel(64);
        let received = Arc::new(parking_lot::Mutex::new(Vec::new()));

        let shutdown_accept = shutdown.clone();
        let control_accept = control.clone();
        let received_accept = Arc::clone(&received);

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    result = listener.accept() => {
                        match result {
                            Ok((stream, _)) => {
                                let control = control_accept.subscribe();
                                let received = Arc::clone(&received_accept);
                                let shutdown = shutdown_accept.clone();
                                tokio::spawn(async move {
                                    Self::handle_connection(stream, control, received, shutdown)
                                        .await;
                                });
                            }
                            Err(e) => {
                                eprintln!("accept error: {}", e);
                                break;
                            }
                        }
                    }
                    _ = shutdown_accept.notified() => {
                        break;
                    }
                }
            }
        });

        Self {
            addr,
            shutdown,
            control,
            received,
        }
    }

    async fn handle_connection(
        stream: tokio::net::TcpStream,
        mut control: broadcast::Receiver<ServerCommand>,
        received: Arc<parking_lot::Mutex<Vec<String>>>,
        shutdown: Arc<Notify>,
    ) {
        use futures_util::{SinkExt, StreamExt};
        use tokio_tungstenite::accept_async;
        use tokio_tungstenite::tungstenite::Message;

        let ws_stream = match accept_async(stream).await {
            Ok(ws) => ws,
            Err(e) => {
                eprintln!("websocket handshake failed: {}", e);
                return;
            }
        };

        let (mut write, mut read) = ws_stream.split();

        let ack = serde_json::json!({
            "type": "connected",
            "payload": { "connection_id": MOCK_SESSION_ID },
        });
        if write.send(Message::Text(ack.to_string())).await.is_err() {
            return;
        }

        loop {
            tokio::select! {
                msg = read.next() => {
                    match msg {
                        Some(Ok(Message::Text(text))) => {
                            received.lock().push(text);
                        }
                        Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                        Some(Ok(_)) => {}
                    }
                }
                command = control.recv() => {
                    match command {
                        Ok(ServerCommand::Send(text)) => {
                            if write.send(Message::Text(text)).await.is_err() {
                                break;
                            }
                        }
                        Ok(ServerCommand::Close) | Err(_) => {
                            let _ = write.close().await;
                            break;
                        }
                    }
                }
                _ = shutdown.notified() => {
                    break;
                }
            }
        }
    }

    /// Get the WebSocket URL for this server
    pub fn ws_url(&self) -> String {
        format!("ws://{}", self.addr)
    }

    /// Push a raw text frame to every live connection
    pub fn push(&self, text: impl Into<String>) {
        let _ = self.control.send(ServerCommand::Send(text.into()));
    }

    /// Push an envelope with the given type and payload
    pub fn push_envelope(&self, kind: &str, payload: serde_json::Value) {
        self.push(
            serde_json::json!({
                "type": kind,
                "payload": payload,
                "timestamp": chrono::Utc::now(),
            })
            .to_string(),
        );
    }

    /// Close every live connection without stopping the server
    pub fn close_clients(&self) {
        let _ = self.control.send(ServerCommand::Close);
    }

    /// Text frames received from clients, in arrival order
    pub fn received(&self) -> Vec<String> {
        self.received.lock().clone()
    }

    /// Shutdown the server
    pub fn shutdown(&self) {
        self.shutdown.notify_waiters();
    }
}

impl Drop for MockWsServer {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Poll a predicate until it holds or the timeout elapses
pub async fn wait_until(predicate: impl Fn() -> bool, timeout: Duration) -> bool {
    let deadline = tokio::time::Instant::now() + timeout;
    while tokio::time::Instant::now() < deadline {
        if predicate() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    predicate()
}
