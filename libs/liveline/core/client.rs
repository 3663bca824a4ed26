use crate::config::ClientConfig;
use crate::connection_state::{AtomicConnectionState, AtomicMetrics, ConnectionState};
use crate::core::breaker::CircuitBreaker;
use crate::core::presence::PresenceRegistry;
use crate::core::queue::OutboundQueue;
use crate::core::status::{StatusPublisher, StatusSnapshot, Subscription};
use crate::traits::*;
use chrono::{DateTime, Utc};
use crossbeam_channel::{unbounded, Receiver, Sender};
use futures::{SinkExt, StreamExt};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http;
use tokio_tungstenite::{connect_async, tungstenite, tungstenite::Message};
use tracing::{debug, error, info, warn};

/// How often waiting loops re-check the shared shutdown flag
const SHUTDOWN_POLL: Duration = Duration::from_millis(250);

type WsStream =
    tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>;

/// Internal command messages for client control
#[derive(Debug)]
enum ClientCommand {
    /// Start connecting (initial or manual)
    Connect,
    /// Tear down to Disconnected, cancelling all pending timers
    Disconnect,
    /// Send a message, or buffer it while not connected
    Send(Envelope),
    /// Reset retry state and breaker, then reconnect immediately
    ForceReconnect,
    /// Shutdown the client
    Shutdown,
}

/// Events emitted by the client
#[derive(Debug, Clone)]
pub enum ClientEvent {
    /// Connected to the server
    Connected,
    /// Disconnected from the server
    Disconnected,
    /// Reconnect scheduled (failed attempt count)
    Reconnecting(u32),
    /// Circuit breaker tripped open
    BreakerOpen,
    /// Error surfaced (also available on the snapshot)
    Error(String),
    /// Application message passed through from the server
    Message(Envelope),
}

/// Client metrics snapshot
#[derive(Debug, Clone)]
pub struct Metrics {
    pub messages_sent: u64,
    pub messages_received: u64,
    pub reconnect_count: u64,
    pub connect_attempts: u64,
    pub connection_state: ConnectionState,
}

/// Live session descriptor, created on the Connected transition
#[derive(Debug, Clone)]
struct ConnectionSession {
    /// Opaque id issued by the server's `connected` envelope
    connection_id: Option<String>,
    last_connected_at: DateTime<Utc>,
}

/// Resilient real-time connection client
///
/// Owns a single persistent WebSocket to a server. A dedicated tokio task
/// runs the connection state machine; it is the only code that touches the
/// transport, the retry state, the outbound queue and the presence
/// registry, so no locking is needed around any of them.
///
/// Failures never surface as errors from this API: `send` while offline
/// buffers, transient failures retry with backoff under circuit-breaker
/// protection, and everything observable lands in the [`StatusSnapshot`]
/// pushed to subscribers.
pub struct RealtimeClient {
    /// Client configuration
    #[allow(dead_code)]
    config: Arc<ClientConfig>,
    /// Atomic connection state
    state: Arc<AtomicConnectionState>,
    /// Atomic metrics
    metrics: Arc<AtomicMetrics>,
    /// Snapshot fan-out
    status: StatusPublisher,
    /// Command channel sender
    command_tx: mpsc::UnboundedSender<ClientCommand>,
    /// Event channel receiver
    event_rx: Receiver<ClientEvent>,
    /// State machine task handle
    task_handle: Option<tokio::task::JoinHandle<()>>,
    /// Shutdown flag reference (for external coordination)
    shutdown_flag: Arc<AtomicBool>,
}

impl RealtimeClient {
    /// Create a new client from configuration
    ///
    /// This is called by the builder's `build()` method.
    /// Use `liveline::builder()` to create a client.
    pub(crate) fn new(config: ClientConfig) -> Self {
        let config = Arc::new(config);
        let state = Arc::new(AtomicConnectionState::new(ConnectionState::Disconnected));
        let metrics = Arc::new(AtomicMetrics::new());
        let status = StatusPublisher::new();
        let shutdown_flag = Arc::clone(&config.shutdown_flag);

        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (event_tx, event_rx) = unbounded();

        let task_handle = {
            let config = Arc::clone(&config);
            let state = Arc::clone(&state);
            let metrics = Arc::clone(&metrics);
            let status = status.clone();

            tokio::spawn(async move {
                run_client(config, state, metrics, status, command_rx, event_tx).await;
            })
        };

        Self {
            config,
            state,
            metrics,
            status,
            command_tx,
            event_rx,
            task_handle: Some(task_handle),
            shutdown_flag,
        }
    }

    /// Start connecting (initial or manual)
    pub fn connect(&self) {
        self.command(ClientCommand::Connect);
    }

    /// Tear down to Disconnected
    ///
    /// Cancels every pending timer (backoff, cooldown, sweep) and discards
    /// retry state, breaker state and buffered outbound messages.
    pub fn disconnect(&self) {
        self.command(ClientCommand::Disconnect);
    }

    /// Send a message through the connection
    ///
    /// Writes directly while connected; buffers into the bounded outbound
    /// queue otherwise. Never fails for transient network conditions - a
    /// full queue evicts its oldest entry instead.
    pub fn send(&self, envelope: Envelope) {
        self.command(ClientCommand::Send(envelope));
    }

    /// Manual "retry now" escape hatch
    ///
    /// Resets the retry counter and the circuit breaker, cancels any
    /// pending backoff or cooldown wait, and immediately starts a new
    /// connection attempt.
    pub fn force_reconnect(&self) {
        self.command(ClientCommand::ForceReconnect);
    }

    fn command(&self, command: ClientCommand) {
        if self.command_tx.send(command).is_err() {
            warn!("client task is gone, command dropped");
        }
    }

    /// Register a snapshot callback; dropping the handle unsubscribes
    pub fn subscribe(
        &self,
        callback: impl Fn(&StatusSnapshot) + Send + Sync + 'static,
    ) -> Subscription {
        self.status.subscribe(callback)
    }

    /// Latest published status snapshot
    pub fn snapshot(&self) -> StatusSnapshot {
        self.status.latest()
    }

    /// Get current connection state
    #[inline]
    pub fn connection_state(&self) -> ConnectionState {
        self.state.get()
    }

    /// Check if connected
    #[inline]
    pub fn is_connected(&self) -> bool {
        self.state.is_connected()
    }

    /// Endpoint this client connects to
    pub fn url(&self) -> &str {
        self.config.url()
    }

    /// Get current metrics
    pub fn metrics(&self) -> Metrics {
        Metrics {
            messages_sent: self.metrics.messages_sent(),
            messages_received: self.metrics.messages_received(),
            reconnect_count: self.metrics.reconnect_count(),
            connect_attempts: self.metrics.connect_attempts(),
            connection_state: self.state.get(),
        }
    }

    /// Try to receive an event (non-blocking)
    pub fn try_recv_event(&self) -> Option<ClientEvent> {
        self.event_rx.try_recv().ok()
    }

    /// Receive an event (blocking)
    pub fn recv_event(&self) -> std::result::Result<ClientEvent, crossbeam_channel::RecvError> {
        self.event_rx.recv()
    }

    /// Get a reference to the shutdown flag
    ///
    /// The flag is checked before every reconnection attempt and inside
    /// every wait; storing `false` shuts the client down from outside.
    pub fn shutdown_flag(&self) -> &Arc<AtomicBool> {
        &self.shutdown_flag
    }

    /// Snapshot fan-out handle, shared with [`SharedRealtime`](crate::SharedRealtime)
    pub(crate) fn status_publisher(&self) -> StatusPublisher {
        self.status.clone()
    }

    /// Shutdown the client and join its task
    pub async fn shutdown(mut self) -> Result<()> {
        info!("shutting down realtime client");
        self.shutdown_flag.store(false, Ordering::Release);
        let _ = self.command_tx.send(ClientCommand::Shutdown);

        if let Some(handle) = self.task_handle.take() {
            let _ = handle.await;
        }
        Ok(())
    }
}

/// Task-local state of the machine
///
/// Everything here has exactly one writer: the state machine task.
struct ClientCore {
    config: Arc<ClientConfig>,
    state: Arc<AtomicConnectionState>,
    metrics: Arc<AtomicMetrics>,
    status: StatusPublisher,
    event_tx: Sender<ClientEvent>,
    session: Option<ConnectionSession>,
    last_connected_at: Option<DateTime<Utc>>,
    retry_attempts: u32,
    breaker: CircuitBreaker,
    queue: OutboundQueue,
    presence: PresenceRegistry,
    last_error: Option<String>,
}

impl ClientCore {
    fn new(
        config: Arc<ClientConfig>,
        state: Arc<AtomicConnectionState>,
        metrics: Arc<AtomicMetrics>,
        status: StatusPublisher,
        event_tx: Sender<ClientEvent>,
    ) -> Self {
        let breaker = CircuitBreaker::new(config.breaker.clone());
        let queue = OutboundQueue::new(config.queue_capacity);
        let presence = PresenceRegistry::new(config.heartbeat_timeout);

        Self {
            config,
            state,
            metrics,
            status,
            event_tx,
            session: None,
            last_connected_at: None,
            retry_attempts: 0,
            breaker,
            queue,
            presence,
            last_error: None,
        }
    }

    fn shutdown_live(&self) -> bool {
        self.config.shutdown_flag.load(Ordering::Acquire)
    }

    fn emit(&self, event: ClientEvent) {
        let _ = self.event_tx.send(event);
    }

    /// Rebuild the snapshot and push it to every subscriber
    fn publish(&self) {
        let state = self.state.get();
        self.status.publish(StatusSnapshot {
            state,
            connected: state == ConnectionState::Connected,
            last_connected_at: self
                .session
                .as_ref()
                .map(|session| session.last_connected_at)
                .or(self.last_connected_at),
            reconnect_attempts: self.retry_attempts,
            connect_attempts: self.metrics.connect_attempts(),
            session_id: self
                .session
                .as_ref()
                .and_then(|session| session.connection_id.clone()),
            last_error: self.last_error.clone(),
            queued_messages: self.queue.len(),
            circuit_breaker_open: self.breaker.is_open(),
            online_users: self.presence.online_users(),
            typing_users: self.presence.typing_users(),
        });
    }

    fn enqueue(&mut self, envelope: Envelope) {
        if let Some(dropped) = self.queue.enqueue(envelope) {
            debug!(
                kind = %dropped.payload.kind,
                "outbound queue full, dropped oldest message"
            );
        }
        self.publish();
    }

    fn begin_attempt(&mut self) {
        self.state.set(ConnectionState::Connecting);
        self.metrics.increment_attempts();
        self.publish();
    }

    fn enter_connected(&mut self) {
        let now = Utc::now();
        self.session = Some(ConnectionSession {
            connection_id: None,
            last_connected_at: now,
        });
        self.last_connected_at = Some(now);
        self.retry_attempts = 0;
        self.breaker.reset();
        self.last_error = None;
        self.state.set(ConnectionState::Connected);
        info!(url = %self.config.url, "connected");
        self.publish();
        self.emit(ClientEvent::Connected);
    }

    fn connection_lost(&mut self, reason: &str) {
        warn!(%reason, "connection lost");
        self.session = None;
        self.presence.clear();
        self.retry_attempts += 1;
        self.metrics.increment_reconnects();
        self.last_error = Some(reason.to_string());
        let tripped = self.breaker.record_failure();
        self.state.set(ConnectionState::Reconnecting);
        self.publish();
        self.emit(ClientEvent::Disconnected);
        self.emit(ClientEvent::Reconnecting(self.retry_attempts));

        if tripped {
            warn!(
                failures = self.breaker.failure_count(),
                "circuit breaker opened"
            );
            self.emit(ClientEvent::BreakerOpen);
        }
    }

    fn enter_breaker_wait(&mut self) {
        let message = "circuit breaker active: automatic reconnection suspended".to_string();
        self.last_error = Some(message.clone());
        self.state.set(ConnectionState::Error);
        self.publish();
        self.emit(ClientEvent::Error(message));
    }

    fn enter_fatal(&mut self, reason: &str) {
        error!(%reason, "unrecoverable connection failure");
        self.session = None;
        self.presence.clear();
        self.last_error = Some(reason.to_string());
        self.state.set(ConnectionState::Error);
        self.publish();
        self.emit(ClientEvent::Error(reason.to_string()));
    }

    /// Reset both RetryState and the breaker before a manual retry
    fn reset_for_manual_retry(&mut self) {
        self.retry_attempts = 0;
        self.breaker.reset();
        self.last_error = None;
    }

    fn enter_disconnected(&mut self, discard_queue: bool) {
        let was_disconnected = self.state.is_disconnected();
        self.session = None;
        self.presence.clear();
        self.retry_attempts = 0;
        self.breaker.reset();
        if discard_queue {
            self.queue.clear();
        }
        self.state.set(ConnectionState::Disconnected);
        if !was_disconnected {
            self.publish();
            self.emit(ClientEvent::Disconnected);
        }
    }

    /// Route an inbound envelope by its type discriminator
    fn route_envelope(&mut self, envelope: Envelope) -> Option<Teardown> {
        match envelope.kind.as_str() {
            kind::CONNECTED => {
                let id = envelope
                    .payload
                    .get("connection_id")
                    .and_then(|value| value.as_str())
                    .map(str::to_string);
                debug!(connection_id = ?id, "session acknowledged by server");
                if let Some(session) = self.session.as_mut() {
                    session.connection_id = id;
                    self.publish();
                }
                None
            }
            kind::PRESENCE => {
                match envelope.presence() {
                    Ok(update) => {
                        let changed = if update.online {
                            self.presence.mark_online(&update.user_id)
                        } else {
                            self.presence.mark_offline(&update.user_id)
                        };
                        if changed {
                            self.publish();
                        }
                    }
                    Err(e) => warn!("dropping malformed presence update: {}", e),
                }
                None
            }
            kind::TYPING => {
                match envelope.typing() {
                    Ok(update) => {
                        let ttl = Duration::from_millis(update.ttl_ms);
                        if self
                            .presence
                            .mark_typing(&update.user_id, &update.context_id, ttl)
                        {
                            self.publish();
                        }
                    }
                    Err(e) => warn!("dropping malformed typing update: {}", e),
                }
                None
            }
            kind::ERROR => {
                let notice = envelope.error_notice().unwrap_or_else(|_| ErrorNotice {
                    message: "unspecified server error".to_string(),
                    fatal: false,
                });
                if notice.fatal {
                    return Some(Teardown::Fatal(notice.message));
                }
                warn!(message = %notice.message, "server reported error");
                self.last_error = Some(notice.message.clone());
                self.publish();
                self.emit(ClientEvent::Error(notice.message));
                None
            }
            _ => {
                self.emit(ClientEvent::Message(envelope));
                None
            }
        }
    }

    /// Process one inbound transport frame
    fn handle_frame(&mut self, frame: Message) -> Option<Teardown> {
        match frame {
            Message::Text(text) => {
                self.metrics.increment_received();
                match serde_json::from_str::<Envelope>(&text) {
                    Ok(envelope) => self.route_envelope(envelope),
                    Err(e) => {
                        warn!("dropping malformed inbound message: {}", e);
                        None
                    }
                }
            }
            Message::Binary(data) => {
                self.metrics.increment_received();
                match serde_json::from_slice::<Envelope>(&data) {
                    Ok(envelope) => self.route_envelope(envelope),
                    Err(e) => {
                        warn!("dropping malformed inbound message: {}", e);
                        None
                    }
                }
            }
            Message::Close(_) => Some(Teardown::Remote("server closed the connection".to_string())),
            // Control frames are handled by the transport layer
            Message::Ping(_) | Message::Pong(_) | Message::Frame(_) => None,
        }
    }
}

/// Why the connected loop ended
enum Teardown {
    /// Transport failed or the server went away; retry applies
    Remote(String),
    /// Non-retryable failure (rejected credentials, fatal server error)
    Fatal(String),
    /// Explicit disconnect() from the application
    Disconnect,
    /// force_reconnect() while connected: reconnect fresh
    Force,
    /// Shutdown requested
    Shutdown,
}

/// Outcome of a cancellable wait (backoff or breaker cooldown)
enum Wait {
    /// The wait elapsed; proceed with the next attempt
    Proceed,
    /// force_reconnect() interrupted the wait
    Force,
    /// disconnect() ended the retry cycle
    Idle,
    Shutdown,
}

/// How the connection-driving loop handed control back
enum Exit {
    Idle,
    Shutdown,
}

/// Main state machine task
async fn run_client(
    config: Arc<ClientConfig>,
    state: Arc<AtomicConnectionState>,
    metrics: Arc<AtomicMetrics>,
    status: StatusPublisher,
    mut command_rx: mpsc::UnboundedReceiver<ClientCommand>,
    event_tx: Sender<ClientEvent>,
) {
    let mut core = ClientCore::new(config, state, metrics, status, event_tx);
    core.publish();

    // Idle loop: Disconnected or Error, nothing scheduled.
    loop {
        if !core.shutdown_live() {
            break;
        }

        let command = tokio::select! {
            command = command_rx.recv() => match command {
                Some(command) => command,
                None => break,
            },
            _ = tokio::time::sleep(SHUTDOWN_POLL) => continue,
        };

        match command {
            ClientCommand::Connect => {}
            ClientCommand::ForceReconnect => core.reset_for_manual_retry(),
            ClientCommand::Send(envelope) => {
                core.enqueue(envelope);
                continue;
            }
            ClientCommand::Disconnect => {
                core.enter_disconnected(true);
                continue;
            }
            ClientCommand::Shutdown => break,
        }

        match drive(&mut core, &mut command_rx).await {
            Exit::Idle => continue,
            Exit::Shutdown => break,
        }
    }

    core.enter_disconnected(false);
    debug!("client task exiting");
}

/// Drive connection attempts until the cycle ends
///
/// Returns to the idle loop on explicit disconnect, fatal failure or
/// exhausted retries; returns Shutdown when the client is going away.
async fn drive(core: &mut ClientCore, command_rx: &mut mpsc::UnboundedReceiver<ClientCommand>) -> Exit {
    loop {
        if !core.shutdown_live() {
            return Exit::Shutdown;
        }

        // While the breaker is open no attempt may be scheduled; hold in
        // Error until the cooldown elapses or a manual retry arrives.
        if core.breaker.is_open() {
            core.enter_breaker_wait();
            let remaining = core
                .breaker
                .remaining_cooldown()
                .unwrap_or(Duration::ZERO);
            info!(?remaining, "circuit breaker open, holding reconnection");
            match cancellable_wait(core, command_rx, remaining).await {
                Wait::Proceed => core.breaker.reset(),
                Wait::Force => core.reset_for_manual_retry(),
                Wait::Idle => return Exit::Idle,
                Wait::Shutdown => return Exit::Shutdown,
            }
        }

        core.begin_attempt();

        match establish(core).await {
            Ok(ws) => {
                core.enter_connected();
                match connected_loop(core, command_rx, ws).await {
                    Teardown::Remote(reason) => core.connection_lost(&reason),
                    Teardown::Fatal(reason) => {
                        core.enter_fatal(&reason);
                        return Exit::Idle;
                    }
                    Teardown::Disconnect => {
                        core.enter_disconnected(true);
                        return Exit::Idle;
                    }
                    Teardown::Force => {
                        core.reset_for_manual_retry();
                        continue;
                    }
                    Teardown::Shutdown => return Exit::Shutdown,
                }
            }
            Err(Handshake::Fatal(reason)) => {
                core.enter_fatal(&reason);
                return Exit::Idle;
            }
            Err(Handshake::Transient(reason)) => core.connection_lost(&reason),
        }

        // A failure was just recorded; if it tripped the breaker, the gate
        // at the top of the loop takes over.
        if core.breaker.is_open() {
            continue;
        }

        // attempts counts recorded failures, so the first retry waits the
        // base delay.
        let attempt = core.retry_attempts.saturating_sub(1);
        let delay = match core.config.backoff.delay_for(attempt) {
            Some(delay) => delay,
            None => {
                core.enter_fatal(&format!(
                    "retries exhausted after {} attempts",
                    core.retry_attempts
                ));
                return Exit::Idle;
            }
        };

        info!(
            ?delay,
            attempt = core.retry_attempts,
            "scheduling reconnection"
        );
        match cancellable_wait(core, command_rx, delay).await {
            Wait::Proceed => {}
            Wait::Force => core.reset_for_manual_retry(),
            Wait::Idle => return Exit::Idle,
            Wait::Shutdown => return Exit::Shutdown,
        }
    }
}

/// Sleep that commands can interrupt
///
/// `send` keeps buffering during the wait; `force_reconnect` bypasses the
/// remaining delay; `disconnect` cancels the retry cycle entirely.
async fn cancellable_wait(
    core: &mut ClientCore,
    command_rx: &mut mpsc::UnboundedReceiver<ClientCommand>,
    delay: Duration,
) -> Wait {
    let deadline = tokio::time::Instant::now() + delay;

    loop {
        tokio::select! {
            _ = tokio::time::sleep_until(deadline) => return Wait::Proceed,
            _ = tokio::time::sleep(SHUTDOWN_POLL) => {
                if !core.shutdown_live() {
                    return Wait::Shutdown;
                }
            }
            command = command_rx.recv() => match command {
                None | Some(ClientCommand::Shutdown) => return Wait::Shutdown,
                Some(ClientCommand::Disconnect) => {
                    core.enter_disconnected(true);
                    return Wait::Idle;
                }
                Some(ClientCommand::ForceReconnect) => return Wait::Force,
                Some(ClientCommand::Connect) => {}
                Some(ClientCommand::Send(envelope)) => core.enqueue(envelope),
            }
        }
    }
}

/// Handshake failure classification
enum Handshake {
    Transient(String),
    Fatal(String),
}

/// Open the socket, attaching the credential to the upgrade request
async fn establish(core: &ClientCore) -> std::result::Result<WsStream, Handshake> {
    let mut request = core
        .config
        .url
        .as_str()
        .into_client_request()
        .map_err(|e| Handshake::Fatal(format!("invalid endpoint: {e}")))?;

    if let Some(provider) = &core.config.credentials {
        match provider.credential().await {
            Ok(Some(token)) => match http::HeaderValue::from_str(&format!("Bearer {token}")) {
                Ok(value) => {
                    request.headers_mut().insert(http::header::AUTHORIZATION, value);
                    debug!("attached credential to handshake");
                }
                Err(e) => {
                    return Err(Handshake::Fatal(format!("credential not header-safe: {e}")))
                }
            },
            Ok(None) => {}
            Err(e) => {
                // The external auth collaborator may recover; retry.
                return Err(Handshake::Transient(format!("credential unavailable: {e}")));
            }
        }
    }

    match connect_async(request).await {
        Ok((ws, _response)) => Ok(ws),
        Err(e) => Err(classify_handshake_error(e)),
    }
}

/// HTTP 401/403 means the credential was rejected; retrying it is useless.
/// Everything else is a transient network condition.
fn classify_handshake_error(error: tungstenite::Error) -> Handshake {
    match &error {
        tungstenite::Error::Http(response)
            if matches!(response.status().as_u16(), 401 | 403) =>
        {
            Handshake::Fatal(format!(
                "authentication rejected by server: HTTP {}",
                response.status()
            ))
        }
        _ => Handshake::Transient(error.to_string()),
    }
}

/// Service the live connection until it ends
async fn connected_loop(
    core: &mut ClientCore,
    command_rx: &mut mpsc::UnboundedReceiver<ClientCommand>,
    ws: WsStream,
) -> Teardown {
    let (mut write, mut read) = ws.split();

    // Flush buffered messages strictly FIFO before anything else. A failed
    // write puts the entry back at the head: already-sent messages are not
    // re-sent, unsent ones stay queued.
    while let Some(entry) = core.queue.pop() {
        let text = match serde_json::to_string(&entry.payload) {
            Ok(text) => text,
            Err(e) => {
                warn!("dropping unencodable queued message: {}", e);
                continue;
            }
        };
        if let Err(e) = write.send(Message::Text(text)).await {
            core.queue.requeue_front(entry);
            return Teardown::Remote(format!("flush interrupted: {e}"));
        }
        core.metrics.increment_sent();
    }
    core.publish();

    let (mut hb_interval, hb_payload) = match &core.config.heartbeat {
        Some((every, payload)) => {
            let start = tokio::time::Instant::now() + *every;
            (
                Some(tokio::time::interval_at(start, *every)),
                Some(payload.clone()),
            )
        }
        None => (None, None),
    };

    let mut sweep = tokio::time::interval(core.config.sweep_interval);
    sweep.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    let mut watchdog = tokio::time::interval(SHUTDOWN_POLL);

    loop {
        tokio::select! {
            frame = read.next() => match frame {
                Some(Ok(frame)) => {
                    if let Some(teardown) = core.handle_frame(frame) {
                        let _ = write.close().await;
                        return teardown;
                    }
                }
                Some(Err(e)) => return Teardown::Remote(e.to_string()),
                None => return Teardown::Remote("stream ended".to_string()),
            },

            command = command_rx.recv() => match command {
                None => {
                    let _ = write.close().await;
                    return Teardown::Shutdown;
                }
                Some(ClientCommand::Send(envelope)) => {
                    match serde_json::to_string(&envelope) {
                        Ok(text) => {
                            if let Err(e) = write.send(Message::Text(text)).await {
                                // The message was not delivered; keep it for
                                // the flush after reconnecting.
                                core.enqueue(envelope);
                                return Teardown::Remote(format!("send failed: {e}"));
                            }
                            core.metrics.increment_sent();
                        }
                        Err(e) => warn!("dropping unencodable outbound message: {}", e),
                    }
                }
                Some(ClientCommand::Disconnect) => {
                    let _ = write.close().await;
                    return Teardown::Disconnect;
                }
                Some(ClientCommand::ForceReconnect) => {
                    let _ = write.close().await;
                    return Teardown::Force;
                }
                Some(ClientCommand::Connect) => {
                    debug!("connect() while already connected, ignoring");
                }
                Some(ClientCommand::Shutdown) => {
                    let _ = write.close().await;
                    return Teardown::Shutdown;
                }
            },

            _ = maybe_tick(hb_interval.as_mut()) => {
                if let Some(payload) = &hb_payload {
                    match serde_json::to_string(payload) {
                        Ok(text) => {
                            if let Err(e) = write.send(Message::Text(text)).await {
                                return Teardown::Remote(format!("heartbeat failed: {e}"));
                            }
                            core.metrics.increment_sent();
                            debug!("heartbeat sent");
                        }
                        Err(e) => warn!("unencodable heartbeat payload: {}", e),
                    }
                }
            }

            _ = sweep.tick() => {
                if core.presence.sweep() {
                    core.publish();
                }
            }

            _ = watchdog.tick() => {
                if !core.shutdown_live() {
                    let _ = write.close().await;
                    return Teardown::Shutdown;
                }
            }
        }
    }
}

/// Tick the interval if present, otherwise stay pending forever
async fn maybe_tick(interval: Option<&mut tokio::time::Interval>) {
    match interval {
        Some(interval) => {
            interval.tick().await;
        }
        None => std::future::pending().await,
    }
}
