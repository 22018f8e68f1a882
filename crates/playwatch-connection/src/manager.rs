//! Connection lifecycle, retry and liveness.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::{broadcast, mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::{Stream, StreamExt};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use playwatch_config::Config;
use playwatch_protocols::{ConnectionState, InboundMessage, OutboundMessage, TransportError};

use crate::backoff::BackoffPolicy;
use crate::connector::{Connector, Link};
use crate::subscription::{HandlerRegistry, Subscription};

#[cfg(test)]
#[path = "manager_tests.rs"]
mod tests;

/// Tuning for a [`ConnectionManager`].
#[derive(Debug, Clone)]
pub struct ConnectionOptions {
    /// Bound on each connect attempt.
    pub handshake_timeout: Duration,
    /// Interval between liveness pings while connected.
    pub ping_interval: Duration,
    /// Time allowed for a pong before the link is declared dead.
    pub pong_timeout: Duration,
    /// Capacity of the broadcast behind [`ConnectionManager::messages`].
    pub inbound_buffer: usize,
    pub backoff: BackoffPolicy,
}

impl Default for ConnectionOptions {
    fn default() -> Self {
        Self {
            handshake_timeout: Duration::from_secs(10),
            ping_interval: Duration::from_secs(15),
            pong_timeout: Duration::from_secs(10),
            inbound_buffer: 256,
            backoff: BackoffPolicy::default(),
        }
    }
}

impl ConnectionOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            handshake_timeout: config.connection.handshake_timeout(),
            ping_interval: config.connection.ping_interval(),
            pong_timeout: config.connection.pong_timeout(),
            inbound_buffer: config.connection.inbound_buffer,
            backoff: BackoffPolicy::from_config(&config.backoff),
        }
    }
}

/// Counters kept by the manager.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConnectionStats {
    pub messages_received: u64,
    pub malformed_dropped: u64,
    pub unknown_dropped: u64,
    pub reconnect_attempts: u64,
}

struct Shared {
    state_tx: watch::Sender<ConnectionState>,
    state_handlers: HandlerRegistry<ConnectionState>,
    message_handlers: HandlerRegistry<InboundMessage>,
    inbound_tx: broadcast::Sender<InboundMessage>,
    outbound: Mutex<Option<mpsc::Sender<String>>>,
    torn_down: AtomicBool,
    messages_received: AtomicU64,
    malformed_dropped: AtomicU64,
    unknown_dropped: AtomicU64,
    reconnect_attempts: AtomicU64,
}

impl Shared {
    fn set_state(&self, next: ConnectionState) {
        if self.torn_down.load(Ordering::SeqCst) {
            return;
        }
        let previous = self.state_tx.send_replace(next);
        if previous != next {
            info!("Connection state: {} -> {}", previous, next);
            self.state_handlers.notify(&next);
        }
    }

    /// Decode one text frame and fan it out. Returns true for a pong.
    fn handle_frame(&self, text: &str) -> bool {
        match InboundMessage::decode(text) {
            Ok(InboundMessage::Unknown) => {
                self.unknown_dropped.fetch_add(1, Ordering::Relaxed);
                debug!("Dropping message with unknown type");
                false
            }
            Ok(message) => {
                self.messages_received.fetch_add(1, Ordering::Relaxed);
                let is_pong = matches!(message, InboundMessage::Pong);
                self.message_handlers.notify(&message);
                // No receivers is fine.
                let _ = self.inbound_tx.send(message);
                is_pong
            }
            Err(e) => {
                self.malformed_dropped.fetch_add(1, Ordering::Relaxed);
                warn!("Dropping malformed message: {}", e);
                false
            }
        }
    }
}

/// Owns the realtime channel of one client session.
///
/// The manager runs a background loop that connects, pumps inbound frames to
/// subscribers and reconnects with backoff whenever the link fails. Transport
/// errors never reach callers; they observe [`ConnectionState`] instead.
pub struct ConnectionManager {
    shared: Arc<Shared>,
    connector: Arc<dyn Connector>,
    options: ConnectionOptions,
    task: Mutex<Option<JoinHandle<()>>>,
    cancel: CancellationToken,
}

impl ConnectionManager {
    pub fn new(connector: Arc<dyn Connector>, options: ConnectionOptions) -> Self {
        let (state_tx, _) = watch::channel(ConnectionState::Connecting);
        let (inbound_tx, _) = broadcast::channel(options.inbound_buffer.max(1));

        Self {
            shared: Arc::new(Shared {
                state_tx,
                state_handlers: HandlerRegistry::new(),
                message_handlers: HandlerRegistry::new(),
                inbound_tx,
                outbound: Mutex::new(None),
                torn_down: AtomicBool::new(false),
                messages_received: AtomicU64::new(0),
                malformed_dropped: AtomicU64::new(0),
                unknown_dropped: AtomicU64::new(0),
                reconnect_attempts: AtomicU64::new(0),
            }),
            connector,
            options,
            task: Mutex::new(None),
            cancel: CancellationToken::new(),
        }
    }

    /// Start the connection loop and wait for the first attempt to settle.
    ///
    /// Returns the state after that attempt: `Connected` or `Disconnected`.
    /// Calling it again while the loop runs starts nothing new. After
    /// [`teardown`](Self::teardown) it is a no-op.
    pub async fn connect(&self) -> ConnectionState {
        {
            let mut task = self.task.lock();
            if task.is_none() && !self.cancel.is_cancelled() {
                debug!("Starting connection loop");
                *task = Some(tokio::spawn(run(
                    self.shared.clone(),
                    self.connector.clone(),
                    self.options.clone(),
                    self.cancel.clone(),
                )));
            }
        }

        let mut rx = self.shared.state_tx.subscribe();
        match rx.wait_for(|state| *state != ConnectionState::Connecting).await {
            Ok(state) => *state,
            Err(_) => self.state(),
        }
    }

    /// Queue an outbound message.
    ///
    /// Dropped (returns false) when not connected or when the outbound queue
    /// is full.
    pub fn send(&self, message: &OutboundMessage) -> bool {
        let state = self.state();
        if !state.is_connected() {
            debug!("Dropping outbound message while {}", state);
            return false;
        }

        let Some(outbound) = self.shared.outbound.lock().clone() else {
            debug!("Dropping outbound message, no active link");
            return false;
        };

        let frame = match message.encode() {
            Ok(frame) => frame,
            Err(e) => {
                warn!("Failed to encode outbound message: {}", e);
                return false;
            }
        };

        match outbound.try_send(frame) {
            Ok(()) => true,
            Err(e) => {
                warn!("Dropping outbound message: {}", e);
                false
            }
        }
    }

    /// Register an inbound message handler.
    pub fn subscribe<F>(&self, handler: F) -> Subscription
    where
        F: Fn(&InboundMessage) + Send + Sync + 'static,
    {
        self.shared.message_handlers.register(handler)
    }

    /// Register a state change handler. Called once per transition.
    pub fn on_state_change<F>(&self, handler: F) -> Subscription
    where
        F: Fn(&ConnectionState) + Send + Sync + 'static,
    {
        self.shared.state_handlers.register(handler)
    }

    /// Receiver for every decoded inbound message.
    pub fn messages(&self) -> broadcast::Receiver<InboundMessage> {
        self.shared.inbound_tx.subscribe()
    }

    /// Inbound messages as a stream. Lagged messages are skipped.
    pub fn inbound_stream(&self) -> impl Stream<Item = InboundMessage> + Send + 'static {
        BroadcastStream::new(self.messages()).filter_map(|result| result.ok())
    }

    pub fn state(&self) -> ConnectionState {
        *self.shared.state_tx.borrow()
    }

    pub fn watch_state(&self) -> watch::Receiver<ConnectionState> {
        self.shared.state_tx.subscribe()
    }

    pub fn stats(&self) -> ConnectionStats {
        ConnectionStats {
            messages_received: self.shared.messages_received.load(Ordering::Relaxed),
            malformed_dropped: self.shared.malformed_dropped.load(Ordering::Relaxed),
            unknown_dropped: self.shared.unknown_dropped.load(Ordering::Relaxed),
            reconnect_attempts: self.shared.reconnect_attempts.load(Ordering::Relaxed),
        }
    }

    /// Stop the loop, drop every handler and close the link.
    pub fn teardown(&self) {
        if self.shared.torn_down.load(Ordering::SeqCst) {
            return;
        }

        self.shared.message_handlers.clear();
        self.shared.state_handlers.clear();
        self.cancel.cancel();
        if let Some(task) = self.task.lock().take() {
            task.abort();
        }
        self.shared.outbound.lock().take();
        self.shared.state_tx.send_replace(ConnectionState::Disconnected);
        self.shared.torn_down.store(true, Ordering::SeqCst);
        info!("Connection manager torn down");
    }
}

impl Drop for ConnectionManager {
    fn drop(&mut self) {
        self.teardown();
    }
}

async fn run(
    shared: Arc<Shared>,
    connector: Arc<dyn Connector>,
    options: ConnectionOptions,
    cancel: CancellationToken,
) {
    let mut attempt: u32 = 0;

    loop {
        let outcome = tokio::select! {
            _ = cancel.cancelled() => break,
            outcome = tokio::time::timeout(options.handshake_timeout, connector.connect()) => outcome,
        };

        match outcome {
            Ok(Ok(link)) => {
                attempt = 0;
                match run_link(&shared, link, &options, &cancel).await {
                    Some(reason) => warn!("Connection lost: {}", reason),
                    None => break,
                }
            }
            Ok(Err(e)) => warn!("Connection attempt failed: {}", e),
            Err(_) => warn!(
                "Connection attempt failed: {}",
                TransportError::HandshakeTimeout(options.handshake_timeout)
            ),
        }

        shared.outbound.lock().take();
        if cancel.is_cancelled() {
            break;
        }
        shared.set_state(ConnectionState::Disconnected);

        let delay = options.backoff.delay_for_attempt(attempt);
        attempt = attempt.saturating_add(1);
        debug!("Reconnecting in {:?} (attempt {})", delay, attempt);

        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = tokio::time::sleep(delay) => {}
        }

        shared.reconnect_attempts.fetch_add(1, Ordering::Relaxed);
        shared.set_state(ConnectionState::Reconnecting);
    }

    debug!("Connection loop stopped");
}

/// Pump one established link until it fails. Returns `None` when cancelled.
async fn run_link(
    shared: &Shared,
    link: Link,
    options: &ConnectionOptions,
    cancel: &CancellationToken,
) -> Option<TransportError> {
    let Link {
        outbound,
        mut inbound,
    } = link;

    // Publish the sender first so state handlers can send on `connected`.
    *shared.outbound.lock() = Some(outbound.clone());
    shared.set_state(ConnectionState::Connected);

    let mut ping = tokio::time::interval(options.ping_interval);
    ping.set_missed_tick_behavior(MissedTickBehavior::Delay);
    ping.tick().await;
    let mut pong_deadline: Option<Instant> = None;

    loop {
        tokio::select! {
            _ = cancel.cancelled() => return None,
            _ = ping.tick() => {
                if pong_deadline.is_none() {
                    pong_deadline = Some(Instant::now() + options.pong_timeout);
                }
                match OutboundMessage::Ping.encode() {
                    Ok(frame) => {
                        if outbound.try_send(frame).is_err() {
                            debug!("Outbound queue full, ping skipped");
                        }
                    }
                    Err(e) => warn!("Failed to encode ping: {}", e),
                }
            }
            _ = sleep_until_opt(pong_deadline) => {
                return Some(TransportError::LivenessTimeout(options.pong_timeout));
            }
            frame = inbound.recv() => match frame {
                Some(text) => {
                    if shared.handle_frame(&text) {
                        pong_deadline = None;
                    }
                }
                None => return Some(TransportError::Closed),
            }
        }
    }
}

async fn sleep_until_opt(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}
