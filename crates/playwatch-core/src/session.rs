//! A watch session: one connection feeding the store and the frame buffer.

use std::collections::BTreeSet;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, info, warn};

use playwatch_config::{Config, ConfigError};
use playwatch_connection::{
    ConnectionManager, ConnectionOptions, Subscription, WsConnector,
};
use playwatch_protocols::{ConnectionState, ExecutionId, InboundMessage, OutboundMessage};

use crate::clicker::RemoteClicker;
use crate::dispatch::ClickDispatcher;
use crate::frames::FrameBuffer;
use crate::reconciler::ExecutionStore;

#[cfg(test)]
#[path = "session_tests.rs"]
mod tests;

/// Owns everything a viewer needs for a set of watched runs.
///
/// Inbound `execution_update`s go to the [`ExecutionStore`] and
/// `screenshot_frame`s to the [`FrameBuffer`]. The server forgets
/// subscriptions when the link drops, so every watched run is subscribed
/// again on each transition to `connected`.
pub struct WatchSession {
    manager: Arc<ConnectionManager>,
    store: Arc<ExecutionStore>,
    frames: Arc<FrameBuffer>,
    clicker: RemoteClicker,
    watched: Arc<Mutex<BTreeSet<ExecutionId>>>,
    last_error: Arc<Mutex<Option<String>>>,
    _subscriptions: Vec<Subscription>,
}

impl WatchSession {
    pub fn new(manager: ConnectionManager, dispatcher: ClickDispatcher) -> Self {
        let manager = Arc::new(manager);
        let store = Arc::new(ExecutionStore::new());
        let frames = Arc::new(FrameBuffer::new());
        let clicker = RemoteClicker::new(frames.clone(), Arc::new(dispatcher));
        let watched: Arc<Mutex<BTreeSet<ExecutionId>>> = Arc::default();
        let last_error: Arc<Mutex<Option<String>>> = Arc::default();

        let on_message = {
            let store = store.clone();
            let frames = frames.clone();
            let last_error = last_error.clone();
            manager.subscribe(move |message| route(&store, &frames, &last_error, message))
        };

        let on_state = {
            let weak = Arc::downgrade(&manager);
            let watched = watched.clone();
            manager.on_state_change(move |state| {
                if !state.is_connected() {
                    return;
                }
                let Some(manager) = weak.upgrade() else {
                    return;
                };
                let ids: Vec<ExecutionId> = watched.lock().iter().cloned().collect();
                for id in ids {
                    debug!("Subscribing to {}", id);
                    manager.send(&OutboundMessage::subscribe(id));
                }
            })
        };

        Self {
            manager,
            store,
            frames,
            clicker,
            watched,
            last_error,
            _subscriptions: vec![on_message, on_state],
        }
    }

    /// Session over WebSocket and HTTP endpoints from `config`.
    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        let connector = Arc::new(WsConnector::from_config(config));
        let manager = ConnectionManager::new(connector, ConnectionOptions::from_config(config));
        let dispatcher = ClickDispatcher::from_config(config)?;
        Ok(Self::new(manager, dispatcher))
    }

    /// Start the connection. See [`ConnectionManager::connect`].
    pub async fn connect(&self) -> ConnectionState {
        self.manager.connect().await
    }

    /// Follow a run.
    ///
    /// Returns whether a subscribe went out now. A run watched while
    /// disconnected is subscribed on the next connect; a run already watched
    /// is left alone.
    pub fn watch(&self, execution_id: impl Into<String>) -> bool {
        let execution_id = execution_id.into();
        if !self.watched.lock().insert(execution_id.clone()) {
            return false;
        }
        info!("Watching {}", execution_id);
        self.manager.send(&OutboundMessage::subscribe(execution_id))
    }

    /// Stop following a run. Its snapshot and last frame are kept.
    pub fn unwatch(&self, execution_id: &str) -> bool {
        if !self.watched.lock().remove(execution_id) {
            return false;
        }
        info!("No longer watching {}", execution_id);
        self.manager.send(&OutboundMessage::unsubscribe(execution_id))
    }

    /// Watched run ids, sorted.
    pub fn watched(&self) -> Vec<ExecutionId> {
        self.watched.lock().iter().cloned().collect()
    }

    pub fn store(&self) -> &Arc<ExecutionStore> {
        &self.store
    }

    pub fn frames(&self) -> &Arc<FrameBuffer> {
        &self.frames
    }

    pub fn clicker(&self) -> &RemoteClicker {
        &self.clicker
    }

    pub fn connection(&self) -> &ConnectionManager {
        &self.manager
    }

    pub fn state(&self) -> ConnectionState {
        self.manager.state()
    }

    /// Most recent `error` message pushed by the server.
    pub fn last_server_error(&self) -> Option<String> {
        self.last_error.lock().clone()
    }

    /// Whether every watched run has reached a terminal status.
    pub fn all_terminal(&self) -> bool {
        let watched = self.watched.lock();
        !watched.is_empty()
            && watched
                .iter()
                .all(|id| self.store.get(id).is_some_and(|s| s.is_terminal()))
    }

    /// Tear down the connection. Snapshots and frames stay readable.
    pub fn shutdown(&self) {
        self.manager.teardown();
        info!("Watch session shut down");
    }
}

fn route(
    store: &ExecutionStore,
    frames: &FrameBuffer,
    last_error: &Mutex<Option<String>>,
    message: &InboundMessage,
) {
    match message {
        InboundMessage::ExecutionUpdate { data } => {
            store.apply(data.clone());
        }
        InboundMessage::ScreenshotFrame { data } => {
            frames.ingest(data.clone());
        }
        InboundMessage::Error { error } => {
            warn!("Server error: {}", error);
            *last_error.lock() = Some(error.clone());
        }
        InboundMessage::Pong | InboundMessage::Unknown => {}
    }
}
