//! Realtime transport errors.

use std::time::Duration;

use thiserror::Error;

/// Failure of the realtime channel.
///
/// Recovered internally by the connection manager; never surfaced to callers.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Handshake timed out after {0:?}")]
    HandshakeTimeout(Duration),

    #[error("WebSocket error: {0}")]
    WebSocket(String),

    #[error("No pong received within {0:?}")]
    LivenessTimeout(Duration),

    #[error("Connection closed")]
    Closed,
}
