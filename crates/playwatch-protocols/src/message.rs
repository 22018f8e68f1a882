//! Realtime channel envelope.
//!
//! Every frame on the realtime channel is a JSON object tagged by `type`:
//!
//! ```text
//! { "type": "execution_update", "data": ExecutionSnapshot }
//! { "type": "screenshot_frame", "data": FrameRecord }
//! { "type": "pong" }
//! { "type": "error", "error": "..." }
//! ```

use serde::{Deserialize, Serialize};

use crate::error::DecodeError;
use crate::execution::ExecutionSnapshot;
use crate::frame::FrameRecord;
use crate::ExecutionId;

#[cfg(test)]
#[path = "message_tests.rs"]
mod tests;

/// Message received from the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InboundMessage {
    ExecutionUpdate { data: ExecutionSnapshot },
    ScreenshotFrame { data: FrameRecord },
    Pong,
    Error { error: String },
    /// Any tag this client does not know. Dropped by consumers.
    #[serde(other)]
    Unknown,
}

impl InboundMessage {
    /// Decode one text frame.
    pub fn decode(text: &str) -> Result<Self, DecodeError> {
        Ok(serde_json::from_str(text)?)
    }

    /// The run this message concerns, if any.
    pub fn execution_id(&self) -> Option<&str> {
        match self {
            InboundMessage::ExecutionUpdate { data } => Some(&data.execution_id),
            InboundMessage::ScreenshotFrame { data } => Some(&data.execution_id),
            InboundMessage::Pong | InboundMessage::Error { .. } | InboundMessage::Unknown => None,
        }
    }

    /// Short name used in logs.
    pub fn kind(&self) -> &'static str {
        match self {
            InboundMessage::ExecutionUpdate { .. } => "execution_update",
            InboundMessage::ScreenshotFrame { .. } => "screenshot_frame",
            InboundMessage::Pong => "pong",
            InboundMessage::Error { .. } => "error",
            InboundMessage::Unknown => "unknown",
        }
    }
}

/// Message sent to the server over the realtime channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OutboundMessage {
    /// Liveness probe; the server answers with `pong`.
    Ping,
    /// Start receiving updates and frames for a run.
    Subscribe { execution_id: ExecutionId },
    /// Stop receiving updates and frames for a run.
    Unsubscribe { execution_id: ExecutionId },
}

impl OutboundMessage {
    pub fn subscribe(execution_id: impl Into<String>) -> Self {
        Self::Subscribe {
            execution_id: execution_id.into(),
        }
    }

    pub fn unsubscribe(execution_id: impl Into<String>) -> Self {
        Self::Unsubscribe {
            execution_id: execution_id.into(),
        }
    }

    /// Encode as a text frame.
    pub fn encode(&self) -> Result<String, DecodeError> {
        Ok(serde_json::to_string(self)?)
    }
}
