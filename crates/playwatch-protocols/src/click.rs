//! Remote click commands.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::ExecutionId;

/// A point in native (unscaled) image coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NativePoint {
    pub x: u32,
    pub y: u32,
}

impl NativePoint {
    pub fn new(x: u32, y: u32) -> Self {
        Self { x, y }
    }
}

impl std::fmt::Display for NativePoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// A click to inject into a run's remote browser.
///
/// Exists only for the duration of one dispatch round-trip.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClickCommand {
    /// Correlates the outcome with the command that caused it.
    pub command_id: Uuid,
    pub execution_id: ExecutionId,
    pub native_x: u32,
    pub native_y: u32,
    pub issued_at: DateTime<Utc>,
}

impl ClickCommand {
    pub fn new(execution_id: impl Into<String>, point: NativePoint) -> Self {
        Self {
            command_id: Uuid::new_v4(),
            execution_id: execution_id.into(),
            native_x: point.x,
            native_y: point.y,
            issued_at: Utc::now(),
        }
    }

    pub fn point(&self) -> NativePoint {
        NativePoint::new(self.native_x, self.native_y)
    }
}

/// Acknowledgement of a delivered click.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClickAck {
    pub command_id: Uuid,
    pub execution_id: ExecutionId,
    /// Human-readable note from the automation engine, if it sent one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}
