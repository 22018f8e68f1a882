//! Click transport abstraction.

use async_trait::async_trait;

use playwatch_protocols::{ClickAck, ClickCommand, DispatchError};

/// Delivers a click command to the automation engine.
///
/// Implementations perform exactly one delivery attempt. Timeouts and
/// cancellation are applied by the [`ClickDispatcher`](super::ClickDispatcher).
#[async_trait]
pub trait ClickTransport: Send + Sync {
    async fn send(&self, command: &ClickCommand) -> Result<ClickAck, DispatchError>;
}
