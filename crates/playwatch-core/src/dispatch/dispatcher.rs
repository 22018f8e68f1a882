//! Click dispatcher with mandatory timeout and cancellation.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use playwatch_config::{Config, ConfigError};
use playwatch_protocols::{ClickAck, ClickCommand, DispatchError, NativePoint};

use super::http_transport::HttpClickTransport;
use super::transport::ClickTransport;

/// The last issued click and how it ended.
#[derive(Debug, Clone, PartialEq)]
pub struct ClickRecord {
    pub command: ClickCommand,
    pub outcome: Result<ClickAck, DispatchError>,
}

/// Sends clicks one attempt at a time.
///
/// Every dispatch resolves: it either completes, times out, or is cancelled.
/// Failures are returned for display and never retried.
pub struct ClickDispatcher {
    transport: Arc<dyn ClickTransport>,
    timeout: Duration,
    last: Mutex<Option<ClickRecord>>,
}

impl ClickDispatcher {
    pub fn new(transport: Arc<dyn ClickTransport>, timeout: Duration) -> Self {
        Self {
            transport,
            timeout,
            last: Mutex::new(None),
        }
    }

    /// HTTP dispatcher for the configured API.
    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        let transport = HttpClickTransport::from_config(config)?;
        Ok(Self::new(Arc::new(transport), config.dispatch.timeout()))
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Click at native coordinates of a run's remote surface.
    pub async fn dispatch(
        &self,
        execution_id: &str,
        native_x: u32,
        native_y: u32,
    ) -> Result<ClickAck, DispatchError> {
        self.dispatch_with_cancel(execution_id, native_x, native_y, &CancellationToken::new())
            .await
    }

    /// Like [`dispatch`](Self::dispatch), resolving to
    /// [`DispatchError::Cancelled`] once `cancel` fires.
    pub async fn dispatch_with_cancel(
        &self,
        execution_id: &str,
        native_x: u32,
        native_y: u32,
        cancel: &CancellationToken,
    ) -> Result<ClickAck, DispatchError> {
        let command = ClickCommand::new(execution_id, NativePoint::new(native_x, native_y));
        info!(
            "Dispatching click {} on {} at {}",
            command.command_id,
            command.execution_id,
            command.point()
        );

        let outcome = tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(DispatchError::Cancelled),
            result = tokio::time::timeout(self.timeout, self.transport.send(&command)) => {
                result.unwrap_or(Err(DispatchError::Timeout(self.timeout)))
            }
        };

        match &outcome {
            Ok(ack) => info!(
                "Click {} delivered{}",
                ack.command_id,
                ack.message
                    .as_deref()
                    .map(|m| format!(": {}", m))
                    .unwrap_or_default()
            ),
            Err(e) => warn!("Click {} failed ({}): {}", command.command_id, e.kind(), e),
        }

        *self.last.lock() = Some(ClickRecord {
            command,
            outcome: outcome.clone(),
        });
        outcome
    }

    /// The most recent click, replaced by the next dispatch.
    pub fn last_click(&self) -> Option<ClickRecord> {
        self.last.lock().clone()
    }
}
