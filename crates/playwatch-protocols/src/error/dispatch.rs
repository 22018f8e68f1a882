//! Remote click dispatch errors.

use std::time::Duration;

use thiserror::Error;

/// A remote click that did not land.
///
/// Shown to the user as-is; never retried automatically.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DispatchError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Click rejected: {reason}")]
    Rejected { status: Option<u16>, reason: String },

    #[error("Run is not active: {0}")]
    RunNotActive(String),

    #[error("Click timed out after {0:?}")]
    Timeout(Duration),

    #[error("Click cancelled")]
    Cancelled,
}

impl DispatchError {
    /// Short machine-readable label for logs and UI badges.
    pub fn kind(&self) -> &'static str {
        match self {
            DispatchError::Network(_) => "network",
            DispatchError::Rejected { .. } => "rejected",
            DispatchError::RunNotActive(_) => "run_not_active",
            DispatchError::Timeout(_) => "timeout",
            DispatchError::Cancelled => "cancelled",
        }
    }
}
