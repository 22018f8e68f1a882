//! Errors of the click pipeline.

use thiserror::Error;

use playwatch_protocols::{DispatchError, FrameError, MapError};

/// Why a click on the rendered image did not reach the remote browser.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ClickError {
    #[error("No frame received yet for run {0}")]
    NoFrame(String),

    #[error("Latest frame is unusable: {0}")]
    Frame(String),

    #[error(transparent)]
    Geometry(#[from] MapError),

    #[error(transparent)]
    Dispatch(#[from] DispatchError),
}

impl From<FrameError> for ClickError {
    fn from(err: FrameError) -> Self {
        ClickError::Frame(err.to_string())
    }
}

impl ClickError {
    /// Whether the click was stopped before anything was sent.
    pub fn prevented_dispatch(&self) -> bool {
        !matches!(self, ClickError::Dispatch(_))
    }
}
