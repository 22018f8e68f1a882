//! Frame inspection errors.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum FrameError {
    #[error("Frame has no image data")]
    Empty,

    #[error("Unreadable image: {0}")]
    Unreadable(String),
}
