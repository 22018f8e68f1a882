//! Coordinate mapping errors.

use thiserror::Error;

/// The rendered or native geometry cannot be mapped.
///
/// Returned to the caller and must prevent any dispatch.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum MapError {
    #[error("Invalid geometry: {0}")]
    InvalidGeometry(String),
}
