//! Wire decoding errors.

use thiserror::Error;

/// An inbound payload that could not be decoded.
///
/// Logged and dropped; never changes connection state.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("Malformed message: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Unsupported frame: {0}")]
    UnsupportedFrame(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_error_from() {
        let json_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err = DecodeError::from(json_err);
        assert!(err.to_string().contains("Malformed message"));
    }

    #[test]
    fn test_unsupported_frame() {
        let err = DecodeError::UnsupportedFrame("binary".to_string());
        assert!(err.to_string().contains("binary"));
    }
}
