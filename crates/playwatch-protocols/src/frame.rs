//! Screenshot frames of the remote browser.

use std::io::Cursor;

use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::FrameError;
use crate::ExecutionId;

/// One encoded image of the remote surface at a moment.
///
/// The image is an immutable blob; cloning a record shares the bytes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameRecord {
    pub execution_id: ExecutionId,
    #[serde(with = "base64_image", alias = "screenshot")]
    pub image: Bytes,
    /// Producer-assigned; monotonic per run, not across runs.
    pub timestamp: DateTime<Utc>,
}

impl FrameRecord {
    pub fn new(
        execution_id: impl Into<String>,
        image: impl Into<Bytes>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            execution_id: execution_id.into(),
            image: image.into(),
            timestamp,
        }
    }

    /// Native pixel dimensions `(width, height)` read from the image header.
    ///
    /// Only the header is probed; the pixels are never decoded.
    pub fn dimensions(&self) -> Result<(u32, u32), FrameError> {
        if self.image.is_empty() {
            return Err(FrameError::Empty);
        }

        image::ImageReader::new(Cursor::new(self.image.as_ref()))
            .with_guessed_format()
            .map_err(|e| FrameError::Unreadable(e.to_string()))?
            .into_dimensions()
            .map_err(|e| FrameError::Unreadable(e.to_string()))
    }

    /// Size of the encoded image in bytes.
    pub fn len(&self) -> usize {
        self.image.len()
    }

    pub fn is_empty(&self) -> bool {
        self.image.is_empty()
    }
}

/// Base64 (optionally `data:` URL) encoding of the image bytes on the wire.
mod base64_image {
    use base64::Engine;
    use base64::engine::general_purpose::STANDARD;
    use bytes::Bytes;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &Bytes, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Bytes, D::Error> {
        let raw = String::deserialize(deserializer)?;
        let payload = match raw.strip_prefix("data:") {
            Some(rest) => rest
                .split_once(',')
                .map(|(_, data)| data)
                .ok_or_else(|| serde::de::Error::custom("data URL without payload"))?,
            None => raw.as_str(),
        };
        STANDARD
            .decode(payload.trim())
            .map(Bytes::from)
            .map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::Engine;
    use base64::engine::general_purpose::STANDARD;
    use image::{ImageFormat, RgbImage};

    fn png(width: u32, height: u32) -> Vec<u8> {
        let mut buffer = Cursor::new(Vec::new());
        RgbImage::new(width, height)
            .write_to(&mut buffer, ImageFormat::Png)
            .unwrap();
        buffer.into_inner()
    }

    #[test]
    fn test_dimensions_from_png_header() {
        let frame = FrameRecord::new("e", png(1280, 720), Utc::now());
        assert_eq!(frame.dimensions().unwrap(), (1280, 720));
    }

    #[test]
    fn test_dimensions_empty_image() {
        let frame = FrameRecord::new("e", Vec::new(), Utc::now());
        assert!(matches!(frame.dimensions(), Err(FrameError::Empty)));
    }

    #[test]
    fn test_dimensions_garbage() {
        let frame = FrameRecord::new("e", b"not an image".to_vec(), Utc::now());
        assert!(matches!(frame.dimensions(), Err(FrameError::Unreadable(_))));
    }

    #[test]
    fn test_deserialize_plain_base64() {
        let json = format!(
            r#"{{"execution_id":"e","image":"{}","timestamp":"2024-05-01T10:00:00Z"}}"#,
            STANDARD.encode(b"abc")
        );
        let frame: FrameRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(frame.image.as_ref(), b"abc");
    }

    #[test]
    fn test_deserialize_data_url_and_alias() {
        let json = format!(
            r#"{{"execution_id":"e","screenshot":"data:image/png;base64,{}","timestamp":"2024-05-01T10:00:00Z"}}"#,
            STANDARD.encode(b"xyz")
        );
        let frame: FrameRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(frame.image.as_ref(), b"xyz");
    }

    #[test]
    fn test_deserialize_invalid_base64() {
        let json = r#"{"execution_id":"e","image":"!!!","timestamp":"2024-05-01T10:00:00Z"}"#;
        assert!(serde_json::from_str::<FrameRecord>(json).is_err());
    }

    #[test]
    fn test_serialize_encodes_base64() {
        let frame = FrameRecord::new("e", b"abc".to_vec(), Utc::now());
        let json = serde_json::to_string(&frame).unwrap();
        assert!(json.contains(&STANDARD.encode(b"abc")));
    }

    #[test]
    fn test_clone_shares_bytes() {
        let frame = FrameRecord::new("e", png(4, 4), Utc::now());
        let copy = frame.clone();
        assert_eq!(frame.image.as_ptr(), copy.image.as_ptr());
        assert_eq!(copy.len(), frame.len());
    }
}
