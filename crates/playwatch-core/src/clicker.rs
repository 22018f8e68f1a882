//! Clicks on the rendered screenshot, end to end.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::debug;

use playwatch_protocols::{ClickAck, NativePoint};

use crate::dispatch::ClickDispatcher;
use crate::error::ClickError;
use crate::frames::FrameBuffer;
use crate::mapper::map_click;

/// A pointer event on the displayed image.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderedClick {
    /// Position relative to the image's top-left corner.
    pub x: f64,
    pub y: f64,
    /// Size the image is currently displayed at.
    pub width: f64,
    pub height: f64,
}

impl RenderedClick {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }
}

/// Maps clicks against the latest frame of a run and dispatches them.
///
/// The native size comes from the frame being displayed, so a click always
/// targets the surface the user is looking at. Without a usable frame or
/// with invalid geometry nothing is sent.
#[derive(Clone)]
pub struct RemoteClicker {
    frames: Arc<FrameBuffer>,
    dispatcher: Arc<ClickDispatcher>,
}

impl RemoteClicker {
    pub fn new(frames: Arc<FrameBuffer>, dispatcher: Arc<ClickDispatcher>) -> Self {
        Self { frames, dispatcher }
    }

    pub fn dispatcher(&self) -> &Arc<ClickDispatcher> {
        &self.dispatcher
    }

    /// Native target of a click, without sending anything.
    pub fn resolve(&self, execution_id: &str, click: RenderedClick) -> Result<NativePoint, ClickError> {
        let frame = self
            .frames
            .latest(execution_id)
            .ok_or_else(|| ClickError::NoFrame(execution_id.to_string()))?;
        let (native_width, native_height) = frame.dimensions()?;

        let point = map_click(
            click.x,
            click.y,
            click.width,
            click.height,
            native_width,
            native_height,
        )?;
        debug!(
            "Mapped ({}, {}) on {}x{} to {} on {}x{}",
            click.x, click.y, click.width, click.height, point, native_width, native_height
        );
        Ok(point)
    }

    pub async fn click(&self, execution_id: &str, click: RenderedClick) -> Result<ClickAck, ClickError> {
        self.click_with_cancel(execution_id, click, &CancellationToken::new())
            .await
    }

    pub async fn click_with_cancel(
        &self,
        execution_id: &str,
        click: RenderedClick,
        cancel: &CancellationToken,
    ) -> Result<ClickAck, ClickError> {
        let point = self.resolve(execution_id, click)?;
        let ack = self
            .dispatcher
            .dispatch_with_cancel(execution_id, point.x, point.y, cancel)
            .await?;
        Ok(ack)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    use async_trait::async_trait;
    use chrono::Utc;
    use image::{ImageFormat, RgbImage};
    use parking_lot::Mutex;
    use playwatch_protocols::{ClickCommand, DispatchError, FrameRecord};

    use crate::dispatch::ClickTransport;

    #[derive(Default)]
    struct Recorder {
        sent: Mutex<Vec<NativePoint>>,
        calls: AtomicU32,
    }

    #[async_trait]
    impl ClickTransport for Recorder {
        async fn send(&self, command: &ClickCommand) -> Result<ClickAck, DispatchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.sent.lock().push(command.point());
            Ok(ClickAck {
                command_id: command.command_id,
                execution_id: command.execution_id.clone(),
                message: None,
            })
        }
    }

    fn png(width: u32, height: u32) -> Vec<u8> {
        let mut buf = Vec::new();
        RgbImage::new(width, height)
            .write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
            .unwrap();
        buf
    }

    fn setup() -> (RemoteClicker, Arc<FrameBuffer>, Arc<Recorder>) {
        let frames = Arc::new(FrameBuffer::new());
        let recorder = Arc::new(Recorder::default());
        let dispatcher = Arc::new(ClickDispatcher::new(
            recorder.clone(),
            Duration::from_secs(5),
        ));
        (RemoteClicker::new(frames.clone(), dispatcher), frames, recorder)
    }

    #[tokio::test]
    async fn test_click_uses_frame_dimensions() {
        let (clicker, frames, recorder) = setup();
        frames.ingest(FrameRecord::new("run-1", png(200, 100), Utc::now()));

        clicker
            .click("run-1", RenderedClick::new(50.0, 25.0, 100.0, 50.0))
            .await
            .unwrap();

        assert_eq!(*recorder.sent.lock(), vec![NativePoint::new(100, 50)]);
    }

    #[tokio::test]
    async fn test_no_frame_prevents_dispatch() {
        let (clicker, _frames, recorder) = setup();
        let err = clicker
            .click("run-1", RenderedClick::new(1.0, 1.0, 10.0, 10.0))
            .await
            .unwrap_err();

        assert_eq!(err, ClickError::NoFrame("run-1".into()));
        assert_eq!(recorder.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_invalid_geometry_prevents_dispatch() {
        let (clicker, frames, recorder) = setup();
        frames.ingest(FrameRecord::new("run-1", png(200, 100), Utc::now()));

        let err = clicker
            .click("run-1", RenderedClick::new(1.0, 1.0, 0.0, 50.0))
            .await
            .unwrap_err();

        assert!(matches!(err, ClickError::Geometry(_)));
        assert!(err.prevented_dispatch());
        assert_eq!(recorder.calls.load(Ordering::SeqCst), 0);
        assert!(clicker.dispatcher().last_click().is_none());
    }

    #[tokio::test]
    async fn test_unreadable_frame_prevents_dispatch() {
        let (clicker, frames, recorder) = setup();
        frames.ingest(FrameRecord::new("run-1", &b"not an image"[..], Utc::now()));

        let err = clicker
            .click("run-1", RenderedClick::new(1.0, 1.0, 10.0, 10.0))
            .await
            .unwrap_err();

        assert!(matches!(err, ClickError::Frame(_)));
        assert_eq!(recorder.calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_resolve_follows_latest_frame() {
        let (clicker, frames, _recorder) = setup();
        let click = RenderedClick::new(10.0, 10.0, 20.0, 20.0);

        frames.ingest(FrameRecord::new("run-1", png(40, 40), Utc::now()));
        assert_eq!(clicker.resolve("run-1", click).unwrap(), NativePoint::new(20, 20));

        frames.ingest(FrameRecord::new("run-1", png(80, 60), Utc::now()));
        assert_eq!(clicker.resolve("run-1", click).unwrap(), NativePoint::new(40, 30));
    }
}
