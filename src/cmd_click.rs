//! `playwatch click` and `playwatch map`.

use playwatch_config::Config;
use playwatch_core::{ClickDispatcher, map_click};
use playwatch_protocols::NativePoint;

use crate::cli::{NativeSize, Point, Size};

pub(crate) fn map(at: Point, rendered: Size, native: NativeSize) -> anyhow::Result<NativePoint> {
    let point = map_click(
        at.x,
        at.y,
        rendered.width,
        rendered.height,
        native.width,
        native.height,
    )?;
    Ok(point)
}

pub(crate) async fn click(
    config: &Config,
    execution_id: &str,
    at: Point,
    rendered: Size,
    native: NativeSize,
) -> anyhow::Result<()> {
    let point = map(at, rendered, native)?;
    let dispatcher = ClickDispatcher::from_config(config)?;

    let ack = dispatcher.dispatch(execution_id, point.x, point.y).await?;
    match ack.message {
        Some(message) => println!("Clicked {} on {}: {}", point, execution_id, message),
        None => println!("Clicked {} on {}", point, execution_id),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_map() {
        let point = map(
            Point { x: 320.0, y: 180.0 },
            Size {
                width: 640.0,
                height: 360.0,
            },
            NativeSize {
                width: 1280,
                height: 720,
            },
        )
        .unwrap();
        assert_eq!(point, NativePoint::new(640, 360));
    }

    #[test]
    fn test_map_invalid_geometry() {
        let err = map(
            Point { x: 1.0, y: 1.0 },
            Size {
                width: 0.0,
                height: 360.0,
            },
            NativeSize {
                width: 1280,
                height: 720,
            },
        )
        .unwrap_err();
        assert!(err.to_string().contains("Invalid geometry"));
    }
}
