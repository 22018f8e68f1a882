//! Rendered-to-native coordinate mapping.

use playwatch_protocols::{MapError, NativePoint};

/// Map a click on a scaled rendering of a frame to native pixel coordinates.
///
/// Each axis is scaled by `native / rendered`, rounded to the nearest pixel
/// and clamped into `[0, native)`. Clicks outside the rendered area therefore
/// land on the nearest edge pixel.
///
/// Fails with [`MapError::InvalidGeometry`] when a rendered dimension is not
/// a positive finite number, a native dimension is zero, or the click
/// position itself is not finite.
pub fn map_click(
    rendered_x: f64,
    rendered_y: f64,
    rendered_width: f64,
    rendered_height: f64,
    native_width: u32,
    native_height: u32,
) -> Result<NativePoint, MapError> {
    let x = map_axis("width", rendered_x, rendered_width, native_width)?;
    let y = map_axis("height", rendered_y, rendered_height, native_height)?;
    Ok(NativePoint::new(x, y))
}

fn map_axis(axis: &str, position: f64, rendered: f64, native: u32) -> Result<u32, MapError> {
    if !rendered.is_finite() || rendered <= 0.0 {
        return Err(MapError::InvalidGeometry(format!(
            "rendered {} is {}",
            axis, rendered
        )));
    }
    if native == 0 {
        return Err(MapError::InvalidGeometry(format!("native {} is 0", axis)));
    }
    if !position.is_finite() {
        return Err(MapError::InvalidGeometry(format!(
            "click position on {} axis is {}",
            axis, position
        )));
    }

    let scaled = (position / rendered * native as f64).round();
    Ok(scaled.clamp(0.0, (native - 1) as f64) as u32)
}
