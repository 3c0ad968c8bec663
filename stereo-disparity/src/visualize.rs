use image::{GrayImage, Luma};
use stereo_core::DisparityMap;

/// Renders a disparity map for display.
///
/// Valid disparities are scaled linearly so the largest one is white. Invalid pixels are black,
/// as are maps without any positive disparity.
pub fn visualize(map: &DisparityMap) -> GrayImage {
    let scale = match map.max_valid() {
        Some(max) if max > 0.0 => 255.0 / max,
        _ => 0.0,
    };
    GrayImage::from_fn(map.width(), map.height(), |x, y| {
        let value = map.get(x, y).map_or(0.0, |d| d * scale);
        Luma([value.round().clamp(0.0, 255.0) as u8])
    })
}
