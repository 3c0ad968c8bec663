use crate::detector::Corner;
use image::GrayImage;

/// Angle from the corner to the intensity centroid of the disc of `radius` around it.
///
/// The corner must be at least `radius` pixels away from every border.
pub(crate) fn intensity_centroid(image: &GrayImage, corner: Corner, radius: u32) -> f64 {
    let radius = radius as i64;
    let (mut m10, mut m01) = (0.0, 0.0);
    for dy in -radius..=radius {
        for dx in -radius..=radius {
            if dx * dx + dy * dy > radius * radius {
                continue;
            }
            let x = (corner.x as i64 + dx).clamp(0, image.width() as i64 - 1) as u32;
            let y = (corner.y as i64 + dy).clamp(0, image.height() as i64 - 1) as u32;
            let value = image.get_pixel(x, y)[0] as f64;
            m10 += dx as f64 * value;
            m01 += dy as f64 * value;
        }
    }
    m01.atan2(m10)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    fn corner(x: u32, y: u32) -> Corner {
        Corner { x, y, response: 0.0 }
    }

    #[test]
    fn bright_right_half_points_right() {
        let image = GrayImage::from_fn(41, 41, |x, _| Luma([if x > 20 { 255 } else { 0 }]));
        assert!(intensity_centroid(&image, corner(20, 20), 15).abs() < 1e-9);
    }

    #[test]
    fn bright_bottom_half_points_down() {
        let image = GrayImage::from_fn(41, 41, |_, y| Luma([if y > 20 { 255 } else { 0 }]));
        let angle = intensity_centroid(&image, corner(20, 20), 15);
        assert!((angle - core::f64::consts::FRAC_PI_2).abs() < 1e-9);
    }
}
