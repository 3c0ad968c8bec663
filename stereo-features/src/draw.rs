use image::{DynamicImage, GenericImageView, Rgba, RgbaImage};
use imageproc::{drawing, pixelops};
use itertools::Itertools;
use palette::{FromColor, Hsv, RgbHue, Srgb};
use stereo_core::{KeyPoint, Match};

/// Places `a` and `b` side by side and draws a line for every match.
///
/// Each line gets its own hue, rotating around the color wheel. Matches with indices outside of
/// the keypoint slices are skipped.
pub fn draw_matches(
    a: &DynamicImage,
    b: &DynamicImage,
    keypoints_a: &[KeyPoint],
    keypoints_b: &[KeyPoint],
    matches: &[Match],
) -> RgbaImage {
    let canvas_width = a.dimensions().0 + b.dimensions().0;
    let canvas_height = a.dimensions().1.max(b.dimensions().1);
    let mut canvas = RgbaImage::from_pixel(canvas_width, canvas_height, Rgba([0, 0, 0, 255]));

    let mut render_image_onto_canvas_x_offset = |image: &RgbaImage, x_offset: u32| {
        let (width, height) = image.dimensions();
        for (x, y) in (0..width).cartesian_product(0..height) {
            canvas.put_pixel(x + x_offset, y, *image.get_pixel(x, y));
        }
    };
    render_image_onto_canvas_x_offset(&a.to_rgba8(), 0);
    render_image_onto_canvas_x_offset(&b.to_rgba8(), a.width());

    let offset = a.width() as i32;
    let to_tuple = |keypoint: &KeyPoint, offset: i32| {
        (keypoint.point.x as i32 + offset, keypoint.point.y as i32)
    };
    for (ix, m) in matches.iter().enumerate() {
        let (Some(ka), Some(kb)) = (keypoints_a.get(m.query), keypoints_b.get(m.train)) else {
            continue;
        };
        let hsv = Hsv::new(RgbHue::from_radians(ix as f64 * 0.1), 1.0, 1.0);
        let rgb = Srgb::from_color(hsv);
        let color = Rgba([
            (rgb.red * 255.0) as u8,
            (rgb.green * 255.0) as u8,
            (rgb.blue * 255.0) as u8,
            255,
        ]);
        let start = to_tuple(ka, 0);
        let end = to_tuple(kb, offset);
        drawing::draw_antialiased_line_segment_mut(
            &mut canvas,
            start,
            end,
            color,
            pixelops::interpolate,
        );
        drawing::draw_cross_mut(&mut canvas, color, start.0, start.1);
        drawing::draw_cross_mut(&mut canvas, color, end.0, end.1);
    }
    canvas
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::GrayImage;
    use stereo_core::nalgebra::Point2;

    fn keypoint(x: f64, y: f64) -> KeyPoint {
        KeyPoint {
            point: Point2::new(x, y),
            scale: 1.0,
            orientation: 0.0,
            response: 1.0,
            octave: 0,
        }
    }

    #[test]
    fn canvas_holds_both_images() {
        let a = DynamicImage::ImageLuma8(GrayImage::from_pixel(30, 20, image::Luma([255])));
        let b = DynamicImage::ImageLuma8(GrayImage::from_pixel(40, 25, image::Luma([0])));
        let matches = [
            Match {
                query: 0,
                train: 0,
                distance: 0.0,
            },
            Match {
                query: 5,
                train: 0,
                distance: 1.0,
            },
        ];
        let canvas = draw_matches(
            &a,
            &b,
            &[keypoint(10.0, 10.0)],
            &[keypoint(20.0, 5.0)],
            &matches,
        );
        assert_eq!(canvas.dimensions(), (70, 25));
        // Below image a the canvas stays black.
        assert_eq!(canvas.get_pixel(5, 22), &Rgba([0, 0, 0, 255]));
        // The first match is drawn in pure red.
        assert_eq!(canvas.get_pixel(50, 5), &Rgba([255, 0, 0, 255]));
    }
}
