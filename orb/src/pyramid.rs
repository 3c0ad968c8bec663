use crate::Orb;
use image::{imageops, GrayImage};
use stereo_core::nalgebra::Point2;

/// One level of the image pyramid.
pub(crate) struct Level {
    pub image: GrayImage,
    /// Size of a pixel of this level in full resolution pixels.
    pub scale: f64,
    pub octave: usize,
}

impl Level {
    pub fn to_full_resolution(&self, x: u32, y: u32) -> Point2<f64> {
        Point2::new(x as f64 * self.scale, y as f64 * self.scale)
    }
}

/// Downsamples `image` by `scale_factor` per level until a level is too small to hold a patch.
pub(crate) fn build(orb: &Orb, image: &GrayImage) -> Vec<Level> {
    let minimum = 2 * orb.edge_threshold + 1;
    let mut levels = Vec::with_capacity(orb.num_levels);
    for octave in 0..orb.num_levels {
        let scale = orb.scale_factor.powi(octave as i32);
        let width = (image.width() as f64 / scale).round() as u32;
        let height = (image.height() as f64 / scale).round() as u32;
        if width < minimum || height < minimum {
            break;
        }
        let level_image = if octave == 0 {
            image.clone()
        } else {
            imageops::resize(image, width, height, imageops::FilterType::Triangle)
        };
        levels.push(Level {
            image: level_image,
            scale,
            octave,
        });
    }
    levels
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn levels_shrink_by_scale_factor() {
        let orb = Orb::default();
        let levels = build(&orb, &GrayImage::new(640, 480));
        assert_eq!(levels.len(), 8);
        assert_eq!(levels[0].image.dimensions(), (640, 480));
        assert_eq!(levels[1].image.dimensions(), (533, 400));
        assert_eq!(levels[1].to_full_resolution(10, 10), Point2::new(12.0, 12.0));
    }

    #[test]
    fn small_images_get_fewer_levels() {
        let levels = build(&Orb::default(), &GrayImage::new(80, 80));
        assert_eq!(levels.len(), 2);
        assert!(build(&Orb::default(), &GrayImage::new(40, 40)).is_empty());
    }
}
