use derive_more::{Deref, DerefMut};
use image::{DynamicImage, ImageBuffer, Luma};
use log::*;

type GrayImageBuffer = ImageBuffer<Luma<f32>, Vec<f32>>;

/// Grayscale image with intensities between 0 and 1.
///
/// Block matching only needs intensities, so both views of a pair are converted once up front and
/// every cost is computed on this type.
#[derive(Debug, Clone, Deref, DerefMut)]
pub struct GrayFloatImage(pub GrayImageBuffer);

impl GrayFloatImage {
    /// Converts any [`DynamicImage`] to unit float grayscale.
    pub fn from_dynamic(input_image: &DynamicImage) -> Self {
        let gray = input_image.to_luma16();
        trace!(
            "Converted a {} x {} image to float grayscale",
            gray.width(),
            gray.height()
        );
        Self(ImageBuffer::from_fn(gray.width(), gray.height(), |x, y| {
            Luma([f32::from(gray[(x, y)][0]) / 65535f32])
        }))
    }

    pub fn from_fn(width: u32, height: u32, mut f: impl FnMut(u32, u32) -> f32) -> Self {
        Self(ImageBuffer::from_fn(width, height, |x, y| Luma([f(x, y)])))
    }

    pub fn width(&self) -> usize {
        self.0.width() as usize
    }

    pub fn height(&self) -> usize {
        self.0.height() as usize
    }

    /// Row `y` as a slice of `width` intensities.
    pub fn row(&self, y: usize) -> &[f32] {
        let width = self.width();
        &self.0.as_raw()[y * width..(y + 1) * width]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::GrayImage;

    #[test]
    fn eight_bit_extremes_map_to_unit_range() {
        let mut gray = GrayImage::new(2, 1);
        gray.put_pixel(1, 0, Luma([255]));
        let float = GrayFloatImage::from_dynamic(&DynamicImage::ImageLuma8(gray));
        assert_eq!(float.row(0), &[0.0, 1.0]);
    }
}
