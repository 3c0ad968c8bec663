use derive_more::{Deref, DerefMut};
use image::{DynamicImage, ImageBuffer, Luma};
use log::*;

pub type GrayImageBuffer = ImageBuffer<Luma<f32>, Vec<f32>>;

/// Grayscale image with intensities between 0 and 1.
///
/// Every stage of the scale space works on this type. The filters below operate on the raw
/// row-major buffer instead of going through per-pixel accessors, which keeps the separable
/// convolutions cheap enough to run a dozen times per evolution.
#[derive(Debug, Clone, Deref, DerefMut)]
pub struct GrayFloatImage(pub GrayImageBuffer);

impl GrayFloatImage {
    /// Converts any [`DynamicImage`] to unit float grayscale.
    pub fn from_dynamic(input_image: &DynamicImage) -> Self {
        debug!(
            "Converting a {} x {} {:?} image to float grayscale",
            input_image.width(),
            input_image.height(),
            input_image.color()
        );
        Self(input_image.to_luma32f())
    }

    pub fn from_fn(width: usize, height: usize, mut f: impl FnMut(usize, usize) -> f32) -> Self {
        Self(ImageBuffer::from_fn(width as u32, height as u32, |x, y| {
            Luma([f(x as usize, y as usize)])
        }))
    }

    pub fn new(width: usize, height: usize) -> Self {
        Self(ImageBuffer::new(width as u32, height as u32))
    }

    pub fn width(&self) -> usize {
        self.0.width() as usize
    }

    pub fn height(&self) -> usize {
        self.0.height() as usize
    }

    pub fn get(&self, x: usize, y: usize) -> f32 {
        self.0.as_raw()[y * self.width() + x]
    }

    /// Like [`GrayFloatImage::get`], with coordinates clamped to the image.
    pub fn get_clamped(&self, x: isize, y: isize) -> f32 {
        let x = x.clamp(0, self.width() as isize - 1) as usize;
        let y = y.clamp(0, self.height() as isize - 1) as usize;
        self.get(x, y)
    }

    /// Halves both dimensions by averaging 2x2 tiles.
    ///
    /// When a dimension is odd, the last output row or column averages the
    /// last input row or column only.
    pub fn half_size(&self) -> Self {
        let (width, height) = (self.width(), self.height());
        let (half_width, half_height) = (width / 2, height / 2);
        let span = |out: usize, half: usize, full: usize| {
            if out + 1 == half && full % 2 == 1 {
                full - 1..full
            } else {
                2 * out..2 * out + 2
            }
        };
        Self::from_fn(half_width, half_height, |x, y| {
            let (xs, ys) = (span(x, half_width, width), span(y, half_height, height));
            let count = (xs.len() * ys.len()) as f32;
            ys.flat_map(|sy| xs.clone().map(move |sx| (sx, sy)))
                .map(|(sx, sy)| self.get(sx, sy))
                .sum::<f32>()
                / count
        })
    }
}

/// Convolves every row with `kernel`, replicating the edge pixels.
pub fn horizontal_filter(image: &GrayImageBuffer, kernel: &[f32]) -> GrayImageBuffer {
    debug_assert!(kernel.len() % 2 == 1);
    let half = kernel.len() / 2;
    let (width, height) = image.dimensions();
    let mut output = GrayImageBuffer::new(width, height);
    let width = width as usize;
    if width == 0 || height == 0 {
        return output;
    }
    let mut scratch = vec![0f32; width + 2 * half];
    for (row_in, row_out) in image
        .as_raw()
        .chunks_exact(width)
        .zip(output.chunks_exact_mut(width))
    {
        scratch[..half].fill(row_in[0]);
        scratch[half..half + width].copy_from_slice(row_in);
        scratch[half + width..].fill(row_in[width - 1]);
        for (out, window) in row_out.iter_mut().zip(scratch.windows(kernel.len())) {
            *out = window.iter().zip(kernel).map(|(v, k)| v * k).sum();
        }
    }
    output
}

/// Convolves every column with `kernel`, replicating the edge pixels.
///
/// Works a whole row at a time so the inner loop runs over contiguous memory.
pub fn vertical_filter(image: &GrayImageBuffer, kernel: &[f32]) -> GrayImageBuffer {
    debug_assert!(kernel.len() % 2 == 1);
    let half = kernel.len() / 2;
    let (width, height) = image.dimensions();
    let mut output = GrayImageBuffer::new(width, height);
    let (width, height) = (width as usize, height as usize);
    if width == 0 || height == 0 {
        return output;
    }
    let input = image.as_raw();
    for (y, row_out) in output.chunks_exact_mut(width).enumerate() {
        for (i, &k) in kernel.iter().enumerate() {
            let source = (y + i).saturating_sub(half).min(height - 1);
            let row_in = &input[source * width..(source + 1) * width];
            for (out, &v) in row_out.iter_mut().zip(row_in) {
                *out += k * v;
            }
        }
    }
    output
}

pub fn separable_filter(
    image: &GrayImageBuffer,
    h_kernel: &[f32],
    v_kernel: &[f32],
) -> GrayImageBuffer {
    vertical_filter(&horizontal_filter(image, h_kernel), v_kernel)
}

fn gaussian(x: f32, sigma: f32) -> f32 {
    ((2.0 * core::f32::consts::PI).sqrt() * sigma).recip()
        * (-x.powi(2) / (2.0 * sigma.powi(2))).exp()
}

/// Normalized Gaussian kernel of odd length `kernel_size`.
pub fn gaussian_kernel(sigma: f32, kernel_size: usize) -> Vec<f32> {
    debug_assert!(kernel_size % 2 == 1, "kernel_size must be odd");
    let half_width = (kernel_size / 2) as i32;
    let mut kernel: Vec<f32> = (-half_width..=half_width)
        .map(|i| gaussian(i as f32, sigma))
        .collect();
    let sum: f32 = kernel.iter().sum();
    for value in &mut kernel {
        *value /= sum;
    }
    kernel
}

/// Gaussian blur with a kernel reaching out to `2 * sigma`.
pub fn gaussian_blur(image: &GrayFloatImage, sigma: f32) -> GrayFloatImage {
    debug_assert!(sigma > 0.0, "sigma must be positive");
    let radius = (2.0 * sigma).ceil() as usize;
    let kernel = gaussian_kernel(sigma, 2 * radius + 1);
    GrayFloatImage(separable_filter(image, &kernel, &kernel))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp() -> GrayFloatImage {
        GrayFloatImage::from_fn(37, 29, |x, y| {
            ((x * 7 + y * 13) % 23) as f32 / 23.0 + if (x / 5 + y / 3) % 2 == 0 { 0.5 } else { 0.0 }
        })
    }

    #[test]
    fn gaussian_kernel_correct() {
        let kernel = gaussian_kernel(3.0, 7);
        let known_correct_kernel = [
            0.1062_8852,
            0.1403_2133,
            0.1657_7007,
            0.1752_4014,
            0.1657_7007,
            0.1403_2133,
            0.1062_8852,
        ];
        for (&ours, &known) in kernel.iter().zip(known_correct_kernel.iter()) {
            approx::assert_abs_diff_eq!(ours, known, epsilon = 0.0001);
        }
    }

    #[test]
    fn horizontal_filter_matches_imageproc() {
        let image = ramp();
        let kernel = gaussian_kernel(3.0, 7);
        let ours = super::horizontal_filter(&image.0, &kernel);
        let theirs = imageproc::filter::horizontal_filter(&image.0, &kernel);
        imageproc::assert_pixels_eq_within!(ours, theirs, 0.0001);
    }

    #[test]
    fn vertical_filter_matches_imageproc() {
        let image = ramp();
        let kernel = gaussian_kernel(3.0, 7);
        let ours = super::vertical_filter(&image.0, &kernel);
        let theirs = imageproc::filter::vertical_filter(&image.0, &kernel);
        imageproc::assert_pixels_eq_within!(ours, theirs, 0.0001);
    }

    #[test]
    fn half_size_folds_odd_edges() {
        let image = GrayFloatImage::from_fn(5, 4, |x, y| (y * 5 + x) as f32);
        let half = image.half_size();
        assert_eq!((half.width(), half.height()), (2, 2));
        assert_eq!(half.get(0, 0), (0.0 + 1.0 + 5.0 + 6.0) / 4.0);
        // The odd fifth column alone feeds the last output column.
        assert_eq!(half.get(1, 0), (4.0 + 9.0) / 2.0);
        assert_eq!(half.get(1, 1), (14.0 + 19.0) / 2.0);
    }

    #[test]
    fn eight_bit_extremes_map_to_unit_range() {
        let mut gray = image::GrayImage::new(2, 1);
        gray.put_pixel(1, 0, Luma([255]));
        let float = GrayFloatImage::from_dynamic(&DynamicImage::ImageLuma8(gray));
        assert_eq!(float.as_raw().as_slice(), &[0.0, 1.0]);
    }
}
