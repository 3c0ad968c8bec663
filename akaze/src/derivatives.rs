//! Scharr derivatives at the scale of an evolution.

use crate::image::{separable_filter, GrayFloatImage};

/// 3x3 Scharr derivative along x, unnormalized.
pub fn simple_scharr_horizontal(image: &GrayFloatImage) -> GrayFloatImage {
    GrayFloatImage(separable_filter(image, &[-1., 0., 1.], &[3., 10., 3.]))
}

/// 3x3 Scharr derivative along y, unnormalized.
pub fn simple_scharr_vertical(image: &GrayFloatImage) -> GrayFloatImage {
    GrayFloatImage(separable_filter(image, &[3., 10., 3.], &[-1., 0., 1.]))
}

/// Scharr derivative along x with the taps spread `sigma_size` pixels apart.
pub fn scharr_horizontal(image: &GrayFloatImage, sigma_size: u32) -> GrayFloatImage {
    if sigma_size <= 1 {
        return simple_scharr_horizontal(image);
    }
    let main = scharr_kernel(sigma_size, Axis::Main);
    let off = scharr_kernel(sigma_size, Axis::Off);
    GrayFloatImage(separable_filter(image, &main, &off))
}

/// Scharr derivative along y with the taps spread `sigma_size` pixels apart.
pub fn scharr_vertical(image: &GrayFloatImage, sigma_size: u32) -> GrayFloatImage {
    if sigma_size <= 1 {
        return simple_scharr_vertical(image);
    }
    let main = scharr_kernel(sigma_size, Axis::Main);
    let off = scharr_kernel(sigma_size, Axis::Off);
    GrayFloatImage(separable_filter(image, &off, &main))
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum Axis {
    /// Along the derivative.
    Main,
    /// Across the derivative, the smoothing part.
    Off,
}

fn scharr_kernel(sigma_size: u32, axis: Axis) -> Vec<f32> {
    let w = 10.0 / 3.0;
    let norm = (1.0 / (2.0 * f64::from(sigma_size) * (w + 2.0))) as f32;
    let size = (3 + 2 * (sigma_size - 1)) as usize;
    let mut kernel = vec![0.0; size];
    match axis {
        Axis::Main => {
            kernel[0] = -1.0;
            kernel[size - 1] = 1.0;
        }
        Axis::Off => {
            kernel[0] = norm;
            kernel[size / 2] = norm * w as f32;
            kernel[size - 1] = norm;
        }
    }
    kernel
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ramp_has_constant_derivative() {
        let ramp = GrayFloatImage::from_fn(20, 20, |x, _| x as f32 * 0.01);
        let lx = scharr_horizontal(&ramp, 3);
        let ly = scharr_vertical(&ramp, 3);
        // Taps sit 3 pixels on either side and the smoothing part sums to 1 / (2 * 3).
        approx::assert_relative_eq!(lx.get(10, 10), 0.01, max_relative = 1e-4);
        approx::assert_abs_diff_eq!(ly.get(10, 10), 0.0);
    }

    #[test]
    fn kernels_are_spread_by_sigma() {
        assert_eq!(scharr_kernel(2, Axis::Main), vec![-1.0, 0.0, 0.0, 0.0, 1.0]);
        let off = scharr_kernel(2, Axis::Off);
        assert_eq!(off.len(), 5);
        approx::assert_relative_eq!(off.iter().sum::<f32>(), 0.25, max_relative = 1e-6);
    }
}
