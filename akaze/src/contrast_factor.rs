use crate::derivatives::{simple_scharr_horizontal, simple_scharr_vertical};
use crate::image::{gaussian_blur, GrayFloatImage};
use float_ord::FloatOrd;
use log::*;

/// Contrast factor used when the image has too little gradient to build a histogram from.
const FALLBACK_CONTRAST: f64 = 0.03;

/// The `percentile` of the gradient magnitude histogram of `image`.
///
/// The image is smoothed with `gradient_histogram_scale` first and the one pixel border is
/// ignored. This is the `k` of the Perona-Malik conductivity: gradients well above it are
/// treated as edges and preserved by the diffusion.
pub fn compute_contrast_factor(
    image: &GrayFloatImage,
    percentile: f64,
    gradient_histogram_scale: f64,
    num_bins: usize,
) -> f64 {
    let gaussian = gaussian_blur(image, gradient_histogram_scale as f32);
    let lx = simple_scharr_horizontal(&gaussian);
    let ly = simple_scharr_vertical(&gaussian);
    let (width, height) = (gaussian.width(), gaussian.height());
    let magnitudes: Vec<f64> = (1..height.saturating_sub(1))
        .flat_map(|y| (1..width.saturating_sub(1)).map(move |x| (x, y)))
        .map(|(x, y)| f64::from(lx.get(x, y)).hypot(f64::from(ly.get(x, y))))
        .collect();
    let hmax = magnitudes
        .iter()
        .copied()
        .map(FloatOrd)
        .max()
        .map_or(0.0, |max| max.0);
    if !(hmax > 0.0) || num_bins == 0 {
        debug!("Flat image, using contrast factor {}", FALLBACK_CONTRAST);
        return FALLBACK_CONTRAST;
    }

    let mut histogram = vec![0usize; num_bins];
    let mut num_points = 0usize;
    for &magnitude in magnitudes.iter().filter(|&&m| m != 0.0) {
        let bin = ((num_bins as f64 * magnitude / hmax) as usize).min(num_bins - 1);
        histogram[bin] += 1;
        num_points += 1;
    }
    let threshold = (num_points as f64 * percentile) as usize;
    let mut k = 0;
    let mut num_elements = 0;
    while num_elements < threshold && k < num_bins {
        num_elements += histogram[k];
        k += 1;
    }
    debug!(
        "hmax: {}, threshold: {}, num_elements: {}",
        hmax, threshold, num_elements
    );
    let contrast = hmax * k as f64 / num_bins as f64;
    if num_elements >= threshold && contrast > 0.0 {
        contrast
    } else {
        FALLBACK_CONTRAST
    }
}
