//! Dense stereo correspondence by block matching.
//!
//! For every pixel of the left view a window of intensities is compared against windows on the
//! same row of the right view, shifted left by every disparity of the search range. The shift with
//! the lowest sum of absolute differences wins if it is confident enough, otherwise the pixel is
//! marked with [`DisparityMap::INVALID`].
//!
//! ```
//! use image::{DynamicImage, GrayImage, Luma};
//! use stereo_disparity::BlockMatching;
//!
//! // A pattern shifted left by four pixels in the right view.
//! let pattern = |x: u32, y: u32| Luma([((x * 7919 + y * 104_729) % 251) as u8]);
//! let left = GrayImage::from_fn(64, 32, pattern);
//! let right = GrayImage::from_fn(64, 32, |x, y| pattern((x + 4).min(63), y));
//! let map = BlockMatching::new()
//!     .max_disparity(8)
//!     .subpixel(false)
//!     .compute(&DynamicImage::ImageLuma8(left), &DynamicImage::ImageLuma8(right))
//!     .unwrap();
//! assert_eq!(map.get(40, 16), Some(4.0));
//! ```

pub mod image;
mod matching;
mod visualize;

pub use crate::image::GrayFloatImage;
pub use stereo_core::{DisparityMap, Error, Result};
pub use visualize::visualize;

use ::image::DynamicImage;
use log::*;

/// Configuration of the block matcher.
#[derive(Debug, Copy, Clone, PartialEq)]
#[cfg_attr(feature = "serde-serialize", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde-serialize", serde(default))]
pub struct BlockMatching {
    /// Side length of the square matching window. Must be odd and no larger than either side of
    /// the image.
    ///
    /// Larger windows are more robust against noise and lose detail at depth edges.
    pub window_size: u32,
    /// Smallest disparity searched.
    pub min_disparity: u32,
    /// Largest disparity searched (inclusive).
    ///
    /// Bounds the nearest measurable depth and the cost of matching. Disparities past the image
    /// width are never searched.
    pub max_disparity: u32,
    /// Margin in percent by which the best cost must beat every candidate more than one pixel
    /// away from it.
    pub uniqueness_ratio: f32,
    /// Minimum mean absolute horizontal gradient inside the window. Flat windows below this are
    /// rejected.
    pub texture_threshold: f32,
    /// If set, the right-to-left match of the winning pixel must land within this many pixels of
    /// the left-to-right disparity.
    pub left_right_max_diff: Option<u32>,
    /// Refine the winning disparity with a parabola through the neighbouring costs.
    pub subpixel: bool,
}

impl BlockMatching {
    /// Equivalent to [`BlockMatching::default()`].
    pub fn new() -> Self {
        Self::default()
    }

    /// Small window for well textured, detailed scenes.
    pub fn fine() -> Self {
        Self {
            window_size: 5,
            ..Self::default()
        }
    }

    /// Large window with a left-right check for noisy phone photos.
    pub fn robust() -> Self {
        Self {
            window_size: 15,
            uniqueness_ratio: 20.0,
            left_right_max_diff: Some(1),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn window_size(self, window_size: u32) -> Self {
        Self {
            window_size,
            ..self
        }
    }

    #[must_use]
    pub fn min_disparity(self, min_disparity: u32) -> Self {
        Self {
            min_disparity,
            ..self
        }
    }

    #[must_use]
    pub fn max_disparity(self, max_disparity: u32) -> Self {
        Self {
            max_disparity,
            ..self
        }
    }

    #[must_use]
    pub fn uniqueness_ratio(self, uniqueness_ratio: f32) -> Self {
        Self {
            uniqueness_ratio,
            ..self
        }
    }

    #[must_use]
    pub fn texture_threshold(self, texture_threshold: f32) -> Self {
        Self {
            texture_threshold,
            ..self
        }
    }

    #[must_use]
    pub fn left_right_max_diff(self, left_right_max_diff: Option<u32>) -> Self {
        Self {
            left_right_max_diff,
            ..self
        }
    }

    #[must_use]
    pub fn subpixel(self, subpixel: bool) -> Self {
        Self { subpixel, ..self }
    }

    pub fn validate(&self) -> Result<()> {
        if self.window_size == 0 || self.window_size % 2 == 0 {
            return Err(Error::InvalidInput(format!(
                "window size must be odd, got {}",
                self.window_size
            )));
        }
        if self.min_disparity > self.max_disparity {
            return Err(Error::InvalidInput(format!(
                "disparity range {}..={} is empty",
                self.min_disparity, self.max_disparity
            )));
        }
        if !(self.uniqueness_ratio >= 0.0 && self.uniqueness_ratio.is_finite()) {
            return Err(Error::InvalidInput(format!(
                "uniqueness ratio must be finite and non-negative, got {}",
                self.uniqueness_ratio
            )));
        }
        if !(self.texture_threshold >= 0.0 && self.texture_threshold.is_finite()) {
            return Err(Error::InvalidInput(format!(
                "texture threshold must be finite and non-negative, got {}",
                self.texture_threshold
            )));
        }
        Ok(())
    }

    /// Computes the disparity of every left view pixel.
    ///
    /// Both images must have the same dimensions. Color images are converted to grayscale.
    pub fn compute(&self, left: &DynamicImage, right: &DynamicImage) -> Result<DisparityMap> {
        if left.width() != right.width() || left.height() != right.height() {
            return Err(Error::DimensionMismatch {
                left: (left.width(), left.height()),
                right: (right.width(), right.height()),
            });
        }
        self.compute_gray(
            &GrayFloatImage::from_dynamic(left),
            &GrayFloatImage::from_dynamic(right),
        )
    }

    /// Same as [`BlockMatching::compute`] on images that are already unit float grayscale.
    pub fn compute_gray(
        &self,
        left: &GrayFloatImage,
        right: &GrayFloatImage,
    ) -> Result<DisparityMap> {
        self.validate()?;
        if left.dimensions() != right.dimensions() {
            return Err(Error::DimensionMismatch {
                left: left.dimensions(),
                right: right.dimensions(),
            });
        }
        let (width, height) = left.dimensions();
        if width > 0 && height > 0 && self.window_size > width.min(height) {
            return Err(Error::InvalidInput(format!(
                "window size {} does not fit a {} x {} image",
                self.window_size, width, height
            )));
        }
        debug!(
            "Block matching {} x {} pair with window {} over disparities {}..={}",
            left.width(),
            left.height(),
            self.window_size,
            self.min_disparity,
            self.max_disparity
        );
        let map = matching::compute(self, left, right)?;
        info!(
            "Computed disparity for {} x {} pair, {} valid pixels",
            map.width(),
            map.height(),
            map.valid_count()
        );
        Ok(map)
    }
}

impl Default for BlockMatching {
    fn default() -> Self {
        Self {
            window_size: 9,
            min_disparity: 0,
            max_disparity: 64,
            uniqueness_ratio: 15.0,
            texture_threshold: 0.0,
            left_right_max_diff: None,
            subpixel: true,
        }
    }
}

/// Computes a disparity map for a stereo pair with the given matcher settings.
pub fn compute_disparity(
    left: &DynamicImage,
    right: &DynamicImage,
    config: &BlockMatching,
) -> Result<DisparityMap> {
    config.compute(left, right)
}
