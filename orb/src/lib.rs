//! ORB-like features.
//!
//! Corners are found with FAST-9 on every level of an image pyramid, ranked by their Harris
//! response, oriented with the intensity centroid of their patch and described by 256 binary
//! intensity comparisons that rotate with the keypoint (rotated BRIEF).
//!
//! The result has the same shape as the output of the `akaze` crate so both detectors can be used
//! interchangeably. Descriptors are 256 bits stored in the first 32 bytes of a `BitArray<64>`.

mod descriptors;
mod detector;
mod orientation;
mod pyramid;

use ::image::{DynamicImage, GrayImage};
use bitarray::BitArray;
use log::*;
use stereo_core::{Error, KeyPoint, Result};

pub use descriptors::DESCRIPTOR_BITS;

/// Contains the configuration parameters of the ORB-like extractor.
///
/// The defaults follow the settings commonly used for ORB in visual odometry: 500 features over
/// 8 pyramid levels spaced by a factor of 1.2, a FAST threshold of 20 and a 31 pixel patch.
#[derive(Debug, Copy, Clone, PartialEq)]
#[cfg_attr(feature = "serde-serialize", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde-serialize", serde(default))]
pub struct Orb {
    /// Maximum number of features to retain.
    pub num_features: usize,

    /// Ratio between the sizes of consecutive pyramid levels.
    pub scale_factor: f64,

    /// Number of pyramid levels, including the full resolution image.
    pub num_levels: usize,

    /// Intensity difference for the FAST segment test.
    pub fast_threshold: u8,

    /// Size of the border in which no features are detected.
    pub edge_threshold: u32,

    /// Side length of the patch used for orientation and the descriptor.
    pub patch_size: u32,

    /// Harris detector free parameter.
    pub harris_k: f64,

    /// Sigma of the Gaussian applied before sampling descriptor pairs.
    pub blur_sigma: f32,

    /// Radius of non-maximum suppression between corners of one level.
    pub nms_radius: u32,
}

impl Orb {
    /// This convenience constructor is provided for the very common case
    /// that the number of features needs to be modified.
    pub fn new(num_features: usize) -> Self {
        Self {
            num_features,
            ..Default::default()
        }
    }

    /// Creates an `Orb` that keeps few, strong features.
    pub fn sparse() -> Self {
        Self::new(200)
    }

    /// Creates an `Orb` that keeps many features.
    pub fn dense() -> Self {
        Self {
            fast_threshold: 10,
            ..Self::new(2000)
        }
    }

    #[must_use]
    pub fn fast_threshold(self, fast_threshold: u8) -> Self {
        Self {
            fast_threshold,
            ..self
        }
    }

    #[must_use]
    pub fn num_levels(self, num_levels: usize) -> Self {
        Self { num_levels, ..self }
    }

    #[must_use]
    pub fn scale_factor(self, scale_factor: f64) -> Self {
        Self {
            scale_factor,
            ..self
        }
    }

    /// Pixels a keypoint needs between itself and the border so its whole rotated patch is inside
    /// the image.
    pub fn required_margin(&self) -> u32 {
        let half = self.patch_size / 2;
        let rotated = (descriptors::pattern_radius(self.patch_size) as f64
            * core::f64::consts::SQRT_2)
            .ceil() as u32;
        half.max(rotated) + 1
    }

    pub fn validate(&self) -> Result<()> {
        if self.num_levels == 0 {
            return Err(Error::InvalidInput("ORB needs at least one level".to_owned()));
        }
        if !(self.scale_factor > 1.0 && self.scale_factor.is_finite()) {
            return Err(Error::InvalidInput(format!(
                "pyramid scale factor must be greater than 1, got {}",
                self.scale_factor
            )));
        }
        if self.patch_size < 7 || self.patch_size % 2 == 0 {
            return Err(Error::InvalidInput(format!(
                "patch size must be odd and at least 7, got {}",
                self.patch_size
            )));
        }
        if self.edge_threshold < self.required_margin() {
            return Err(Error::InvalidInput(format!(
                "edge threshold {} does not cover the {} pixel rotated patch margin",
                self.edge_threshold,
                self.required_margin()
            )));
        }
        if !(self.blur_sigma > 0.0 && self.blur_sigma.is_finite()) {
            return Err(Error::InvalidInput(format!(
                "blur sigma must be positive, got {}",
                self.blur_sigma
            )));
        }
        if !self.harris_k.is_finite() {
            return Err(Error::InvalidInput("Harris k must be finite".to_owned()));
        }
        Ok(())
    }

    /// Extract features from an image.
    ///
    /// Color images are converted to 8-bit grayscale first. Returns the keypoints, in full
    /// resolution pixel coordinates and sorted by descending response, and one descriptor per
    /// keypoint.
    ///
    /// # Example
    /// ```
    /// use image::{DynamicImage, GrayImage, Luma};
    /// let image = GrayImage::from_fn(128, 128, |x, y| Luma([if (x / 16 + y / 16) % 2 == 0 { 30 } else { 220 }]));
    /// let (keypoints, descriptors) = orb::Orb::default().extract(&DynamicImage::ImageLuma8(image)).unwrap();
    /// assert_eq!(keypoints.len(), descriptors.len());
    /// ```
    pub fn extract(&self, image: &DynamicImage) -> Result<(Vec<KeyPoint>, Vec<BitArray<64>>)> {
        self.extract_from_gray_image(&image.to_luma8())
    }

    /// Same as [`Orb::extract`] for an image that is already 8-bit grayscale.
    pub fn extract_from_gray_image(
        &self,
        image: &GrayImage,
    ) -> Result<(Vec<KeyPoint>, Vec<BitArray<64>>)> {
        self.validate()?;
        let levels = pyramid::build(self, image);
        debug!(
            "Built {} pyramid levels for a {} x {} image",
            levels.len(),
            image.width(),
            image.height()
        );
        let quotas = detector::level_quotas(self, levels.len());

        let pattern = descriptors::pattern(self.patch_size);
        let mut features = vec![];
        for (level, quota) in levels.iter().zip(quotas) {
            let corners = detector::detect(self, level, quota);
            trace!(
                "Level {} kept {} corners of quota {}",
                level.octave,
                corners.len(),
                quota
            );
            let smoothed = imageproc::filter::gaussian_blur_f32(&level.image, self.blur_sigma);
            for corner in corners {
                let angle =
                    orientation::intensity_centroid(&level.image, corner, self.patch_size / 2);
                let descriptor = descriptors::describe(&smoothed, corner, angle, &pattern);
                let keypoint = KeyPoint {
                    point: level.to_full_resolution(corner.x, corner.y),
                    scale: self.patch_size as f64 * level.scale,
                    orientation: angle,
                    response: corner.response,
                    octave: level.octave,
                };
                features.push((keypoint, descriptor));
            }
        }

        // Strongest first. Ties break on position so the order never depends on the level loop.
        features.sort_by(|(a, _), (b, _)| {
            float_ord::FloatOrd(b.response)
                .cmp(&float_ord::FloatOrd(a.response))
                .then(a.octave.cmp(&b.octave))
                .then(float_ord::FloatOrd(a.point.y).cmp(&float_ord::FloatOrd(b.point.y)))
                .then(float_ord::FloatOrd(a.point.x).cmp(&float_ord::FloatOrd(b.point.x)))
        });
        features.truncate(self.num_features);
        if features.is_empty() {
            warn!(
                "No features found in {} x {} image",
                image.width(),
                image.height()
            );
        }
        info!("Extracted {} features", features.len());
        Ok(features.into_iter().unzip())
    }
}

impl Default for Orb {
    fn default() -> Orb {
        Orb {
            num_features: 500,
            scale_factor: 1.2,
            num_levels: 8,
            fast_threshold: 20,
            edge_threshold: 31,
            patch_size: 31,
            harris_k: 0.04,
            blur_sigma: 2.0,
            nms_radius: 3,
        }
    }
}
