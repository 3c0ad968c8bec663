//! AKAZE-like features.
//!
//! The image is diffused with a nonlinear scale space that blurs flat regions while keeping edges,
//! the scale normalized determinant of the Hessian is computed on every evolution, and its maxima
//! over space and scale become keypoints. Each keypoint gets a dominant orientation and a rotation
//! invariant M-LDB binary descriptor.
//!
//! Output has the same shape as the `orb` crate: keypoints in full resolution pixel coordinates
//! and one `BitArray<64>` per keypoint, compared by Hamming distance.

mod contrast_factor;
mod derivatives;
mod descriptors;
mod detector_response;
mod evolution;
mod fed_tau;
pub mod image;
mod nonlinear_diffusion;
mod scale_space_extrema;

use crate::image::{gaussian_blur, GrayFloatImage};
use ::image::DynamicImage;
use bitarray::BitArray;
use log::*;
use nonlinear_diffusion::pm_g2;
use scale_space_extrema::Extremum;
use stereo_core::nalgebra::Point2;
use stereo_core::{Error, KeyPoint, Result};

pub use evolution::{EvolutionStep, MIN_EVOLUTION_SIZE};

/// Contains the configuration parameters of AKAZE.
///
/// The most important parameter to pay attention to is `detector_threshold`.
/// [`Akaze::new`] can be used to set this threshold and let all other parameters
/// remain default. You can also use the helpers [`Akaze::sparse`] and
/// [`Akaze::dense`]. The default value of `detector_threshold` is `0.001`.
#[derive(Debug, Copy, Clone, PartialEq)]
#[cfg_attr(feature = "serde-serialize", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde-serialize", serde(default))]
pub struct Akaze {
    /// Number of sublevels per octave.
    pub num_sublevels: u32,

    /// Maximum octave evolution of the image 2^sigma (coarsest scale sigma units).
    pub max_octave_evolution: u32,

    /// Base scale offset (sigma units).
    pub base_scale_offset: f64,

    /// Percentile level for the contrast factor.
    pub contrast_percentile: f64,

    /// Number of bins for the contrast factor histogram.
    pub contrast_factor_num_bins: usize,

    /// Factor for the multiscale derivatives.
    pub derivative_factor: f64,

    /// Detector response threshold to accept point.
    pub detector_threshold: f64,

    /// Number of channels in the descriptor (1, 2, 3).
    pub descriptor_channels: usize,

    /// Actual patch size is `2 * pattern_size * point.scale`.
    pub descriptor_pattern_size: usize,
}

impl Akaze {
    /// This convenience constructor is provided for the very common case
    /// that the detector threshold needs to be modified.
    pub fn new(threshold: f64) -> Self {
        Self {
            detector_threshold: threshold,
            ..Default::default()
        }
    }

    /// Creates an `Akaze` that sparsely detects features.
    ///
    /// Uses a threshold of `0.01` (default is `0.001`).
    pub fn sparse() -> Self {
        Self::new(0.01)
    }

    /// Creates an `Akaze` that densely detects features.
    ///
    /// Uses a threshold of `0.0001` (default is `0.001`).
    pub fn dense() -> Self {
        Self::new(0.0001)
    }

    #[must_use]
    pub fn detector_threshold(self, detector_threshold: f64) -> Self {
        Self {
            detector_threshold,
            ..self
        }
    }

    #[must_use]
    pub fn max_octave_evolution(self, max_octave_evolution: u32) -> Self {
        Self {
            max_octave_evolution,
            ..self
        }
    }

    #[must_use]
    pub fn descriptor_channels(self, descriptor_channels: usize) -> Self {
        Self {
            descriptor_channels,
            ..self
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.num_sublevels == 0 || self.max_octave_evolution == 0 {
            return Err(Error::InvalidInput(
                "AKAZE needs at least one octave and one sublevel".to_owned(),
            ));
        }
        if self.max_octave_evolution > 16 {
            return Err(Error::InvalidInput(format!(
                "at most 16 octaves are supported, got {}",
                self.max_octave_evolution
            )));
        }
        for (name, value) in [
            ("base scale offset", self.base_scale_offset),
            ("derivative factor", self.derivative_factor),
        ] {
            if !(value > 0.0 && value.is_finite()) {
                return Err(Error::InvalidInput(format!(
                    "{} must be positive, got {}",
                    name, value
                )));
            }
        }
        if !(self.contrast_percentile > 0.0 && self.contrast_percentile <= 1.0) {
            return Err(Error::InvalidInput(format!(
                "contrast percentile must be in (0, 1], got {}",
                self.contrast_percentile
            )));
        }
        if self.contrast_factor_num_bins == 0 {
            return Err(Error::InvalidInput(
                "contrast histogram needs at least one bin".to_owned(),
            ));
        }
        if !self.detector_threshold.is_finite() {
            return Err(Error::InvalidInput(
                "detector threshold must be finite".to_owned(),
            ));
        }
        if !(1..=3).contains(&self.descriptor_channels) {
            return Err(Error::InvalidInput(format!(
                "descriptor channels must be 1, 2 or 3, got {}",
                self.descriptor_channels
            )));
        }
        if self.descriptor_pattern_size == 0 {
            return Err(Error::InvalidInput(
                "descriptor pattern size must be positive".to_owned(),
            ));
        }
        Ok(())
    }
}

impl Default for Akaze {
    fn default() -> Akaze {
        Akaze {
            num_sublevels: 4,
            max_octave_evolution: 4,
            base_scale_offset: 1.6f64,
            contrast_percentile: 0.7f64,
            contrast_factor_num_bins: 300,
            derivative_factor: 1.5f64,
            detector_threshold: 0.001f64,
            descriptor_channels: 3usize,
            descriptor_pattern_size: 10usize,
        }
    }
}

impl Akaze {
    /// Builds the nonlinear scale space into the allocated `evolutions`.
    fn create_nonlinear_scale_space(
        &self,
        evolutions: &mut [EvolutionStep],
        image: &GrayFloatImage,
    ) {
        let Some(first) = evolutions.first_mut() else {
            return;
        };
        first.lt = gaussian_blur(image, self.base_scale_offset as f32);
        first.smooth = first.lt.clone();
        let mut contrast_factor = contrast_factor::compute_contrast_factor(
            &first.smooth,
            self.contrast_percentile,
            1.0f64,
            self.contrast_factor_num_bins,
        );
        debug!(
            "Contrast percentile={}, Num bins={}, Initial contrast factor={}",
            self.contrast_percentile, self.contrast_factor_num_bins, contrast_factor
        );
        for i in 1..evolutions.len() {
            let (done, rest) = evolutions.split_at_mut(i);
            let (previous, evolution) = (&done[i - 1], &mut rest[0]);
            if evolution.octave > previous.octave {
                evolution.lt = previous.lt.half_size();
                contrast_factor *= 0.75;
                debug!(
                    "New image size: {}x{}, new contrast factor: {}",
                    evolution.lt.width(),
                    evolution.lt.height(),
                    contrast_factor
                );
            } else {
                evolution.lt = previous.lt.clone();
            }
            evolution.smooth = gaussian_blur(&evolution.lt, 1.0f32);
            evolution.lx = derivatives::scharr_horizontal(&evolution.smooth, 1);
            evolution.ly = derivatives::scharr_vertical(&evolution.smooth, 1);
            evolution.flow = pm_g2(&evolution.lx, &evolution.ly, contrast_factor);
            for step_size in evolution.fed_tau_steps.clone() {
                nonlinear_diffusion::diffusion_step(evolution, step_size as f32);
            }
            trace!(
                "Evolution {} took {} diffusion steps",
                i,
                evolution.fed_tau_steps.len()
            );
        }
    }

    /// Extract features using the AKAZE-like feature extractor.
    ///
    /// Returns the keypoints, in full resolution pixel coordinates, and one descriptor per
    /// keypoint. Images with a side shorter than [`MIN_EVOLUTION_SIZE`] have no scale space and
    /// yield no features.
    ///
    /// # Example
    /// ```
    /// use image::{DynamicImage, GrayImage, Luma};
    /// let image = GrayImage::from_fn(128, 128, |x, y| Luma([if (x / 16 + y / 16) % 2 == 0 { 30 } else { 220 }]));
    /// let (keypoints, descriptors) = akaze::Akaze::default().extract(&DynamicImage::ImageLuma8(image)).unwrap();
    /// assert_eq!(keypoints.len(), descriptors.len());
    /// ```
    pub fn extract(&self, image: &DynamicImage) -> Result<(Vec<KeyPoint>, Vec<BitArray<64>>)> {
        self.extract_from_gray_float_image(&GrayFloatImage::from_dynamic(image))
    }

    /// Same as [`Akaze::extract`] for an image that is already float grayscale.
    pub fn extract_from_gray_float_image(
        &self,
        image: &GrayFloatImage,
    ) -> Result<(Vec<KeyPoint>, Vec<BitArray<64>>)> {
        self.validate()?;
        let mut evolutions = self.allocate_evolutions(image.width(), image.height());
        if evolutions.is_empty() {
            warn!(
                "{} x {} image is smaller than {} pixels on a side, no AKAZE features",
                image.width(),
                image.height(),
                MIN_EVOLUTION_SIZE
            );
            return Ok((vec![], vec![]));
        }
        self.create_nonlinear_scale_space(&mut evolutions, image);
        self.detector_response(&mut evolutions);
        let extrema = self.detect_keypoints(&evolutions);
        let (extrema, descriptors) = self.extract_descriptors(&evolutions, &extrema);
        info!("Extracted {} features", extrema.len());
        Ok((extrema.iter().map(to_keypoint).collect(), descriptors))
    }
}

fn to_keypoint(extremum: &Extremum) -> KeyPoint {
    KeyPoint {
        point: Point2::new(f64::from(extremum.point.0), f64::from(extremum.point.1)),
        scale: f64::from(extremum.size),
        orientation: f64::from(extremum.angle),
        response: f64::from(extremum.response),
        octave: extremum.octave as usize,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_valid() {
        assert!(Akaze::default().validate().is_ok());
        assert!(Akaze::sparse().validate().is_ok());
        assert!(Akaze::dense().validate().is_ok());
    }

    #[test]
    fn invalid_settings_are_rejected() {
        assert!(Akaze::default().max_octave_evolution(0).validate().is_err());
        assert!(Akaze::default().max_octave_evolution(40).validate().is_err());
        assert!(Akaze::default().descriptor_channels(4).validate().is_err());
        assert!(Akaze::default().detector_threshold(f64::NAN).validate().is_err());
        let blurry = Akaze {
            base_scale_offset: 0.0,
            ..Akaze::default()
        };
        assert!(blurry.validate().is_err());
    }

    #[test]
    fn flat_image_has_no_features() {
        let flat = GrayFloatImage::from_fn(100, 100, |_, _| 0.5);
        let (keypoints, descriptors) = Akaze::default()
            .extract_from_gray_float_image(&flat)
            .unwrap();
        assert!(keypoints.is_empty());
        assert!(descriptors.is_empty());
    }
}
