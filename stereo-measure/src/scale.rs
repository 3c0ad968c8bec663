use ::image::{imageops::FilterType, DynamicImage};
use log::*;
use stereo_core::nalgebra::Vector2;
use stereo_core::{Error, Result};

/// Which of two photos was taken with the shorter focal length.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShorterFocal {
    First,
    Second,
}

/// Returns the photo with the shorter focal length and how much longer the other focal length is.
///
/// Focal lengths only need to share a unit, so 35mm equivalent values from EXIF data work. If the
/// two are equal the first photo is reported as the shorter one.
///
/// ```
/// use stereo_measure::{focal_scale_factor, ShorterFocal};
///
/// let (shorter, factor) = focal_scale_factor(77.0, 26.0).unwrap();
/// assert_eq!(shorter, ShorterFocal::Second);
/// assert!((factor - 77.0 / 26.0).abs() < 1e-12);
/// ```
pub fn focal_scale_factor(focal_a: f64, focal_b: f64) -> Result<(ShorterFocal, f64)> {
    for focal in [focal_a, focal_b] {
        if !(focal > 0.0 && focal.is_finite()) {
            return Err(Error::InvalidInput(format!(
                "focal lengths must be positive, got {focal}"
            )));
        }
    }
    Ok(if focal_a <= focal_b {
        (ShorterFocal::First, focal_b / focal_a)
    } else {
        (ShorterFocal::Second, focal_a / focal_b)
    })
}

/// How the wider photo of a dual focal capture is cropped to match the narrower one.
#[derive(Debug, Copy, Clone, PartialEq)]
#[cfg_attr(feature = "serde-serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct ScaleAlignment {
    /// Ratio of the longer focal length to the shorter one.
    pub scale_factor: f64,
    /// Divides `scale_factor`. Values above one keep more of the wider photo.
    pub zoom_correction: f64,
    /// Shift of the crop from the image center, in pixels of the wider photo.
    pub offset: Vector2<f64>,
}

impl ScaleAlignment {
    /// A centered crop without zoom correction.
    pub fn new(scale_factor: f64) -> Self {
        Self {
            scale_factor,
            zoom_correction: 1.0,
            offset: Vector2::zeros(),
        }
    }

    #[must_use]
    pub fn zoom_correction(self, zoom_correction: f64) -> Self {
        Self {
            zoom_correction,
            ..self
        }
    }

    #[must_use]
    pub fn offset(self, offset: Vector2<f64>) -> Self {
        Self { offset, ..self }
    }

    /// The factor the wider photo is magnified by.
    pub fn magnification(&self) -> f64 {
        self.scale_factor / self.zoom_correction
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.scale_factor > 0.0 && self.scale_factor.is_finite()) {
            return Err(Error::InvalidInput(format!(
                "scale factor must be positive, got {}",
                self.scale_factor
            )));
        }
        if !(self.zoom_correction > 0.0 && self.zoom_correction.is_finite()) {
            return Err(Error::InvalidInput(format!(
                "zoom correction must be positive, got {}",
                self.zoom_correction
            )));
        }
        if !self.offset.iter().all(|v| v.is_finite()) {
            return Err(Error::InvalidInput("crop offset must be finite".to_owned()));
        }
        Ok(())
    }

    /// The crop rectangle as `(x, y, width, height)` in an image of the given size.
    pub fn crop_rect(&self, (width, height): (u32, u32)) -> Result<(u32, u32, u32, u32)> {
        self.validate()?;
        let magnification = self.magnification();
        let crop_width = (width as f64 / magnification).round();
        let crop_height = (height as f64 / magnification).round();
        let x = ((width as f64 - crop_width) / 2.0 + self.offset.x).round();
        let y = ((height as f64 - crop_height) / 2.0 + self.offset.y).round();
        let inside = crop_width >= 1.0
            && crop_height >= 1.0
            && x >= 0.0
            && y >= 0.0
            && x + crop_width <= width as f64
            && y + crop_height <= height as f64;
        if !inside {
            return Err(Error::InvalidInput(format!(
                "crop of {}x{} at ({}, {}) leaves the {}x{} image",
                crop_width, crop_height, x, y, width, height
            )));
        }
        Ok((x as u32, y as u32, crop_width as u32, crop_height as u32))
    }
}

/// Crops the photo with the shorter focal length so it shows the same field of view as the
/// longer one and resizes it to `target_size`.
///
/// A new image is returned and the input is left untouched.
pub fn align_to_scale(
    short_focal: &DynamicImage,
    target_size: (u32, u32),
    alignment: &ScaleAlignment,
) -> Result<DynamicImage> {
    if target_size.0 == 0 || target_size.1 == 0 {
        return Err(Error::InvalidInput(format!(
            "target size {}x{} is empty",
            target_size.0, target_size.1
        )));
    }
    let (x, y, width, height) =
        alignment.crop_rect((short_focal.width(), short_focal.height()))?;
    debug!(
        "Cropping {}x{} at ({}, {}) and resizing to {}x{}",
        width, height, x, y, target_size.0, target_size.1
    );
    Ok(short_focal
        .crop_imm(x, y, width, height)
        .resize_exact(target_size.0, target_size.1, FilterType::Triangle))
}
