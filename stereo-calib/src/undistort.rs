use crate::CalibrationModel;
use image::{DynamicImage, ImageBuffer, Pixel, Primitive};
use log::*;
use num_traits::{NumCast, ToPrimitive, Zero};
use stereo_core::nalgebra::Point2;
use stereo_core::{Error, Result};

/// What an undistorted pixel receives when its source position falls outside the input image.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde-serialize", derive(serde::Serialize, serde::Deserialize))]
pub enum BorderFill {
    /// Repeat the nearest edge pixel.
    #[default]
    Replicate,
    /// Fill with zero in every channel.
    Zero,
}

/// Precomputed remapping from undistorted output pixels to distorted input positions.
///
/// Building the map is the expensive part of undistortion, so an `Undistorter` should be kept
/// around when many frames of the same camera are corrected. The output has the same dimensions as
/// the input and every output pixel `(u, v)` is sampled from the position where the calibrated
/// lens images the ideal ray through `(u, v)`.
#[derive(Debug, Clone)]
pub struct Undistorter {
    width: u32,
    height: u32,
    /// `None` marks output pixels that take the zero fill.
    map: Vec<Option<Point2<f32>>>,
}

impl Undistorter {
    pub fn new(
        calibration: &CalibrationModel,
        width: u32,
        height: u32,
        border: BorderFill,
    ) -> Result<Self> {
        if width == 0 || height == 0 {
            debug!("empty {}x{} undistortion map", width, height);
            return Ok(Self {
                width,
                height,
                map: vec![],
            });
        }
        let intrinsics = calibration.intrinsics();
        let lens = calibration.distortion();
        let max_x = (width - 1) as f64;
        let max_y = (height - 1) as f64;
        let mut outside = 0usize;
        let map = (0..height)
            .flat_map(|y| (0..width).map(move |x| Point2::new(x as f64, y as f64)))
            .map(|ideal| {
                let source = intrinsics.uncalibrate(lens.distort(intrinsics.calibrate(ideal)));
                let inside = source.x >= -0.5
                    && source.x <= max_x + 0.5
                    && source.y >= -0.5
                    && source.y <= max_y + 0.5;
                if !inside {
                    outside += 1;
                }
                match (inside, border) {
                    (false, BorderFill::Zero) => None,
                    // NaN sources (rational model poles) replicate the nearest corner.
                    _ => Some(Point2::new(
                        clamp_finite(source.x, max_x) as f32,
                        clamp_finite(source.y, max_y) as f32,
                    )),
                }
            })
            .collect();
        debug!(
            "built {}x{} undistortion map with {} pixels sourced outside the image",
            width, height, outside
        );
        Ok(Self { width, height, map })
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// Undistorts a single image buffer of any pixel type.
    ///
    /// Channels are bilinearly interpolated. Integer channels are rounded to the nearest value.
    /// An empty image yields an empty image of the same dimensions.
    pub fn apply<P>(
        &self,
        image: &ImageBuffer<P, Vec<P::Subpixel>>,
    ) -> Result<ImageBuffer<P, Vec<P::Subpixel>>>
    where
        P: Pixel + 'static,
    {
        if image.dimensions() != self.dimensions() {
            return Err(Error::InvalidInput(format!(
                "undistorter built for {:?} cannot correct a {:?} image",
                self.dimensions(),
                image.dimensions()
            )));
        }
        if self.map.is_empty() {
            return Ok(ImageBuffer::new(self.width, self.height));
        }
        let integral = is_integral::<P::Subpixel>();
        let mut zero = *image.get_pixel(0, 0);
        zero.channels_mut()
            .iter_mut()
            .for_each(|c| *c = P::Subpixel::zero());
        Ok(ImageBuffer::from_fn(self.width, self.height, |x, y| {
            match self.map[(y * self.width + x) as usize] {
                Some(source) => bilinear(image, source, integral),
                None => zero,
            }
        }))
    }

    /// Undistorts every pixel layout supported by [`DynamicImage`] while preserving it.
    pub fn apply_dynamic(&self, image: &DynamicImage) -> Result<DynamicImage> {
        use DynamicImage::*;
        Ok(match image {
            ImageLuma8(buffer) => ImageLuma8(self.apply(buffer)?),
            ImageLumaA8(buffer) => ImageLumaA8(self.apply(buffer)?),
            ImageRgb8(buffer) => ImageRgb8(self.apply(buffer)?),
            ImageRgba8(buffer) => ImageRgba8(self.apply(buffer)?),
            ImageLuma16(buffer) => ImageLuma16(self.apply(buffer)?),
            ImageLumaA16(buffer) => ImageLumaA16(self.apply(buffer)?),
            ImageRgb16(buffer) => ImageRgb16(self.apply(buffer)?),
            ImageRgba16(buffer) => ImageRgba16(self.apply(buffer)?),
            ImageRgb32F(buffer) => ImageRgb32F(self.apply(buffer)?),
            ImageRgba32F(buffer) => ImageRgba32F(self.apply(buffer)?),
            other => ImageRgba16(self.apply(&other.to_rgba16())?),
        })
    }
}

/// Removes lens distortion from `image` using `calibration`.
///
/// This builds a fresh [`Undistorter`]; keep one around instead when correcting many frames.
pub fn undistort<P>(
    image: &ImageBuffer<P, Vec<P::Subpixel>>,
    calibration: &CalibrationModel,
    border: BorderFill,
) -> Result<ImageBuffer<P, Vec<P::Subpixel>>>
where
    P: Pixel + 'static,
{
    let (width, height) = image.dimensions();
    Undistorter::new(calibration, width, height, border)?.apply(image)
}

/// [`undistort`] for a [`DynamicImage`].
pub fn undistort_dynamic(
    image: &DynamicImage,
    calibration: &CalibrationModel,
    border: BorderFill,
) -> Result<DynamicImage> {
    Undistorter::new(calibration, image.width(), image.height(), border)?.apply_dynamic(image)
}

fn clamp_finite(value: f64, max: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, max)
    }
}

fn is_integral<S: Primitive>() -> bool {
    let half: Option<S> = NumCast::from(0.5f32);
    half.and_then(|h| h.to_f32()) != Some(0.5)
}

fn bilinear<P>(image: &ImageBuffer<P, Vec<P::Subpixel>>, source: Point2<f32>, integral: bool) -> P
where
    P: Pixel + 'static,
{
    let (width, height) = image.dimensions();
    let x0 = source.x.floor() as u32;
    let y0 = source.y.floor() as u32;
    let x1 = (x0 + 1).min(width - 1);
    let y1 = (y0 + 1).min(height - 1);
    let fx = source.x - x0 as f32;
    let fy = source.y - y0 as f32;
    let weights = [
        ((x0, y0), (1.0 - fx) * (1.0 - fy)),
        ((x1, y0), fx * (1.0 - fy)),
        ((x0, y1), (1.0 - fx) * fy),
        ((x1, y1), fx * fy),
    ];

    let mut out = *image.get_pixel(x0, y0);
    for (channel, value) in out.channels_mut().iter_mut().enumerate() {
        let mixed: f32 = weights
            .iter()
            .filter(|(_, weight)| *weight != 0.0)
            .map(|&((x, y), weight)| {
                let sample = image.get_pixel(x, y).channels()[channel];
                sample.to_f32().unwrap_or(0.0) * weight
            })
            .sum();
        let mixed = if integral { mixed.round() } else { mixed };
        if let Some(cast) = NumCast::from(mixed) {
            *value = cast;
        }
    }
    out
}
