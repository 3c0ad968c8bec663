use nalgebra::Point2;

#[cfg(feature = "serde-serialize")]
use serde::{Deserialize, Serialize};

/// Allows the retrieval of the point on the image the feature came from.
pub trait ImagePoint {
    /// Retrieves the point on the image in pixel coordinates.
    fn image_point(&self) -> Point2<f64>;
}

impl ImagePoint for Point2<f64> {
    fn image_point(&self) -> Point2<f64> {
        *self
    }
}

/// A salient, repeatably detectable point of interest in an image.
///
/// This follows OpenCV conventions. The coordinate system has `+x` facing right
/// and `+y` facing down, with the origin at the top left of the full resolution
/// image, regardless of which pyramid level the point was detected on.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
pub struct KeyPoint {
    /// Location in pixel coordinates of the full resolution image.
    pub point: Point2<f64>,
    /// Diameter of the meaningful neighborhood, in pixels.
    pub scale: f64,
    /// Orientation angle in radians.
    pub orientation: f64,
    /// The magnitude of response from the detector.
    pub response: f64,
    /// The pyramid level or scale space octave the point was detected on.
    pub octave: usize,
}

impl ImagePoint for KeyPoint {
    fn image_point(&self) -> Point2<f64> {
        self.point
    }
}
