//! Converts disparities into camera space points and measures distances between them.
//!
//! For a rectified pair with focal length `f` (pixels) and baseline `b`, a pixel `(u, v)` with
//! disparity `d` lies at depth `Z = f b / d` and reconstructs to
//!
//! ```text
//! X = (u - cx) Z / f
//! Y = (v - cy) Z / f
//! ```
//!
//! All results are in the unit of the baseline.

use log::*;
use stereo_calib::CalibrationModel;
use stereo_core::nalgebra::{Point2, Point3};
use stereo_core::{DisparityMap, Error, ImagePoint, Result};

/// Parameters of a rectified stereo rig.
#[derive(Debug, Copy, Clone, PartialEq)]
#[cfg_attr(feature = "serde-serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct StereoGeometry {
    /// Focal length of the left camera in pixels.
    pub focal_length: f64,
    /// Distance between the camera centers.
    pub baseline: f64,
    /// Principal point of the left camera in pixels.
    pub principal_point: Point2<f64>,
}

impl StereoGeometry {
    pub fn new(focal_length: f64, baseline: f64, principal_point: Point2<f64>) -> Result<Self> {
        let geometry = Self {
            focal_length,
            baseline,
            principal_point,
        };
        geometry.validate()?;
        Ok(geometry)
    }

    /// Places the principal point at the center of the disparity map.
    ///
    /// Used when the camera was never calibrated.
    pub fn centered(map: &DisparityMap, focal_length: f64, baseline: f64) -> Result<Self> {
        Self::new(
            focal_length,
            baseline,
            Point2::new(map.width() as f64 / 2.0, map.height() as f64 / 2.0),
        )
    }

    /// Takes the horizontal focal length and the principal point from a calibration.
    pub fn from_calibration(calibration: &CalibrationModel, baseline: f64) -> Result<Self> {
        let intrinsics = calibration.intrinsics();
        Self::new(intrinsics.focals.x, baseline, intrinsics.principal_point)
    }

    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("focal length", self.focal_length),
            ("baseline", self.baseline),
        ] {
            if !(value > 0.0 && value.is_finite()) {
                return Err(Error::InvalidInput(format!(
                    "{name} must be strictly positive, got {value}"
                )));
            }
        }
        if !(self.principal_point.x.is_finite() && self.principal_point.y.is_finite()) {
            return Err(Error::InvalidInput(format!(
                "principal point {} is not finite",
                self.principal_point
            )));
        }
        Ok(())
    }

    /// Depth of a point with the given disparity.
    pub fn depth(&self, disparity: f64) -> Result<f64> {
        if !(disparity > 0.0) {
            return Err(Error::DegenerateGeometry(format!(
                "disparity {disparity} places the point at or beyond infinity"
            )));
        }
        Ok(self.focal_length * self.baseline / disparity)
    }

    /// Reads the disparity at a sub-pixel position.
    ///
    /// Interpolates bilinearly between the pixels that contribute to `point`. Fails if any of them
    /// is unmatched or if the result is not strictly positive.
    pub fn disparity_at(&self, map: &DisparityMap, point: impl ImagePoint) -> Result<f64> {
        let point = point.image_point();
        let disparity = map.interpolate(point)?;
        trace!("disparity at {} is {}", point, disparity);
        if !(disparity > 0.0) {
            return Err(Error::DegenerateGeometry(format!(
                "disparity {disparity} at ({}, {}) is not positive",
                point.x, point.y
            )));
        }
        Ok(disparity)
    }

    /// Camera space position of a pixel with a known disparity.
    pub fn triangulate(&self, point: impl ImagePoint, disparity: f64) -> Result<Point3<f64>> {
        self.validate()?;
        let point = point.image_point();
        let depth = self.depth(disparity)?;
        let centered = point - self.principal_point;
        Ok(Point3::new(
            centered.x * depth / self.focal_length,
            centered.y * depth / self.focal_length,
            depth,
        ))
    }

    /// Camera space position of a pixel using the disparity stored in `map`.
    pub fn reconstruct(&self, map: &DisparityMap, point: impl ImagePoint) -> Result<Point3<f64>> {
        let point = point.image_point();
        self.triangulate(point, self.disparity_at(map, point)?)
    }

    /// Euclidean distance between the scene points behind two pixels.
    pub fn distance_between(
        &self,
        map: &DisparityMap,
        a: impl ImagePoint,
        b: impl ImagePoint,
    ) -> Result<f64> {
        let a = self.reconstruct(map, a)?;
        let b = self.reconstruct(map, b)?;
        let distance = (a - b).norm();
        debug!("distance between {} and {} is {}", a, b, distance);
        Ok(distance)
    }
}

/// Measures the distance between the scene points behind `a` and `b`.
///
/// When no principal point is given the center of the map is used.
pub fn distance_between(
    map: &DisparityMap,
    a: impl ImagePoint,
    b: impl ImagePoint,
    focal_length: f64,
    baseline: f64,
    principal_point: Option<Point2<f64>>,
) -> Result<f64> {
    let geometry = match principal_point {
        Some(principal_point) => StereoGeometry::new(focal_length, baseline, principal_point)?,
        None => StereoGeometry::centered(map, focal_length, baseline)?,
    };
    geometry.distance_between(map, a, b)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn principal_point_reconstructs_on_axis() {
        let geometry = StereoGeometry::new(1000.0, 0.2, Point2::new(320.0, 240.0)).unwrap();
        let point = geometry.triangulate(Point2::new(320.0, 240.0), 40.0).unwrap();
        assert_relative_eq!(point, Point3::new(0.0, 0.0, 5.0));
    }

    #[test]
    fn zero_and_negative_disparity_are_degenerate() {
        let geometry = StereoGeometry::new(1000.0, 0.2, Point2::origin()).unwrap();
        assert!(matches!(geometry.depth(0.0), Err(Error::DegenerateGeometry(_))));
        assert!(matches!(geometry.depth(-3.0), Err(Error::DegenerateGeometry(_))));
    }

    #[test]
    fn rig_must_be_positive() {
        assert!(matches!(
            StereoGeometry::new(0.0, 0.2, Point2::origin()),
            Err(Error::InvalidInput(_))
        ));
        assert!(matches!(
            StereoGeometry::new(1000.0, -0.2, Point2::origin()),
            Err(Error::InvalidInput(_))
        ));
        assert!(StereoGeometry::new(f64::INFINITY, 0.2, Point2::origin()).is_err());
    }

    #[test]
    fn centered_uses_map_center() {
        let map = DisparityMap::new(640, 480);
        let geometry = StereoGeometry::centered(&map, 800.0, 0.1).unwrap();
        assert_eq!(geometry.principal_point, Point2::new(320.0, 240.0));
    }
}
