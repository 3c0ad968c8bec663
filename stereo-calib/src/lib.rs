//! This crate holds the result of an external camera calibration and uses it to remove lens
//! distortion. A [`CalibrationModel`] is produced once by a multi-view calibration routine (for
//! instance checkerboard detection over many views) and is read-only afterwards. It can be shared
//! freely between threads and consumed by any number of [`Undistorter`]s.
//!
//! Pixel coordinates are converted to normalized image coordinates with [`CameraIntrinsics`],
//! distorted or undistorted there with [`BrownConrady`], and converted back.

mod calibration;
mod distortion;
mod undistort;

pub use calibration::*;
pub use distortion::*;
pub use undistort::*;

use stereo_core::nalgebra::{Matrix3, Point2, Vector2};
use stereo_core::{Error, ImagePoint, Result};

/// This contains intrinsic camera parameters as per
/// [this Wikipedia page](https://en.wikipedia.org/wiki/Camera_resectioning#Intrinsic_parameters).
///
/// For a high quality camera, this may be sufficient to normalize image coordinates.
/// Undistortion may also be necessary to normalize image coordinates.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
#[cfg_attr(feature = "serde-serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct CameraIntrinsics {
    pub focals: Vector2<f64>,
    pub principal_point: Point2<f64>,
    pub skew: f64,
}

impl CameraIntrinsics {
    /// Creates camera intrinsics that would create an identity intrinsic matrix.
    pub fn identity() -> Self {
        Self {
            focals: Vector2::new(1.0, 1.0),
            skew: 0.0,
            principal_point: Point2::new(0.0, 0.0),
        }
    }

    /// Reads the intrinsics out of an upper-triangular camera matrix.
    ///
    /// Fails with [`Error::InvalidCalibrationData`] if the matrix is not of the form
    /// `[fx s cx; 0 fy cy; 0 0 1]` or is singular.
    pub fn from_matrix(matrix: &Matrix3<f64>) -> Result<Self> {
        let lower = [matrix[(1, 0)], matrix[(2, 0)], matrix[(2, 1)]];
        if lower.iter().any(|&v| v != 0.0) || matrix[(2, 2)] != 1.0 {
            return Err(Error::InvalidCalibrationData(format!(
                "camera matrix is not an intrinsic matrix: {matrix}"
            )));
        }
        let focals = Vector2::new(matrix[(0, 0)], matrix[(1, 1)]);
        if focals.x * focals.y == 0.0 || !matrix.iter().all(|v| v.is_finite()) {
            return Err(Error::InvalidCalibrationData(format!(
                "camera matrix is singular: {matrix}"
            )));
        }
        Ok(Self {
            focals,
            principal_point: Point2::new(matrix[(0, 2)], matrix[(1, 2)]),
            skew: matrix[(0, 1)],
        })
    }

    pub fn focals(self, focals: Vector2<f64>) -> Self {
        Self { focals, ..self }
    }

    pub fn focal(self, focal: f64) -> Self {
        Self {
            focals: Vector2::new(focal, focal),
            ..self
        }
    }

    pub fn principal_point(self, principal_point: Point2<f64>) -> Self {
        Self {
            principal_point,
            ..self
        }
    }

    pub fn skew(self, skew: f64) -> Self {
        Self { skew, ..self }
    }

    #[rustfmt::skip]
    pub fn matrix(&self) -> Matrix3<f64> {
        Matrix3::new(
            self.focals.x,  self.skew,      self.principal_point.x,
            0.0,            self.focals.y,  self.principal_point.y,
            0.0,            0.0,            1.0,
        )
    }

    /// Takes in a point from an image in pixel coordinates and
    /// converts it to normalized image coordinates.
    ///
    /// ```
    /// use stereo_calib::CameraIntrinsics;
    /// use stereo_core::nalgebra::{Point2, Vector2};
    /// let intrinsics = CameraIntrinsics {
    ///     focals: Vector2::new(800.0, 900.0),
    ///     principal_point: Point2::new(500.0, 600.0),
    ///     skew: 1.7,
    /// };
    /// let kp = Point2::new(471.0, 322.0);
    /// let nkp = intrinsics.calibrate(kp);
    /// let distance = (kp.to_homogeneous() - intrinsics.matrix() * nkp.to_homogeneous()).norm();
    /// assert!(distance < 1e-9);
    /// ```
    pub fn calibrate(&self, point: impl ImagePoint) -> Point2<f64> {
        let centered = point.image_point() - self.principal_point;
        let y = centered.y / self.focals.y;
        let x = (centered.x - self.skew * y) / self.focals.x;
        Point2::new(x, y)
    }

    /// Converts normalized image coordinates back into pixel coordinates.
    ///
    /// ```
    /// use stereo_calib::CameraIntrinsics;
    /// use stereo_core::nalgebra::{Point2, Vector2};
    /// let intrinsics = CameraIntrinsics::identity()
    ///     .focals(Vector2::new(800.0, 900.0))
    ///     .principal_point(Point2::new(500.0, 600.0))
    ///     .skew(1.7);
    /// let kp = Point2::new(471.0, 322.0);
    /// let ukp = intrinsics.uncalibrate(intrinsics.calibrate(kp));
    /// assert!((kp - ukp).norm() < 1e-6);
    /// ```
    pub fn uncalibrate(&self, normalized: Point2<f64>) -> Point2<f64> {
        let y = normalized.y * self.focals.y;
        let x = normalized.x * self.focals.x + self.skew * normalized.y;
        Point2::new(x, y) + self.principal_point.coords
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matrix_round_trips() {
        let intrinsics = CameraIntrinsics::identity()
            .focals(Vector2::new(1400.0, 1380.0))
            .principal_point(Point2::new(960.0, 540.0))
            .skew(0.5);
        assert_eq!(
            CameraIntrinsics::from_matrix(&intrinsics.matrix()).unwrap(),
            intrinsics
        );
    }

    #[test]
    fn singular_matrix_is_rejected() {
        let matrix = CameraIntrinsics::identity().focal(0.0).matrix();
        assert!(matches!(
            CameraIntrinsics::from_matrix(&matrix),
            Err(Error::InvalidCalibrationData(_))
        ));
    }

    #[test]
    fn projective_matrix_is_rejected() {
        let mut matrix = CameraIntrinsics::identity().focal(500.0).matrix();
        matrix[(2, 0)] = 0.01;
        assert!(CameraIntrinsics::from_matrix(&matrix).is_err());
    }
}
