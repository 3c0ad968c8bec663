use stereo_core::nalgebra::Point2;
use stereo_core::{Error, Result};

/// Number of fixed-point iterations used to invert [`BrownConrady::distort`].
const UNDISTORT_ITERATIONS: usize = 20;
const UNDISTORT_EPSILON: f64 = 1e-12;

/// Rational Brown–Conrady lens distortion.
///
/// Coefficients follow the `[k1, k2, p1, p2, k3, k4, k5, k6]` ordering common to calibration
/// toolkits. Shorter coefficient lists leave the trailing terms at zero.
///
/// For a normalized point `(x, y)` with `r² = x² + y²`:
///
/// ```text
/// radial = (1 + k1 r² + k2 r⁴ + k3 r⁶) / (1 + k4 r² + k5 r⁴ + k6 r⁶)
/// x' = x radial + 2 p1 x y + p2 (r² + 2 x²)
/// y' = y radial + p1 (r² + 2 y²) + 2 p2 x y
/// ```
#[derive(Debug, Default, Clone, Copy, PartialEq, PartialOrd)]
#[cfg_attr(feature = "serde-serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct BrownConrady {
    pub k1: f64,
    pub k2: f64,
    pub p1: f64,
    pub p2: f64,
    pub k3: f64,
    pub k4: f64,
    pub k5: f64,
    pub k6: f64,
}

impl BrownConrady {
    /// Accepts between one and eight coefficients.
    pub fn from_coefficients(coefficients: &[f64]) -> Result<Self> {
        if coefficients.is_empty() || coefficients.len() > 8 {
            return Err(Error::InvalidCalibrationData(format!(
                "expected 1 to 8 distortion coefficients, got {}",
                coefficients.len()
            )));
        }
        if let Some(bad) = coefficients.iter().find(|c| !c.is_finite()) {
            return Err(Error::InvalidCalibrationData(format!(
                "distortion coefficient {bad} is not finite"
            )));
        }
        let mut padded = [0.0; 8];
        padded[..coefficients.len()].copy_from_slice(coefficients);
        let [k1, k2, p1, p2, k3, k4, k5, k6] = padded;
        Ok(Self {
            k1,
            k2,
            p1,
            p2,
            k3,
            k4,
            k5,
            k6,
        })
    }

    pub fn coefficients(&self) -> [f64; 8] {
        [
            self.k1, self.k2, self.p1, self.p2, self.k3, self.k4, self.k5, self.k6,
        ]
    }

    /// Returns `true` if this distortion leaves every point where it is.
    pub fn is_identity(&self) -> bool {
        self.coefficients().iter().all(|&c| c == 0.0)
    }

    /// Maps an ideal normalized point to where the lens actually images it.
    pub fn distort(&self, point: Point2<f64>) -> Point2<f64> {
        let (x, y) = (point.x, point.y);
        let r2 = x * x + y * y;
        let r4 = r2 * r2;
        let r6 = r4 * r2;
        let radial = (1.0 + self.k1 * r2 + self.k2 * r4 + self.k3 * r6)
            / (1.0 + self.k4 * r2 + self.k5 * r4 + self.k6 * r6);
        let xy = x * y;
        Point2::new(
            x * radial + 2.0 * self.p1 * xy + self.p2 * (r2 + 2.0 * x * x),
            y * radial + self.p1 * (r2 + 2.0 * y * y) + 2.0 * self.p2 * xy,
        )
    }

    /// Inverts [`BrownConrady::distort`] by fixed-point iteration.
    ///
    /// Converges for the mild distortions of phone and machine vision lenses. Strong fisheye
    /// distortion is outside of the model's range.
    pub fn undistort(&self, point: Point2<f64>) -> Point2<f64> {
        if self.is_identity() {
            return point;
        }
        let mut estimate = point;
        for _ in 0..UNDISTORT_ITERATIONS {
            let error = self.distort(estimate) - point;
            estimate -= error;
            if error.norm_squared() < UNDISTORT_EPSILON * UNDISTORT_EPSILON {
                break;
            }
        }
        estimate
    }
}
