use thiserror::Error;

/// The failure kinds of every operation in the stereo measurement crates.
///
/// Each error is scoped to the call that produced it. Inputs are deterministic,
/// so retrying a failed call with the same inputs fails the same way.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    /// The calibration data was malformed, inconsistent, or singular.
    #[error("invalid calibration data: {0}")]
    InvalidCalibrationData(String),
    /// The two images of a stereo pair differ in size.
    #[error("stereo pair dimensions differ: left is {left:?}, right is {right:?}")]
    DimensionMismatch { left: (u32, u32), right: (u32, u32) },
    /// The queried point has no valid disparity.
    #[error("no valid disparity at ({x}, {y})")]
    InsufficientDisparityData { x: f64, y: f64 },
    /// The geometry cannot produce a finite answer.
    #[error("degenerate geometry: {0}")]
    DegenerateGeometry(String),
    /// An argument was out of bounds or otherwise unusable.
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

pub type Result<T, E = Error> = core::result::Result<T, E>;
