use crate::{BrownConrady, CameraIntrinsics};
use stereo_core::nalgebra::{Matrix3, Point2, Vector3};
use stereo_core::{Error, ImagePoint, Result};

/// The result of calibrating one camera over a set of views.
///
/// This is read-only once constructed. Every constructor validates its inputs, so a value of this
/// type always has a finite, non-singular camera matrix and one to eight distortion coefficients.
/// Deserialization goes through [`CalibrationModel::new`] as well.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde-serialize", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(
    feature = "serde-serialize",
    serde(try_from = "CalibrationRecord", into = "CalibrationRecord")
)]
pub struct CalibrationModel {
    reprojection_error: f64,
    camera_matrix: Matrix3<f64>,
    distortion: Vec<f64>,
    rotation_vectors: Vec<Vector3<f64>>,
    translation_vectors: Vec<Vector3<f64>>,
    total_error: f64,
    intrinsics: CameraIntrinsics,
    lens: BrownConrady,
}

/// The serialized form of a [`CalibrationModel`], without the derived intrinsics and lens.
#[cfg(feature = "serde-serialize")]
#[derive(serde::Serialize, serde::Deserialize)]
struct CalibrationRecord {
    reprojection_error: f64,
    camera_matrix: Matrix3<f64>,
    distortion: Vec<f64>,
    rotation_vectors: Vec<Vector3<f64>>,
    translation_vectors: Vec<Vector3<f64>>,
    total_error: f64,
}

#[cfg(feature = "serde-serialize")]
impl TryFrom<CalibrationRecord> for CalibrationModel {
    type Error = Error;

    fn try_from(record: CalibrationRecord) -> Result<Self> {
        Self::new(
            record.reprojection_error,
            record.camera_matrix,
            record.distortion,
            record.rotation_vectors,
            record.translation_vectors,
            record.total_error,
        )
    }
}

#[cfg(feature = "serde-serialize")]
impl From<CalibrationModel> for CalibrationRecord {
    fn from(model: CalibrationModel) -> Self {
        Self {
            reprojection_error: model.reprojection_error,
            camera_matrix: model.camera_matrix,
            distortion: model.distortion,
            rotation_vectors: model.rotation_vectors,
            translation_vectors: model.translation_vectors,
            total_error: model.total_error,
        }
    }
}

impl CalibrationModel {
    /// Builds a calibration from its parts.
    ///
    /// `rotation_vectors` and `translation_vectors` are the per-view extrinsics (Rodrigues
    /// rotations and translations) and must have the same length.
    pub fn new(
        reprojection_error: f64,
        camera_matrix: Matrix3<f64>,
        distortion: Vec<f64>,
        rotation_vectors: Vec<Vector3<f64>>,
        translation_vectors: Vec<Vector3<f64>>,
        total_error: f64,
    ) -> Result<Self> {
        for (name, error) in [
            ("reprojection error", reprojection_error),
            ("total error", total_error),
        ] {
            if !error.is_finite() || error < 0.0 {
                return Err(Error::InvalidCalibrationData(format!(
                    "{name} must be finite and non-negative, got {error}"
                )));
            }
        }
        let intrinsics = CameraIntrinsics::from_matrix(&camera_matrix)?;
        let lens = BrownConrady::from_coefficients(&distortion)?;
        if rotation_vectors.len() != translation_vectors.len() {
            return Err(Error::InvalidCalibrationData(format!(
                "{} rotation vectors but {} translation vectors",
                rotation_vectors.len(),
                translation_vectors.len()
            )));
        }
        if rotation_vectors
            .iter()
            .chain(&translation_vectors)
            .any(|v| !v.iter().all(|c| c.is_finite()))
        {
            return Err(Error::InvalidCalibrationData(
                "extrinsic vectors must be finite".to_owned(),
            ));
        }
        Ok(Self {
            reprojection_error,
            camera_matrix,
            distortion,
            rotation_vectors,
            translation_vectors,
            total_error,
            intrinsics,
            lens,
        })
    }

    /// Builds a calibration from the nested numeric arrays that calibration tools usually emit.
    ///
    /// * `camera_matrix` must be three rows of three values.
    /// * `distortion` is flattened, so both a single row and a column vector are accepted.
    /// * every row of `rotation_vectors` and `translation_vectors` is one view and holds three
    ///   values.
    pub fn from_rows(
        reprojection_error: f64,
        camera_matrix: &[Vec<f64>],
        distortion: &[Vec<f64>],
        rotation_vectors: &[Vec<f64>],
        translation_vectors: &[Vec<f64>],
        total_error: f64,
    ) -> Result<Self> {
        if camera_matrix.len() != 3 || camera_matrix.iter().any(|row| row.len() != 3) {
            return Err(Error::InvalidCalibrationData(format!(
                "camera matrix must be 3x3, got rows of lengths {:?}",
                camera_matrix.iter().map(Vec::len).collect::<Vec<_>>()
            )));
        }
        let matrix = Matrix3::from_fn(|r, c| camera_matrix[r][c]);
        let distortion = distortion.iter().flatten().copied().collect();
        Self::new(
            reprojection_error,
            matrix,
            distortion,
            vectors("rotation", rotation_vectors)?,
            vectors("translation", translation_vectors)?,
            total_error,
        )
    }

    pub fn reprojection_error(&self) -> f64 {
        self.reprojection_error
    }

    pub fn camera_matrix(&self) -> &Matrix3<f64> {
        &self.camera_matrix
    }

    /// The distortion coefficients exactly as they were supplied.
    pub fn distortion_coefficients(&self) -> &[f64] {
        &self.distortion
    }

    pub fn rotation_vectors(&self) -> &[Vector3<f64>] {
        &self.rotation_vectors
    }

    pub fn translation_vectors(&self) -> &[Vector3<f64>] {
        &self.translation_vectors
    }

    pub fn total_error(&self) -> f64 {
        self.total_error
    }

    /// Number of views the calibration was computed from.
    pub fn view_count(&self) -> usize {
        self.rotation_vectors.len()
    }

    pub fn intrinsics(&self) -> CameraIntrinsics {
        self.intrinsics
    }

    pub fn distortion(&self) -> BrownConrady {
        self.lens
    }

    /// Horizontal and vertical focal lengths in pixels.
    pub fn focal_lengths(&self) -> (f64, f64) {
        (self.camera_matrix[(0, 0)], self.camera_matrix[(1, 1)])
    }

    /// Removes lens distortion from a single pixel position.
    pub fn undistort_point(&self, point: impl ImagePoint) -> Point2<f64> {
        let normalized = self.lens.undistort(self.intrinsics.calibrate(point));
        self.intrinsics.uncalibrate(normalized)
    }

    /// Applies lens distortion to a single ideal pixel position.
    pub fn distort_point(&self, point: impl ImagePoint) -> Point2<f64> {
        let normalized = self.lens.distort(self.intrinsics.calibrate(point));
        self.intrinsics.uncalibrate(normalized)
    }
}

fn vectors(kind: &str, rows: &[Vec<f64>]) -> Result<Vec<Vector3<f64>>> {
    rows.iter()
        .map(|row| match row.as_slice() {
            &[x, y, z] => Ok(Vector3::new(x, y, z)),
            _ => Err(Error::InvalidCalibrationData(format!(
                "{kind} vector must have 3 values, got {}",
                row.len()
            ))),
        })
        .collect()
}
