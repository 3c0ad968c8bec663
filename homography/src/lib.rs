//! Planar homography estimation from point correspondences.
//!
//! [`FourPoint`] implements the normalized direct linear transform from Hartley and Zisserman and
//! plugs into any [`sample_consensus::Consensus`](stereo_core::sample_consensus::Consensus)
//! algorithm through [`Estimator`].

use derive_more::{AsMut, AsRef, Deref, DerefMut, From, Into};
use stereo_core::{
    nalgebra::{Matrix3, OMatrix, OVector, Point2, Vector2, U9},
    sample_consensus::{Estimator, Model},
    FeatureMatch,
};

/// Points closer than this (after normalization) count as coincident.
const COINCIDENT_EPSILON: f64 = 1e-9;
/// Twice the triangle area (after normalization) below which three points count as collinear.
const COLLINEAR_EPSILON: f64 = 1e-6;

/// A 3x3 projective transform mapping points of image A onto image B.
///
/// The matrix is scaled so that its bottom right entry is `1` whenever possible.
#[derive(Debug, Clone, Copy, PartialEq, AsMut, AsRef, Deref, DerefMut, From, Into)]
pub struct Homography(pub Matrix3<f64>);

impl Homography {
    pub fn identity() -> Self {
        Self(Matrix3::identity())
    }

    /// Maps a point of image A into image B.
    ///
    /// Returns `None` for points on the line the homography sends to infinity.
    pub fn transform(&self, point: Point2<f64>) -> Option<Point2<f64>> {
        let projected = self.0 * point.to_homogeneous();
        if projected.z.abs() < f64::EPSILON {
            return None;
        }
        Some(Point2::new(
            projected.x / projected.z,
            projected.y / projected.z,
        ))
    }

    /// The homography mapping image B back onto image A.
    pub fn inverse(&self) -> Option<Self> {
        self.0.try_inverse().map(|inverse| Self(inverse).normalized())
    }

    /// Distance in image B between the mapped point of A and the matched point of B.
    pub fn reprojection_error(&self, FeatureMatch(a, b): &FeatureMatch) -> f64 {
        self.transform(*a)
            .map(|projected| (projected - b).norm())
            .unwrap_or(f64::INFINITY)
    }

    fn normalized(self) -> Self {
        let scale = if self.0[(2, 2)].abs() > COINCIDENT_EPSILON {
            self.0[(2, 2)]
        } else {
            self.0.norm()
        };
        Self(self.0 / scale)
    }
}

impl Model<FeatureMatch> for Homography {
    fn residual(&self, data: &FeatureMatch) -> f64 {
        self.reprojection_error(data)
    }
}

/// Similarity transform moving the centroid to the origin and the mean distance to `sqrt(2)`.
fn conditioner(points: &[Point2<f64>]) -> Option<Matrix3<f64>> {
    let count = points.len() as f64;
    let centroid = points.iter().map(|p| p.coords).sum::<Vector2<f64>>() / count;
    let mean_distance = points
        .iter()
        .map(|p| (p.coords - centroid).norm())
        .sum::<f64>()
        / count;
    if mean_distance < COINCIDENT_EPSILON {
        return None;
    }
    let scale = core::f64::consts::SQRT_2 / mean_distance;
    #[rustfmt::skip]
    let matrix = Matrix3::new(
        scale, 0.0,   -scale * centroid.x,
        0.0,   scale, -scale * centroid.y,
        0.0,   0.0,   1.0,
    );
    Some(matrix)
}

fn apply(matrix: &Matrix3<f64>, points: &[Point2<f64>]) -> Vec<Point2<f64>> {
    points
        .iter()
        .map(|p| Point2::from_homogeneous(matrix * p.to_homogeneous()).unwrap_or(*p))
        .collect()
}

fn collinear(a: Point2<f64>, b: Point2<f64>, c: Point2<f64>) -> bool {
    let ab = b - a;
    let ac = c - a;
    (ab.x * ac.y - ab.y * ac.x).abs() < COLLINEAR_EPSILON
}

/// Checks conditioned points for configurations that do not determine a homography.
///
/// A minimal sample must not contain coincident points or any collinear triple. Larger sets only
/// need to span the plane.
fn degenerate(points: &[Point2<f64>]) -> bool {
    let n = points.len();
    if n == FourPoint::MIN_SAMPLES {
        for i in 0..n {
            for j in i + 1..n {
                if (points[i] - points[j]).norm() < COINCIDENT_EPSILON {
                    return true;
                }
                for k in j + 1..n {
                    if collinear(points[i], points[j], points[k]) {
                        return true;
                    }
                }
            }
        }
        return false;
    }
    let origin = points[0];
    let farthest = points
        .iter()
        .copied()
        .max_by_key(|&p| float_ord::FloatOrd((p - origin).norm()))
        .unwrap_or(origin);
    points.iter().all(|&p| collinear(origin, farthest, p))
}

/// Accumulates `AᵀA` of the DLT system, two rows per correspondence.
fn encode_dlt(a: &[Point2<f64>], b: &[Point2<f64>]) -> OMatrix<f64, U9, U9> {
    let mut ata = OMatrix::<f64, U9, U9>::zeros();
    for (p, q) in a.iter().zip(b) {
        let (x, y, u, v) = (p.x, p.y, q.x, q.y);
        let rows = [
            OVector::<f64, U9>::from_column_slice(&[-x, -y, -1.0, 0.0, 0.0, 0.0, u * x, u * y, u]),
            OVector::<f64, U9>::from_column_slice(&[0.0, 0.0, 0.0, -x, -y, -1.0, v * x, v * y, v]),
        ];
        for row in &rows {
            ata += row * row.transpose();
        }
    }
    ata
}

/// Estimates a [`Homography`] with the normalized direct linear transform.
///
/// At least four correspondences are needed. Coincident points and collinear minimal samples do
/// not determine a homography and produce no model.
#[derive(Copy, Clone, Debug)]
pub struct FourPoint {
    pub epsilon: f64,
    pub iterations: usize,
}

impl FourPoint {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn from_matches<I>(&self, data: I) -> Option<Homography>
    where
        I: Iterator<Item = FeatureMatch> + Clone,
    {
        let (a, b): (Vec<Point2<f64>>, Vec<Point2<f64>>) =
            data.map(|FeatureMatch(a, b)| (a, b)).unzip();
        if a.len() < Self::MIN_SAMPLES {
            return None;
        }
        let conditioner_a = conditioner(&a)?;
        let conditioner_b = conditioner(&b)?;
        let a = apply(&conditioner_a, &a);
        let b = apply(&conditioner_b, &b);
        if degenerate(&a) || degenerate(&b) {
            return None;
        }

        let ata = encode_dlt(&a, &b);
        let eigens = ata.try_symmetric_eigen(self.epsilon, self.iterations)?;
        let eigenvector = eigens
            .eigenvalues
            .iter()
            .enumerate()
            .min_by_key(|&(_, &n)| float_ord::FloatOrd(n))
            .map(|(ix, _)| eigens.eigenvectors.column(ix).into_owned())?;
        let conditioned = Matrix3::from_row_slice(eigenvector.as_slice());

        let unconditioned = conditioner_b.try_inverse()? * conditioned * conditioner_a;
        let homography = Homography(unconditioned).normalized();
        let determinant = homography.0.determinant();
        if !determinant.is_finite() || determinant.abs() < self.epsilon {
            return None;
        }
        homography.0.iter().all(|v| v.is_finite()).then_some(homography)
    }
}

impl Default for FourPoint {
    fn default() -> Self {
        Self {
            epsilon: 1e-12,
            iterations: 1000,
        }
    }
}

impl Estimator<FeatureMatch> for FourPoint {
    type Model = Homography;
    type ModelIter = Option<Homography>;
    const MIN_SAMPLES: usize = 4;

    fn estimate<I>(&self, data: I) -> Self::ModelIter
    where
        I: Iterator<Item = FeatureMatch> + Clone,
    {
        self.from_matches(data)
    }
}
