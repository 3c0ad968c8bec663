use nalgebra::Point2;

#[cfg(feature = "serde-serialize")]
use serde::{Deserialize, Serialize};

/// A pair of corresponding points, one in each image.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct FeatureMatch<P = Point2<f64>>(pub P, pub P);

/// Links the keypoint at `query` in image A to its best corresponding
/// keypoint at `train` in image B.
///
/// `distance` is measured with the descriptors' natural metric, so a lower
/// distance is a better match.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
pub struct Match {
    pub query: usize,
    pub train: usize,
    pub distance: f64,
}
