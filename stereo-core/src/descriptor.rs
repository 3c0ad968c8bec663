use crate::{Error, KeyPoint, Result};
use bitarray::{BitArray, Hamming};
use space::Metric;

#[cfg(feature = "serde-serialize")]
use serde::{Deserialize, Serialize};

/// The binary descriptor produced by both feature detectors.
///
/// AKAZE fills all 486 meaningful bits, ORB fills the first 256 bits and leaves
/// the rest zeroed, so descriptors from the same detector compare correctly.
pub type BinaryDescriptor = BitArray<64>;

/// A numeric fingerprint of a keypoint together with the [`Metric`] that compares it.
///
/// Nearest neighbor search runs on the integer units of the metric. [`Descriptor::to_distance`]
/// converts those units back to the distance reported in a [`crate::Match`].
pub trait Descriptor: Sized {
    type Metric: Metric<Self> + Default;

    /// The distance that `unit` stands for. Lower means more similar.
    fn to_distance(unit: <Self::Metric as Metric<Self>>::Unit) -> f64;

    fn distance(&self, other: &Self) -> f64 {
        Self::to_distance(Self::Metric::default().distance(self, other))
    }
}

impl<const B: usize> Descriptor for BitArray<B> {
    type Metric = Hamming;

    fn to_distance(unit: u32) -> f64 {
        f64::from(unit)
    }
}

/// Euclidean distance between float vectors.
///
/// The unit is the bit pattern of the `f32` distance. Non-negative floats order the same way as
/// their bits, so the metric can drive an integer nearest neighbor search. Vectors of different
/// lengths are infinitely far apart.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Euclidean;

impl Metric<Vec<f32>> for Euclidean {
    type Unit = u32;

    fn distance(&self, a: &Vec<f32>, b: &Vec<f32>) -> u32 {
        if a.len() != b.len() {
            return f32::INFINITY.to_bits();
        }
        a.iter()
            .zip(b.iter())
            .map(|(&a, &b)| (a - b) * (a - b))
            .sum::<f32>()
            .sqrt()
            .to_bits()
    }
}

impl Descriptor for Vec<f32> {
    type Metric = Euclidean;

    fn to_distance(unit: u32) -> f64 {
        f64::from(f32::from_bits(unit))
    }
}

/// Keypoints and their descriptors, attached 1:1 by index.
///
/// Deserialization goes through [`Features::new`], so mismatched counts are rejected.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde-serialize", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde-serialize", serde(try_from = "FeaturesRecord<D>"))]
pub struct Features<D = BinaryDescriptor> {
    keypoints: Vec<KeyPoint>,
    descriptors: Vec<D>,
}

#[cfg(feature = "serde-serialize")]
#[derive(Deserialize)]
struct FeaturesRecord<D> {
    keypoints: Vec<KeyPoint>,
    descriptors: Vec<D>,
}

#[cfg(feature = "serde-serialize")]
impl<D> TryFrom<FeaturesRecord<D>> for Features<D> {
    type Error = Error;

    fn try_from(record: FeaturesRecord<D>) -> Result<Self> {
        Self::new(record.keypoints, record.descriptors)
    }
}

impl<D> Features<D> {
    /// Pairs up keypoints with descriptors.
    ///
    /// Fails with [`Error::InvalidInput`] if the counts differ.
    pub fn new(keypoints: Vec<KeyPoint>, descriptors: Vec<D>) -> Result<Self> {
        if keypoints.len() != descriptors.len() {
            return Err(Error::InvalidInput(format!(
                "{} keypoints but {} descriptors",
                keypoints.len(),
                descriptors.len()
            )));
        }
        Ok(Self {
            keypoints,
            descriptors,
        })
    }

    pub fn empty() -> Self {
        Self {
            keypoints: vec![],
            descriptors: vec![],
        }
    }

    pub fn keypoints(&self) -> &[KeyPoint] {
        &self.keypoints
    }

    pub fn descriptors(&self) -> &[D] {
        &self.descriptors
    }

    pub fn len(&self) -> usize {
        self.keypoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keypoints.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&KeyPoint, &D)> + Clone + '_ {
        self.keypoints.iter().zip(self.descriptors.iter())
    }

    pub fn into_parts(self) -> (Vec<KeyPoint>, Vec<D>) {
        (self.keypoints, self.descriptors)
    }
}
