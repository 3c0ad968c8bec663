//! Feature based alignment of two photos.
//!
//! This is the path used when the two views are not a calibrated stereo pair: salient points are
//! detected in both images with an ORB-like or AKAZE-like detector, their descriptors are matched,
//! and a homography mapping the first image onto the second is fitted robustly to the matches.
//!
//! ```no_run
//! use stereo_features::*;
//!
//! let a = image::open("a.png").expect("failed to open image file");
//! let b = image::open("b.png").expect("failed to open image file");
//! let detector = FeatureDetector::from(DetectorKind::Akaze);
//! let features_a = detect_keypoints(&a, &detector).unwrap();
//! let features_b = detect_keypoints(&b, &detector).unwrap();
//! let matches = match_features(&features_a, &features_b, &MatchConfig::default()).unwrap();
//! let transform = estimate_transform(
//!     &matches,
//!     features_a.keypoints(),
//!     features_b.keypoints(),
//!     &TransformConfig::default(),
//! )
//! .unwrap();
//! ```

mod detect;
mod draw;
mod matching;
mod transform;

pub use detect::*;
pub use draw::*;
pub use matching::*;
pub use transform::*;

pub use akaze::Akaze;
pub use homography::{FourPoint, Homography};
pub use orb::Orb;
pub use stereo_core::{
    BinaryDescriptor, Descriptor, Error, FeatureMatch, Features, KeyPoint, Match, Result,
};
