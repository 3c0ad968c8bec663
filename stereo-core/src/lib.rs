//! # Stereo Core
//!
//! Common types for the stereo measurement crates. Every crate in the workspace
//! that produces or consumes keypoints, matches, descriptors, or disparity maps
//! depends on this crate, so that the calibration, disparity, geometry, and
//! feature crates can be combined freely. Anything that is not shared by at
//! least two crates does not belong here.
//!
//! ## Disparity and depth
//!
//! Two cameras with identical intrinsics are placed side by side, `baseline`
//! apart, looking in the same direction. A point `p` at depth `Z` is seen at
//! column `xl` in the left image and at column `xr` in the right image. The
//! horizontal shift `d = xl - xr` is the *disparity*. By similar triangles:
//!
//! ```text
//!                   p
//!                  /|\
//!                 / | \
//!                /  |Z \
//!               /   |   \
//!   @@@@@@@@@@@xl@@@|@@@xr@@@@@@@@@@@   image plane at distance f
//!             /     |     \
//!            Ol-----+------Or
//!             <-- baseline -->
//! ```
//!
//! `Z = f * baseline / d`. A disparity of zero puts the point at infinity,
//! which is why the [`DisparityMap`] reserves negative values as a sentinel
//! for pixels that could not be matched and the geometry crate rejects
//! non-positive disparities outright.

mod descriptor;
mod disparity;
mod error;
mod keypoint;
mod matches;

pub use bitarray;
pub use descriptor::*;
pub use disparity::*;
pub use error::*;
pub use keypoint::*;
pub use matches::*;
pub use nalgebra;
pub use sample_consensus;
pub use space;
