//! # `stereo-measure`
//!
//! Measures real-world distances, such as the height of a jump, from two photographs taken by a
//! calibrated stereo rig.
//!
//! The calibrated measurement path runs
//! undistortion ([`calib`]) → block matching ([`disparity`]) → triangulation ([`geom`]) and is
//! wrapped by [`StereoPipeline::measure`]. The alignment path ([`features`]) detects and matches
//! keypoints between two photos and fits a homography between them, independent of any
//! calibration, and is wrapped by [`StereoPipeline::align`].
//!
//! All of the shared types live at the root of the crate.
//!
//! ## Modules
//! * [`calib`] - calibration results and lens distortion correction
//! * [`consensus`] - finding the best estimated model from noisy data
//! * [`disparity`] - dense stereo correspondence
//! * [`estimate`] - estimation of models from data
//! * [`features`] - feature extraction, matching and alignment
//! * [`geom`] - triangulation and distances
//! * [`image`] - image opening and processing/manipulation

mod pipeline;
mod scale;

pub use pipeline::*;
pub use scale::*;
pub use stereo_core::{sample_consensus::*, *};

/// Calibration results and lens distortion correction
pub mod calib {
    pub use stereo_calib::*;
}

/// Consensus algorithms (RANSAC)
pub mod consensus {
    pub use arrsac::Arrsac;
}

/// Dense stereo correspondence
pub mod disparity {
    pub use stereo_disparity::{compute_disparity, visualize, BlockMatching, GrayFloatImage};
}

/// Estimation algorithms
pub mod estimate {
    pub use homography::{FourPoint, Homography};
}

/// Feature detection, description and matching
pub mod features {
    pub use stereo_features::*;

    /// The ORB-like detector
    pub mod orb {
        pub use orb::*;
    }

    /// A robust and fast feature detector
    pub mod akaze {
        pub use akaze::*;
    }
}

/// Triangulation from disparity
pub mod geom {
    pub use stereo_geom::*;
}

/// Image opening and processing/manipulation
pub mod image {
    /// Re-export of [`image`] to open and save images
    #[allow(clippy::module_inception)]
    pub mod image {
        pub use image::*;
    }

    /// Re-export of [`imageproc`] crate for image manipulation routines
    pub mod imageproc {
        pub use imageproc::*;
    }
}
