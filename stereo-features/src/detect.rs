use akaze::Akaze;
use image::DynamicImage;
use log::*;
use orb::Orb;
use stereo_core::{Features, Result};

/// Which family of detector to run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde-serialize", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde-serialize", serde(rename_all = "lowercase"))]
pub enum DetectorKind {
    /// FAST corners with rotated BRIEF descriptors, see [`Orb`].
    #[default]
    Orb,
    /// Nonlinear scale space features with binary descriptors, see [`Akaze`].
    Akaze,
}

/// A configured detector. Both variants produce binary descriptors compared by Hamming distance.
#[derive(Debug, Clone, Copy)]
pub enum FeatureDetector {
    Orb(Orb),
    Akaze(Akaze),
}

impl FeatureDetector {
    pub fn kind(&self) -> DetectorKind {
        match self {
            Self::Orb(_) => DetectorKind::Orb,
            Self::Akaze(_) => DetectorKind::Akaze,
        }
    }

    /// Detects keypoints and computes their descriptors.
    ///
    /// The result is a pure function of the image and the settings.
    pub fn detect(&self, image: &DynamicImage) -> Result<Features> {
        let (keypoints, descriptors) = match self {
            Self::Orb(orb) => orb.extract(image)?,
            Self::Akaze(akaze) => akaze.extract(image)?,
        };
        debug!(
            "{:?} detector found {} keypoints in {} x {} image",
            self.kind(),
            keypoints.len(),
            image.width(),
            image.height()
        );
        Features::new(keypoints, descriptors)
    }
}

impl Default for FeatureDetector {
    fn default() -> Self {
        DetectorKind::default().into()
    }
}

impl From<DetectorKind> for FeatureDetector {
    fn from(kind: DetectorKind) -> Self {
        match kind {
            DetectorKind::Orb => Self::Orb(Orb::default()),
            DetectorKind::Akaze => Self::Akaze(Akaze::default()),
        }
    }
}

impl From<Orb> for FeatureDetector {
    fn from(orb: Orb) -> Self {
        Self::Orb(orb)
    }
}

impl From<Akaze> for FeatureDetector {
    fn from(akaze: Akaze) -> Self {
        Self::Akaze(akaze)
    }
}

/// Detects keypoints and their descriptors in `image` with `detector`.
pub fn detect_keypoints(image: &DynamicImage, detector: &FeatureDetector) -> Result<Features> {
    detector.detect(image)
}
