use ::image::{DynamicImage, RgbaImage};
use akaze::Akaze;
use log::*;
use std::borrow::Cow;
use stereo_calib::{undistort_dynamic, BorderFill, CalibrationModel};
use stereo_core::nalgebra::{Point2, Point3};
use stereo_core::{DisparityMap, Error, Features, Match, Result};
use stereo_disparity::BlockMatching;
use stereo_features::{
    detect_keypoints, draw_matches, estimate_transform, match_features, DetectorKind,
    FeatureDetector, MatchConfig, Transform, TransformConfig,
};
use stereo_geom::StereoGeometry;

/// Every setting of the pipeline in one place.
#[derive(Debug, Copy, Clone, PartialEq)]
#[cfg_attr(feature = "serde-serialize", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde-serialize", serde(default))]
pub struct PipelineConfig {
    /// Detector used on the alignment path.
    pub detector: DetectorKind,
    /// Settings of the ORB-like detector.
    pub orb: orb::Orb,
    /// Detector response threshold of the AKAZE-like detector.
    pub akaze_threshold: f64,
    pub block_matching: BlockMatching,
    /// What undistortion writes where the lens saw nothing.
    pub border_fill: BorderFill,
    pub matching: MatchConfig,
    pub transform: TransformConfig,
}

impl PipelineConfig {
    #[must_use]
    pub fn detector(self, detector: DetectorKind) -> Self {
        Self { detector, ..self }
    }

    #[must_use]
    pub fn block_matching(self, block_matching: BlockMatching) -> Self {
        Self {
            block_matching,
            ..self
        }
    }

    #[must_use]
    pub fn border_fill(self, border_fill: BorderFill) -> Self {
        Self {
            border_fill,
            ..self
        }
    }

    #[must_use]
    pub fn matching(self, matching: MatchConfig) -> Self {
        Self { matching, ..self }
    }

    #[must_use]
    pub fn transform(self, transform: TransformConfig) -> Self {
        Self { transform, ..self }
    }

    /// The configured detector of the selected kind.
    pub fn feature_detector(&self) -> FeatureDetector {
        match self.detector {
            DetectorKind::Orb => FeatureDetector::Orb(self.orb),
            DetectorKind::Akaze => FeatureDetector::Akaze(Akaze::new(self.akaze_threshold)),
        }
    }

    pub fn validate(&self) -> Result<()> {
        self.block_matching.validate()?;
        self.orb.validate()?;
        if !(self.akaze_threshold > 0.0 && self.akaze_threshold.is_finite()) {
            return Err(Error::InvalidInput(format!(
                "AKAZE threshold must be positive, got {}",
                self.akaze_threshold
            )));
        }
        self.matching.validate()?;
        self.transform.validate()
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            detector: DetectorKind::default(),
            orb: orb::Orb::default(),
            akaze_threshold: Akaze::default().detector_threshold,
            block_matching: BlockMatching::default(),
            border_fill: BorderFill::default(),
            matching: MatchConfig::default(),
            transform: TransformConfig::default(),
        }
    }
}

/// Two views of the same scene, optionally with the calibration of each camera.
#[derive(Debug, Clone, Copy)]
pub struct StereoPair<'a> {
    pub left: &'a DynamicImage,
    pub right: &'a DynamicImage,
    pub left_calibration: Option<&'a CalibrationModel>,
    pub right_calibration: Option<&'a CalibrationModel>,
}

impl<'a> StereoPair<'a> {
    /// A pair without calibration. The images are used as they are.
    pub fn new(left: &'a DynamicImage, right: &'a DynamicImage) -> Self {
        Self {
            left,
            right,
            left_calibration: None,
            right_calibration: None,
        }
    }

    /// Removes lens distortion from each view before matching.
    #[must_use]
    pub fn calibrated(self, left: &'a CalibrationModel, right: &'a CalibrationModel) -> Self {
        Self {
            left_calibration: Some(left),
            right_calibration: Some(right),
            ..self
        }
    }
}

/// The two pixels to measure between and the rig they were captured with.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde-serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct MeasureRequest {
    pub point_a: Point2<f64>,
    pub point_b: Point2<f64>,
    /// Focal length in pixels.
    pub focal_length: f64,
    /// Distance between the cameras, in the unit the result should have.
    pub baseline: f64,
}

/// The result of [`StereoPipeline::measure`].
#[derive(Debug, Clone, PartialEq)]
pub struct Measurement {
    /// Distance between the two points, in the unit of the baseline.
    pub distance: f64,
    /// Camera space position of the first point.
    pub point_a: Point3<f64>,
    /// Camera space position of the second point.
    pub point_b: Point3<f64>,
    /// The disparity map the points were read from.
    pub disparity: DisparityMap,
}

/// The result of [`StereoPipeline::align`].
#[derive(Debug, Clone, PartialEq)]
pub struct Alignment {
    pub features_a: Features,
    pub features_b: Features,
    /// Matches from `features_a` to `features_b`, best first.
    pub matches: Vec<Match>,
    /// `None` if the matches do not determine a homography.
    pub transform: Option<Transform>,
}

impl Alignment {
    /// The matches that agree with the transform, or all matches if there is none.
    pub fn inlier_matches(&self) -> Vec<Match> {
        match &self.transform {
            Some(transform) => transform.inliers.iter().map(|&ix| self.matches[ix]).collect(),
            None => self.matches.clone(),
        }
    }
}

/// Runs the measurement and alignment paths with one configuration.
///
/// The pipeline holds no state besides its configuration, so it can be shared between threads.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StereoPipeline {
    config: PipelineConfig,
}

impl StereoPipeline {
    pub fn new(config: PipelineConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    fn corrected<'a>(
        &self,
        image: &'a DynamicImage,
        calibration: Option<&CalibrationModel>,
    ) -> Result<Cow<'a, DynamicImage>> {
        Ok(match calibration {
            Some(calibration) => Cow::Owned(undistort_dynamic(
                image,
                calibration,
                self.config.border_fill,
            )?),
            None => Cow::Borrowed(image),
        })
    }

    /// Undistorts each calibrated view and computes the disparity of the left view.
    pub fn disparity(&self, pair: StereoPair<'_>) -> Result<DisparityMap> {
        if pair.left.width() != pair.right.width() || pair.left.height() != pair.right.height() {
            return Err(Error::DimensionMismatch {
                left: (pair.left.width(), pair.left.height()),
                right: (pair.right.width(), pair.right.height()),
            });
        }
        let left = self.corrected(pair.left, pair.left_calibration)?;
        let right = self.corrected(pair.right, pair.right_calibration)?;
        self.config.block_matching.compute(&left, &right)
    }

    /// Measures the distance between two pixels of the left view.
    ///
    /// The principal point comes from the left calibration when there is one and from the image
    /// center otherwise.
    pub fn measure(&self, pair: StereoPair<'_>, request: MeasureRequest) -> Result<Measurement> {
        let disparity = self.disparity(pair)?;
        let geometry = match pair.left_calibration {
            Some(calibration) => StereoGeometry::new(
                request.focal_length,
                request.baseline,
                calibration.intrinsics().principal_point,
            )?,
            None => StereoGeometry::centered(&disparity, request.focal_length, request.baseline)?,
        };
        let point_a = geometry.reconstruct(&disparity, request.point_a)?;
        let point_b = geometry.reconstruct(&disparity, request.point_b)?;
        let distance = (point_a - point_b).norm();
        info!(
            "Measured {} between {} and {}",
            distance, request.point_a, request.point_b
        );
        Ok(Measurement {
            distance,
            point_a,
            point_b,
            disparity,
        })
    }

    /// Detects and matches features in two photos and fits a homography from `a` to `b`.
    pub fn align(&self, a: &DynamicImage, b: &DynamicImage) -> Result<Alignment> {
        let detector = self.config.feature_detector();
        let features_a = detect_keypoints(a, &detector)?;
        let features_b = detect_keypoints(b, &detector)?;
        let matches = match_features(&features_a, &features_b, &self.config.matching)?;
        let transform = estimate_transform(
            &matches,
            features_a.keypoints(),
            features_b.keypoints(),
            &self.config.transform,
        )?;
        if transform.is_none() {
            warn!("No transform found between images from {} matches", matches.len());
        }
        Ok(Alignment {
            features_a,
            features_b,
            matches,
            transform,
        })
    }

    /// [`StereoPipeline::align`] and a side by side image of the supporting matches.
    pub fn align_and_draw(
        &self,
        a: &DynamicImage,
        b: &DynamicImage,
    ) -> Result<(Alignment, RgbaImage)> {
        let alignment = self.align(a, b)?;
        let drawing = draw_matches(
            a,
            b,
            alignment.features_a.keypoints(),
            alignment.features_b.keypoints(),
            &alignment.inlier_matches(),
        );
        Ok((alignment, drawing))
    }
}

impl Default for StereoPipeline {
    fn default() -> Self {
        Self {
            config: PipelineConfig::default(),
        }
    }
}
