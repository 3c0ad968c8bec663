use arrsac::Arrsac;
use homography::{FourPoint, Homography};
use log::*;
use rand::SeedableRng;
use rand_xoshiro::Xoshiro256PlusPlus;
use stereo_core::{
    nalgebra::Point2,
    sample_consensus::{Consensus, Estimator, Model},
    Error, FeatureMatch, KeyPoint, Match, Result,
};

/// Settings of robust homography fitting.
#[derive(Debug, Copy, Clone, PartialEq)]
#[cfg_attr(feature = "serde-serialize", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde-serialize", serde(default))]
pub struct TransformConfig {
    /// Reprojection error in pixels below which a match supports a homography.
    pub inlier_threshold: f64,
    /// Seed of the consensus sampler. The same seed always gives the same transform.
    pub seed: u64,
    /// Fewest inliers a transform needs to be reported.
    pub min_inliers: usize,
}

impl TransformConfig {
    #[must_use]
    pub fn inlier_threshold(self, inlier_threshold: f64) -> Self {
        Self {
            inlier_threshold,
            ..self
        }
    }

    #[must_use]
    pub fn seed(self, seed: u64) -> Self {
        Self { seed, ..self }
    }

    #[must_use]
    pub fn min_inliers(self, min_inliers: usize) -> Self {
        Self {
            min_inliers,
            ..self
        }
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.inlier_threshold > 0.0 && self.inlier_threshold.is_finite()) {
            return Err(Error::InvalidInput(format!(
                "inlier threshold must be positive, got {}",
                self.inlier_threshold
            )));
        }
        if self.min_inliers < FourPoint::MIN_SAMPLES {
            return Err(Error::InvalidInput(format!(
                "a homography needs at least {} inliers, got {}",
                FourPoint::MIN_SAMPLES,
                self.min_inliers
            )));
        }
        Ok(())
    }
}

impl Default for TransformConfig {
    fn default() -> Self {
        Self {
            inlier_threshold: 3.0,
            seed: 0,
            min_inliers: FourPoint::MIN_SAMPLES,
        }
    }
}

/// A homography between two images together with the matches that support it.
#[derive(Debug, Clone, PartialEq)]
pub struct Transform {
    pub homography: Homography,
    /// Indices into the matches the transform was estimated from.
    pub inliers: Vec<usize>,
}

impl Transform {
    /// Maps a point of image A into image B.
    pub fn transform(&self, point: Point2<f64>) -> Option<Point2<f64>> {
        self.homography.transform(point)
    }
}

fn inliers_of(homography: &Homography, data: &[FeatureMatch], threshold: f64) -> Vec<usize> {
    data.iter()
        .enumerate()
        .filter(|(_, m)| homography.residual(m) < threshold)
        .map(|(ix, _)| ix)
        .collect()
}

/// Fits a homography mapping image A onto image B to the given matches.
///
/// Returns `Ok(None)` when there are fewer than four matches, when the correspondences are
/// degenerate (coincident or collinear points), or when fewer than
/// [`TransformConfig::min_inliers`] matches agree with the best model. Match indices outside of the
/// keypoint slices fail with [`Error::InvalidInput`].
pub fn estimate_transform(
    matches: &[Match],
    keypoints_a: &[KeyPoint],
    keypoints_b: &[KeyPoint],
    config: &TransformConfig,
) -> Result<Option<Transform>> {
    config.validate()?;
    let data = matches
        .iter()
        .map(|m| match (keypoints_a.get(m.query), keypoints_b.get(m.train)) {
            (Some(a), Some(b)) => Ok(FeatureMatch(a.point, b.point)),
            _ => Err(Error::InvalidInput(format!(
                "match {} -> {} is out of range for {} and {} keypoints",
                m.query,
                m.train,
                keypoints_a.len(),
                keypoints_b.len()
            ))),
        })
        .collect::<Result<Vec<_>>>()?;

    if data.len() < FourPoint::MIN_SAMPLES {
        debug!("{} matches are too few for a homography", data.len());
        return Ok(None);
    }

    let estimator = FourPoint::new();
    let candidate = if data.len() == FourPoint::MIN_SAMPLES {
        estimator
            .estimate(data.iter().copied())
            .map(|homography| {
                let inliers = inliers_of(&homography, &data, config.inlier_threshold);
                (homography, inliers)
            })
    } else {
        let mut arrsac = Arrsac::new(
            config.inlier_threshold,
            Xoshiro256PlusPlus::seed_from_u64(config.seed),
        );
        arrsac.model_inliers(&estimator, data.iter().copied())
    };
    let Some((homography, inliers)) = candidate else {
        debug!("no homography fits {} matches", data.len());
        return Ok(None);
    };

    // Refitting on every inlier averages out the noise of the minimal sample.
    let (homography, inliers) = match estimator.from_matches(inliers.iter().map(|&ix| data[ix])) {
        Some(refit) => {
            let refit_inliers = inliers_of(&refit, &data, config.inlier_threshold);
            if refit_inliers.len() >= inliers.len() {
                (refit, refit_inliers)
            } else {
                (homography, inliers)
            }
        }
        None => (homography, inliers),
    };

    if inliers.len() < config.min_inliers {
        debug!(
            "homography has {} inliers, {} required",
            inliers.len(),
            config.min_inliers
        );
        return Ok(None);
    }
    info!(
        "Estimated homography with {} of {} matches as inliers",
        inliers.len(),
        data.len()
    );
    Ok(Some(Transform {
        homography,
        inliers,
    }))
}
