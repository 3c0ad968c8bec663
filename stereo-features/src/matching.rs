use float_ord::FloatOrd;
use log::*;
use stereo_core::space::{Knn, LinearKnn};
use stereo_core::{Descriptor, Error, Features, Match, Result};

/// Filters applied while matching descriptors.
#[derive(Debug, Copy, Clone, PartialEq)]
#[cfg_attr(feature = "serde-serialize", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde-serialize", serde(default))]
pub struct MatchConfig {
    /// Keep a match only if the query is also the nearest neighbor of its train descriptor.
    pub cross_check: bool,
    /// Lowe's ratio test: the best distance must be below `ratio` times the second best.
    pub ratio: Option<f64>,
    /// Reject matches farther apart than this.
    pub max_distance: Option<f64>,
}

impl MatchConfig {
    #[must_use]
    pub fn cross_check(self, cross_check: bool) -> Self {
        Self {
            cross_check,
            ..self
        }
    }

    #[must_use]
    pub fn ratio(self, ratio: Option<f64>) -> Self {
        Self { ratio, ..self }
    }

    #[must_use]
    pub fn max_distance(self, max_distance: Option<f64>) -> Self {
        Self {
            max_distance,
            ..self
        }
    }

    pub fn validate(&self) -> Result<()> {
        if let Some(ratio) = self.ratio {
            if !(ratio > 0.0 && ratio <= 1.0) {
                return Err(Error::InvalidInput(format!(
                    "ratio test threshold must be in (0, 1], got {ratio}"
                )));
            }
        }
        if let Some(max_distance) = self.max_distance {
            if !(max_distance >= 0.0) {
                return Err(Error::InvalidInput(format!(
                    "maximum match distance must be non-negative, got {max_distance}"
                )));
            }
        }
        Ok(())
    }
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            cross_check: true,
            ratio: None,
            max_distance: None,
        }
    }
}

/// Best neighbor of `query` and the distance of the runner up, if there is one.
fn nearest<'a, D, I>(
    knn: &LinearKnn<D::Metric, I>,
    query: &D,
) -> Option<((usize, f64), Option<f64>)>
where
    D: Descriptor + 'a,
    I: Iterator<Item = &'a D> + Clone,
{
    let mut neighbors = knn.knn(query, 2).into_iter();
    let best = neighbors.next()?;
    let second = neighbors.next().map(|neighbor| D::to_distance(neighbor.distance));
    Some(((best.index, D::to_distance(best.distance)), second))
}

/// Matches every descriptor of `a` to its nearest descriptor in `b`.
///
/// Neighbors are found by exhaustive search under the descriptor's [`Descriptor::Metric`]. The
/// result is ordered by ascending distance, ties by query index. No descriptors, or no surviving
/// matches, give an empty vector.
pub fn match_features<D: Descriptor>(
    a: &Features<D>,
    b: &Features<D>,
    config: &MatchConfig,
) -> Result<Vec<Match>> {
    config.validate()?;
    let (a, b) = (a.descriptors(), b.descriptors());
    let knn_b = LinearKnn {
        metric: D::Metric::default(),
        iter: b.iter(),
    };
    let knn_a = LinearKnn {
        metric: D::Metric::default(),
        iter: a.iter(),
    };
    let mut matches: Vec<Match> = a
        .iter()
        .enumerate()
        .filter_map(|(query, descriptor)| {
            let ((train, distance), second) = nearest(&knn_b, descriptor)?;
            if let (Some(ratio), Some(second)) = (config.ratio, second) {
                if !(distance < ratio * second) {
                    return None;
                }
            }
            if config.max_distance.map_or(false, |max| distance > max) {
                return None;
            }
            if config.cross_check {
                let ((reverse, _), _) = nearest(&knn_a, &b[train])?;
                if reverse != query {
                    return None;
                }
            }
            Some(Match {
                query,
                train,
                distance,
            })
        })
        .collect();
    matches.sort_by_key(|m| FloatOrd(m.distance));
    debug!(
        "Matched {} of {} query descriptors against {}",
        matches.len(),
        a.len(),
        b.len()
    );
    Ok(matches)
}

#[cfg(test)]
mod tests {
    use super::*;

    use stereo_core::Euclidean;

    #[test]
    fn nearest_tracks_second_best() {
        let candidates = vec![vec![5.0f32], vec![1.5], vec![-2.0], vec![1.0]];
        let knn = LinearKnn {
            metric: Euclidean,
            iter: candidates.iter(),
        };
        let ((index, distance), second) = nearest(&knn, &vec![0.0f32]).unwrap();
        assert_eq!(index, 3);
        assert_eq!(distance, 1.0);
        assert_eq!(second, Some(1.5));

        let single = vec![vec![4.0f32]];
        let knn = LinearKnn {
            metric: Euclidean,
            iter: single.iter(),
        };
        assert_eq!(nearest(&knn, &vec![1.0f32]), Some(((0, 3.0), None)));

        let empty: Vec<Vec<f32>> = vec![];
        let knn = LinearKnn {
            metric: Euclidean,
            iter: empty.iter(),
        };
        assert!(nearest(&knn, &vec![0.0f32]).is_none());
    }

    #[test]
    fn ratio_bounds_are_checked() {
        assert!(MatchConfig::default().ratio(Some(0.0)).validate().is_err());
        assert!(MatchConfig::default().ratio(Some(1.5)).validate().is_err());
        assert!(MatchConfig::default().max_distance(Some(-1.0)).validate().is_err());
        assert!(MatchConfig::default().ratio(Some(0.8)).validate().is_ok());
    }
}
