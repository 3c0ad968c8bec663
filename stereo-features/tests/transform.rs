use approx::assert_relative_eq;
use stereo_core::nalgebra::Point2;
use stereo_features::{estimate_transform, Error, KeyPoint, Match, TransformConfig};

fn keypoint(point: Point2<f64>) -> KeyPoint {
    KeyPoint {
        point,
        scale: 31.0,
        orientation: 0.0,
        response: 1.0,
        octave: 0,
    }
}

/// The affine map the synthetic second image is warped with.
fn affine(p: Point2<f64>) -> Point2<f64> {
    Point2::new(1.1 * p.x + 0.2 * p.y + 15.0, -0.1 * p.x + 0.9 * p.y - 8.0)
}

fn pairs(points: &[Point2<f64>]) -> (Vec<KeyPoint>, Vec<KeyPoint>, Vec<Match>) {
    let a = points.iter().copied().map(keypoint).collect();
    let b = points.iter().copied().map(affine).map(keypoint).collect();
    let matches = (0..points.len())
        .map(|ix| Match {
            query: ix,
            train: ix,
            distance: 0.0,
        })
        .collect();
    (a, b, matches)
}

fn grid(count: usize) -> Vec<Point2<f64>> {
    (0..count)
        .map(|i| Point2::new((i % 7) as f64 * 40.0 + 13.0, (i / 7) as f64 * 35.0 + 9.0))
        .collect()
}

#[test]
fn three_matches_give_no_transform() {
    let (a, b, matches) = pairs(&grid(3));
    let result = estimate_transform(&matches, &a, &b, &TransformConfig::default());
    assert_eq!(result, Ok(None));
}

#[test]
fn four_affine_matches_fit_exactly() {
    let _ = pretty_env_logger::try_init_timed();
    let corners = [
        Point2::new(10.0, 20.0),
        Point2::new(300.0, 25.0),
        Point2::new(290.0, 210.0),
        Point2::new(15.0, 200.0),
    ];
    let (a, b, matches) = pairs(&corners);
    let transform = estimate_transform(&matches, &a, &b, &TransformConfig::default())
        .unwrap()
        .expect("four points in general position determine a homography");
    assert_eq!(transform.inliers, vec![0, 1, 2, 3]);
    for point in corners {
        let mapped = transform.transform(point).unwrap();
        assert_relative_eq!(mapped, affine(point), epsilon = 1e-6);
    }
}

#[test]
fn outliers_are_rejected() {
    let points = grid(35);
    let (a, mut b, matches) = pairs(&points);
    for (ix, keypoint) in b.iter_mut().enumerate().step_by(5) {
        keypoint.point = Point2::new(400.0 - ix as f64 * 7.0, 20.0 + ix as f64 * 3.0);
    }
    let transform = estimate_transform(&matches, &a, &b, &TransformConfig::default())
        .unwrap()
        .expect("most matches agree on one affine map");
    assert!(transform.inliers.iter().all(|ix| ix % 5 != 0));
    assert!(transform.inliers.len() >= 25);
    let mapped = transform.transform(Point2::new(100.0, 100.0)).unwrap();
    assert_relative_eq!(mapped, affine(Point2::new(100.0, 100.0)), epsilon = 1e-3);
}

#[test]
fn seeded_estimation_is_reproducible() {
    let (a, b, matches) = pairs(&grid(20));
    let config = TransformConfig::default().seed(42);
    let first = estimate_transform(&matches, &a, &b, &config).unwrap();
    let second = estimate_transform(&matches, &a, &b, &config).unwrap();
    assert!(first.is_some());
    assert_eq!(first, second);
}

#[test]
fn collinear_matches_give_no_transform() {
    let line: Vec<_> = (0..4).map(|i| Point2::new(i as f64 * 10.0, i as f64 * 5.0)).collect();
    let (a, b, matches) = pairs(&line);
    let result = estimate_transform(&matches, &a, &b, &TransformConfig::default());
    assert_eq!(result, Ok(None));
}

#[test]
fn out_of_range_match_is_invalid_input() {
    let (a, b, mut matches) = pairs(&grid(6));
    matches[2].train = 99;
    let result = estimate_transform(&matches, &a, &b, &TransformConfig::default());
    assert!(matches!(result, Err(Error::InvalidInput(_))));
}
