use approx::assert_relative_eq;
use quickcheck_macros::quickcheck;
use stereo_calib::CalibrationModel;
use stereo_core::nalgebra::{Matrix3, Point2};
use stereo_core::{DisparityMap, Error};
use stereo_geom::{distance_between, StereoGeometry};

#[test]
fn constant_depth_recovers_pixel_separation() {
    let _ = pretty_env_logger::try_init_timed();
    let (focal, baseline, depth) = (1200.0, 0.12, 3.5);
    let disparity = (focal * baseline / depth) as f32;
    let map = DisparityMap::from_fn(400, 300, |_, _| disparity);

    let a = Point2::new(100.0, 150.0);
    let b = Point2::new(260.0, 30.0);
    let measured = distance_between(&map, a, b, focal, baseline, None).unwrap();
    let expected = (a - b).norm() * depth / focal;
    assert_relative_eq!(measured, expected, max_relative = 1e-3);
}

#[test]
fn depth_difference_adds_to_distance() {
    let geometry = StereoGeometry::new(1000.0, 0.1, Point2::new(50.0, 50.0)).unwrap();
    let map = DisparityMap::from_fn(100, 100, |x, _| if x < 50 { 20.0 } else { 10.0 });
    // Both points on the optical axis row at depths 5 and 10.
    let near = geometry.reconstruct(&map, Point2::new(10.0, 50.0)).unwrap();
    let far = geometry.reconstruct(&map, Point2::new(90.0, 50.0)).unwrap();
    assert_relative_eq!(near.z, 5.0);
    assert_relative_eq!(far.z, 10.0);
    let distance = geometry
        .distance_between(&map, Point2::new(10.0, 50.0), Point2::new(90.0, 50.0))
        .unwrap();
    assert_relative_eq!(distance, (near - far).norm());
}

#[quickcheck]
fn sentinel_disparity_is_insufficient(x: u8, y: u8) -> bool {
    let (x, y) = (x as u32 % 64, y as u32 % 48);
    let mut map = DisparityMap::from_fn(64, 48, |_, _| 16.0);
    map.set(x, y, DisparityMap::INVALID);
    let hole = Point2::new(x as f64, y as f64);
    let other = Point2::new(((x + 32) % 64) as f64, ((y + 24) % 48) as f64);
    matches!(
        distance_between(&map, hole, other, 800.0, 0.1, None),
        Err(Error::InsufficientDisparityData { .. })
    ) && matches!(
        distance_between(&map, other, hole, 800.0, 0.1, None),
        Err(Error::InsufficientDisparityData { .. })
    )
}

#[test]
fn zero_disparity_is_degenerate() {
    let map = DisparityMap::from_fn(32, 32, |_, _| 0.0);
    let result = distance_between(
        &map,
        Point2::new(1.0, 1.0),
        Point2::new(20.0, 20.0),
        800.0,
        0.1,
        None,
    );
    assert!(matches!(result, Err(Error::DegenerateGeometry(_))));
}

#[test]
fn out_of_bounds_points_are_invalid_input() {
    let map = DisparityMap::from_fn(32, 32, |_, _| 4.0);
    let inside = Point2::new(1.0, 1.0);
    for outside in [
        Point2::new(32.0, 5.0),
        Point2::new(-0.5, 5.0),
        Point2::new(5.0, 40.0),
    ] {
        assert!(matches!(
            distance_between(&map, inside, outside, 800.0, 0.1, None),
            Err(Error::InvalidInput(_))
        ));
    }
}

#[test]
fn non_positive_rig_is_invalid_input() {
    let map = DisparityMap::from_fn(32, 32, |_, _| 4.0);
    let p = Point2::new(1.0, 1.0);
    assert!(matches!(
        distance_between(&map, p, p, 0.0, 0.1, None),
        Err(Error::InvalidInput(_))
    ));
    assert!(matches!(
        distance_between(&map, p, p, 800.0, 0.0, None),
        Err(Error::InvalidInput(_))
    ));
}

#[test]
fn calibration_supplies_focal_and_principal_point() {
    let calibration = CalibrationModel::new(
        0.2,
        Matrix3::new(900.0, 0.0, 300.0, 0.0, 905.0, 200.0, 0.0, 0.0, 1.0),
        vec![0.0; 5],
        vec![],
        vec![],
        0.0,
    )
    .unwrap();
    let geometry = StereoGeometry::from_calibration(&calibration, 0.25).unwrap();
    assert_eq!(geometry.focal_length, 900.0);
    assert_eq!(geometry.principal_point, Point2::new(300.0, 200.0));
}
