use akaze::{Akaze, MIN_EVOLUTION_SIZE};
use image::{DynamicImage, GrayImage, Luma};

/// Bright discs of several radii on a dark background, shifted by `(dx, dy)`.
fn discs(width: u32, height: u32, dx: f64, dy: f64) -> DynamicImage {
    let discs = [
        (70.0, 60.0, 5.0),
        (150.0, 70.0, 7.0),
        (100.0, 120.0, 4.0),
        (190.0, 130.0, 6.0),
        (60.0, 140.0, 8.0),
        (130.0, 100.0, 3.0),
    ];
    DynamicImage::ImageLuma8(GrayImage::from_fn(width, height, |x, y| {
        let inside = discs.iter().any(|&(cx, cy, r)| {
            (x as f64 - cx - dx).powi(2) + (y as f64 - cy - dy).powi(2) <= r * r
        });
        Luma([if inside { 230 } else { 20 }])
    }))
}

#[test]
fn extraction_is_deterministic() {
    let _ = pretty_env_logger::try_init_timed();
    let image = discs(256, 200, 0.0, 0.0);
    let akaze = Akaze::default();
    let first = akaze.extract(&image).unwrap();
    let second = akaze.extract(&image).unwrap();
    assert!(!first.0.is_empty());
    assert_eq!(first.0.len(), first.1.len());
    assert_eq!(first, second);
}

#[test]
fn keypoints_lie_inside_the_image() {
    let (keypoints, _) = Akaze::dense().extract(&discs(256, 200, 0.0, 0.0)).unwrap();
    for keypoint in &keypoints {
        assert!((0.0..256.0).contains(&keypoint.point.x));
        assert!((0.0..200.0).contains(&keypoint.point.y));
        assert!(keypoint.response > 0.0);
        assert!((0.0..2.0 * core::f64::consts::PI).contains(&keypoint.orientation));
    }
}

#[test]
fn shifted_discs_move_their_keypoints() {
    let akaze = Akaze::default();
    let (kps_a, _) = akaze.extract(&discs(256, 200, 0.0, 0.0)).unwrap();
    let (kps_b, _) = akaze.extract(&discs(256, 200, 6.0, 4.0)).unwrap();
    let followed = kps_a.iter().any(|a| {
        kps_b.iter().any(|b| {
            (b.point.x - a.point.x - 6.0).hypot(b.point.y - a.point.y - 4.0) < 2.0
        })
    });
    assert!(followed);
}

#[test]
fn images_below_the_minimum_side_have_no_features() {
    let _ = pretty_env_logger::try_init_timed();
    let side = MIN_EVOLUTION_SIZE as u32 - 8;
    let checker = GrayImage::from_fn(side, side, |x, y| {
        Luma([if (x / 4 + y / 4) % 2 == 0 { 0 } else { 255 }])
    });
    for image in [
        DynamicImage::ImageLuma8(checker),
        DynamicImage::ImageLuma8(GrayImage::new(400, 10)),
        DynamicImage::ImageLuma8(GrayImage::new(0, 0)),
    ] {
        let (keypoints, descriptors) = Akaze::default().extract(&image).unwrap();
        assert!(keypoints.is_empty());
        assert!(descriptors.is_empty());
    }
}

#[test]
fn invalid_settings_fail() {
    let akaze = Akaze::default().descriptor_channels(0);
    assert!(akaze.extract(&discs(64, 64, 0.0, 0.0)).is_err());
}
