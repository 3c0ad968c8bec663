use image::{DynamicImage, GrayImage, Luma};
use stereo_features::{detect_keypoints, DetectorKind, FeatureDetector, Orb};

/// Smooth blobs of varying brightness, which both detectors respond to.
fn scene() -> DynamicImage {
    let blobs = [
        (60.0, 50.0, 12.0),
        (150.0, 70.0, 18.0),
        (90.0, 130.0, 9.0),
        (200.0, 150.0, 15.0),
        (40.0, 160.0, 20.0),
    ];
    DynamicImage::ImageLuma8(GrayImage::from_fn(256, 200, |x, y| {
        let value: f64 = blobs
            .iter()
            .map(|&(cx, cy, r)| {
                let d2 = (x as f64 - cx).powi(2) + (y as f64 - cy).powi(2);
                200.0 * (-d2 / (2.0 * r * r)).exp()
            })
            .sum();
        let checker = if (x / 8 + y / 8) % 2 == 0 { 25.0 } else { 0.0 };
        Luma([(value + checker).min(255.0) as u8])
    }))
}

#[test]
fn detection_is_idempotent_for_every_kind() {
    let _ = pretty_env_logger::try_init_timed();
    let image = scene();
    for kind in [DetectorKind::Orb, DetectorKind::Akaze] {
        let detector = FeatureDetector::from(kind);
        assert_eq!(detector.kind(), kind);
        let first = detect_keypoints(&image, &detector).unwrap();
        let second = detect_keypoints(&image, &detector).unwrap();
        assert_eq!(first, second, "{kind:?} is not deterministic");
        assert_eq!(first.keypoints().len(), first.descriptors().len());
    }
}

#[test]
fn orb_settings_pass_through() {
    let detector = FeatureDetector::from(Orb::new(10));
    let features = detect_keypoints(&scene(), &detector).unwrap();
    assert!(features.len() <= 10);
}

#[test]
fn invalid_orb_settings_fail() {
    let detector = FeatureDetector::from(Orb::default().num_levels(0));
    assert!(detect_keypoints(&scene(), &detector).is_err());
}

#[test]
fn tiny_images_yield_no_features_for_every_kind() {
    let _ = pretty_env_logger::try_init_timed();
    let checker = DynamicImage::ImageLuma8(GrayImage::from_fn(32, 32, |x, y| {
        Luma([if (x / 4 + y / 4) % 2 == 0 { 10 } else { 240 }])
    }));
    for kind in [DetectorKind::Orb, DetectorKind::Akaze] {
        let features = detect_keypoints(&checker, &FeatureDetector::from(kind)).unwrap();
        assert!(features.is_empty(), "{kind:?} found features in a 32 x 32 image");
    }
}
