use image::{DynamicImage, GrayImage, ImageBuffer, Luma, Rgb, RgbImage};
use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256PlusPlus;
use stereo_calib::{undistort, undistort_dynamic, BorderFill, CalibrationModel, Undistorter};
use stereo_core::nalgebra::{Matrix3, Vector3};
use stereo_core::Error;

fn calibration(distortion: Vec<f64>) -> CalibrationModel {
    CalibrationModel::new(
        0.25,
        Matrix3::new(80.0, 0.0, 32.0, 0.0, 80.0, 24.0, 0.0, 0.0, 1.0),
        distortion,
        vec![Vector3::new(0.1, 0.0, 0.0)],
        vec![Vector3::new(0.0, 0.0, 20.0)],
        0.02,
    )
    .unwrap()
}

fn noise(width: u32, height: u32) -> RgbImage {
    let mut rng = Xoshiro256PlusPlus::seed_from_u64(0);
    ImageBuffer::from_fn(width, height, |_, _| Rgb(rng.gen()))
}

#[test]
fn zero_distortion_is_identity() {
    let _ = pretty_env_logger::try_init_timed();
    let image = noise(64, 48);
    let corrected = undistort(&image, &calibration(vec![0.0; 5]), BorderFill::Replicate).unwrap();
    assert_eq!(corrected, image);
}

#[test]
fn dynamic_images_keep_their_layout() {
    let image = DynamicImage::ImageRgb8(noise(64, 48));
    let corrected =
        undistort_dynamic(&image, &calibration(vec![0.0; 4]), BorderFill::Zero).unwrap();
    assert_eq!(corrected.color(), image.color());
    assert_eq!(corrected.as_bytes(), image.as_bytes());
}

#[test]
fn barrel_distortion_pulls_corners_from_outside() {
    // Positive k1 samples the output corners from beyond the input frame.
    let model = calibration(vec![0.8]);
    let image = GrayImage::from_pixel(64, 48, Luma([200]));

    let zeroed = undistort(&image, &model, BorderFill::Zero).unwrap();
    assert_eq!(zeroed.get_pixel(0, 0), &Luma([0]));
    assert_eq!(zeroed.get_pixel(32, 24), &Luma([200]));

    let replicated = undistort(&image, &model, BorderFill::Replicate).unwrap();
    assert!(replicated.pixels().all(|p| p == &Luma([200])));
}

#[test]
fn center_pixel_is_fixed_under_radial_distortion() {
    let mut image = GrayImage::new(64, 48);
    image.put_pixel(32, 24, Luma([255]));
    let corrected = undistort(&image, &calibration(vec![0.3, -0.1]), BorderFill::Zero).unwrap();
    assert_eq!(corrected.get_pixel(32, 24), &Luma([255]));
}

#[test]
fn undistorter_rejects_wrong_size() {
    let undistorter = Undistorter::new(&calibration(vec![0.1]), 64, 48, BorderFill::Replicate)
        .unwrap();
    let result = undistorter.apply(&GrayImage::new(48, 64));
    assert!(matches!(result, Err(Error::InvalidInput(_))));
}

#[test]
fn empty_images_stay_empty() {
    let calibration = calibration(vec![0.1]);
    let undistorter = Undistorter::new(&calibration, 0, 48, BorderFill::Zero).unwrap();
    assert_eq!(undistorter.dimensions(), (0, 48));
    let corrected = undistorter.apply(&GrayImage::new(0, 48)).unwrap();
    assert_eq!(corrected.dimensions(), (0, 48));

    let corrected = undistort(&noise(64, 0), &calibration, BorderFill::Replicate).unwrap();
    assert_eq!(corrected.dimensions(), (64, 0));
    let dynamic = DynamicImage::ImageLuma8(GrayImage::new(0, 0));
    let corrected = undistort_dynamic(&dynamic, &calibration, BorderFill::Zero).unwrap();
    assert_eq!((corrected.width(), corrected.height()), (0, 0));
    assert!(matches!(
        undistorter.apply(&GrayImage::new(48, 0)),
        Err(Error::InvalidInput(_))
    ));
}
