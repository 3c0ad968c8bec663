use image::{DynamicImage, GrayImage, Luma};
use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256PlusPlus;
use stereo_disparity::{compute_disparity, BlockMatching, DisparityMap, Error, GrayFloatImage};

/// Random texture and the same texture shifted left by `shift` pixels.
fn shifted_pair(width: u32, height: u32, shift: u32) -> (DynamicImage, DynamicImage) {
    let mut rng = Xoshiro256PlusPlus::seed_from_u64(7);
    let left = GrayImage::from_fn(width, height, |_, _| Luma([rng.gen()]));
    let right = GrayImage::from_fn(width, height, |x, y| {
        *left.get_pixel((x + shift).min(width - 1), y)
    });
    (DynamicImage::ImageLuma8(left), DynamicImage::ImageLuma8(right))
}

#[test]
fn recovers_constant_shift() {
    let _ = pretty_env_logger::try_init_timed();
    let (left, right) = shifted_pair(96, 48, 6);
    let config = BlockMatching::new().max_disparity(16).subpixel(false);
    let map = compute_disparity(&left, &right, &config).unwrap();
    assert_eq!(map.dimensions(), (96, 48));
    let half = config.window_size / 2;
    for y in 0..48 {
        for x in (6 + half)..96 {
            assert_eq!(map.get(x, y), Some(6.0), "pixel ({x}, {y})");
        }
    }
}

#[test]
fn subpixel_stays_near_integer_winner() {
    let (left, right) = shifted_pair(80, 40, 5);
    let map = BlockMatching::new()
        .max_disparity(12)
        .compute(&left, &right)
        .unwrap();
    let value = map.get(50, 20).unwrap();
    assert!((value - 5.0).abs() <= 0.5, "got {value}");
}

#[test]
fn pixels_left_of_min_disparity_are_invalid() {
    let (left, right) = shifted_pair(64, 32, 4);
    let map = BlockMatching::new()
        .min_disparity(2)
        .max_disparity(8)
        .compute(&left, &right)
        .unwrap();
    assert_eq!(map.get(0, 10), None);
    assert_eq!(map.get(1, 10), None);
    assert_eq!(map.raw(1, 10), Some(DisparityMap::INVALID));
}

#[test]
fn left_right_check_keeps_consistent_matches() {
    let (left, right) = shifted_pair(96, 48, 6);
    let config = BlockMatching::new()
        .max_disparity(16)
        .subpixel(false)
        .left_right_max_diff(Some(0));
    let map = config.compute(&left, &right).unwrap();
    assert_eq!(map.get(60, 24), Some(6.0));
}

#[test]
fn flat_images_have_no_confident_matches() {
    let flat = DynamicImage::ImageLuma8(GrayImage::from_pixel(48, 32, Luma([90])));
    let map = compute_disparity(&flat, &flat, &BlockMatching::default()).unwrap();
    // Columns 0 and 1 only have candidates adjacent to the winner.
    for y in 0..32 {
        for x in 2..48 {
            assert_eq!(map.get(x, y), None);
        }
    }
}

#[test]
fn texture_threshold_rejects_flat_regions() {
    let (left, right) = shifted_pair(64, 32, 3);
    let map = BlockMatching::new()
        .max_disparity(8)
        .texture_threshold(2.0)
        .compute(&left, &right)
        .unwrap();
    assert_eq!(map.valid_count(), 0);
}

#[test]
fn mismatched_dimensions_fail() {
    let left = DynamicImage::ImageLuma8(GrayImage::new(100, 100));
    let right = DynamicImage::ImageLuma8(GrayImage::new(90, 100));
    let result = compute_disparity(&left, &right, &BlockMatching::default());
    assert_eq!(
        result,
        Err(Error::DimensionMismatch {
            left: (100, 100),
            right: (90, 100),
        })
    );
}

#[test]
fn invalid_config_fails_before_matching() {
    let image = GrayFloatImage::from_fn(16, 16, |x, _| x as f32 / 16.0);
    let result = BlockMatching::new().window_size(8).compute_gray(&image, &image);
    assert!(matches!(result, Err(Error::InvalidInput(_))));
}

#[test]
fn windows_larger_than_the_image_fail() {
    let image = GrayFloatImage::from_fn(8, 8, |x, y| ((x * 3 + y * 5) % 7) as f32 / 7.0);
    let result = BlockMatching::new()
        .window_size(65_537)
        .max_disparity(2)
        .texture_threshold(0.01)
        .compute_gray(&image, &image);
    assert!(matches!(result, Err(Error::InvalidInput(_))));
    let result = BlockMatching::new()
        .window_size(9)
        .max_disparity(2)
        .compute_gray(&image, &image);
    assert!(matches!(result, Err(Error::InvalidInput(_))));
}

#[test]
fn texture_check_accepts_a_window_as_large_as_the_image() {
    let (left, right) = shifted_pair(16, 16, 2);
    let map = BlockMatching::new()
        .window_size(15)
        .max_disparity(4)
        .texture_threshold(0.01)
        .compute(&left, &right)
        .unwrap();
    assert_eq!(map.dimensions(), (16, 16));
}

#[test]
fn search_range_is_clamped_to_the_image_width() {
    let (left, right) = shifted_pair(32, 16, 3);
    let clamped = BlockMatching::new()
        .window_size(5)
        .max_disparity(u32::MAX)
        .subpixel(false)
        .compute(&left, &right)
        .unwrap();
    let bounded = BlockMatching::new()
        .window_size(5)
        .max_disparity(31)
        .subpixel(false)
        .compute(&left, &right)
        .unwrap();
    assert_eq!(clamped, bounded);
}

#[test]
fn range_starting_past_the_image_is_all_invalid() {
    let (left, right) = shifted_pair(32, 16, 3);
    let map = BlockMatching::new()
        .window_size(5)
        .min_disparity(40)
        .max_disparity(60)
        .compute(&left, &right)
        .unwrap();
    assert_eq!(map.dimensions(), (32, 16));
    assert_eq!(map.valid_count(), 0);
}
