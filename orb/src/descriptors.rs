use crate::detector::Corner;
use bitarray::BitArray;
use image::GrayImage;
use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256PlusPlus;

/// Number of intensity comparisons in a descriptor.
pub const DESCRIPTOR_BITS: usize = 256;

/// Fixed seed so the sampling pattern, and with it every descriptor, is reproducible.
const PATTERN_SEED: u64 = 0x5eed_0b1f;

/// Pair of sample offsets from the keypoint.
pub(crate) type Pair = [(f64, f64); 2];

/// Largest offset of a sample along either axis before rotation.
pub(crate) fn pattern_radius(patch_size: u32) -> i32 {
    (patch_size / 2) as i32 - 2
}

/// The comparison pattern for a patch size, identical on every call.
pub(crate) fn pattern(patch_size: u32) -> Vec<Pair> {
    let radius = pattern_radius(patch_size);
    let mut rng = Xoshiro256PlusPlus::seed_from_u64(PATTERN_SEED);
    let mut offset = || {
        (
            rng.gen_range(-radius..=radius) as f64,
            rng.gen_range(-radius..=radius) as f64,
        )
    };
    (0..DESCRIPTOR_BITS).map(|_| [offset(), offset()]).collect()
}

/// Computes the rotated BRIEF descriptor of a corner on the smoothed level image.
pub(crate) fn describe(
    smoothed: &GrayImage,
    corner: Corner,
    angle: f64,
    pattern: &[Pair],
) -> BitArray<64> {
    let (sin, cos) = angle.sin_cos();
    let sample = |(dx, dy): (f64, f64)| {
        let x = (corner.x as f64 + (dx * cos - dy * sin).round())
            .clamp(0.0, (smoothed.width() - 1) as f64);
        let y = (corner.y as f64 + (dx * sin + dy * cos).round())
            .clamp(0.0, (smoothed.height() - 1) as f64);
        smoothed.get_pixel(x as u32, y as u32)[0]
    };
    let mut descriptor = BitArray::zeros();
    let bytes = descriptor.bytes_mut();
    for (bit, &[a, b]) in pattern.iter().enumerate() {
        if sample(a) < sample(b) {
            bytes[bit / 8] |= 1 << (bit % 8);
        }
    }
    descriptor
}
