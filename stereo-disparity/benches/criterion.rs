use criterion::{criterion_group, criterion_main, Criterion};
use image::{DynamicImage, GrayImage, Luma};
use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256PlusPlus;
use stereo_disparity::{BlockMatching, GrayFloatImage};

fn load_pair() -> (GrayFloatImage, GrayFloatImage) {
    let mut rng = Xoshiro256PlusPlus::seed_from_u64(0);
    let left = GrayImage::from_fn(320, 240, |_, _| Luma([rng.gen()]));
    let right = GrayImage::from_fn(320, 240, |x, y| *left.get_pixel((x + 12).min(319), y));
    (
        GrayFloatImage::from_dynamic(&DynamicImage::ImageLuma8(left)),
        GrayFloatImage::from_dynamic(&DynamicImage::ImageLuma8(right)),
    )
}

fn block_matching(c: &mut Criterion) {
    let (left, right) = load_pair();
    let default = BlockMatching::default();
    c.bench_function("block_matching_default", |b| {
        b.iter(|| default.compute_gray(&left, &right))
    });
    let robust = BlockMatching::robust();
    c.bench_function("block_matching_robust", |b| {
        b.iter(|| robust.compute_gray(&left, &right))
    });
}

criterion_group!(
    name = disparity;
    config = Criterion::default().sample_size(10);
    targets = block_matching
);
criterion_main!(disparity);
