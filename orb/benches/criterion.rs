use criterion::{criterion_group, criterion_main, Criterion};
use image::{GrayImage, Luma};
use orb::Orb;
use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256PlusPlus;

fn load_image() -> GrayImage {
    let mut rng = Xoshiro256PlusPlus::seed_from_u64(0);
    let cells: Vec<u8> = (0..161 * 121).map(|_| rng.gen()).collect();
    GrayImage::from_fn(640, 480, |x, y| Luma([cells[((y / 4) * 161 + x / 4) as usize]]))
}

fn extract(c: &mut Criterion) {
    let image = load_image();
    let orb = Orb::default();
    c.bench_function("extract", |b| b.iter(|| orb.extract_from_gray_image(&image)));
    let dense = Orb::dense();
    c.bench_function("extract_dense", |b| {
        b.iter(|| dense.extract_from_gray_image(&image))
    });
}

criterion_group!(
    name = orb;
    config = Criterion::default().sample_size(10);
    targets = extract
);
criterion_main!(orb);
