//! Benchmarks for fingerprinting and clustering.
//!
//! Run with: cargo bench -p reclaim-core

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use image::{DynamicImage, GrayImage, Luma};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use reclaim_core::cluster::{find_similar_groups, Candidate};
use reclaim_core::config::SimilarConfig;
use reclaim_core::fingerprint::{self, BlurAssessment, Raster};
use reclaim_core::{MediaItem, MediaKind};

fn noise_raster(seed: u64, width: u32, height: u32) -> Raster {
    let mut rng = StdRng::seed_from_u64(seed);
    let img = GrayImage::from_fn(width, height, |_, _| Luma([rng.gen()]));
    Raster::new("bench", DynamicImage::ImageLuma8(img)).unwrap()
}

fn benchmark_perceptual_hash(c: &mut Criterion) {
    let raster = noise_raster(1, 64, 48);

    c.bench_function("perceptual_hash", |b| {
        b.iter(|| fingerprint::perceptual_hash(black_box(&raster)))
    });
}

fn benchmark_difference_hash(c: &mut Criterion) {
    let raster = noise_raster(2, 64, 48);

    c.bench_function("difference_hash", |b| {
        b.iter(|| fingerprint::difference_hash(black_box(&raster)))
    });
}

fn benchmark_blur_assessment(c: &mut Criterion) {
    let raster = noise_raster(3, 256, 192);

    c.bench_function("blur_assessment_256px", |b| {
        b.iter(|| BlurAssessment::assess(black_box(&raster), 2.0, 90.0))
    });
}

fn benchmark_similar_groups(c: &mut Criterion) {
    // 500 items in families of five near-identical shots.
    let candidates: Vec<Candidate> = (0..500u64)
        .map(|i| {
            let raster = noise_raster(i / 5, 64, 48);
            let item = MediaItem::new(format!("item-{i:04}"), MediaKind::Image, 4000, 3000, i as i64, 1);
            Candidate::new(&item, fingerprint::fingerprint(&raster, 4000, 3000))
        })
        .collect();
    let config = SimilarConfig::default();

    c.bench_function("find_similar_groups_500", |b| {
        b.iter(|| find_similar_groups(black_box(&candidates), &config))
    });
}

criterion_group!(
    benches,
    benchmark_perceptual_hash,
    benchmark_difference_hash,
    benchmark_blur_assessment,
    benchmark_similar_groups,
);
criterion_main!(benches);
