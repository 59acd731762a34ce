//! Benchmarks for similarity queries through the engine.

use std::sync::Arc;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use rand::prelude::*;
use simcf::dataset::{Dataset, DatasetConfig, MemoryDataset};
use simcf::{RatingVector, SimilarityConfig, SimilarityEngine};

/// Random 1–5 star matrix with roughly `density` of cells filled.
fn random_dataset(users: u32, items: u32, density: f64) -> MemoryDataset {
    let mut rng = StdRng::seed_from_u64(42);
    let mut data = MemoryDataset::new(DatasetConfig::new(1.0, 5.0));
    for user in 0..users {
        for item in 0..items {
            if rng.random_bool(density) {
                data.insert(user, item, f64::from(rng.random_range(1u32..=5)));
            }
        }
    }
    data
}

fn bench_measures(c: &mut Criterion) {
    let mut group = c.benchmark_group("similarity");

    let data = Arc::new(random_dataset(200, 500, 0.1));
    let pairs: Vec<(Arc<RatingVector>, Arc<RatingVector>)> = (0..20u32)
        .filter_map(|u| Some((data.user_rating(u)?, data.user_rating(u + 100)?)))
        .collect();

    for name in ["cosine", "pearson", "msd", "jaccard", "nhsm", "pip", "smtp", "src"] {
        let engine = SimilarityEngine::new(SimilarityConfig::with_measure(name));
        engine.setup(data.clone()).unwrap();

        group.bench_with_input(BenchmarkId::new("uncached", name), &name, |bench, _| {
            bench.iter(|| {
                pairs
                    .iter()
                    .map(|(a, b)| engine.similarity(black_box(a), black_box(b), None, None, &[]))
                    .sum::<f64>()
            })
        });
    }

    group.finish();
}

fn bench_column_measures(c: &mut Criterion) {
    let mut group = c.benchmark_group("column_measures");
    group.sample_size(20);

    let data = Arc::new(random_dataset(100, 200, 0.1));
    let a = data.user_rating(1).unwrap_or_default();
    let b = data.user_rating(2).unwrap_or_default();

    for cached in [false, true] {
        let label = if cached { "cached" } else { "uncached" };
        let config = SimilarityConfig::with_measure("bcf").support_cache(cached);
        let engine = SimilarityEngine::new(config);
        engine.setup(data.clone()).unwrap();

        group.bench_with_input(BenchmarkId::new("bcf", label), &cached, |bench, _| {
            bench.iter(|| engine.similarity(black_box(&a), black_box(&b), None, None, &[]))
        });
    }

    group.finish();
}

criterion_group!(benches, bench_measures, bench_column_measures);
criterion_main!(benches);
