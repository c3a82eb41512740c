//! Benchmarks for KMNN index construction.
//!
//! Build time is dominated by k-means, so this measures how it scales with
//! item count, cluster size factor and the worker pool.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use kmnn::benchmark::{gaussian_blobs, random_centers};
use kmnn::distance::Euclidean;
use kmnn::kmnn::{IndexParams, KMNNIndex};
use kmnn::pool::{RayonPool, SequentialPool};

const DIM: usize = 16;

fn clustered_vectors(n: usize, seed: u64) -> Vec<Vec<f32>> {
    let centers = random_centers(32, DIM, 100.0, seed);
    gaussian_blobs(&centers, n / 32, 4.0, seed + 1).points
}

fn bench_build_scaling(c: &mut Criterion) {
    let mut group = c.benchmark_group("build_scaling");
    group.sample_size(10);
    let zero = vec![0.0; DIM];

    for n in [1_024, 4_096, 16_384] {
        let items = clustered_vectors(n, 42);
        group.throughput(Throughput::Elements(n as u64));
        group.bench_with_input(BenchmarkId::new("rayon", n), &items, |b, items| {
            let pool = RayonPool::global();
            b.iter(|| {
                KMNNIndex::build(items, Euclidean, IndexParams::default(), &zero, &pool)
                    .expect("build failed")
            })
        });
        group.bench_with_input(BenchmarkId::new("sequential", n), &items, |b, items| {
            b.iter(|| {
                KMNNIndex::build(items, Euclidean, IndexParams::default(), &zero, &SequentialPool)
                    .expect("build failed")
            })
        });
    }
    group.finish();
}

fn bench_cluster_size_factor(c: &mut Criterion) {
    let mut group = c.benchmark_group("build_factor");
    group.sample_size(10);
    let items = clustered_vectors(4_096, 7);
    let zero = vec![0.0; DIM];
    let pool = RayonPool::global();

    for factor in [0.5, 1.0, 2.0, 4.0] {
        let params = IndexParams::default().with_cluster_size_factor(factor);
        group.bench_with_input(
            BenchmarkId::new("factor", factor),
            &params,
            |b, params| {
                b.iter(|| {
                    let index = KMNNIndex::build(&items, Euclidean, params.clone(), &zero, &pool)
                        .expect("build failed");
                    black_box(index.num_clusters())
                })
            },
        );
    }
    group.finish();
}

criterion_group!(benches, bench_build_scaling, bench_cluster_size_factor);
criterion_main!(benches);
