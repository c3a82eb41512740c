//! Recall vs Latency benchmarks.
//!
//! Measures the fundamental tradeoff of the cluster size factor: finer
//! clusters prune more work per query but lose more true neighbors.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use kmnn::benchmark::{brute_force_knn, gaussian_blobs, mean_recall, random_centers, result_indices};
use kmnn::distance::Euclidean;
use kmnn::kmnn::{IndexParams, KMNNIndex};
use kmnn::pool::RayonPool;

const DIM: usize = 16;
const N: usize = 8_192;
const NUM_QUERIES: usize = 100;

fn clustered_vectors(seed: u64) -> Vec<Vec<f32>> {
    let centers = random_centers(64, DIM, 100.0, seed);
    gaussian_blobs(&centers, N / 64, 5.0, seed + 1).points
}

fn queries(items: &[Vec<f32>]) -> Vec<Vec<f32>> {
    // perturbed items, so queries follow the data distribution without hitting it exactly
    items
        .iter()
        .step_by(items.len() / NUM_QUERIES)
        .take(NUM_QUERIES)
        .map(|v| v.iter().map(|x| x + 0.5).collect())
        .collect()
}

fn bench_search_factor(c: &mut Criterion) {
    let mut group = c.benchmark_group("search_factor");
    group.sample_size(20);

    let items = clustered_vectors(42);
    let queries = queries(&items);
    let zero = vec![0.0; DIM];
    let k = 10;

    let ground_truth: Vec<Vec<usize>> = queries
        .iter()
        .map(|q| result_indices(&brute_force_knn(&items, &Euclidean, q, k)))
        .collect();

    for factor in [0.5, 1.0, 2.0, 4.0] {
        let params = IndexParams::default().with_cluster_size_factor(factor);
        let index = KMNNIndex::build(&items, Euclidean, params, &zero, &RayonPool::global())
            .expect("build failed");

        let mut retrieved = Vec::with_capacity(queries.len());
        let mut computations = 0;
        for q in &queries {
            let (hits, stats) = index.search_with_stats(&items, q, k).expect("search failed");
            retrieved.push(result_indices(&hits));
            computations += stats.distance_computations;
        }
        eprintln!(
            "factor={}: clusters={} recall@{}={:.3} distances/query={:.0}",
            factor,
            index.num_clusters(),
            k,
            mean_recall(&ground_truth, &retrieved, k),
            computations as f64 / queries.len() as f64
        );

        group.bench_with_input(BenchmarkId::new("factor", factor), &index, |b, index| {
            b.iter(|| {
                for q in &queries {
                    black_box(index.search(&items, q, k).expect("search failed"));
                }
            })
        });
    }
    group.finish();
}

fn bench_search_k(c: &mut Criterion) {
    let mut group = c.benchmark_group("search_k");
    group.sample_size(20);

    let items = clustered_vectors(7);
    let queries = queries(&items);
    let index = KMNNIndex::build(
        &items,
        Euclidean,
        IndexParams::default(),
        &vec![0.0; DIM],
        &RayonPool::global(),
    )
    .expect("build failed");

    for k in [1, 10, 50] {
        group.bench_with_input(BenchmarkId::new("k", k), &k, |b, &k| {
            b.iter(|| {
                for q in &queries {
                    black_box(index.search(&items, q, k).expect("search failed"));
                }
            })
        });
    }
    group.finish();
}

fn bench_brute_force(c: &mut Criterion) {
    let items = clustered_vectors(42);
    let queries = queries(&items);
    c.bench_function("brute_force_k10", |b| {
        b.iter(|| {
            for q in &queries {
                black_box(brute_force_knn(&items, &Euclidean, q, 10));
            }
        })
    });
}

criterion_group!(benches, bench_search_factor, bench_search_k, bench_brute_force);
criterion_main!(benches);
