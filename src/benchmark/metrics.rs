//! Evaluation metrics for ANN quality.
//!
//! - Recall@k: fraction of true neighbors found
//! - Exact k-NN by brute force, the reference recall is measured against

use std::collections::HashSet;

use crate::distance::{cmp_distance, Metric};
use crate::kmnn::Neighbor;
use crate::partitioning::ItemSet;

/// Compute recall@k: fraction of true k-nearest neighbors that were retrieved.
///
/// recall@k = |retrieved ∩ ground_truth| / k
///
/// # Arguments
///
/// * `ground_truth` - True k-nearest neighbor indices
/// * `retrieved` - Retrieved neighbor indices (may be more or fewer than k)
/// * `k` - Number of neighbors we're evaluating
///
/// # Returns
///
/// Recall value in [0.0, 1.0]
pub fn recall_at_k(ground_truth: &[usize], retrieved: &[usize], k: usize) -> f32 {
    if k == 0 || ground_truth.is_empty() {
        return 0.0;
    }

    let gt_set: HashSet<usize> = ground_truth.iter().take(k).copied().collect();
    let retrieved_set: HashSet<usize> = retrieved.iter().take(k).copied().collect();

    let intersection = gt_set.intersection(&retrieved_set).count();
    intersection as f32 / k as f32
}

/// Compute mean recall across multiple queries.
pub fn mean_recall(ground_truths: &[Vec<usize>], retrievals: &[Vec<usize>], k: usize) -> f32 {
    if ground_truths.is_empty() {
        return 0.0;
    }

    let total: f32 = ground_truths
        .iter()
        .zip(retrievals.iter())
        .map(|(gt, ret)| recall_at_k(gt, ret, k))
        .sum();

    total / ground_truths.len() as f32
}

/// Exact k nearest neighbors by scanning every item, nearest first.
///
/// Ties are broken by item index, matching the index's result order.
pub fn brute_force_knn<X, S, M>(items: &S, metric: &M, query: &X, k: usize) -> Vec<Neighbor<M::Dist>>
where
    S: ItemSet<X> + ?Sized,
    M: Metric<X>,
{
    let mut all: Vec<Neighbor<M::Dist>> = (0..items.len())
        .map(|index| Neighbor {
            distance: metric.distance(query, items.get(index)),
            index,
        })
        .collect();
    all.sort_by(|a, b| cmp_distance(&a.distance, &b.distance).then_with(|| a.index.cmp(&b.index)));
    all.truncate(k);
    all
}

/// Item indices of a result list, skipping unfilled slots.
pub fn result_indices<D: crate::distance::Scalar>(hits: &[Neighbor<D>]) -> Vec<usize> {
    hits.iter().filter(|h| h.is_valid()).map(|h| h.index).collect()
}
