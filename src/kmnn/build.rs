//! KMNN index construction.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{ClusterExtent, DistanceEntry, KMNNIndex};
use crate::distance::{cmp_distance, Metric, Scalar};
use crate::partitioning::kmeans::{DEFAULT_MAX_ITERATIONS, DEFAULT_SEED};
use crate::partitioning::{ClusterId, ItemSet, KMeans, KMeansParams, MeanItem};
use crate::pool::WorkerPool;
use crate::{Result, RetrieveError};

/// Cluster size factor used when none is configured.
pub const DEFAULT_CLUSTER_SIZE_FACTOR: f64 = 2.0;

/// Index construction parameters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct IndexParams {
    /// Scales the cluster count: `k = min(round(factor * sqrt(n)), n)`.
    /// Larger values give more, smaller clusters.
    pub cluster_size_factor: f64,

    /// Upper bound on k-means iterations
    pub max_iterations: usize,

    /// Seed for the k-means initialization
    pub seed: u64,

    /// Independent k-means runs; the lowest distortion wins
    pub restarts: usize,
}

impl Default for IndexParams {
    fn default() -> Self {
        Self {
            cluster_size_factor: DEFAULT_CLUSTER_SIZE_FACTOR,
            max_iterations: DEFAULT_MAX_ITERATIONS,
            seed: DEFAULT_SEED,
            restarts: 1,
        }
    }
}

impl IndexParams {
    #[must_use]
    pub fn with_cluster_size_factor(mut self, factor: f64) -> Self {
        self.cluster_size_factor = factor;
        self
    }

    #[must_use]
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    #[must_use]
    pub fn with_restarts(mut self, restarts: usize) -> Self {
        self.restarts = restarts;
        self
    }
}

/// Number of clusters for `n` items: `min(round(factor * sqrt(n)), n)`.
pub fn cluster_count(n: usize, cluster_size_factor: f64) -> usize {
    let k = (cluster_size_factor * (n as f64).sqrt()).round();
    (k as usize).min(n)
}

/// Composite sort key: cluster ascending, then distance to the mean ascending.
struct BuildEntry<D> {
    cluster: ClusterId,
    distance: D,
    index: usize,
}

impl<D: Scalar> BuildEntry<D> {
    fn cmp_by_cluster_then_distance(&self, other: &Self) -> Ordering {
        self.cluster
            .cmp(&other.cluster)
            .then_with(|| cmp_distance(&self.distance, &other.distance))
            .then_with(|| self.index.cmp(&other.index))
    }
}

impl<X, M> KMNNIndex<X, M>
where
    X: MeanItem,
    M: Metric<X>,
{
    /// Cluster `items` and build the search structures.
    ///
    /// `zero` is the additive identity of `X`. The index keeps no reference to
    /// `items`; pass the same collection to every search.
    pub fn build<S, P>(items: &S, metric: M, params: IndexParams, zero: &X, pool: &P) -> Result<Self>
    where
        S: ItemSet<X> + ?Sized,
        P: WorkerPool + ?Sized,
    {
        let n = items.len();
        if n == 0 {
            return Err(RetrieveError::EmptyItems);
        }
        if !params.cluster_size_factor.is_finite() || params.cluster_size_factor <= 0.0 {
            return Err(RetrieveError::InvalidParameter(format!(
                "cluster_size_factor must be finite and positive, got {}",
                params.cluster_size_factor
            )));
        }
        let k = cluster_count(n, params.cluster_size_factor);
        if k == 0 {
            return Err(RetrieveError::InvalidClusterCount { k, n });
        }

        let kmeans = KMeans::new(
            KMeansParams::new(k)
                .with_max_iterations(params.max_iterations)
                .with_seed(params.seed)
                .with_restarts(params.restarts),
        )?;
        let clustering = kmeans.fit(items, &metric, zero, pool)?;
        let means = clustering.means;
        let assignments = clustering.assignments;

        let mut entries: Vec<BuildEntry<M::Dist>> = assignments
            .iter()
            .enumerate()
            .map(|(index, &cluster)| BuildEntry {
                cluster,
                distance: metric.distance(&means[cluster as usize], items.get(index)),
                index,
            })
            .collect();
        entries.sort_by(BuildEntry::cmp_by_cluster_then_distance);

        let clusters = cluster_extents(&entries, k);
        let distances = entries
            .into_iter()
            .map(|e| DistanceEntry {
                distance: e.distance,
                index: e.index,
            })
            .collect();

        let index = Self {
            metric,
            params,
            means,
            assignments,
            distances,
            clusters,
        };

        let stats = index.cluster_stats();
        debug!(
            items = n,
            clusters = stats.num_clusters,
            empty = stats.empty_clusters,
            mean_size = stats.mean_size,
            std_size = stats.std_size,
            min_size = stats.min_size,
            max_size = stats.max_size,
            "kmnn index built"
        );

        Ok(index)
    }
}

/// One extent per cluster over entries sorted by cluster.
///
/// A cluster without members gets an empty extent at the start of the next
/// populated cluster.
fn cluster_extents<D>(entries: &[BuildEntry<D>], k: usize) -> Vec<ClusterExtent> {
    let mut clusters = Vec::with_capacity(k);
    let mut cursor = 0;
    for cluster in 0..k {
        let start = cursor;
        while cursor < entries.len() && entries[cursor].cluster as usize == cluster {
            cursor += 1;
        }
        clusters.push(ClusterExtent { start, end: cursor });
    }
    debug_assert_eq!(cursor, entries.len(), "extents must cover every entry");
    clusters
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::distance::Euclidean;
    use crate::pool::SequentialPool;

    fn entry(cluster: ClusterId, distance: f32, index: usize) -> BuildEntry<f32> {
        BuildEntry {
            cluster,
            distance,
            index,
        }
    }

    #[test]
    fn cluster_count_follows_sqrt_rule() {
        assert_eq!(cluster_count(100, 0.4), 4);
        assert_eq!(cluster_count(100, 2.0), 20);
        assert_eq!(cluster_count(10, 100.0), 10);
        assert_eq!(cluster_count(16, 0.25), 1);
        assert_eq!(cluster_count(16, 0.1), 0);
    }

    #[test]
    fn entries_sort_by_cluster_then_distance() {
        let mut entries = vec![
            entry(1, 0.5, 0),
            entry(0, 2.0, 1),
            entry(1, 0.1, 2),
            entry(0, 1.0, 3),
        ];
        entries.sort_by(BuildEntry::cmp_by_cluster_then_distance);
        let order: Vec<usize> = entries.iter().map(|e| e.index).collect();
        assert_eq!(order, vec![3, 1, 2, 0]);
    }

    #[test]
    fn empty_clusters_get_zero_length_extents() {
        let entries = vec![entry(0, 0.0, 0), entry(0, 1.0, 1), entry(2, 0.0, 2), entry(4, 0.0, 3)];
        let extents = cluster_extents(&entries, 5);
        assert_eq!(
            extents,
            vec![
                ClusterExtent { start: 0, end: 2 },
                ClusterExtent { start: 2, end: 2 },
                ClusterExtent { start: 2, end: 3 },
                ClusterExtent { start: 3, end: 3 },
                ClusterExtent { start: 3, end: 4 },
            ]
        );
    }

    #[test]
    fn build_rejects_bad_factor() {
        let items = vec![[0.0f32], [1.0]];
        for factor in [0.0, -1.0, f64::NAN, f64::INFINITY] {
            let params = IndexParams::default().with_cluster_size_factor(factor);
            assert!(KMNNIndex::build(&items, Euclidean, params, &[0.0], &SequentialPool).is_err());
        }
    }

    #[test]
    fn build_rejects_rounding_to_zero_clusters() {
        let items: Vec<[f32; 1]> = (0..4).map(|i| [i as f32]).collect();
        let params = IndexParams::default().with_cluster_size_factor(0.1);
        assert_eq!(
            KMNNIndex::build(&items, Euclidean, params, &[0.0], &SequentialPool).unwrap_err(),
            RetrieveError::InvalidClusterCount { k: 0, n: 4 }
        );
    }

    #[test]
    fn build_rejects_empty_items() {
        let items: Vec<[f32; 1]> = Vec::new();
        assert_eq!(
            KMNNIndex::build(&items, Euclidean, IndexParams::default(), &[0.0], &SequentialPool)
                .unwrap_err(),
            RetrieveError::EmptyItems
        );
    }
}
