//! KMNN: k-means nearest neighbor index.
//!
//! A two-stage partition index. Build once over a fixed item collection, then
//! answer k-nearest-neighbor queries without scanning everything.
//!
//! ## Build
//!
//! 1. Run parallel k-means with `k = min(round(s * sqrt(n)), n)` clusters, where
//!    `s` is the cluster size factor.
//! 2. Record every item's distance to its own cluster mean.
//! 3. Sort items by (cluster, distance) and store contiguous per-cluster
//!    extents into that order.
//!
//! ```text
//!   distances:  [ c0: d0 <= d1 <= d2 | c1: d3 <= d4 | c2: (empty) | c3: ... ]
//!   clusters:   c0 = 0..3, c1 = 3..5, c2 = 5..5, c3 = 5..n
//! ```
//!
//! ## Search
//!
//! Clusters are visited nearest-mean first. Within a cluster, items are scanned
//! in order of distance to the cluster mean, and the scan stops once
//! `max_dist <= d(q, mean) - d(item, mean)`, where `max_dist` is the current
//! k-th best distance.
//!
//! That test is a heuristic early exit, not a certified bound: items sorted by
//! distance to the mean are not sorted by their lower bound against the query.
//! Results are approximate. Raise the cluster size factor for finer clusters,
//! and measure recall with [`crate::benchmark`].
//!
//! ## Usage
//!
//! ```rust
//! use kmnn::distance::Euclidean;
//! use kmnn::kmnn::{IndexParams, KMNNIndex};
//! use kmnn::pool::RayonPool;
//!
//! let items: Vec<[f32; 2]> = (0..64).map(|i| [(i % 8) as f32, (i / 8) as f32]).collect();
//! let index = KMNNIndex::build(&items, Euclidean, IndexParams::default(), &[0.0; 2], &RayonPool::global())?;
//!
//! let hits = index.search(&items, &[3.1, 4.0], 3)?;
//! assert_eq!(hits.len(), 3);
//! assert!(hits[0].distance <= hits[1].distance && hits[1].distance <= hits[2].distance);
//! # Ok::<(), kmnn::RetrieveError>(())
//! ```
//!
//! ## Concurrency
//!
//! A built [`KMNNIndex`] is immutable; `search` takes `&self`, so any number of
//! threads may query it at once. The item collection is borrowed, never owned,
//! and must be the one the index was built over.

mod build;
mod search;
mod stats;

pub use build::{cluster_count, IndexParams, DEFAULT_CLUSTER_SIZE_FACTOR};
pub use search::SearchStats;
pub use stats::ClusterStats;

use serde::{Deserialize, Serialize};

use crate::distance::{Metric, Scalar};
use crate::partitioning::ClusterId;

/// Sentinel item index for unfilled result slots.
pub const INVALID_INDEX: usize = usize::MAX;

/// An item's distance to the mean of the cluster it belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct DistanceEntry<D> {
    pub distance: D,
    pub index: usize,
}

/// Half-open range of one cluster's entries in the distance table.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ClusterExtent {
    pub start: usize,
    pub end: usize,
}

impl ClusterExtent {
    #[inline]
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    #[inline]
    pub fn range(&self) -> std::ops::Range<usize> {
        self.start..self.end
    }
}

/// One search result.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Neighbor<D> {
    pub distance: D,
    pub index: usize,
}

impl<D: Scalar> Neighbor<D> {
    /// Placeholder for a slot no item has filled yet.
    pub fn sentinel() -> Self {
        Self {
            distance: D::INFINITY,
            index: INVALID_INDEX,
        }
    }

    /// `false` for sentinel slots (fewer than `k` items reachable).
    pub fn is_valid(&self) -> bool {
        self.index != INVALID_INDEX
    }
}

/// Clustering-based approximate nearest neighbor index.
#[derive(Clone, Debug)]
pub struct KMNNIndex<X, M: Metric<X>> {
    metric: M,
    params: IndexParams,
    means: Vec<X>,
    assignments: Vec<ClusterId>,
    distances: Vec<DistanceEntry<M::Dist>>,
    clusters: Vec<ClusterExtent>,
}

impl<X, M: Metric<X>> KMNNIndex<X, M> {
    /// Whether this index was built with a metric equal to `other`.
    ///
    /// Cluster layout depends on the metric, so an index built with a
    /// different one is stale.
    pub fn is_valid(&self, other: &M) -> bool
    where
        M: PartialEq,
    {
        self.metric == *other
    }

    pub fn metric(&self) -> &M {
        &self.metric
    }

    pub fn params(&self) -> &IndexParams {
        &self.params
    }

    /// Cluster means, indexed by cluster id.
    pub fn means(&self) -> &[X] {
        &self.means
    }

    /// Per-cluster extents into [`Self::distances`].
    pub fn clusters(&self) -> &[ClusterExtent] {
        &self.clusters
    }

    /// Distance-to-mean table, grouped by cluster, ascending within each cluster.
    pub fn distances(&self) -> &[DistanceEntry<M::Dist>] {
        &self.distances
    }

    /// Entries of one cluster, nearest to its mean first.
    pub fn cluster_entries(&self, cluster: usize) -> &[DistanceEntry<M::Dist>] {
        &self.distances[self.clusters[cluster].range()]
    }

    /// Cluster the item at `index` belongs to.
    pub fn assignment(&self, index: usize) -> ClusterId {
        self.assignments[index]
    }

    pub fn assignments(&self) -> &[ClusterId] {
        &self.assignments
    }

    pub fn num_items(&self) -> usize {
        self.distances.len()
    }

    pub fn num_clusters(&self) -> usize {
        self.clusters.len()
    }
}
