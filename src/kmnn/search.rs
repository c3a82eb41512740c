//! KMNN query path.

use smallvec::{smallvec, SmallVec};

use super::{KMNNIndex, Neighbor};
use crate::distance::{cmp_distance, Metric, Scalar};
use crate::partitioning::ItemSet;
use crate::{Result, RetrieveError};

/// Work done by one query.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SearchStats {
    /// Clusters whose extent was entered
    pub clusters_visited: usize,
    /// Cluster scans cut short by the lower-bound test
    pub clusters_pruned: usize,
    /// Metric evaluations, including the ones against cluster means
    pub distance_computations: usize,
}

/// Largest `k` whose result list fits in an allocation.
const MAX_RESULTS: usize = isize::MAX as usize / std::mem::size_of::<Neighbor<f64>>();

/// Best-k list; stays on the stack for typical `k`.
type BestK<D> = SmallVec<[Neighbor<D>; 16]>;

#[inline]
fn cmp_neighbor<D: Scalar>(a: &Neighbor<D>, b: &Neighbor<D>) -> std::cmp::Ordering {
    cmp_distance(&a.distance, &b.distance).then_with(|| a.index.cmp(&b.index))
}

impl<X, M: Metric<X>> KMNNIndex<X, M> {
    /// Approximate `k` nearest neighbors of `query`, nearest first.
    ///
    /// Always returns exactly `k` entries; when fewer than `k` items are
    /// reachable the tail holds sentinels (see [`Neighbor::is_valid`]).
    /// `items` must be the collection the index was built over.
    ///
    /// The result list is allocated up front, so `k` is expected to be at most
    /// [`Self::num_items`]. A `k` whose result list could never be allocated is
    /// rejected with [`RetrieveError::InvalidParameter`].
    pub fn search<S>(&self, items: &S, query: &X, k: usize) -> Result<Vec<Neighbor<M::Dist>>>
    where
        S: ItemSet<X> + ?Sized,
    {
        self.search_with_stats(items, query, k).map(|(hits, _)| hits)
    }

    /// [`Self::search`], also reporting how much work the query did.
    pub fn search_with_stats<S>(
        &self,
        items: &S,
        query: &X,
        k: usize,
    ) -> Result<(Vec<Neighbor<M::Dist>>, SearchStats)>
    where
        S: ItemSet<X> + ?Sized,
    {
        self.check_items(items)?;
        let mut stats = SearchStats::default();
        if k == 0 {
            return Ok((Vec::new(), stats));
        }
        if k > MAX_RESULTS {
            return Err(RetrieveError::InvalidParameter(format!(
                "k = {k} exceeds the largest result list ({MAX_RESULTS})"
            )));
        }

        let mut best: BestK<M::Dist> = smallvec![Neighbor::sentinel(); k];
        let mut max_dist = M::Dist::INFINITY;

        let mut order: Vec<(M::Dist, usize)> = self
            .means
            .iter()
            .enumerate()
            .map(|(cluster, mean)| (self.metric.distance(query, mean), cluster))
            .collect();
        order.sort_by(|a, b| cmp_distance(&a.0, &b.0).then_with(|| a.1.cmp(&b.1)));
        stats.distance_computations += order.len();

        for (mean_dist, cluster) in order {
            let extent = self.clusters[cluster];
            if extent.is_empty() {
                continue;
            }
            stats.clusters_visited += 1;

            for entry in &self.distances[extent.range()] {
                if max_dist <= mean_dist - entry.distance {
                    stats.clusters_pruned += 1;
                    break;
                }

                let dist = self.metric.distance(query, items.get(entry.index));
                stats.distance_computations += 1;

                if dist < best[k - 1].distance {
                    best[k - 1] = Neighbor {
                        distance: dist,
                        index: entry.index,
                    };
                    best.sort_by(cmp_neighbor);
                    max_dist = best[k - 1].distance;
                }
            }
        }

        Ok((best.into_vec(), stats))
    }

    /// Look item 0 up and require it to come back first at distance zero.
    ///
    /// Catches a metric that is not zero on identical items, and pruning that
    /// loses an indexed item against its own query.
    pub fn self_check<S>(&self, items: &S) -> Result<()>
    where
        S: ItemSet<X> + ?Sized,
    {
        let k = self.num_items().min(10);
        let hits = self.search(items, items.get(0), k)?;
        let first = hits[0];
        if first.distance != M::Dist::ZERO {
            return Err(RetrieveError::SelfCheckFailed(format!(
                "first result distance is {:?}, expected zero",
                first.distance
            )));
        }
        if first.index != 0 {
            return Err(RetrieveError::SelfCheckFailed(format!(
                "first result is item {}, expected item 0",
                first.index
            )));
        }
        Ok(())
    }

    fn check_items<S>(&self, items: &S) -> Result<()>
    where
        S: ItemSet<X> + ?Sized,
    {
        if items.len() != self.num_items() {
            return Err(RetrieveError::ItemCountMismatch {
                expected: self.num_items(),
                actual: items.len(),
            });
        }
        Ok(())
    }
}
