//! Cluster size statistics for a built index.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::KMNNIndex;
use crate::distance::Metric;

/// Summary of how evenly items spread over clusters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ClusterStats {
    pub num_clusters: usize,
    pub num_items: usize,
    pub empty_clusters: usize,
    pub min_size: usize,
    pub max_size: usize,
    pub mean_size: f64,
    /// Population standard deviation of cluster sizes
    pub std_size: f64,
    /// All cluster sizes, ascending
    pub sizes: Vec<usize>,
}

impl ClusterStats {
    pub fn from_sizes(mut sizes: Vec<usize>) -> Self {
        sizes.sort_unstable();
        let num_clusters = sizes.len();
        let num_items = sizes.iter().sum();
        if num_clusters == 0 {
            return Self {
                num_clusters,
                num_items,
                empty_clusters: 0,
                min_size: 0,
                max_size: 0,
                mean_size: 0.0,
                std_size: 0.0,
                sizes,
            };
        }

        let mean = num_items as f64 / num_clusters as f64;
        let variance = sizes
            .iter()
            .map(|&s| (s as f64 - mean).powi(2))
            .sum::<f64>()
            / num_clusters as f64;

        Self {
            num_clusters,
            num_items,
            empty_clusters: sizes.iter().take_while(|&&s| s == 0).count(),
            min_size: sizes[0],
            max_size: sizes[num_clusters - 1],
            mean_size: mean,
            std_size: variance.sqrt(),
            sizes,
        }
    }
}

impl fmt::Display for ClusterStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} items in {} clusters ({} empty): size mean={:.2} std={:.2} min={} max={}",
            self.num_items,
            self.num_clusters,
            self.empty_clusters,
            self.mean_size,
            self.std_size,
            self.min_size,
            self.max_size
        )
    }
}

impl<X, M: Metric<X>> KMNNIndex<X, M> {
    pub fn cluster_stats(&self) -> ClusterStats {
        ClusterStats::from_sizes(self.clusters.iter().map(|c| c.len()).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summarizes_sizes() {
        let stats = ClusterStats::from_sizes(vec![4, 0, 2, 2]);
        assert_eq!(stats.sizes, vec![0, 2, 2, 4]);
        assert_eq!(stats.num_items, 8);
        assert_eq!(stats.empty_clusters, 1);
        assert_eq!(stats.min_size, 0);
        assert_eq!(stats.max_size, 4);
        assert_eq!(stats.mean_size, 2.0);
        assert!((stats.std_size - 2.0f64.sqrt()).abs() < 1e-12);
    }

    #[test]
    fn empty_summary() {
        let stats = ClusterStats::from_sizes(Vec::new());
        assert_eq!(stats.num_clusters, 0);
        assert_eq!(stats.mean_size, 0.0);
        assert!(stats.to_string().contains("0 clusters"));
    }
}
