//! kmnn: clustering-based approximate nearest neighbor search.
//!
//! Partition items with parallel Lloyd's k-means, keep each cluster's items
//! sorted by distance to the cluster mean, then answer k-NN queries by
//! visiting clusters nearest-mean first and cutting scans short.
//!
//! - `partitioning/`: item abstractions and the k-means driver
//! - `kmnn/`: the index (build, search, statistics)
//! - `distance`: metrics, including the weighted dead-zone metric
//! - `pool`: the worker pool k-means runs its jobs on
//! - `benchmark/`: recall measurement and synthetic data
//!
//! # Critical Nuances
//!
//! ## Results Are Approximate
//!
//! The in-cluster early exit compares against `d(q, mean) - d(item, mean)`
//! for the item currently being scanned. Items further along the scan can have
//! smaller lower bounds, so a true neighbor can be skipped. Recall is high on
//! data with real cluster structure and degrades on uniform data.
//!
//! ## The Item Collection Is Borrowed
//!
//! The index stores indices, means and distances, never items. Every search
//! takes the collection again and rejects one of the wrong length, but it
//! cannot tell two collections of equal length apart.
//!
//! ## Determinism
//!
//! A fixed seed gives identical clusterings regardless of worker pool or
//! thread count: every job writes a disjoint slice and reductions run in
//! a fixed order.

pub mod benchmark;
pub mod distance;
pub mod error;
pub mod kmnn;
pub mod partitioning;
pub mod pool;

// Re-exports
pub use distance::{Euclidean, Metric, Scalar, WeightedEuclidean};
pub use error::{Result, RetrieveError};
pub use kmnn::{ClusterStats, IndexParams, KMNNIndex, Neighbor, SearchStats};
pub use partitioning::{ItemSet, KMeans, KMeansParams, MeanItem, Subset};
pub use pool::{RayonPool, SequentialPool, WorkerPool};
