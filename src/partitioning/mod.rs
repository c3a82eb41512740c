//! Partitioning primitives: item abstractions and parallel k-means.

pub mod item;
pub mod kmeans;

pub use item::{ItemSet, MeanItem, Subset};
pub use kmeans::{cluster, ClusterId, Clustering, KMeans, KMeansParams};
