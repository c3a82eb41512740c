//! Evaluation utilities for ANN quality.
//!
//! KMNN results are approximate, so recall has to be measured rather than
//! assumed. This module provides:
//!
//! - **Accuracy**: recall@k against brute-force ground truth
//! - **Data**: seeded Gaussian blobs, the structure KMNN is built for

pub mod datasets;
pub mod metrics;

pub use datasets::{gaussian_blobs, random_centers, Blobs};
pub use metrics::{brute_force_knn, mean_recall, recall_at_k, result_indices};
