//! Error types for kmnn.

use thiserror::Error;

/// Errors that can occur while clustering, building or querying an index.
///
/// Configuration errors are detected before any work starts, so an `Err`
/// never comes with a partially built index.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RetrieveError {
    /// No items to cluster or index.
    #[error("item collection is empty")]
    EmptyItems,

    /// Requested cluster count is zero or larger than the item count.
    #[error("invalid cluster count {k} for {n} items")]
    InvalidClusterCount { k: usize, n: usize },

    /// Cluster indices would not fit the assignment index type.
    #[error("requested k too big ({k} / {max})")]
    TooManyClusters { k: usize, max: usize },

    /// Invalid parameter value.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// The item collection passed at query time is not the one the index was built over.
    #[error("item count mismatch: index built over {expected} items, got {actual}")]
    ItemCountMismatch { expected: usize, actual: usize },

    /// Looking an indexed item up did not return the item itself.
    #[error("self check failed: {0}")]
    SelfCheckFailed(String),
}

pub type Result<T> = std::result::Result<T, RetrieveError>;
