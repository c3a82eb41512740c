//! k-means clustering implementation.
//!
//! Parallel Lloyd's algorithm over any [`MeanItem`] type and [`Metric`]. Used by
//! [`crate::kmnn::KMNNIndex`] to partition its items.
//!
//! Each iteration runs two job batches on a [`WorkerPool`]:
//!
//! 1. **Assignment**: the item range is split into `k` contiguous chunks. Each
//!    job assigns its items to the nearest mean (lowest cluster index wins ties)
//!    and reports a partial distortion.
//! 2. **Mean update**: the cluster range is split into jobs. Each job rescans
//!    all items and averages the members of its own clusters.
//!
//! Both batches are joined before the next step reads their output.

use std::time::Instant;

use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, trace};

use super::item::{ItemSet, MeanItem};
use crate::distance::{Metric, Scalar};
use crate::pool::{Job, WorkerPool};
use crate::{Result, RetrieveError};

/// Cluster index stored per item.
pub type ClusterId = u32;

/// Iteration ceiling used when none is configured.
pub const DEFAULT_MAX_ITERATIONS: usize = 2500;

/// Relative distortion change below which iteration stops.
pub const CONVERGENCE_EPSILON: f64 = 1e-5;

/// Seed used when none is configured.
pub const DEFAULT_SEED: u64 = 1;

/// k-means parameters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct KMeansParams {
    /// Number of clusters
    pub k: usize,

    /// Upper bound on Lloyd iterations
    pub max_iterations: usize,

    /// Convergence threshold on relative distortion change
    pub epsilon: f64,

    /// Seed for choosing the initial means
    pub seed: u64,

    /// Independent runs (seeds `seed`, `seed + 1`, ...); the lowest distortion wins
    pub restarts: usize,
}

impl KMeansParams {
    pub fn new(k: usize) -> Self {
        Self {
            k,
            max_iterations: DEFAULT_MAX_ITERATIONS,
            epsilon: CONVERGENCE_EPSILON,
            seed: DEFAULT_SEED,
            restarts: 1,
        }
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
    pub fn with_epsilon(mut self, epsilon: f64) -> Self {
        self.epsilon = epsilon;
        self
    }

    #[must_use]
    pub fn with_restarts(mut self, restarts: usize) -> Self {
        self.restarts = restarts;
        self
    }
}

/// Result of a k-means run.
#[derive(Clone, Debug, PartialEq)]
pub struct Clustering<X, D> {
    /// Cluster of each item, indexed like the input items
    pub assignments: Vec<ClusterId>,

    /// One mean per cluster; empty clusters keep the zero element
    pub means: Vec<X>,

    /// Total distortion (sum of squared distances to the assigned mean) per iteration
    pub distortions: Vec<D>,

    /// Iterations executed
    pub iterations: usize,

    /// `false` when `max_iterations` ran out first
    pub converged: bool,

    /// Seed of the run that produced this result
    pub seed: u64,
}

impl<X, D: Scalar> Clustering<X, D> {
    pub fn num_clusters(&self) -> usize {
        self.means.len()
    }

    /// Number of items assigned to each cluster.
    pub fn cluster_sizes(&self) -> Vec<usize> {
        let mut sizes = vec![0usize; self.means.len()];
        for &a in &self.assignments {
            sizes[a as usize] += 1;
        }
        sizes
    }

    /// Distortion of the last iteration.
    pub fn final_distortion(&self) -> D {
        self.distortions.last().copied().unwrap_or(D::INFINITY)
    }
}

/// Parallel Lloyd's k-means.
#[derive(Clone, Debug)]
pub struct KMeans {
    params: KMeansParams,
}

impl KMeans {
    /// Validate parameters that do not depend on the items.
    pub fn new(params: KMeansParams) -> Result<Self> {
        if params.k == 0 {
            return Err(RetrieveError::InvalidParameter(
                "k must be greater than 0".to_string(),
            ));
        }
        let max = ClusterId::MAX as u64;
        if (params.k as u64 - 1) > max {
            return Err(RetrieveError::TooManyClusters {
                k: params.k,
                max: max as usize,
            });
        }
        if params.max_iterations == 0 {
            return Err(RetrieveError::InvalidParameter(
                "max_iterations must be greater than 0".to_string(),
            ));
        }
        if !params.epsilon.is_finite() || params.epsilon < 0.0 {
            return Err(RetrieveError::InvalidParameter(format!(
                "epsilon must be finite and non-negative, got {}",
                params.epsilon
            )));
        }
        if params.restarts == 0 {
            return Err(RetrieveError::InvalidParameter(
                "restarts must be greater than 0".to_string(),
            ));
        }
        Ok(Self { params })
    }

    pub fn params(&self) -> &KMeansParams {
        &self.params
    }

    /// Cluster `items` into `k` groups.
    ///
    /// `zero` is the additive identity of `X` (e.g. a zero vector of the right
    /// dimension). Fails before doing any work when `k > items.len()` or when an
    /// item does not match the shape of `zero`.
    ///
    /// # Panics
    ///
    /// If an empty cluster still has items assigned after a mean update. That
    /// can only come from overlapping job ranges, never from the input.
    pub fn fit<X, S, M, P>(
        &self,
        items: &S,
        metric: &M,
        zero: &X,
        pool: &P,
    ) -> Result<Clustering<X, M::Dist>>
    where
        X: MeanItem,
        S: ItemSet<X> + ?Sized,
        M: Metric<X>,
        P: WorkerPool + ?Sized,
    {
        let n = items.len();
        if n == 0 {
            return Err(RetrieveError::EmptyItems);
        }
        if self.params.k > n {
            return Err(RetrieveError::InvalidClusterCount {
                k: self.params.k,
                n,
            });
        }
        if let Some(ix) = (0..n).find(|&ix| !zero.same_shape(items.get(ix))) {
            return Err(RetrieveError::InvalidParameter(format!(
                "item {ix} does not match the shape of the zero element"
            )));
        }

        let start = Instant::now();
        let mut best: Option<Clustering<X, M::Dist>> = None;
        for restart in 0..self.params.restarts {
            let seed = self.params.seed.wrapping_add(restart as u64);
            let run = self.fit_seeded(items, metric, zero, pool, seed);
            let better = match &best {
                None => true,
                Some(b) => run.final_distortion() < b.final_distortion(),
            };
            if better {
                best = Some(run);
            }
        }
        let best = best.ok_or(RetrieveError::EmptyItems)?;

        info!(
            items = n,
            clusters = self.params.k,
            iterations = best.iterations,
            converged = best.converged,
            seed = best.seed,
            workers = pool.parallelism(),
            seconds = start.elapsed().as_secs_f64(),
            "k-means finished"
        );
        Ok(best)
    }

    fn fit_seeded<X, S, M, P>(
        &self,
        items: &S,
        metric: &M,
        zero: &X,
        pool: &P,
        seed: u64,
    ) -> Clustering<X, M::Dist>
    where
        X: MeanItem,
        S: ItemSet<X> + ?Sized,
        M: Metric<X>,
        P: WorkerPool + ?Sized,
    {
        let n = items.len();
        let k = self.params.k;
        let num_jobs = k;

        let mut rng = StdRng::seed_from_u64(seed);
        let mut means = initial_means(items, k, &mut rng);
        let mut assignments: Vec<ClusterId> = vec![0; n];
        let mut counts = vec![0usize; k];

        let epsilon = M::Dist::from_f64(self.params.epsilon);
        let mut prev_distortion = M::Dist::INFINITY;
        let mut distortions = Vec::new();
        let mut converged = false;
        let mut iter = 0;

        while iter < self.params.max_iterations {
            iter += 1;

            let cur_distortion =
                assign_clusters(items, metric, &means, &mut assignments, num_jobs, pool);
            update_means(
                items,
                &assignments,
                &mut means,
                &mut counts,
                zero,
                num_jobs,
                pool,
            );
            distortions.push(cur_distortion);

            let delta = (cur_distortion - prev_distortion).abs();
            let no_distortion =
                prev_distortion <= epsilon || delta / prev_distortion < epsilon;
            let finished = iter > 1 && no_distortion;

            debug!(
                iter,
                distortion = ?cur_distortion,
                delta = ?delta,
                finished,
                "k-means iteration"
            );

            if finished {
                converged = true;
                break;
            }
            prev_distortion = cur_distortion;
        }

        Clustering {
            assignments,
            means,
            distortions,
            iterations: iter,
            converged,
            seed,
        }
    }
}

/// Cluster `items` into `k` groups with default parameters and the given iteration cap.
pub fn cluster<X, S, M, P>(
    items: &S,
    k: usize,
    metric: &M,
    max_iterations: usize,
    zero: &X,
    pool: &P,
) -> Result<Clustering<X, M::Dist>>
where
    X: MeanItem,
    S: ItemSet<X> + ?Sized,
    M: Metric<X>,
    P: WorkerPool + ?Sized,
{
    KMeans::new(KMeansParams::new(k).with_max_iterations(max_iterations))?
        .fit(items, metric, zero, pool)
}

/// Pick `k` distinct items uniformly at random as starting means.
fn initial_means<X, S>(items: &S, k: usize, rng: &mut StdRng) -> Vec<X>
where
    X: MeanItem,
    S: ItemSet<X> + ?Sized,
{
    rand::seq::index::sample(rng, items.len(), k)
        .into_iter()
        .map(|i| items.get(i).clone())
        .collect()
}

/// Index and squared distance of the nearest mean. Strict `<` keeps the lowest index on ties.
#[inline]
fn nearest_mean<X, M: Metric<X>>(metric: &M, means: &[X], item: &X) -> (ClusterId, M::Dist) {
    let mut best = 0;
    let mut min_dist = M::Dist::INFINITY;
    for (im, mean) in means.iter().enumerate() {
        let d = metric.distance_sqr(mean, item);
        if d < min_dist {
            best = im;
            min_dist = d;
        }
    }
    (best as ClusterId, min_dist)
}

/// Assignment step. Returns the total distortion.
fn assign_clusters<X, S, M, P>(
    items: &S,
    metric: &M,
    means: &[X],
    assignments: &mut [ClusterId],
    num_jobs: usize,
    pool: &P,
) -> M::Dist
where
    X: MeanItem,
    S: ItemSet<X> + ?Sized,
    M: Metric<X>,
    P: WorkerPool + ?Sized,
{
    let items_per_job = assignments.len().div_ceil(num_jobs);
    let mut partials = vec![M::Dist::ZERO; num_jobs];

    let jobs: Vec<Job<'_>> = assignments
        .chunks_mut(items_per_job)
        .zip(partials.iter_mut())
        .enumerate()
        .map(|(job, (chunk, partial))| {
            let start = job * items_per_job;
            Box::new(move || {
                let mut distortion = M::Dist::ZERO;
                for (offset, slot) in chunk.iter_mut().enumerate() {
                    let (mean, min_dist) = nearest_mean(metric, means, items.get(start + offset));
                    distortion += min_dist;
                    *slot = mean;
                }
                trace!(
                    start,
                    end = start + chunk.len(),
                    distortion = ?distortion,
                    "k-means assignment job"
                );
                *partial = distortion;
            }) as Job<'_>
        })
        .collect();
    pool.run_jobs(jobs);

    partials
        .into_iter()
        .fold(M::Dist::ZERO, |acc, d| acc + d)
}

/// Mean update step. Each job owns a contiguous range of clusters.
fn update_means<X, S, P>(
    items: &S,
    assignments: &[ClusterId],
    means: &mut [X],
    counts: &mut [usize],
    zero: &X,
    num_jobs: usize,
    pool: &P,
) where
    X: MeanItem,
    S: ItemSet<X> + ?Sized,
    P: WorkerPool + ?Sized,
{
    let clusters_per_job = means.len().div_ceil(num_jobs);

    let jobs: Vec<Job<'_>> = means
        .chunks_mut(clusters_per_job)
        .zip(counts.chunks_mut(clusters_per_job))
        .enumerate()
        .map(|(job, (mean_chunk, count_chunk))| {
            let start = job * clusters_per_job;
            let end = start + mean_chunk.len();
            Box::new(move || {
                for (mean, count) in mean_chunk.iter_mut().zip(count_chunk.iter_mut()) {
                    mean.clone_from(zero);
                    *count = 0;
                }

                for (ix, &a) in assignments.iter().enumerate() {
                    let a = a as usize;
                    if (start..end).contains(&a) {
                        mean_chunk[a - start].accumulate(items.get(ix));
                        count_chunk[a - start] += 1;
                    }
                }

                for (offset, (mean, &count)) in
                    mean_chunk.iter_mut().zip(count_chunk.iter()).enumerate()
                {
                    if count > 0 {
                        mean.divide(count);
                    } else {
                        assert_unassigned(assignments, start + offset);
                    }
                }
            }) as Job<'_>
        })
        .collect();
    pool.run_jobs(jobs);
}

/// An empty cluster must not be claimed by any item.
fn assert_unassigned(assignments: &[ClusterId], cluster: usize) {
    if let Some(ix) = assignments.iter().position(|&a| a as usize == cluster) {
        panic!(
            "internal k-means assignment error: empty cluster {cluster} still has item {ix} assigned"
        );
    }
}
