//! Worker pools for data-parallel job batches.
//!
//! k-means submits one batch of independent jobs per step and blocks until the
//! whole batch is done. Every job owns disjoint `&mut` slices of the output
//! buffers (handed out with `chunks_mut`), so jobs never share mutable state and
//! results do not depend on scheduling order.
//!
//! ```rust
//! use kmnn::pool::{Job, SequentialPool, WorkerPool};
//!
//! let mut out = vec![0u32; 4];
//! let jobs: Vec<Job<'_>> = out
//!     .chunks_mut(2)
//!     .enumerate()
//!     .map(|(i, chunk)| Box::new(move || chunk.fill(i as u32)) as Job<'_>)
//!     .collect();
//! SequentialPool.run_jobs(jobs);
//! assert_eq!(out, vec![0, 0, 1, 1]);
//! ```

use crate::{Result, RetrieveError};

/// A self-contained unit of work. It may borrow from the submitting stack frame.
pub type Job<'a> = Box<dyn FnOnce() + Send + 'a>;

/// Executes batches of independent jobs.
pub trait WorkerPool: Sync {
    /// Run every job in `jobs` and return once all of them have completed.
    ///
    /// A panicking job propagates its panic to the caller after the batch joins.
    fn run_jobs<'a>(&self, jobs: Vec<Job<'a>>);

    /// Number of jobs that may run at the same time.
    fn parallelism(&self) -> usize {
        1
    }
}

impl<P: WorkerPool + ?Sized> WorkerPool for &P {
    fn run_jobs<'a>(&self, jobs: Vec<Job<'a>>) {
        (**self).run_jobs(jobs)
    }

    fn parallelism(&self) -> usize {
        (**self).parallelism()
    }
}

/// Runs jobs inline on the calling thread, in submission order.
#[derive(Debug, Clone, Copy, Default)]
pub struct SequentialPool;

impl WorkerPool for SequentialPool {
    fn run_jobs<'a>(&self, jobs: Vec<Job<'a>>) {
        for job in jobs {
            job();
        }
    }
}

/// Rayon-backed pool: either the global rayon pool or a dedicated one.
#[derive(Debug, Default)]
pub struct RayonPool {
    pool: Option<rayon::ThreadPool>,
}

impl RayonPool {
    /// Use rayon's global thread pool.
    pub fn global() -> Self {
        Self { pool: None }
    }

    /// Build a dedicated pool with `num_threads` workers.
    pub fn with_threads(num_threads: usize) -> Result<Self> {
        if num_threads == 0 {
            return Err(RetrieveError::InvalidParameter(
                "worker pool needs at least one thread".to_string(),
            ));
        }
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(num_threads)
            .thread_name(|i| format!("kmnn-worker-{i}"))
            .build()
            .map_err(|e| RetrieveError::InvalidParameter(format!("thread pool: {e}")))?;
        Ok(Self { pool: Some(pool) })
    }
}

impl WorkerPool for RayonPool {
    fn run_jobs<'a>(&self, jobs: Vec<Job<'a>>) {
        let spawn_all = |scope: &rayon::Scope<'a>| {
            for job in jobs {
                scope.spawn(move |_| job());
            }
        };
        match &self.pool {
            Some(pool) => pool.scope(spawn_all),
            None => rayon::scope(spawn_all),
        }
    }

    fn parallelism(&self) -> usize {
        match &self.pool {
            Some(pool) => pool.current_num_threads(),
            None => rayon::current_num_threads(),
        }
    }
}
