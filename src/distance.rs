//! Distance types and metrics.
//!
//! A [`Metric`] exposes a true distance `distance(a, b)`, used at query time, and
//! `distance_sqr(a, b)`, used while clustering. The squared form defaults to
//! `distance(a, b)^2` so clustering and querying always agree up to a monotonic
//! transform. Metrics with a cheaper exact square (plain L2) override it.
//!
//! ## Important nuance
//!
//! Query-time pruning in [`crate::kmnn`] subtracts distances, which is only a
//! lower bound when the metric satisfies the triangle inequality.
//! [`WeightedEuclidean`] in hybrid mode does not, so expect lower recall there.

use std::cmp::Ordering;
use std::fmt::Debug;
use std::ops::{Add, AddAssign, Div, Mul, Sub};

use serde::{Deserialize, Serialize};

use crate::{Result, RetrieveError};

/// Numeric type produced by a [`Metric`].
pub trait Scalar:
    Copy
    + Debug
    + PartialOrd
    + Send
    + Sync
    + Add<Output = Self>
    + Sub<Output = Self>
    + Mul<Output = Self>
    + Div<Output = Self>
    + AddAssign
{
    const ZERO: Self;
    const INFINITY: Self;

    fn abs(self) -> Self;

    fn from_f64(v: f64) -> Self;
}

macro_rules! impl_scalar {
    ($t:ty) => {
        impl Scalar for $t {
            const ZERO: Self = 0.0;
            const INFINITY: Self = <$t>::INFINITY;

            #[inline]
            fn abs(self) -> Self {
                <$t>::abs(self)
            }

            #[inline]
            fn from_f64(v: f64) -> Self {
                v as $t
            }
        }
    };
}

impl_scalar!(f32);
impl_scalar!(f64);

/// Total order over distances. NaN sorts after every number.
#[inline]
pub fn cmp_distance<D: Scalar>(a: &D, b: &D) -> Ordering {
    match a.partial_cmp(b) {
        Some(ord) => ord,
        None => is_nan(a).cmp(&is_nan(b)),
    }
}

#[allow(clippy::eq_op)]
#[inline]
fn is_nan<D: Scalar>(d: &D) -> bool {
    d != d
}

/// Distance function over items of type `X`.
pub trait Metric<X: ?Sized>: Sync {
    type Dist: Scalar;

    /// True distance between two items.
    fn distance(&self, a: &X, b: &X) -> Self::Dist;

    /// Squared distance, used as the k-means objective.
    #[inline]
    fn distance_sqr(&self, a: &X, b: &X) -> Self::Dist {
        let d = self.distance(a, b);
        d * d
    }
}

/// L2 (Euclidean) distance.
#[inline]
#[must_use]
pub fn l2_distance(a: &[f32], b: &[f32]) -> f32 {
    l2_distance_squared(a, b).sqrt()
}

/// L2 distance squared (faster when only comparing distances).
///
/// If dimensions mismatch, this returns `f32::INFINITY` (so it is never selected as a
/// nearest neighbor).
#[inline]
#[must_use]
pub fn l2_distance_squared(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return f32::INFINITY;
    }
    a.iter().zip(b.iter()).map(|(x, y)| (x - y).powi(2)).sum()
}

/// Plain Euclidean metric over anything that views as `[f32]`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Euclidean;

impl<X: AsRef<[f32]> + ?Sized> Metric<X> for Euclidean {
    type Dist = f32;

    #[inline]
    fn distance(&self, a: &X, b: &X) -> f32 {
        l2_distance(a.as_ref(), b.as_ref())
    }

    #[inline]
    fn distance_sqr(&self, a: &X, b: &X) -> f32 {
        l2_distance_squared(a.as_ref(), b.as_ref())
    }
}

/// Per-dimension weighted Euclidean distance with a dead zone.
///
/// Each dimension contributes `max(|a_i - b_i| - min_i, 0) * scale_i`, so
/// differences below `min_i` are ignored. With `hybrid` set the result is
/// `min(d^2, d)`, which flattens small distances and keeps large ones linear.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeightedEuclidean {
    scale: Vec<f32>,
    min: Vec<f32>,
    hybrid: bool,
}

impl WeightedEuclidean {
    /// Create a weighted metric. `scale` and `min` must have equal length.
    pub fn new(scale: Vec<f32>, min: Vec<f32>) -> Result<Self> {
        if scale.len() != min.len() {
            return Err(RetrieveError::InvalidParameter(format!(
                "scale has {} dimensions, min has {}",
                scale.len(),
                min.len()
            )));
        }
        if scale.iter().chain(min.iter()).any(|v| !v.is_finite()) {
            return Err(RetrieveError::InvalidParameter(
                "scale and min must be finite".to_string(),
            ));
        }
        Ok(Self {
            scale,
            min,
            hybrid: false,
        })
    }

    /// Unit scales and no dead zone: equivalent to [`Euclidean`].
    pub fn uniform(dimension: usize) -> Self {
        Self {
            scale: vec![1.0; dimension],
            min: vec![0.0; dimension],
            hybrid: false,
        }
    }

    #[must_use]
    pub fn with_hybrid(mut self, hybrid: bool) -> Self {
        self.hybrid = hybrid;
        self
    }

    pub fn scale(&self) -> &[f32] {
        &self.scale
    }

    pub fn min(&self) -> &[f32] {
        &self.min
    }

    pub fn dimension(&self) -> usize {
        self.scale.len()
    }

    pub fn is_hybrid(&self) -> bool {
        self.hybrid
    }

    fn scaled_sqr(&self, a: &[f32], b: &[f32]) -> f32 {
        if a.len() != self.scale.len() || b.len() != self.scale.len() {
            return f32::INFINITY;
        }
        a.iter()
            .zip(b)
            .zip(self.min.iter().zip(&self.scale))
            .map(|((x, y), (m, s))| {
                let d = ((x - y).abs() - m).max(0.0) * s;
                d * d
            })
            .sum()
    }
}

impl<X: AsRef<[f32]> + ?Sized> Metric<X> for WeightedEuclidean {
    type Dist = f32;

    fn distance(&self, a: &X, b: &X) -> f32 {
        let dist_sqr = self.scaled_sqr(a.as_ref(), b.as_ref());
        let dist = dist_sqr.sqrt();
        if self.hybrid {
            dist_sqr.min(dist)
        } else {
            dist
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn euclidean_matches_pythagoras() {
        let a = [0.0f32, 0.0];
        let b = [3.0f32, 4.0];
        assert_eq!(Euclidean.distance(&a, &b), 5.0);
        assert_eq!(Euclidean.distance_sqr(&a, &b), 25.0);
    }

    #[test]
    fn dimension_mismatch_is_infinite() {
        let a = vec![1.0f32, 2.0];
        let b = vec![1.0f32];
        assert_eq!(Euclidean.distance(&a, &b), f32::INFINITY);
    }

    #[test]
    fn weighted_dead_zone_ignores_small_differences() {
        let m = WeightedEuclidean::new(vec![1.0, 2.0], vec![0.5, 0.0]).unwrap();
        let a = [0.0f32, 0.0];
        let b = [0.4f32, 1.0];
        // first dimension falls inside the dead zone, second is doubled
        assert!((m.distance(&a, &b) - 2.0).abs() < 1e-6);
    }

    #[test]
    fn weighted_uniform_equals_euclidean() {
        let m = WeightedEuclidean::uniform(3);
        let a = [1.0f32, -2.0, 0.5];
        let b = [0.0f32, 2.0, 1.5];
        assert!((m.distance(&a, &b) - Euclidean.distance(&a, &b)).abs() < 1e-6);
    }

    #[test]
    fn hybrid_flattens_small_distances() {
        let m = WeightedEuclidean::uniform(1).with_hybrid(true);
        let d = m.distance(&[0.0f32], &[0.5f32]);
        assert!((d - 0.25).abs() < 1e-6);
        let d = m.distance(&[0.0f32], &[4.0f32]);
        assert!((d - 4.0).abs() < 1e-6);
    }

    #[test]
    fn weighted_rejects_mismatched_vectors() {
        assert!(WeightedEuclidean::new(vec![1.0], vec![0.0, 0.0]).is_err());
        assert!(WeightedEuclidean::new(vec![f32::NAN], vec![0.0]).is_err());
    }

    #[test]
    fn nan_sorts_last() {
        let mut d = vec![f32::NAN, 2.0, f32::INFINITY, 1.0];
        d.sort_by(cmp_distance);
        assert_eq!(&d[..3], &[1.0, 2.0, f32::INFINITY]);
        assert!(d[3].is_nan());
    }

    #[test]
    fn equality_tracks_configuration() {
        let a = WeightedEuclidean::uniform(2);
        let b = WeightedEuclidean::uniform(2).with_hybrid(true);
        assert_ne!(a, b);
        assert_eq!(a, WeightedEuclidean::uniform(2));
    }
}
