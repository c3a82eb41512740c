//! Item abstractions for clustering.
//!
//! k-means only needs two things from an item type: accumulating another item
//! into a running sum and dividing that sum by a count. The zero element is
//! supplied by the caller, since its shape (e.g. vector length) is only known at
//! runtime.

use crate::{Result, RetrieveError};

/// An item whose arithmetic mean can be computed.
pub trait MeanItem: Clone + Send + Sync {
    /// `self += other`
    fn accumulate(&mut self, other: &Self);

    /// `self /= count`
    fn divide(&mut self, count: usize);

    /// Whether `other` can be accumulated into `self`. Fixed-size types always can.
    fn same_shape(&self, _other: &Self) -> bool {
        true
    }
}

macro_rules! impl_mean_item_float {
    ($t:ty) => {
        impl MeanItem for $t {
            #[inline]
            fn accumulate(&mut self, other: &Self) {
                *self += *other;
            }

            #[inline]
            fn divide(&mut self, count: usize) {
                *self /= count as $t;
            }
        }

        impl MeanItem for Vec<$t> {
            fn accumulate(&mut self, other: &Self) {
                assert_eq!(self.len(), other.len(), "mean dimension mismatch");
                for (a, b) in self.iter_mut().zip(other) {
                    *a += *b;
                }
            }

            fn divide(&mut self, count: usize) {
                let c = count as $t;
                for a in self.iter_mut() {
                    *a /= c;
                }
            }

            fn same_shape(&self, other: &Self) -> bool {
                self.len() == other.len()
            }
        }

        impl<const N: usize> MeanItem for [$t; N] {
            fn accumulate(&mut self, other: &Self) {
                for (a, b) in self.iter_mut().zip(other) {
                    *a += *b;
                }
            }

            fn divide(&mut self, count: usize) {
                let c = count as $t;
                for a in self.iter_mut() {
                    *a /= c;
                }
            }
        }
    };
}

impl_mean_item_float!(f32);
impl_mean_item_float!(f64);

/// Read-only, indexable collection of items.
///
/// Implemented for slices and vectors, and for [`Subset`] views.
pub trait ItemSet<X>: Sync {
    fn len(&self) -> usize;

    fn get(&self, index: usize) -> &X;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<X: Sync> ItemSet<X> for [X] {
    #[inline]
    fn len(&self) -> usize {
        <[X]>::len(self)
    }

    #[inline]
    fn get(&self, index: usize) -> &X {
        &self[index]
    }
}

impl<X: Sync> ItemSet<X> for Vec<X> {
    #[inline]
    fn len(&self) -> usize {
        Vec::len(self)
    }

    #[inline]
    fn get(&self, index: usize) -> &X {
        &self[index]
    }
}

/// A view over selected entries of a larger item table.
///
/// Local index `i` refers to `table[indices[i]]`; results computed over the
/// subset map back to the table with [`Subset::translate_index`].
#[derive(Debug, Clone)]
pub struct Subset<'a, X> {
    table: &'a [X],
    indices: Vec<usize>,
}

impl<'a, X> Subset<'a, X> {
    /// Every index must be in range for `table`.
    pub fn new(table: &'a [X], indices: Vec<usize>) -> Result<Self> {
        if let Some(&bad) = indices.iter().find(|&&i| i >= table.len()) {
            return Err(RetrieveError::InvalidParameter(format!(
                "subset index {bad} out of range for table of {} items",
                table.len()
            )));
        }
        Ok(Self { table, indices })
    }

    /// Map a local index back to its position in the underlying table.
    #[inline]
    pub fn translate_index(&self, i: usize) -> usize {
        self.indices[i]
    }

    pub fn indices(&self) -> &[usize] {
        &self.indices
    }

    pub fn table(&self) -> &'a [X] {
        self.table
    }
}

impl<X: Sync> ItemSet<X> for Subset<'_, X> {
    #[inline]
    fn len(&self) -> usize {
        self.indices.len()
    }

    #[inline]
    fn get(&self, index: usize) -> &X {
        &self.table[self.indices[index]]
    }
}
