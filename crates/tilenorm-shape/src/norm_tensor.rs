//! Dense per-tile norm storage.
//!
//! A [`NormTensor`] holds one nonnegative scalar per tile of a tile grid, in
//! row-major tile-ordinal order. It has no algebra of its own beyond
//! elementwise maps and the geometric transforms shape algebra needs:
//! axis permutation and block extraction.
//!
//! # Examples
//!
//! ```
//! use tilenorm_range::Permutation;
//! use tilenorm_shape::NormTensor;
//!
//! let norms = NormTensor::from_vec(&[2, 3], vec![0.0, 1.0, 2.0, 3.0, 4.0, 5.0]).unwrap();
//! let transposed = norms.permute(&Permutation::new(vec![1, 0]).unwrap()).unwrap();
//! assert_eq!(transposed.extents(), &[3, 2]);
//! assert_eq!(transposed.as_slice(), &[0.0, 3.0, 1.0, 4.0, 2.0, 5.0]);
//! ```

use std::fmt;

use scirs2_core::ndarray::Slice;
use scirs2_core::ndarray_ext::{Array, ArrayD, ArrayView, IxDyn};
use scirs2_core::numeric::{Float, FromPrimitive};
use tilenorm_range::{Permutation, TileIndex};

use crate::error::{ShapeError, ShapeResult};

/// Scalar type usable as a tile norm.
pub trait NormScalar:
    Float + FromPrimitive + Send + Sync + fmt::Debug + fmt::Display + 'static
{
    /// Convert a tile volume (element count) to this scalar type.
    fn from_volume(volume: usize) -> Self {
        Self::from_usize(volume).unwrap_or_else(Self::infinity)
    }
}

impl<T> NormScalar for T where
    T: Float + FromPrimitive + Send + Sync + fmt::Debug + fmt::Display + 'static
{
}

/// Dense N-dimensional array of per-tile norms.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct NormTensor<T> {
    extents: TileIndex,
    values: Vec<T>,
}

impl<T: NormScalar> NormTensor<T> {
    /// All-zero norms over a tile grid with the given extents.
    pub fn zeros(extents: &[usize]) -> Self {
        Self {
            extents: extents.iter().copied().collect(),
            values: vec![T::zero(); extents.iter().product()],
        }
    }

    /// Wrap row-major values.
    ///
    /// # Errors
    ///
    /// Returns [`ShapeError::ShapeMismatch`] when `values.len()` differs from
    /// the product of `extents`.
    pub fn from_vec(extents: &[usize], values: Vec<T>) -> ShapeResult<Self> {
        let expected: usize = extents.iter().product();
        if values.len() != expected {
            return Err(ShapeError::shape_mismatch(
                "NormTensor::from_vec",
                &[expected],
                &[values.len()],
            ));
        }
        Ok(Self {
            extents: extents.iter().copied().collect(),
            values,
        })
    }

    /// Copy an array in logical (row-major) order.
    pub fn from_array(array: ArrayD<T>) -> Self {
        Self {
            extents: array.shape().iter().copied().collect(),
            values: array.iter().copied().collect(),
        }
    }

    /// Tile-grid extents (number of tiles along each axis).
    pub fn extents(&self) -> &[usize] {
        &self.extents
    }

    pub fn rank(&self) -> usize {
        self.extents.len()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Norm at a tile ordinal.
    pub fn get(&self, ordinal: usize) -> Option<T> {
        self.values.get(ordinal).copied()
    }

    /// Norm at a tile multi-index.
    pub fn get_at(&self, index: &[usize]) -> Option<T> {
        if index.len() != self.rank() {
            return None;
        }
        let mut ordinal = 0;
        for (&i, &extent) in index.iter().zip(self.extents.iter()) {
            if i >= extent {
                return None;
            }
            ordinal = ordinal * extent + i;
        }
        self.get(ordinal)
    }

    pub fn as_slice(&self) -> &[T] {
        &self.values
    }

    pub fn into_vec(self) -> Vec<T> {
        self.values
    }

    /// Borrow as an N-dimensional array view.
    pub fn view(&self) -> ShapeResult<ArrayView<'_, T, IxDyn>> {
        ArrayView::from_shape(IxDyn(&self.extents), &self.values)
            .map_err(|_| ShapeError::shape_mismatch("NormTensor::view", &self.extents, &[self.len()]))
    }

    /// Copy into an owned N-dimensional array.
    pub fn to_array(&self) -> ShapeResult<ArrayD<T>> {
        Array::from_shape_vec(IxDyn(&self.extents), self.values.clone())
            .map_err(|_| ShapeError::shape_mismatch("NormTensor::to_array", &self.extents, &[self.len()]))
    }

    /// Permute tile axes: the entry at `perm(idx)` of the result equals the
    /// entry at `idx` of `self`.
    ///
    /// # Errors
    ///
    /// Returns [`ShapeError::DimensionMismatch`] when the permutation rank
    /// differs from the tensor rank.
    pub fn permute(&self, perm: &Permutation) -> ShapeResult<Self> {
        if perm.rank() != self.rank() {
            return Err(ShapeError::dimension_mismatch(
                "NormTensor::permute",
                format!(
                    "permutation of rank {} applied to rank {} tensor",
                    perm.rank(),
                    self.rank()
                ),
            ));
        }
        if perm.is_identity() {
            return Ok(self.clone());
        }
        // permuted_axes takes, for every result axis, the source axis it reads
        let inverse = perm.inverse();
        let permuted = self.view()?.permuted_axes(IxDyn(inverse.as_slice()));
        Ok(Self {
            extents: permuted.shape().iter().copied().collect(),
            values: permuted.iter().copied().collect(),
        })
    }

    /// Copy the tiles of `[lower, upper)` into a tensor addressed from zero.
    ///
    /// # Errors
    ///
    /// Returns [`ShapeError::OutOfRange`] unless `lower[i] < upper[i] <=
    /// extent[i]` on every axis.
    pub fn extract_block(&self, lower: &[usize], upper: &[usize]) -> ShapeResult<Self> {
        self.check_block("NormTensor::extract_block", lower, upper)?;
        let view = self.view()?;
        let block = view.slice_each_axis(|ax| {
            let axis = ax.axis.index();
            Slice::from(lower[axis]..upper[axis])
        });
        Ok(Self::from_array(block.to_owned()))
    }

    /// [`extract_block`](Self::extract_block) followed by a permutation of
    /// the block's axes.
    pub fn extract_block_permuted(
        &self,
        lower: &[usize],
        upper: &[usize],
        perm: &Permutation,
    ) -> ShapeResult<Self> {
        self.extract_block(lower, upper)?.permute(perm)
    }

    /// Apply `op` to every entry.
    pub fn map<F>(&self, op: F) -> Self
    where
        F: Fn(T) -> T,
    {
        Self {
            extents: self.extents.clone(),
            values: self.values.iter().map(|&v| op(v)).collect(),
        }
    }

    /// Combine two tensors of identical extents entry by entry.
    pub fn zip_map<F>(&self, other: &Self, op: F) -> ShapeResult<Self>
    where
        F: Fn(T, T) -> T,
    {
        if self.extents != other.extents {
            return Err(ShapeError::shape_mismatch(
                "NormTensor::zip_map",
                &self.extents,
                &other.extents,
            ));
        }
        Ok(Self {
            extents: self.extents.clone(),
            values: self
                .values
                .iter()
                .zip(&other.values)
                .map(|(&a, &b)| op(a, b))
                .collect(),
        })
    }

    /// Number of entries that are exactly zero.
    pub fn count_zeros(&self) -> usize {
        self.values.iter().filter(|v| v.is_zero()).count()
    }

    pub(crate) fn with_values(&self, values: Vec<T>) -> Self {
        debug_assert_eq!(values.len(), self.values.len());
        Self {
            extents: self.extents.clone(),
            values,
        }
    }

    pub(crate) fn as_mut_slice(&mut self) -> &mut [T] {
        &mut self.values
    }

    fn check_block(&self, operation: &'static str, lower: &[usize], upper: &[usize]) -> ShapeResult<()> {
        let valid = lower.len() == self.rank()
            && upper.len() == self.rank()
            && lower
                .iter()
                .zip(upper)
                .zip(self.extents.iter())
                .all(|((&lo, &up), &extent)| lo < up && up <= extent);
        if valid {
            Ok(())
        } else {
            Err(ShapeError::OutOfRange {
                operation,
                lower: lower.to_vec(),
                upper: upper.to_vec(),
                extents: self.extents.to_vec(),
            })
        }
    }
}
