//! Contraction of tile-norm tensors.
//!
//! A contraction sums over `inner` axes shared by both operands and keeps the
//! remaining `outer` axes, left operand's first. [`GemmHelper`] records how
//! the axes of each operand are partitioned, flattens both norm tensors into
//! matrices and multiplies them.
//!
//! With both operands untransposed the left tensor is laid out as
//! `(outer..., inner...)` and the right one as `(inner..., outer...)`, so the
//! contraction is an ordinary matrix product of the flattened tensors.
//! [`Transpose::Trans`] swaps the two groups for that operand.
//!
//! # Examples
//!
//! ```
//! use tilenorm_shape::{GemmHelper, Transpose};
//!
//! // (i, k) x (k, j) -> (i, j)
//! let helper = GemmHelper::new(Transpose::NoTrans, Transpose::NoTrans, 2, 2, 2).unwrap();
//! assert_eq!(helper.inner_rank(), 1);
//! assert_eq!(helper.left_outer_rank(), 1);
//! assert_eq!(helper.right_outer_rank(), 1);
//!
//! // ranks that cannot be partitioned
//! assert!(GemmHelper::new(Transpose::NoTrans, Transpose::NoTrans, 3, 2, 2).is_err());
//! ```

use std::ops::Range;

use scirs2_core::ndarray_ext::{ArrayView, Ix2};
use tilenorm_range::TiledRange;
use tracing::debug;

use crate::error::{ShapeError, ShapeResult};
use crate::norm_tensor::{NormScalar, NormTensor};

/// Storage order of a contraction operand.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Transpose {
    /// Left operand `(outer, inner)`, right operand `(inner, outer)`.
    #[default]
    NoTrans,
    /// Left operand `(inner, outer)`, right operand `(outer, inner)`.
    Trans,
}

/// Axis partition of a contraction.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GemmHelper {
    left_op: Transpose,
    right_op: Transpose,
    result_rank: usize,
    left_rank: usize,
    right_rank: usize,
    inner_rank: usize,
}

impl GemmHelper {
    /// Describe a contraction producing a rank-`result_rank` tensor from
    /// operands of rank `left_rank` and `right_rank`.
    ///
    /// The number of contracted axes is `(left_rank + right_rank -
    /// result_rank) / 2`.
    ///
    /// # Errors
    ///
    /// Returns [`ShapeError::DimensionMismatch`] when the ranks do not admit
    /// such a partition or when every axis would be contracted.
    pub fn new(
        left_op: Transpose,
        right_op: Transpose,
        result_rank: usize,
        left_rank: usize,
        right_rank: usize,
    ) -> ShapeResult<Self> {
        let total = left_rank + right_rank;
        if result_rank == 0 || result_rank > total || (total - result_rank) % 2 != 0 {
            return Err(ShapeError::dimension_mismatch(
                "GemmHelper::new",
                format!(
                    "cannot contract rank {left_rank} with rank {right_rank} into rank {result_rank}"
                ),
            ));
        }
        let inner_rank = (total - result_rank) / 2;
        if inner_rank > left_rank || inner_rank > right_rank {
            return Err(ShapeError::dimension_mismatch(
                "GemmHelper::new",
                format!(
                    "{inner_rank} contracted axes exceed operand ranks {left_rank} and {right_rank}"
                ),
            ));
        }
        Ok(Self {
            left_op,
            right_op,
            result_rank,
            left_rank,
            right_rank,
            inner_rank,
        })
    }

    pub fn left_op(&self) -> Transpose {
        self.left_op
    }

    pub fn right_op(&self) -> Transpose {
        self.right_op
    }

    pub fn result_rank(&self) -> usize {
        self.result_rank
    }

    pub fn left_rank(&self) -> usize {
        self.left_rank
    }

    pub fn right_rank(&self) -> usize {
        self.right_rank
    }

    /// Number of contracted axes.
    pub fn inner_rank(&self) -> usize {
        self.inner_rank
    }

    pub fn left_outer_rank(&self) -> usize {
        self.left_rank - self.inner_rank
    }

    pub fn right_outer_rank(&self) -> usize {
        self.right_rank - self.inner_rank
    }

    /// Axes of the left operand kept in the result.
    pub fn left_outer_axes(&self) -> Range<usize> {
        match self.left_op {
            Transpose::NoTrans => 0..self.left_outer_rank(),
            Transpose::Trans => self.inner_rank..self.left_rank,
        }
    }

    /// Contracted axes of the left operand.
    pub fn left_inner_axes(&self) -> Range<usize> {
        match self.left_op {
            Transpose::NoTrans => self.left_outer_rank()..self.left_rank,
            Transpose::Trans => 0..self.inner_rank,
        }
    }

    /// Axes of the right operand kept in the result.
    pub fn right_outer_axes(&self) -> Range<usize> {
        match self.right_op {
            Transpose::NoTrans => self.inner_rank..self.right_rank,
            Transpose::Trans => 0..self.right_outer_rank(),
        }
    }

    /// Contracted axes of the right operand.
    pub fn right_inner_axes(&self) -> Range<usize> {
        match self.right_op {
            Transpose::NoTrans => 0..self.inner_rank,
            Transpose::Trans => self.right_outer_rank()..self.right_rank,
        }
    }

    /// Tile geometry of the contraction result: the left operand's outer
    /// axes followed by the right operand's.
    ///
    /// # Errors
    ///
    /// [`ShapeError::DimensionMismatch`] if an operand rank disagrees with
    /// the helper, [`ShapeError::ShapeMismatch`] if the contracted axes are
    /// tiled differently.
    pub fn result_range(&self, left: &TiledRange, right: &TiledRange) -> ShapeResult<TiledRange> {
        self.check_ranks("GemmHelper::result_range", left.rank(), right.rank())?;
        let left_inner = &left.dims()[self.left_inner_axes()];
        let right_inner = &right.dims()[self.right_inner_axes()];
        if left_inner != right_inner {
            return Err(ShapeError::shape_mismatch(
                "GemmHelper::result_range",
                &left.tile_extents()[self.left_inner_axes()],
                &right.tile_extents()[self.right_inner_axes()],
            ));
        }
        let dims = left.dims()[self.left_outer_axes()]
            .iter()
            .chain(&right.dims()[self.right_outer_axes()])
            .cloned()
            .collect();
        Ok(TiledRange::new(dims)?)
    }

    /// Matrix product of two norm tensors over the contracted axes.
    ///
    /// Entry `[a, b]` of the result is `Σ_k left[a, k] · right[k, b]` with
    /// `a` ranging over the left outer tiles, `b` over the right outer tiles
    /// and `k` over the contracted tiles. The inputs must already be in the
    /// units the caller wants summed; no thresholding is done here.
    pub fn contract<T: NormScalar>(
        &self,
        left: &NormTensor<T>,
        right: &NormTensor<T>,
    ) -> ShapeResult<NormTensor<T>> {
        self.check_ranks("GemmHelper::contract", left.rank(), right.rank())?;
        let left_inner = &left.extents()[self.left_inner_axes()];
        let right_inner = &right.extents()[self.right_inner_axes()];
        if left_inner != right_inner {
            return Err(ShapeError::shape_mismatch(
                "GemmHelper::contract",
                left_inner,
                right_inner,
            ));
        }

        let m: usize = left.extents()[self.left_outer_axes()].iter().product();
        let n: usize = right.extents()[self.right_outer_axes()].iter().product();
        let k: usize = left_inner.iter().product();
        debug!(m, n, k, "contracting tile norms");

        let lhs = match self.left_op {
            Transpose::NoTrans => as_matrix(left, m, k, Transpose::NoTrans)?,
            Transpose::Trans => as_matrix(left, k, m, Transpose::Trans)?,
        };
        let rhs = match self.right_op {
            Transpose::NoTrans => as_matrix(right, k, n, Transpose::NoTrans)?,
            Transpose::Trans => as_matrix(right, n, k, Transpose::Trans)?,
        };
        let product = lhs.dot(&rhs);

        let extents: Vec<usize> = left.extents()[self.left_outer_axes()]
            .iter()
            .chain(&right.extents()[self.right_outer_axes()])
            .copied()
            .collect();
        NormTensor::from_vec(&extents, product.iter().copied().collect())
    }

    fn check_ranks(&self, operation: &'static str, left: usize, right: usize) -> ShapeResult<()> {
        if left != self.left_rank || right != self.right_rank {
            return Err(ShapeError::dimension_mismatch(
                operation,
                format!(
                    "helper expects ranks ({}, {}), got ({left}, {right})",
                    self.left_rank, self.right_rank
                ),
            ));
        }
        Ok(())
    }
}

/// View a norm tensor as a `rows x cols` row-major matrix, transposed
/// afterwards for [`Transpose::Trans`].
fn as_matrix<T: NormScalar>(
    norms: &NormTensor<T>,
    rows: usize,
    cols: usize,
    op: Transpose,
) -> ShapeResult<ArrayView<'_, T, Ix2>> {
    let view = ArrayView::from_shape((rows, cols), norms.as_slice()).map_err(|_| {
        ShapeError::shape_mismatch("GemmHelper::contract", &[rows, cols], &[norms.len()])
    })?;
    Ok(match op {
        Transpose::NoTrans => view,
        Transpose::Trans => view.reversed_axes(),
    })
}
