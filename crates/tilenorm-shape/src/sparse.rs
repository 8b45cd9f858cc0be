//! Sparse tile shapes.
//!
//! A [`SparseShape`] records, for every tile of a tile grid, the tile's
//! Frobenius norm divided by its volume (the *scaled* norm). Scaled norms
//! below the shape's [`Threshold`] are stored as exactly zero and the tile is
//! reported as zero by [`is_zero`](SparseShape::is_zero).
//!
//! Shapes are immutable values. Every algebra method returns a new shape
//! bounding the sparsity of the corresponding tensor operation; the receiver
//! is left unchanged, so shapes can be shared freely between threads.
//!
//! A default-constructed shape is *empty*: it only answers
//! [`is_empty`](SparseShape::is_empty), [`is_dense`](SparseShape::is_dense)
//! and [`validate`](SparseShape::validate). Every other method returns
//! [`ShapeError::InvalidState`].
//!
//! # Examples
//!
//! ```
//! use std::sync::Arc;
//!
//! use tilenorm_range::TiledRange;
//! use tilenorm_shape::{NormTensor, SparseShape, Threshold};
//!
//! let range = Arc::new(TiledRange::from_tile_sizes(&[&[2, 3]]).unwrap());
//! let norms = NormTensor::from_vec(&[2], vec![4.0, 0.0]).unwrap();
//! let shape = SparseShape::with_policy(norms, range, Threshold::new(1e-6).unwrap()).unwrap();
//!
//! assert_eq!(shape.data().unwrap().as_slice(), &[2.0, 0.0]);
//! assert!(shape.is_zero(1).unwrap());
//! assert_eq!(shape.sparsity().unwrap(), 0.5);
//!
//! let scaled = shape.scale(-2.0).unwrap();
//! assert_eq!(scaled.data().unwrap().as_slice(), &[4.0, 0.0]);
//! ```

use std::sync::Arc;

use tilenorm_range::{Permutation, TiledRange};
use tracing::{debug, trace};

use crate::algebra;
use crate::error::{ShapeError, ShapeResult};
use crate::gemm::GemmHelper;
use crate::norm_tensor::{NormScalar, NormTensor};
use crate::threshold::Threshold;

/// Per-tile scaled norms over a shared tile grid.
#[derive(Clone, Debug)]
pub struct SparseShape<T> {
    inner: Option<Initialized<T>>,
}

#[derive(Clone, Debug)]
struct Initialized<T> {
    norms: NormTensor<T>,
    range: Arc<TiledRange>,
    threshold: Threshold<T>,
    zero_tiles: usize,
}

impl<T> Default for SparseShape<T> {
    fn default() -> Self {
        Self { inner: None }
    }
}

impl<T: PartialEq> PartialEq for SparseShape<T> {
    fn eq(&self, other: &Self) -> bool {
        match (&self.inner, &other.inner) {
            (None, None) => true,
            (Some(a), Some(b)) => {
                a.threshold == b.threshold && same_geometry(&a.range, &b.range) && a.norms == b.norms
            }
            _ => false,
        }
    }
}

impl<T: NormScalar> SparseShape<T> {
    /// Build a shape from the unscaled Frobenius norm of every tile, using
    /// the default threshold of `T`.
    ///
    /// # Errors
    ///
    /// [`ShapeError::ShapeMismatch`] when the extents of `tile_norms` differ
    /// from the tile grid of `range`, [`ShapeError::InvalidNorm`] for a
    /// negative or non-finite norm.
    pub fn new(tile_norms: NormTensor<T>, range: Arc<TiledRange>) -> ShapeResult<Self> {
        Self::with_policy(tile_norms, range, Threshold::default())
    }

    /// Build a shape from unscaled tile norms under an explicit threshold.
    pub fn with_policy(
        tile_norms: NormTensor<T>,
        range: Arc<TiledRange>,
        threshold: Threshold<T>,
    ) -> ShapeResult<Self> {
        check_extents("SparseShape::new", &tile_norms, &range)?;
        check_norms(&tile_norms)?;
        let norms = algebra::rescale(&tile_norms, &range.tile_volumes(), threshold)?;
        let shape = Self::from_parts(norms, range, threshold);
        if let Some(inner) = &shape.inner {
            debug!(
                tiles = inner.norms.len(),
                zero_tiles = inner.zero_tiles,
                threshold = %threshold.value(),
                "constructed sparse shape"
            );
        }
        Ok(shape)
    }

    /// Build a shape from `(tile index, unscaled norm)` pairs. Tiles that
    /// are not listed have norm zero; a tile listed twice keeps its last
    /// norm.
    ///
    /// # Errors
    ///
    /// Fails with [`ShapeError::Range`] for an index outside the tile grid,
    /// otherwise as [`with_policy`](Self::with_policy).
    pub fn from_sparse_norms<I, Idx>(
        range: Arc<TiledRange>,
        entries: I,
        threshold: Threshold<T>,
    ) -> ShapeResult<Self>
    where
        I: IntoIterator<Item = (Idx, T)>,
        Idx: AsRef<[usize]>,
    {
        let tile_norms = scatter_norms(&range, entries)?;
        Self::with_policy(tile_norms, range, threshold)
    }

    /// Wrap already scaled and thresholded norms.
    fn from_parts(norms: NormTensor<T>, range: Arc<TiledRange>, threshold: Threshold<T>) -> Self {
        let zero_tiles = norms
            .as_slice()
            .iter()
            .filter(|&&v| threshold.is_zero(v))
            .count();
        Self {
            inner: Some(Initialized {
                norms,
                range,
                threshold,
                zero_tiles,
            }),
        }
    }

    /// Whether this is a default-constructed shape with no norms.
    pub fn is_empty(&self) -> bool {
        self.inner.is_none()
    }

    /// Always `false`: a sparse shape tracks every tile.
    pub fn is_dense(&self) -> bool {
        false
    }

    /// Whether this shape can describe a tensor tiled by `range`.
    pub fn validate(&self, range: &TiledRange) -> bool {
        match &self.inner {
            Some(inner) => inner.norms.extents() == range.tile_extents(),
            None => false,
        }
    }

    /// Scaled norm of the tile at `ordinal`.
    pub fn get(&self, ordinal: usize) -> ShapeResult<T> {
        let inner = self.init("get")?;
        inner.norms.get(ordinal).ok_or(ShapeError::TileOutOfRange {
            operation: "get",
            ordinal,
            count: inner.norms.len(),
        })
    }

    /// Scaled norm of the tile at a multi-index.
    pub fn norm_at(&self, index: &[usize]) -> ShapeResult<T> {
        let inner = self.init("norm_at")?;
        let ordinal = inner.range.ordinal_of(index)?;
        self.get(ordinal)
    }

    /// Whether the tile at `ordinal` is below the threshold.
    pub fn is_zero(&self, ordinal: usize) -> ShapeResult<bool> {
        let inner = self.init("is_zero")?;
        let value = self.get(ordinal)?;
        Ok(inner.threshold.is_zero(value))
    }

    /// Fraction of zero tiles, in `[0, 1]`.
    pub fn sparsity(&self) -> ShapeResult<f64> {
        let inner = self.init("sparsity")?;
        Ok(inner.zero_tiles as f64 / inner.norms.len() as f64)
    }

    /// Number of zero tiles.
    pub fn zero_tile_count(&self) -> ShapeResult<usize> {
        Ok(self.init("zero_tile_count")?.zero_tiles)
    }

    /// Stored scaled norms.
    pub fn data(&self) -> ShapeResult<&NormTensor<T>> {
        Ok(&self.init("data")?.norms)
    }

    /// Unscaled norms: scaled norm times tile volume.
    pub fn tile_norms(&self) -> ShapeResult<NormTensor<T>> {
        let inner = self.init("tile_norms")?;
        algebra::unscale(&inner.norms, &inner.range.tile_volumes())
    }

    /// Shared tile grid.
    pub fn range(&self) -> ShapeResult<&Arc<TiledRange>> {
        Ok(&self.init("range")?.range)
    }

    /// Zero threshold carried by this shape.
    pub fn threshold(&self) -> ShapeResult<Threshold<T>> {
        Ok(self.init("threshold")?.threshold)
    }

    /// Same norms under a different threshold. Norms already snapped to zero
    /// stay zero.
    pub fn with_threshold(&self, threshold: Threshold<T>) -> ShapeResult<Self> {
        let inner = self.init("with_threshold")?;
        let norms = algebra::snap(&inner.norms, threshold);
        Ok(Self::from_parts(norms, Arc::clone(&inner.range), threshold))
    }

    /// Re-apply the shape's own threshold.
    pub fn rethreshold(&self) -> ShapeResult<Self> {
        let threshold = self.threshold()?;
        self.with_threshold(threshold)
    }

    /// Permute the tile axes.
    pub fn perm(&self, perm: &Permutation) -> ShapeResult<Self> {
        let inner = self.init("perm")?;
        self.derive("perm", inner.norms.clone(), Some(perm))
    }

    /// Shape of `factor * self`.
    pub fn scale(&self, factor: T) -> ShapeResult<Self> {
        self.scale_inner("scale", factor, None)
    }

    /// [`scale`](Self::scale) followed by a permutation.
    pub fn scale_perm(&self, factor: T, perm: &Permutation) -> ShapeResult<Self> {
        self.scale_inner("scale_perm", factor, Some(perm))
    }

    /// Shape of `self + other`.
    pub fn add(&self, other: &Self) -> ShapeResult<Self> {
        self.add_inner("add", other, T::one(), None)
    }

    /// Shape of `factor * (self + other)`.
    pub fn add_scaled(&self, other: &Self, factor: T) -> ShapeResult<Self> {
        self.add_inner("add_scaled", other, factor, None)
    }

    /// [`add`](Self::add) followed by a permutation.
    pub fn add_perm(&self, other: &Self, perm: &Permutation) -> ShapeResult<Self> {
        self.add_inner("add_perm", other, T::one(), Some(perm))
    }

    /// [`add_scaled`](Self::add_scaled) followed by a permutation.
    pub fn add_scaled_perm(&self, other: &Self, factor: T, perm: &Permutation) -> ShapeResult<Self> {
        self.add_inner("add_scaled_perm", other, factor, Some(perm))
    }

    /// Shape of `self + constant` (elementwise).
    pub fn add_const(&self, constant: T) -> ShapeResult<Self> {
        self.add_const_inner("add_const", constant, None)
    }

    /// [`add_const`](Self::add_const) followed by a permutation.
    pub fn add_const_perm(&self, constant: T, perm: &Permutation) -> ShapeResult<Self> {
        self.add_const_inner("add_const_perm", constant, Some(perm))
    }

    /// Shape of `self - other`. The bound is the same as for addition.
    pub fn subt(&self, other: &Self) -> ShapeResult<Self> {
        self.add_inner("subt", other, T::one(), None)
    }

    /// Shape of `factor * (self - other)`.
    pub fn subt_scaled(&self, other: &Self, factor: T) -> ShapeResult<Self> {
        self.add_inner("subt_scaled", other, factor, None)
    }

    /// [`subt`](Self::subt) followed by a permutation.
    pub fn subt_perm(&self, other: &Self, perm: &Permutation) -> ShapeResult<Self> {
        self.add_inner("subt_perm", other, T::one(), Some(perm))
    }

    /// [`subt_scaled`](Self::subt_scaled) followed by a permutation.
    pub fn subt_scaled_perm(&self, other: &Self, factor: T, perm: &Permutation) -> ShapeResult<Self> {
        self.add_inner("subt_scaled_perm", other, factor, Some(perm))
    }

    /// Shape of `self - constant` (elementwise).
    pub fn subt_const(&self, constant: T) -> ShapeResult<Self> {
        self.add_const_inner("subt_const", constant, None)
    }

    /// [`subt_const`](Self::subt_const) followed by a permutation.
    pub fn subt_const_perm(&self, constant: T, perm: &Permutation) -> ShapeResult<Self> {
        self.add_const_inner("subt_const_perm", constant, Some(perm))
    }

    /// Shape of the elementwise product `self * other`.
    pub fn mult(&self, other: &Self) -> ShapeResult<Self> {
        self.mult_inner("mult", other, T::one(), None)
    }

    /// Shape of `factor * self * other` (elementwise).
    pub fn mult_scaled(&self, other: &Self, factor: T) -> ShapeResult<Self> {
        self.mult_inner("mult_scaled", other, factor, None)
    }

    /// [`mult`](Self::mult) followed by a permutation.
    pub fn mult_perm(&self, other: &Self, perm: &Permutation) -> ShapeResult<Self> {
        self.mult_inner("mult_perm", other, T::one(), Some(perm))
    }

    /// [`mult_scaled`](Self::mult_scaled) followed by a permutation.
    pub fn mult_scaled_perm(&self, other: &Self, factor: T, perm: &Permutation) -> ShapeResult<Self> {
        self.mult_inner("mult_scaled_perm", other, factor, Some(perm))
    }

    /// Shape of the contraction `factor * self · other` described by
    /// `helper`.
    ///
    /// The result lives on a new tile grid made of the outer axes of both
    /// operands.
    pub fn gemm(&self, other: &Self, factor: T, helper: &GemmHelper) -> ShapeResult<Self> {
        self.gemm_inner("gemm", other, factor, helper, None)
    }

    /// [`gemm`](Self::gemm) with the result axes permuted.
    pub fn gemm_perm(
        &self,
        other: &Self,
        factor: T,
        helper: &GemmHelper,
        perm: &Permutation,
    ) -> ShapeResult<Self> {
        self.gemm_inner("gemm_perm", other, factor, helper, Some(perm))
    }

    /// Shape of the tiles in `[lower, upper)`, on the block's own tile grid.
    ///
    /// # Errors
    ///
    /// [`ShapeError::OutOfRange`] unless `lower[i] < upper[i] <= extent[i]`
    /// on every axis.
    pub fn block(&self, lower: &[usize], upper: &[usize]) -> ShapeResult<Self> {
        self.block_inner("block", lower, upper, None, None)
    }

    /// [`block`](Self::block) scaled by `|factor|`.
    pub fn block_scaled(&self, lower: &[usize], upper: &[usize], factor: T) -> ShapeResult<Self> {
        self.block_inner("block_scaled", lower, upper, Some(factor), None)
    }

    /// [`block`](Self::block) with the block's axes permuted.
    pub fn block_perm(&self, lower: &[usize], upper: &[usize], perm: &Permutation) -> ShapeResult<Self> {
        self.block_inner("block_perm", lower, upper, None, Some(perm))
    }

    /// [`block_scaled`](Self::block_scaled) with the block's axes permuted.
    pub fn block_scaled_perm(
        &self,
        lower: &[usize],
        upper: &[usize],
        factor: T,
        perm: &Permutation,
    ) -> ShapeResult<Self> {
        self.block_inner("block_scaled_perm", lower, upper, Some(factor), Some(perm))
    }

    /// Zero the tiles that `mask` treats as zero.
    ///
    /// A tile of the result is zero where it is zero in `self`, or where it
    /// is nonzero in `self` but [`is_zero`](Self::is_zero) in `mask` under
    /// the mask's own threshold.
    pub fn mask(&self, mask: &Self) -> ShapeResult<Self> {
        let (a, b) = self.binary("mask", mask)?;
        let norms = algebra::mask(&a.norms, &b.norms, b.threshold, a.threshold)?;
        self.derive("mask", norms, None)
    }

    /// Replace the stored scaled norms with `op(scaled norms)` and
    /// re-threshold.
    ///
    /// # Errors
    ///
    /// [`ShapeError::ShapeMismatch`] if `op` changes the extents,
    /// [`ShapeError::InvalidNorm`] if it produces a negative or non-finite
    /// value.
    pub fn transform<F>(&self, op: F) -> ShapeResult<Self>
    where
        F: FnOnce(&NormTensor<T>) -> NormTensor<T>,
    {
        let inner = self.init("transform")?;
        let norms = op(&inner.norms);
        check_extents("transform", &norms, &inner.range)?;
        check_norms(&norms)?;
        self.derive("transform", algebra::snap(&norms, inner.threshold), None)
    }

    /// Like [`transform`](Self::transform), but `op` sees and returns
    /// unscaled norms.
    pub fn transform_unscaled<F>(&self, op: F) -> ShapeResult<Self>
    where
        F: FnOnce(&NormTensor<T>) -> NormTensor<T>,
    {
        let inner = self.init("transform_unscaled")?;
        let volumes = inner.range.tile_volumes();
        let norms = op(&algebra::unscale(&inner.norms, &volumes)?);
        check_extents("transform_unscaled", &norms, &inner.range)?;
        check_norms(&norms)?;
        let norms = algebra::rescale(&norms, &volumes, inner.threshold)?;
        self.derive("transform_unscaled", norms, None)
    }

    fn init(&self, operation: &'static str) -> ShapeResult<&Initialized<T>> {
        self.inner
            .as_ref()
            .ok_or(ShapeError::InvalidState { operation })
    }

    fn binary<'a>(
        &'a self,
        operation: &'static str,
        other: &'a Self,
    ) -> ShapeResult<(&'a Initialized<T>, &'a Initialized<T>)> {
        let a = self.init(operation)?;
        let b = other.init(operation)?;
        if !same_geometry(&a.range, &b.range) {
            return Err(geometry_mismatch(operation, &a.range, &b.range));
        }
        Ok((a, b))
    }

    /// New shape on this shape's grid, optionally permuted. `norms` must
    /// already be thresholded.
    fn derive(
        &self,
        operation: &'static str,
        norms: NormTensor<T>,
        perm: Option<&Permutation>,
    ) -> ShapeResult<Self> {
        let inner = self.init(operation)?;
        finish(
            operation,
            norms,
            Arc::clone(&inner.range),
            inner.threshold,
            perm,
        )
    }

    fn scale_inner(&self, operation: &'static str, factor: T, perm: Option<&Permutation>) -> ShapeResult<Self> {
        let inner = self.init(operation)?;
        check_factor(operation, factor)?;
        let norms = algebra::scale(&inner.norms, factor, inner.threshold);
        self.derive(operation, norms, perm)
    }

    fn add_inner(
        &self,
        operation: &'static str,
        other: &Self,
        factor: T,
        perm: Option<&Permutation>,
    ) -> ShapeResult<Self> {
        let (a, b) = self.binary(operation, other)?;
        check_factor(operation, factor)?;
        let norms = algebra::add(&a.norms, &b.norms, factor, a.threshold)?;
        self.derive(operation, norms, perm)
    }

    fn add_const_inner(
        &self,
        operation: &'static str,
        constant: T,
        perm: Option<&Permutation>,
    ) -> ShapeResult<Self> {
        let inner = self.init(operation)?;
        check_factor(operation, constant)?;
        let norms = algebra::add_const(
            &inner.norms,
            &inner.range.tile_volumes(),
            constant,
            inner.threshold,
        )?;
        self.derive(operation, norms, perm)
    }

    fn mult_inner(
        &self,
        operation: &'static str,
        other: &Self,
        factor: T,
        perm: Option<&Permutation>,
    ) -> ShapeResult<Self> {
        let (a, b) = self.binary(operation, other)?;
        check_factor(operation, factor)?;
        let norms = algebra::mult(
            &a.norms,
            &b.norms,
            &a.range.tile_volumes(),
            factor,
            a.threshold,
        )?;
        self.derive(operation, norms, perm)
    }

    fn gemm_inner(
        &self,
        operation: &'static str,
        other: &Self,
        factor: T,
        helper: &GemmHelper,
        perm: Option<&Permutation>,
    ) -> ShapeResult<Self> {
        let a = self.init(operation)?;
        let b = other.init(operation)?;
        check_factor(operation, factor)?;
        let range = Arc::new(helper.result_range(&a.range, &b.range)?);
        let norms = algebra::gemm(
            helper,
            &a.norms,
            &a.range.tile_volumes(),
            &b.norms,
            &b.range.tile_volumes(),
            &range.tile_volumes(),
            factor,
            a.threshold,
        )?;
        finish(operation, norms, range, a.threshold, perm)
    }

    fn block_inner(
        &self,
        operation: &'static str,
        lower: &[usize],
        upper: &[usize],
        factor: Option<T>,
        perm: Option<&Permutation>,
    ) -> ShapeResult<Self> {
        let inner = self.init(operation)?;
        if let Some(factor) = factor {
            check_factor(operation, factor)?;
        }
        let norms = inner.norms.extract_block(lower, upper)?;
        let range = Arc::new(inner.range.block(lower, upper)?);
        let norms = match factor {
            Some(factor) => algebra::scale(&norms, factor, inner.threshold),
            None => norms,
        };
        finish(operation, norms, range, inner.threshold, perm)
    }
}

fn finish<T: NormScalar>(
    operation: &'static str,
    norms: NormTensor<T>,
    range: Arc<TiledRange>,
    threshold: Threshold<T>,
    perm: Option<&Permutation>,
) -> ShapeResult<SparseShape<T>> {
    let (norms, range) = match perm {
        Some(perm) => (norms.permute(perm)?, Arc::new(range.permute(perm)?)),
        None => (norms, range),
    };
    let shape = SparseShape::from_parts(norms, range, threshold);
    if let Some(inner) = &shape.inner {
        trace!(
            operation,
            tiles = inner.norms.len(),
            zero_tiles = inner.zero_tiles,
            "derived sparse shape"
        );
    }
    Ok(shape)
}

fn same_geometry(a: &Arc<TiledRange>, b: &Arc<TiledRange>) -> bool {
    Arc::ptr_eq(a, b) || **a == **b
}

/// Mismatch between two grids. Reports the tile extents when they differ,
/// otherwise the boundaries of the first axis whose tiling differs.
fn geometry_mismatch(operation: &'static str, a: &TiledRange, b: &TiledRange) -> ShapeError {
    if a.tile_extents() != b.tile_extents() {
        return ShapeError::shape_mismatch(operation, a.tile_extents(), b.tile_extents());
    }
    match a.dims().iter().zip(b.dims()).find(|(x, y)| x != y) {
        Some((x, y)) => ShapeError::shape_mismatch(operation, x.boundaries(), y.boundaries()),
        None => ShapeError::shape_mismatch(operation, a.tile_extents(), b.tile_extents()),
    }
}

fn check_factor<T: NormScalar>(operation: &'static str, value: T) -> ShapeResult<()> {
    if value.is_finite() {
        return Ok(());
    }
    Err(ShapeError::InvalidFactor {
        operation,
        value: value.to_f64().unwrap_or(f64::NAN),
    })
}

fn check_extents<T: NormScalar>(
    operation: &'static str,
    norms: &NormTensor<T>,
    range: &TiledRange,
) -> ShapeResult<()> {
    if norms.extents() != range.tile_extents() {
        return Err(ShapeError::shape_mismatch(
            operation,
            range.tile_extents(),
            norms.extents(),
        ));
    }
    Ok(())
}

pub(crate) fn check_norms<T: NormScalar>(norms: &NormTensor<T>) -> ShapeResult<()> {
    match norms
        .as_slice()
        .iter()
        .position(|v| !v.is_finite() || *v < T::zero())
    {
        Some(ordinal) => Err(ShapeError::InvalidNorm {
            ordinal,
            value: norms
                .get(ordinal)
                .and_then(|v| v.to_f64())
                .unwrap_or(f64::NAN),
        }),
        None => Ok(()),
    }
}

/// Dense unscaled norms from `(tile index, norm)` pairs, zero elsewhere.
pub(crate) fn scatter_norms<T, I, Idx>(range: &TiledRange, entries: I) -> ShapeResult<NormTensor<T>>
where
    T: NormScalar,
    I: IntoIterator<Item = (Idx, T)>,
    Idx: AsRef<[usize]>,
{
    let mut norms = NormTensor::zeros(range.tile_extents());
    let values = norms.as_mut_slice();
    for (index, norm) in entries {
        let ordinal = range.ordinal_of(index.as_ref())?;
        values[ordinal] = norm;
    }
    Ok(norms)
}
