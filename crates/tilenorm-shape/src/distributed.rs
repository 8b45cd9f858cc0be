//! Shape construction when tile norms are computed by several participants.
//!
//! Each participant fills in the norms of the tiles it owns and leaves every
//! other entry at zero. [`DistributedShapeBuilder`] sums the partial norm
//! tensors with [`Collective::all_reduce_sum`]; since every tile has exactly
//! one nonzero contributor, the sum is the full set of norms on every
//! participant. The threshold is then applied locally, which needs no
//! further communication.
//!
//! Input is validated before the reduction so that a malformed local buffer
//! fails on the participant that produced it. Peers of a participant that
//! fails this way are left blocked in the collective.

use std::sync::Arc;

use tilenorm_range::TiledRange;
use tracing::debug;

use crate::collective::Collective;
use crate::error::{ShapeError, ShapeResult};
use crate::norm_tensor::{NormScalar, NormTensor};
use crate::sparse::{check_norms, scatter_norms, SparseShape};
use crate::threshold::Threshold;

/// Builds identical [`SparseShape`]s on every participant of a collective.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
///
/// use tilenorm_range::TiledRange;
/// use tilenorm_shape::{DistributedShapeBuilder, NormTensor, SingleProcess};
///
/// let range = Arc::new(TiledRange::from_tile_sizes(&[&[2, 3]]).unwrap());
/// let builder = DistributedShapeBuilder::new(&SingleProcess);
/// let shape = builder
///     .build(NormTensor::from_vec(&[2], vec![4.0, 0.0]).unwrap(), range)
///     .unwrap();
/// assert_eq!(shape.data().unwrap().as_slice(), &[2.0, 0.0]);
/// ```
pub struct DistributedShapeBuilder<'a, T, C: ?Sized> {
    comm: &'a C,
    threshold: Threshold<T>,
}

impl<'a, T, C> DistributedShapeBuilder<'a, T, C>
where
    T: NormScalar,
    C: Collective<T> + ?Sized,
{
    /// Builder using the default threshold.
    pub fn new(comm: &'a C) -> Self {
        Self {
            comm,
            threshold: Threshold::default(),
        }
    }

    pub fn with_threshold(mut self, threshold: Threshold<T>) -> Self {
        self.threshold = threshold;
        self
    }

    pub fn threshold(&self) -> Threshold<T> {
        self.threshold
    }

    /// Reduce zero-filled partial norms into a shape.
    ///
    /// `local_norms` holds the unscaled norm of every tile owned by this
    /// participant and zero elsewhere. Every participant of the collective
    /// must call this with the same `range`.
    ///
    /// # Errors
    ///
    /// [`ShapeError::ShapeMismatch`] or [`ShapeError::InvalidNorm`] for a bad
    /// local buffer (detected before the reduction), and
    /// [`ShapeError::Collective`] when the reduction itself fails.
    pub fn build(&self, local_norms: NormTensor<T>, range: Arc<TiledRange>) -> ShapeResult<SparseShape<T>> {
        if local_norms.extents() != range.tile_extents() {
            return Err(ShapeError::shape_mismatch(
                "DistributedShapeBuilder::build",
                range.tile_extents(),
                local_norms.extents(),
            ));
        }
        check_norms(&local_norms)?;

        let mut norms = local_norms;
        debug!(
            rank = self.comm.rank(),
            size = self.comm.size(),
            tiles = norms.len(),
            "reducing partial tile norms"
        );
        self.comm.all_reduce_sum(norms.as_mut_slice())?;
        SparseShape::with_policy(norms, range, self.threshold)
    }

    /// Reduce `(tile index, unscaled norm)` pairs for the tiles this
    /// participant owns into a shape. Unlisted tiles contribute zero.
    pub fn build_sparse<I, Idx>(&self, range: Arc<TiledRange>, entries: I) -> ShapeResult<SparseShape<T>>
    where
        I: IntoIterator<Item = (Idx, T)>,
        Idx: AsRef<[usize]>,
    {
        let local_norms = scatter_norms(&range, entries)?;
        self.build(local_norms, range)
    }
}
