//! Tiled index ranges.
//!
//! [`TiledRange1`] cuts one axis into contiguous tiles; [`TiledRange`] is the
//! Cartesian product of per-axis tilings and addresses its tiles in
//! row-major (C) order, the last axis varying fastest.

use std::ops::Range;

use crate::error::{RangeError, RangeResult};
use crate::permutation::Permutation;
use crate::TileIndex;

/// Tiling of a single axis, stored as strictly increasing tile boundaries.
///
/// Tile `i` covers the elements `boundaries[i]..boundaries[i + 1]`.
///
/// # Examples
///
/// ```
/// use tilenorm_range::TiledRange1;
///
/// let tr1 = TiledRange1::new(vec![0, 2, 5, 9]).unwrap();
/// assert_eq!(tr1.tile_count(), 3);
/// assert_eq!(tr1.tile(1), Some(2..5));
/// assert_eq!(tr1.element_count(), 9);
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TiledRange1 {
    boundaries: Vec<usize>,
}

impl TiledRange1 {
    /// Create a tiling from its boundaries.
    ///
    /// # Errors
    ///
    /// Returns [`RangeError::InvalidBoundaries`] if fewer than two boundaries
    /// are given or they are not strictly increasing (empty tiles are not
    /// allowed).
    pub fn new(boundaries: impl Into<Vec<usize>>) -> RangeResult<Self> {
        let boundaries = boundaries.into();
        if boundaries.len() < 2 {
            return Err(RangeError::InvalidBoundaries {
                boundaries,
                reason: "at least one tile is required".to_string(),
            });
        }
        if boundaries.windows(2).any(|w| w[0] >= w[1]) {
            return Err(RangeError::InvalidBoundaries {
                boundaries,
                reason: "boundaries must be strictly increasing".to_string(),
            });
        }
        Ok(Self { boundaries })
    }

    /// Create a tiling starting at element 0 from a list of tile sizes.
    pub fn from_tile_sizes(sizes: &[usize]) -> RangeResult<Self> {
        let mut boundaries = Vec::with_capacity(sizes.len() + 1);
        let mut offset = 0;
        boundaries.push(offset);
        for &size in sizes {
            offset += size;
            boundaries.push(offset);
        }
        Self::new(boundaries)
    }

    pub fn tile_count(&self) -> usize {
        self.boundaries.len() - 1
    }

    /// Element range covered by tile `i`.
    pub fn tile(&self, i: usize) -> Option<Range<usize>> {
        if i < self.tile_count() {
            Some(self.boundaries[i]..self.boundaries[i + 1])
        } else {
            None
        }
    }

    /// Number of elements in tile `i`.
    pub fn tile_extent(&self, i: usize) -> Option<usize> {
        self.tile(i).map(|r| r.end - r.start)
    }

    pub fn element_range(&self) -> Range<usize> {
        self.boundaries[0]..self.boundaries[self.boundaries.len() - 1]
    }

    pub fn element_count(&self) -> usize {
        let r = self.element_range();
        r.end - r.start
    }

    pub fn boundaries(&self) -> &[usize] {
        &self.boundaries
    }

    /// Sub-tiling made of tiles `lower..upper`, rebased to start at element 0.
    ///
    /// Slices with the same tile sizes compare equal wherever they were taken
    /// from.
    pub fn slice(&self, lower: usize, upper: usize) -> RangeResult<Self> {
        if lower >= upper || upper > self.tile_count() {
            return Err(RangeError::InvalidBlock {
                lower: vec![lower],
                upper: vec![upper],
                extents: vec![self.tile_count()],
            });
        }
        let origin = self.boundaries[lower];
        Ok(Self {
            boundaries: self.boundaries[lower..=upper]
                .iter()
                .map(|b| b - origin)
                .collect(),
        })
    }
}

/// Dense N-dimensional grid of rectangular tiles.
///
/// # Examples
///
/// ```
/// use tilenorm_range::TiledRange;
///
/// let tr = TiledRange::from_tile_sizes(&[&[2, 3], &[4]]).unwrap();
/// assert_eq!(tr.rank(), 2);
/// assert_eq!(tr.tile_count(), 2);
/// assert_eq!(tr.tile_volumes(), vec![8, 12]);
/// assert_eq!(&tr.multi_index_of(1).unwrap()[..], &[1, 0]);
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TiledRange {
    dims: Vec<TiledRange1>,
    tile_extents: TileIndex,
}

impl TiledRange {
    /// Build a tile grid from per-axis tilings.
    ///
    /// # Errors
    ///
    /// Returns [`RangeError::RankMismatch`] for an empty list of axes.
    pub fn new(dims: Vec<TiledRange1>) -> RangeResult<Self> {
        if dims.is_empty() {
            return Err(RangeError::RankMismatch {
                expected: 1,
                got: 0,
            });
        }
        let tile_extents = dims.iter().map(TiledRange1::tile_count).collect();
        Ok(Self { dims, tile_extents })
    }

    /// Build a tile grid from per-axis tile sizes.
    pub fn from_tile_sizes(sizes: &[&[usize]]) -> RangeResult<Self> {
        let dims = sizes
            .iter()
            .map(|s| TiledRange1::from_tile_sizes(s))
            .collect::<RangeResult<Vec<_>>>()?;
        Self::new(dims)
    }

    pub fn rank(&self) -> usize {
        self.dims.len()
    }

    pub fn dim(&self, axis: usize) -> Option<&TiledRange1> {
        self.dims.get(axis)
    }

    pub fn dims(&self) -> &[TiledRange1] {
        &self.dims
    }

    /// Number of tiles along each axis.
    pub fn tile_extents(&self) -> &[usize] {
        &self.tile_extents
    }

    pub fn tile_count(&self) -> usize {
        self.tile_extents.iter().product()
    }

    /// Row-major ordinal of a tile multi-index.
    pub fn ordinal_of(&self, index: &[usize]) -> RangeResult<usize> {
        if index.len() != self.rank() {
            return Err(RangeError::RankMismatch {
                expected: self.rank(),
                got: index.len(),
            });
        }
        let mut ordinal = 0;
        for (&i, &extent) in index.iter().zip(self.tile_extents.iter()) {
            if i >= extent {
                return Err(RangeError::IndexOutOfBounds {
                    index: index.to_vec(),
                    extents: self.tile_extents.to_vec(),
                });
            }
            ordinal = ordinal * extent + i;
        }
        Ok(ordinal)
    }

    /// Tile multi-index of a row-major ordinal.
    pub fn multi_index_of(&self, ordinal: usize) -> RangeResult<TileIndex> {
        let count = self.tile_count();
        if ordinal >= count {
            return Err(RangeError::OrdinalOutOfBounds { ordinal, count });
        }
        Ok(unravel(ordinal, &self.tile_extents))
    }

    /// Element count of the tile at `ordinal`.
    pub fn tile_volume(&self, ordinal: usize) -> RangeResult<usize> {
        let index = self.multi_index_of(ordinal)?;
        Ok(self.volume_at(&index))
    }

    /// Element counts of every tile, in ordinal order.
    pub fn tile_volumes(&self) -> Vec<usize> {
        self.tile_indices().map(|idx| self.volume_at(&idx)).collect()
    }

    /// Iterate over all tile multi-indices in ordinal order.
    pub fn tile_indices(&self) -> impl Iterator<Item = TileIndex> + '_ {
        (0..self.tile_count()).map(move |ord| unravel(ord, &self.tile_extents))
    }

    /// Reorder the axes of the grid.
    pub fn permute(&self, perm: &Permutation) -> RangeResult<Self> {
        Self::new(perm.permute_axes(&self.dims)?)
    }

    /// Sub-grid covering tiles `[lower, upper)`, addressed from zero.
    ///
    /// # Errors
    ///
    /// Returns [`RangeError::InvalidBlock`] unless `lower[i] < upper[i] <=
    /// extent[i]` on every axis.
    pub fn block(&self, lower: &[usize], upper: &[usize]) -> RangeResult<Self> {
        self.check_block(lower, upper)?;
        let dims = self
            .dims
            .iter()
            .zip(lower.iter().zip(upper))
            .map(|(d, (&lo, &up))| d.slice(lo, up))
            .collect::<RangeResult<Vec<_>>>()?;
        Self::new(dims)
    }

    /// Sub-grid covering tiles `[lower, upper)` with its axes permuted.
    pub fn block_permuted(
        &self,
        lower: &[usize],
        upper: &[usize],
        perm: &Permutation,
    ) -> RangeResult<Self> {
        self.block(lower, upper)?.permute(perm)
    }

    /// Validate block bounds against this grid.
    pub fn check_block(&self, lower: &[usize], upper: &[usize]) -> RangeResult<()> {
        if lower.len() != self.rank() || upper.len() != self.rank() {
            return Err(RangeError::RankMismatch {
                expected: self.rank(),
                got: if lower.len() != self.rank() {
                    lower.len()
                } else {
                    upper.len()
                },
            });
        }
        let valid = lower
            .iter()
            .zip(upper)
            .zip(self.tile_extents.iter())
            .all(|((&lo, &up), &extent)| lo < up && up <= extent);
        if !valid {
            return Err(RangeError::InvalidBlock {
                lower: lower.to_vec(),
                upper: upper.to_vec(),
                extents: self.tile_extents.to_vec(),
            });
        }
        Ok(())
    }

    fn volume_at(&self, index: &[usize]) -> usize {
        self.dims
            .iter()
            .zip(index)
            .map(|(d, &i)| d.tile_extent(i).unwrap_or(0))
            .product()
    }
}

fn unravel(mut ordinal: usize, extents: &[usize]) -> TileIndex {
    let mut index: TileIndex = smallvec::smallvec![0; extents.len()];
    for (slot, &extent) in index.iter_mut().zip(extents).rev() {
        *slot = ordinal % extent;
        ordinal /= extent;
    }
    index
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn grid() -> TiledRange {
        TiledRange::from_tile_sizes(&[&[2, 3, 1], &[4, 5]]).unwrap()
    }

    #[test]
    fn test_tiled_range1_rejects_empty_tile() {
        assert!(TiledRange1::new(vec![0, 2, 2]).is_err());
        assert!(TiledRange1::new(vec![3]).is_err());
    }

    #[test]
    fn test_tiled_range1_slice_starts_at_zero() {
        let tr1 = TiledRange1::new(vec![0, 2, 5, 9]).unwrap();
        let sub = tr1.slice(1, 3).unwrap();
        assert_eq!(sub.boundaries(), &[0, 3, 7]);
        assert_eq!(sub.tile_extent(0), Some(3));
        assert_eq!(sub.element_range(), 0..7);

        // equal tilings taken at different positions are the same tiling
        let even = TiledRange1::from_tile_sizes(&[2, 2, 2]).unwrap();
        assert_eq!(even.slice(0, 1).unwrap(), even.slice(2, 3).unwrap());
        assert!(tr1.slice(2, 2).is_err());
        assert!(tr1.slice(0, 4).is_err());
    }

    #[test]
    fn test_ordinal_round_trip() {
        let tr = grid();
        assert_eq!(tr.tile_count(), 6);
        for ord in 0..tr.tile_count() {
            let idx = tr.multi_index_of(ord).unwrap();
            assert_eq!(tr.ordinal_of(&idx).unwrap(), ord);
        }
        assert_eq!(&tr.multi_index_of(3).unwrap()[..], &[1, 1]);
    }

    #[test]
    fn test_tile_volumes() {
        let tr = grid();
        assert_eq!(tr.tile_volumes(), vec![8, 10, 12, 15, 4, 5]);
        assert_eq!(tr.tile_volume(3).unwrap(), 15);
        assert!(tr.tile_volume(6).is_err());
    }

    #[test]
    fn test_ordinal_out_of_bounds() {
        let tr = grid();
        assert!(matches!(
            tr.ordinal_of(&[3, 0]),
            Err(RangeError::IndexOutOfBounds { .. })
        ));
        assert!(matches!(
            tr.ordinal_of(&[0]),
            Err(RangeError::RankMismatch { .. })
        ));
    }

    #[test]
    fn test_permute_moves_tilings() {
        let tr = grid();
        let perm = Permutation::new(vec![1, 0]).unwrap();
        let pt = tr.permute(&perm).unwrap();
        assert_eq!(pt.tile_extents(), &[2, 3]);
        assert_eq!(pt.dim(0), tr.dim(1));
        // tile (i, j) of the original is tile (j, i) of the permuted grid
        let ord = tr.ordinal_of(&[2, 1]).unwrap();
        let pord = pt.ordinal_of(&perm.apply(&[2, 1]).unwrap()).unwrap();
        assert_eq!(tr.tile_volume(ord).unwrap(), pt.tile_volume(pord).unwrap());
    }

    #[test]
    fn test_block() {
        let tr = grid();
        let block = tr.block(&[1, 0], &[3, 1]).unwrap();
        assert_eq!(block.tile_extents(), &[2, 1]);
        assert_eq!(block.tile_volumes(), vec![12, 4]);
        assert_eq!(block.dim(0).unwrap().boundaries(), &[0, 3, 4]);
    }

    #[test]
    fn test_block_rejects_bad_bounds() {
        let tr = grid();
        assert!(tr.block(&[1, 1], &[1, 2]).is_err());
        assert!(tr.block(&[0, 0], &[4, 2]).is_err());
        assert!(tr.block(&[0], &[1]).is_err());
    }

    #[test]
    fn test_block_permuted() {
        let tr = grid();
        let perm = Permutation::new(vec![1, 0]).unwrap();
        let block = tr.block_permuted(&[0, 1], &[2, 2], &perm).unwrap();
        assert_eq!(block.tile_extents(), &[1, 2]);
        assert_eq!(block.tile_volumes(), vec![10, 15]);
    }

    proptest! {
        #[test]
        fn prop_volumes_sum_to_element_count(
            sizes_a in prop::collection::vec(1usize..6, 1..5),
            sizes_b in prop::collection::vec(1usize..6, 1..5),
        ) {
            let tr = TiledRange::from_tile_sizes(&[&sizes_a, &sizes_b]).unwrap();
            let total: usize = tr.tile_volumes().iter().sum();
            let expected: usize = sizes_a.iter().sum::<usize>() * sizes_b.iter().sum::<usize>();
            prop_assert_eq!(total, expected);
        }
    }
}
