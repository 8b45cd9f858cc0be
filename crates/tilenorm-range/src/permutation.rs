//! Axis permutations.
//!
//! A [`Permutation`] of rank `n` maps axis `i` of its argument to axis
//! `map[i]` of its result. Applied to a multi-index `idx`, it produces `r`
//! with `r[map[i]] = idx[i]`; applied to a tiling it moves per-axis tilings
//! the same way.

use crate::error::{RangeError, RangeResult};
use crate::TileIndex;

/// A bijection on the axes `0..rank`.
///
/// # Examples
///
/// ```
/// use tilenorm_range::Permutation;
///
/// let perm = Permutation::new(vec![2, 0, 1]).unwrap();
/// // axis 0 -> 2, axis 1 -> 0, axis 2 -> 1
/// assert_eq!(&perm.apply(&[10, 20, 30]).unwrap()[..], &[20, 30, 10]);
///
/// let inv = perm.inverse();
/// let round_trip = inv.apply(&perm.apply(&[10, 20, 30]).unwrap()).unwrap();
/// assert_eq!(&round_trip[..], &[10, 20, 30]);
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Permutation {
    map: Vec<usize>,
}

impl Permutation {
    /// Create a permutation from its axis map.
    ///
    /// # Errors
    ///
    /// Returns [`RangeError::InvalidPermutation`] if `map` is not a bijection
    /// on `0..map.len()`.
    pub fn new(map: Vec<usize>) -> RangeResult<Self> {
        let mut seen = vec![false; map.len()];
        for &axis in &map {
            if axis >= map.len() {
                return Err(RangeError::InvalidPermutation {
                    reason: format!("axis {} exceeds rank {}", axis, map.len()),
                    map,
                });
            }
            if seen[axis] {
                return Err(RangeError::InvalidPermutation {
                    reason: format!("axis {} appears more than once", axis),
                    map,
                });
            }
            seen[axis] = true;
        }
        Ok(Self { map })
    }

    /// The identity permutation on `rank` axes.
    pub fn identity(rank: usize) -> Self {
        Self {
            map: (0..rank).collect(),
        }
    }

    pub fn rank(&self) -> usize {
        self.map.len()
    }

    pub fn is_identity(&self) -> bool {
        self.map.iter().enumerate().all(|(i, &axis)| i == axis)
    }

    /// The axis map, `map[i]` being the destination of axis `i`.
    pub fn as_slice(&self) -> &[usize] {
        &self.map
    }

    pub fn inverse(&self) -> Self {
        let mut inv = vec![0; self.map.len()];
        for (i, &axis) in self.map.iter().enumerate() {
            inv[axis] = i;
        }
        Self { map: inv }
    }

    /// Apply the permutation to a multi-index.
    ///
    /// # Errors
    ///
    /// Returns [`RangeError::RankMismatch`] when `index` does not have the
    /// permutation's rank.
    pub fn apply(&self, index: &[usize]) -> RangeResult<TileIndex> {
        Ok(self.permute_axes(index)?.into_iter().collect())
    }

    /// Move per-axis data (extents, tilings, bounds) to their permuted axes.
    pub fn permute_axes<T: Clone>(&self, items: &[T]) -> RangeResult<Vec<T>> {
        if items.len() != self.map.len() {
            return Err(RangeError::RankMismatch {
                expected: self.map.len(),
                got: items.len(),
            });
        }
        let mut slots: Vec<Option<T>> = vec![None; items.len()];
        for (item, &axis) in items.iter().zip(&self.map) {
            slots[axis] = Some(item.clone());
        }
        Ok(slots.into_iter().flatten().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity() {
        let perm = Permutation::identity(3);
        assert!(perm.is_identity());
        assert_eq!(&perm.apply(&[4, 5, 6]).unwrap()[..], &[4, 5, 6]);
    }

    #[test]
    fn test_swap() {
        let perm = Permutation::new(vec![1, 0]).unwrap();
        assert!(!perm.is_identity());
        assert_eq!(&perm.apply(&[3, 7]).unwrap()[..], &[7, 3]);
        assert_eq!(perm.inverse(), perm);
    }

    #[test]
    fn test_cycle_inverse() {
        let perm = Permutation::new(vec![1, 2, 0]).unwrap();
        let inv = perm.inverse();
        assert_eq!(inv.as_slice(), &[2, 0, 1]);
        let idx = perm.apply(&[0, 1, 2]).unwrap();
        assert_eq!(&idx[..], &[2, 0, 1]);
        assert_eq!(&inv.apply(&idx).unwrap()[..], &[0, 1, 2]);
    }

    #[test]
    fn test_rejects_duplicate_axis() {
        let err = Permutation::new(vec![0, 0]).unwrap_err();
        assert!(matches!(err, RangeError::InvalidPermutation { .. }));
    }

    #[test]
    fn test_rejects_out_of_range_axis() {
        assert!(Permutation::new(vec![0, 2]).is_err());
    }

    #[test]
    fn test_rank_mismatch() {
        let perm = Permutation::identity(2);
        assert_eq!(
            perm.apply(&[1, 2, 3]).unwrap_err(),
            RangeError::RankMismatch {
                expected: 2,
                got: 3
            }
        );
    }
}
