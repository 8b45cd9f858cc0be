//! Dense tile shapes.
//!
//! [`DenseShape`] treats every tile as present. It stores nothing and every
//! operation on it yields another `DenseShape`: once one operand is fully
//! dense there is no sparsity left worth tracking.

use tilenorm_range::{Permutation, TiledRange};

use crate::gemm::GemmHelper;

/// Shape in which no tile is zero.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DenseShape;

impl DenseShape {
    pub fn is_empty(&self) -> bool {
        false
    }

    pub fn is_dense(&self) -> bool {
        true
    }

    /// A dense shape fits any tile grid.
    pub fn validate(&self, _range: &TiledRange) -> bool {
        true
    }

    pub fn is_zero(&self, _ordinal: usize) -> bool {
        false
    }

    pub fn sparsity(&self) -> f64 {
        0.0
    }

    pub fn perm(&self, _perm: &Permutation) -> Self {
        Self
    }

    pub fn scale<T>(&self, _factor: T) -> Self {
        Self
    }

    pub fn scale_perm<T>(&self, _factor: T, _perm: &Permutation) -> Self {
        Self
    }

    pub fn add(&self, _other: &Self) -> Self {
        Self
    }

    pub fn add_scaled<T>(&self, _other: &Self, _factor: T) -> Self {
        Self
    }

    pub fn add_perm(&self, _other: &Self, _perm: &Permutation) -> Self {
        Self
    }

    pub fn add_scaled_perm<T>(&self, _other: &Self, _factor: T, _perm: &Permutation) -> Self {
        Self
    }

    pub fn add_const<T>(&self, _constant: T) -> Self {
        Self
    }

    pub fn add_const_perm<T>(&self, _constant: T, _perm: &Permutation) -> Self {
        Self
    }

    pub fn subt(&self, _other: &Self) -> Self {
        Self
    }

    pub fn subt_scaled<T>(&self, _other: &Self, _factor: T) -> Self {
        Self
    }

    pub fn subt_perm(&self, _other: &Self, _perm: &Permutation) -> Self {
        Self
    }

    pub fn subt_scaled_perm<T>(&self, _other: &Self, _factor: T, _perm: &Permutation) -> Self {
        Self
    }

    pub fn subt_const<T>(&self, _constant: T) -> Self {
        Self
    }

    pub fn subt_const_perm<T>(&self, _constant: T, _perm: &Permutation) -> Self {
        Self
    }

    pub fn mult(&self, _other: &Self) -> Self {
        Self
    }

    pub fn mult_scaled<T>(&self, _other: &Self, _factor: T) -> Self {
        Self
    }

    pub fn mult_perm(&self, _other: &Self, _perm: &Permutation) -> Self {
        Self
    }

    pub fn mult_scaled_perm<T>(&self, _other: &Self, _factor: T, _perm: &Permutation) -> Self {
        Self
    }

    pub fn gemm<T>(&self, _other: &Self, _factor: T, _helper: &GemmHelper) -> Self {
        Self
    }

    pub fn gemm_perm<T>(
        &self,
        _other: &Self,
        _factor: T,
        _helper: &GemmHelper,
        _perm: &Permutation,
    ) -> Self {
        Self
    }

    pub fn block(&self, _lower: &[usize], _upper: &[usize]) -> Self {
        Self
    }

    pub fn block_scaled<T>(&self, _lower: &[usize], _upper: &[usize], _factor: T) -> Self {
        Self
    }

    pub fn block_perm(&self, _lower: &[usize], _upper: &[usize], _perm: &Permutation) -> Self {
        Self
    }

    pub fn block_scaled_perm<T>(
        &self,
        _lower: &[usize],
        _upper: &[usize],
        _factor: T,
        _perm: &Permutation,
    ) -> Self {
        Self
    }

    pub fn mask(&self, _mask: &Self) -> Self {
        Self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gemm::Transpose;

    #[test]
    fn test_queries() {
        let range = TiledRange::from_tile_sizes(&[&[2, 3]]).unwrap();
        let d = DenseShape;
        assert!(d.is_dense());
        assert!(!d.is_empty());
        assert!(d.validate(&range));
        assert!(!d.is_zero(1));
        assert_eq!(d.sparsity(), 0.0);
    }

    #[test]
    fn test_operations_stay_dense() {
        let d = DenseShape;
        let p = Permutation::new(vec![1, 0]).unwrap();
        let helper = GemmHelper::new(Transpose::NoTrans, Transpose::NoTrans, 2, 2, 2).unwrap();
        assert_eq!(d.scale_perm(-1.0, &p), DenseShape);
        assert_eq!(d.add_scaled(&d, 2.0_f32), DenseShape);
        assert_eq!(d.mult(&d), DenseShape);
        assert_eq!(d.gemm(&d, 1.0, &helper), DenseShape);
        assert_eq!(d.block(&[0, 0], &[1, 1]), DenseShape);
        assert_eq!(d.mask(&d), DenseShape);
    }
}
