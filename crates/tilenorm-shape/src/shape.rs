//! The closed set of tile shapes.
//!
//! [`Shape`] is either [`DenseShape`] or [`SparseShape`]. Combining two
//! sparse shapes runs the sparse algebra; as soon as one operand is dense the
//! result is dense and no norms are computed.
//!
//! # Examples
//!
//! ```
//! use std::sync::Arc;
//!
//! use tilenorm_range::TiledRange;
//! use tilenorm_shape::{DenseShape, NormTensor, Shape, SparseShape};
//!
//! let range = Arc::new(TiledRange::from_tile_sizes(&[&[2, 3]]).unwrap());
//! let sparse: Shape<f64> =
//!     SparseShape::new(NormTensor::from_vec(&[2], vec![4.0, 0.0]).unwrap(), range)
//!         .unwrap()
//!         .into();
//! let dense: Shape<f64> = DenseShape.into();
//!
//! assert!(!sparse.add(&sparse).unwrap().is_dense());
//! assert!(sparse.add(&dense).unwrap().is_dense());
//! ```

use tilenorm_range::{Permutation, TiledRange};

use crate::dense::DenseShape;
use crate::error::{ShapeError, ShapeResult};
use crate::gemm::GemmHelper;
use crate::norm_tensor::{NormScalar, NormTensor};
use crate::sparse::SparseShape;

/// Dense or sparse tile shape.
#[derive(Clone, Debug, PartialEq)]
pub enum Shape<T> {
    Dense(DenseShape),
    Sparse(SparseShape<T>),
}

impl<T> From<DenseShape> for Shape<T> {
    fn from(shape: DenseShape) -> Self {
        Shape::Dense(shape)
    }
}

impl<T> From<SparseShape<T>> for Shape<T> {
    fn from(shape: SparseShape<T>) -> Self {
        Shape::Sparse(shape)
    }
}

impl<T: NormScalar> Shape<T> {
    pub fn is_dense(&self) -> bool {
        matches!(self, Shape::Dense(_))
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Shape::Dense(d) => d.is_empty(),
            Shape::Sparse(s) => s.is_empty(),
        }
    }

    pub fn validate(&self, range: &TiledRange) -> bool {
        match self {
            Shape::Dense(d) => d.validate(range),
            Shape::Sparse(s) => s.validate(range),
        }
    }

    pub fn as_sparse(&self) -> Option<&SparseShape<T>> {
        match self {
            Shape::Sparse(s) => Some(s),
            Shape::Dense(_) => None,
        }
    }

    pub fn is_zero(&self, ordinal: usize) -> ShapeResult<bool> {
        match self {
            Shape::Dense(d) => Ok(d.is_zero(ordinal)),
            Shape::Sparse(s) => s.is_zero(ordinal),
        }
    }

    pub fn sparsity(&self) -> ShapeResult<f64> {
        match self {
            Shape::Dense(d) => Ok(d.sparsity()),
            Shape::Sparse(s) => s.sparsity(),
        }
    }

    pub fn perm(&self, perm: &Permutation) -> ShapeResult<Self> {
        self.unary(|s| s.perm(perm))
    }

    pub fn scale(&self, factor: T) -> ShapeResult<Self> {
        self.unary(|s| s.scale(factor))
    }

    pub fn scale_perm(&self, factor: T, perm: &Permutation) -> ShapeResult<Self> {
        self.unary(|s| s.scale_perm(factor, perm))
    }

    pub fn add(&self, other: &Self) -> ShapeResult<Self> {
        self.binary("add", other, |a, b| a.add(b))
    }

    pub fn add_scaled(&self, other: &Self, factor: T) -> ShapeResult<Self> {
        self.binary("add_scaled", other, |a, b| a.add_scaled(b, factor))
    }

    pub fn add_perm(&self, other: &Self, perm: &Permutation) -> ShapeResult<Self> {
        self.binary("add_perm", other, |a, b| a.add_perm(b, perm))
    }

    pub fn add_scaled_perm(&self, other: &Self, factor: T, perm: &Permutation) -> ShapeResult<Self> {
        self.binary("add_scaled_perm", other, |a, b| a.add_scaled_perm(b, factor, perm))
    }

    pub fn add_const(&self, constant: T) -> ShapeResult<Self> {
        self.unary(|s| s.add_const(constant))
    }

    pub fn add_const_perm(&self, constant: T, perm: &Permutation) -> ShapeResult<Self> {
        self.unary(|s| s.add_const_perm(constant, perm))
    }

    pub fn subt(&self, other: &Self) -> ShapeResult<Self> {
        self.binary("subt", other, |a, b| a.subt(b))
    }

    pub fn subt_scaled(&self, other: &Self, factor: T) -> ShapeResult<Self> {
        self.binary("subt_scaled", other, |a, b| a.subt_scaled(b, factor))
    }

    pub fn subt_perm(&self, other: &Self, perm: &Permutation) -> ShapeResult<Self> {
        self.binary("subt_perm", other, |a, b| a.subt_perm(b, perm))
    }

    pub fn subt_scaled_perm(&self, other: &Self, factor: T, perm: &Permutation) -> ShapeResult<Self> {
        self.binary("subt_scaled_perm", other, |a, b| a.subt_scaled_perm(b, factor, perm))
    }

    pub fn subt_const(&self, constant: T) -> ShapeResult<Self> {
        self.unary(|s| s.subt_const(constant))
    }

    pub fn subt_const_perm(&self, constant: T, perm: &Permutation) -> ShapeResult<Self> {
        self.unary(|s| s.subt_const_perm(constant, perm))
    }

    pub fn mult(&self, other: &Self) -> ShapeResult<Self> {
        self.binary("mult", other, |a, b| a.mult(b))
    }

    pub fn mult_scaled(&self, other: &Self, factor: T) -> ShapeResult<Self> {
        self.binary("mult_scaled", other, |a, b| a.mult_scaled(b, factor))
    }

    pub fn mult_perm(&self, other: &Self, perm: &Permutation) -> ShapeResult<Self> {
        self.binary("mult_perm", other, |a, b| a.mult_perm(b, perm))
    }

    pub fn mult_scaled_perm(&self, other: &Self, factor: T, perm: &Permutation) -> ShapeResult<Self> {
        self.binary("mult_scaled_perm", other, |a, b| a.mult_scaled_perm(b, factor, perm))
    }

    pub fn gemm(&self, other: &Self, factor: T, helper: &GemmHelper) -> ShapeResult<Self> {
        self.binary("gemm", other, |a, b| a.gemm(b, factor, helper))
    }

    pub fn gemm_perm(
        &self,
        other: &Self,
        factor: T,
        helper: &GemmHelper,
        perm: &Permutation,
    ) -> ShapeResult<Self> {
        self.binary("gemm_perm", other, |a, b| a.gemm_perm(b, factor, helper, perm))
    }

    pub fn block(&self, lower: &[usize], upper: &[usize]) -> ShapeResult<Self> {
        self.unary(|s| s.block(lower, upper))
    }

    pub fn block_scaled(&self, lower: &[usize], upper: &[usize], factor: T) -> ShapeResult<Self> {
        self.unary(|s| s.block_scaled(lower, upper, factor))
    }

    pub fn block_perm(&self, lower: &[usize], upper: &[usize], perm: &Permutation) -> ShapeResult<Self> {
        self.unary(|s| s.block_perm(lower, upper, perm))
    }

    pub fn block_scaled_perm(
        &self,
        lower: &[usize],
        upper: &[usize],
        factor: T,
        perm: &Permutation,
    ) -> ShapeResult<Self> {
        self.unary(|s| s.block_scaled_perm(lower, upper, factor, perm))
    }

    pub fn mask(&self, mask: &Self) -> ShapeResult<Self> {
        self.binary("mask", mask, |a, b| a.mask(b))
    }

    /// Sparse: [`SparseShape::transform`]. Dense shapes are returned as is.
    pub fn transform<F>(&self, op: F) -> ShapeResult<Self>
    where
        F: FnOnce(&NormTensor<T>) -> NormTensor<T>,
    {
        self.unary(|s| s.transform(op))
    }

    fn unary<F>(&self, op: F) -> ShapeResult<Self>
    where
        F: FnOnce(&SparseShape<T>) -> ShapeResult<SparseShape<T>>,
    {
        match self {
            Shape::Dense(d) => Ok(Shape::Dense(*d)),
            Shape::Sparse(s) => op(s).map(Shape::Sparse),
        }
    }

    fn binary<F>(&self, operation: &'static str, other: &Self, op: F) -> ShapeResult<Self>
    where
        F: FnOnce(&SparseShape<T>, &SparseShape<T>) -> ShapeResult<SparseShape<T>>,
    {
        match (self, other) {
            (Shape::Sparse(a), Shape::Sparse(b)) => op(a, b).map(Shape::Sparse),
            (Shape::Sparse(s), Shape::Dense(_)) | (Shape::Dense(_), Shape::Sparse(s)) if s.is_empty() => {
                Err(ShapeError::InvalidState { operation })
            }
            _ => Ok(Shape::Dense(DenseShape)),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::error::ErrorKind;
    use crate::gemm::Transpose;

    fn sparse(scaled: &[f64]) -> Shape<f64> {
        let sizes = vec![1; scaled.len()];
        let range = Arc::new(TiledRange::from_tile_sizes(&[sizes.as_slice()]).unwrap());
        let norms = NormTensor::from_vec(&[scaled.len()], scaled.to_vec()).unwrap();
        SparseShape::new(norms, range).unwrap().into()
    }

    #[test]
    fn test_sparse_sparse_stays_sparse() {
        let a = sparse(&[1.0, 0.0]);
        let sum = a.add(&a).unwrap();
        assert!(!sum.is_dense());
        assert_eq!(sum.as_sparse().unwrap().data().unwrap().as_slice(), &[2.0, 0.0]);
        assert_eq!(sum.sparsity().unwrap(), 0.5);
        assert!(sum.is_zero(1).unwrap());
    }

    #[test]
    fn test_dense_operand_gives_dense() {
        let a = sparse(&[1.0, 0.0]);
        let d: Shape<f64> = DenseShape.into();
        let helper = GemmHelper::new(Transpose::NoTrans, Transpose::NoTrans, 1, 1, 2).unwrap();
        for result in [
            a.add(&d).unwrap(),
            d.subt(&a).unwrap(),
            a.mult(&d).unwrap(),
            d.mask(&a).unwrap(),
            a.mask(&d).unwrap(),
            d.gemm(&a, 2.0, &helper).unwrap(),
            d.scale(3.0).unwrap(),
            d.block(&[0], &[1]).unwrap(),
        ] {
            assert!(result.is_dense());
            assert_eq!(result.sparsity().unwrap(), 0.0);
        }
    }

    #[test]
    fn test_empty_sparse_with_dense_is_invalid() {
        let empty: Shape<f64> = SparseShape::default().into();
        let d: Shape<f64> = DenseShape.into();
        assert!(empty.is_empty());
        assert_eq!(empty.add(&d).unwrap_err().kind(), ErrorKind::InvalidState);
        assert_eq!(d.mult(&empty).unwrap_err().kind(), ErrorKind::InvalidState);
        assert_eq!(empty.scale(1.0).unwrap_err().kind(), ErrorKind::InvalidState);
    }

    #[test]
    fn test_validate() {
        let range = TiledRange::from_tile_sizes(&[&[1, 1]]).unwrap();
        let other = TiledRange::from_tile_sizes(&[&[2]]).unwrap();
        let a = sparse(&[1.0, 0.0]);
        assert!(a.validate(&range));
        assert!(!a.validate(&other));
        assert!(Shape::<f64>::Dense(DenseShape).validate(&other));
    }
}
