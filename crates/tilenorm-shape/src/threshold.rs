//! Zero-threshold policy.
//!
//! A scaled tile norm (norm per element) strictly below the threshold marks
//! the tile as negligible and is snapped to exactly zero. Every value that
//! survives is therefore either `0` or `>= threshold`.
//!
//! The threshold is an explicit value carried by each shape rather than a
//! process-wide global, so differently configured shapes can coexist in one
//! process. Changing the policy of a shape is done with
//! [`SparseShape::with_threshold`](crate::SparseShape::with_threshold), which
//! re-applies the new policy to the stored norms.

use crate::error::{ShapeError, ShapeResult};
use crate::norm_tensor::{NormScalar, NormTensor};

/// Nonnegative cutoff below which a scaled tile norm counts as zero.
///
/// # Examples
///
/// ```
/// use tilenorm_shape::Threshold;
///
/// let t = Threshold::new(1e-6_f64).unwrap();
/// assert_eq!(t.snap(5e-7), 0.0);
/// assert_eq!(t.snap(1e-6), 1e-6);
/// assert!(t.is_zero(0.0));
/// assert!(Threshold::new(-1.0_f64).is_err());
/// ```
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Threshold<T> {
    value: T,
}

impl<T: NormScalar> Threshold<T> {
    /// # Errors
    ///
    /// Returns [`ShapeError::InvalidThreshold`] for a negative or
    /// non-finite value.
    pub fn new(value: T) -> ShapeResult<Self> {
        if !value.is_finite() || value < T::zero() {
            return Err(ShapeError::InvalidThreshold(value.to_f64().unwrap_or(f64::NAN)));
        }
        Ok(Self { value })
    }

    pub fn value(&self) -> T {
        self.value
    }

    pub fn is_zero(&self, scaled_norm: T) -> bool {
        scaled_norm < self.value
    }

    /// Snap a scaled norm below the threshold to zero.
    pub fn snap(&self, scaled_norm: T) -> T {
        if self.is_zero(scaled_norm) {
            T::zero()
        } else {
            scaled_norm
        }
    }

    /// Snap every entry of `norms` in place, returning the zero count.
    pub fn apply(&self, norms: &mut NormTensor<T>) -> usize {
        let mut zeros = 0;
        for v in norms.as_mut_slice() {
            if self.is_zero(*v) {
                *v = T::zero();
                zeros += 1;
            }
        }
        zeros
    }
}

impl<T: NormScalar> Default for Threshold<T> {
    /// Single-precision machine epsilon, whatever the norm type.
    fn default() -> Self {
        Self {
            value: T::from_f32(f32::EPSILON).unwrap_or_else(T::epsilon),
        }
    }
}
