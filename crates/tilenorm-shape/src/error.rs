//! Error types for shape construction and shape algebra
//!
//! Every failure is reported synchronously at the offending call. Nothing is
//! retried and nothing is silently repaired: a shape that cannot be computed
//! exactly as requested is an error, never a best-effort result.
//!
//! # Examples
//!
//! ```
//! use tilenorm_shape::{ErrorKind, SparseShape};
//!
//! let empty = SparseShape::<f32>::default();
//! let err = empty.scale(2.0).unwrap_err();
//! assert_eq!(err.kind(), ErrorKind::InvalidState);
//! ```

use thiserror::Error;
use tilenorm_range::RangeError;

/// Top-level error type for shape operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ShapeError {
    /// Operation invoked on a default-constructed (empty) shape
    #[error("{operation}: shape is empty")]
    InvalidState { operation: &'static str },

    /// Operands disagree on tile geometry or rank
    #[error("{operation}: shape mismatch - expected {expected:?}, got {got:?}")]
    ShapeMismatch {
        operation: &'static str,
        expected: Vec<usize>,
        got: Vec<usize>,
    },

    /// Block bounds outside the tile grid or empty on some axis
    #[error("{operation}: block [{lower:?}, {upper:?}) is invalid for tile grid {extents:?}")]
    OutOfRange {
        operation: &'static str,
        lower: Vec<usize>,
        upper: Vec<usize>,
        extents: Vec<usize>,
    },

    /// Tile ordinal past the end of the tile grid
    #[error("{operation}: tile ordinal {ordinal} out of range for {count} tiles")]
    TileOutOfRange {
        operation: &'static str,
        ordinal: usize,
        count: usize,
    },

    /// Contraction axis partition inconsistent with operand ranks
    #[error("{operation}: dimension mismatch - {reason}")]
    DimensionMismatch {
        operation: &'static str,
        reason: String,
    },

    /// Input norm is negative or not finite
    #[error("Invalid norm {value} for tile {ordinal}: norms must be finite and nonnegative")]
    InvalidNorm { ordinal: usize, value: f64 },

    /// Scale factor or constant is not finite
    #[error("{operation}: invalid scalar argument {value}: must be finite")]
    InvalidFactor { operation: &'static str, value: f64 },

    /// Threshold is negative or not finite
    #[error("Invalid zero threshold {0}: must be finite and nonnegative")]
    InvalidThreshold(f64),

    /// Failure inside a collective reduction
    #[error("Collective error: {0}")]
    Collective(String),

    /// Tile geometry error
    #[error("Range error: {0}")]
    Range(#[from] RangeError),
}

/// Coarse classification of a [`ShapeError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    InvalidState,
    ShapeMismatch,
    OutOfRange,
    DimensionMismatch,
    InvalidInput,
    Collective,
}

impl ShapeError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ShapeError::InvalidState { .. } => ErrorKind::InvalidState,
            ShapeError::ShapeMismatch { .. } => ErrorKind::ShapeMismatch,
            ShapeError::OutOfRange { .. } | ShapeError::TileOutOfRange { .. } => {
                ErrorKind::OutOfRange
            }
            ShapeError::DimensionMismatch { .. } => ErrorKind::DimensionMismatch,
            ShapeError::InvalidNorm { .. }
            | ShapeError::InvalidFactor { .. }
            | ShapeError::InvalidThreshold(_) => ErrorKind::InvalidInput,
            ShapeError::Collective(_) => ErrorKind::Collective,
            ShapeError::Range(err) => match err {
                RangeError::RankMismatch { .. } => ErrorKind::ShapeMismatch,
                RangeError::IndexOutOfBounds { .. }
                | RangeError::OrdinalOutOfBounds { .. }
                | RangeError::InvalidBlock { .. } => ErrorKind::OutOfRange,
                RangeError::InvalidBoundaries { .. } | RangeError::InvalidPermutation { .. } => {
                    ErrorKind::InvalidInput
                }
            },
        }
    }

    pub(crate) fn dimension_mismatch(operation: &'static str, reason: impl Into<String>) -> Self {
        ShapeError::DimensionMismatch {
            operation,
            reason: reason.into(),
        }
    }

    pub(crate) fn shape_mismatch(operation: &'static str, expected: &[usize], got: &[usize]) -> Self {
        ShapeError::ShapeMismatch {
            operation,
            expected: expected.to_vec(),
            got: got.to_vec(),
        }
    }
}

/// Result type alias for shape operations
pub type ShapeResult<T> = Result<T, ShapeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_state_display() {
        let err = ShapeError::InvalidState { operation: "scale" };
        assert_eq!(err.to_string(), "scale: shape is empty");
        assert_eq!(err.kind(), ErrorKind::InvalidState);
    }

    #[test]
    fn test_range_error_kind() {
        let err: ShapeError = RangeError::InvalidBlock {
            lower: vec![1],
            upper: vec![1],
            extents: vec![2],
        }
        .into();
        assert_eq!(err.kind(), ErrorKind::OutOfRange);

        let err: ShapeError = RangeError::RankMismatch {
            expected: 2,
            got: 3,
        }
        .into();
        assert_eq!(err.kind(), ErrorKind::ShapeMismatch);
    }

    #[test]
    fn test_shape_mismatch_display() {
        let err = ShapeError::shape_mismatch("add", &[2, 3], &[3, 2]);
        assert_eq!(
            err.to_string(),
            "add: shape mismatch - expected [2, 3], got [3, 2]"
        );
    }
}
