//! Error types for tile geometry

use thiserror::Error;

/// Errors raised while building or querying tile geometry
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RangeError {
    #[error("Invalid tile boundaries {boundaries:?}: {reason}")]
    InvalidBoundaries {
        boundaries: Vec<usize>,
        reason: String,
    },

    #[error("Invalid permutation {map:?}: {reason}")]
    InvalidPermutation { map: Vec<usize>, reason: String },

    #[error("Rank mismatch: expected {expected}, got {got}")]
    RankMismatch { expected: usize, got: usize },

    #[error("Tile index {index:?} out of bounds for tile grid {extents:?}")]
    IndexOutOfBounds {
        index: Vec<usize>,
        extents: Vec<usize>,
    },

    #[error("Tile ordinal {ordinal} out of bounds for {count} tiles")]
    OrdinalOutOfBounds { ordinal: usize, count: usize },

    #[error("Invalid block [{lower:?}, {upper:?}) for tile grid {extents:?}")]
    InvalidBlock {
        lower: Vec<usize>,
        upper: Vec<usize>,
        extents: Vec<usize>,
    },
}

/// Result type alias for geometry operations
pub type RangeResult<T> = Result<T, RangeError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ordinal_error_display() {
        let err = RangeError::OrdinalOutOfBounds {
            ordinal: 7,
            count: 6,
        };
        assert_eq!(err.to_string(), "Tile ordinal 7 out of bounds for 6 tiles");
    }

    #[test]
    fn test_block_error_display() {
        let err = RangeError::InvalidBlock {
            lower: vec![1, 0],
            upper: vec![1, 2],
            extents: vec![2, 2],
        };
        assert_eq!(
            err.to_string(),
            "Invalid block [[1, 0], [1, 2]) for tile grid [2, 2]"
        );
    }
}
