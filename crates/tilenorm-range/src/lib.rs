//! # tilenorm-range
//!
//! Tile geometry for block-sparse tensors.
//!
//! A tensor's index space is cut along every axis into contiguous tiles
//! ([`TiledRange1`]); the Cartesian product of the per-axis tilings forms a
//! dense grid of rectangular tiles ([`TiledRange`]). Tiles are addressed
//! either by a multi-index into that grid or by a row-major ordinal.
//!
//! This crate provides only what shape tracking needs from the geometry:
//!
//! - ordinal ↔ multi-index mapping
//! - tile volumes (element counts)
//! - axis permutations ([`Permutation`]) applied to indices and tilings
//! - block sub-geometries addressed from zero
//!
//! ## Quick Start
//!
//! ```
//! use tilenorm_range::{Permutation, TiledRange};
//!
//! // 2 x 3 tile grid over a 5 x 9 element index space
//! let tr = TiledRange::from_tile_sizes(&[&[2, 3], &[3, 3, 3]]).unwrap();
//! assert_eq!(tr.tile_extents(), &[2, 3]);
//! assert_eq!(tr.tile_count(), 6);
//!
//! let ord = tr.ordinal_of(&[1, 2]).unwrap();
//! assert_eq!(ord, 5);
//! assert_eq!(tr.tile_volume(ord).unwrap(), 9);
//!
//! let perm = Permutation::new(vec![1, 0]).unwrap();
//! let transposed = tr.permute(&perm).unwrap();
//! assert_eq!(transposed.tile_extents(), &[3, 2]);
//! ```

pub mod error;
pub mod permutation;
pub mod tiled_range;

pub use error::*;
pub use permutation::Permutation;
pub use tiled_range::{TiledRange, TiledRange1};

use smallvec::SmallVec;

/// Multi-index of a tile within the tile grid.
///
/// Inline storage covers tensors of up to six dimensions.
pub type TileIndex = SmallVec<[usize; 6]>;
