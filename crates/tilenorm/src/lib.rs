//! # tilenorm - Tile-Norm Sparsity Tracking
//!
//! Screening of block-sparse tensor algebra by per-tile norm bounds.
//!
//! This is the **meta crate** that re-exports the tilenorm components for
//! convenient access.
//!
//! ## Quick Start
//!
//! ```
//! use std::sync::Arc;
//!
//! use tilenorm::prelude::*;
//!
//! // 2 x 2 tile grid of 2 x 2 element tiles
//! let range = Arc::new(TiledRange::from_tile_sizes(&[&[2, 2], &[2, 2]])?);
//! let threshold = Threshold::new(1e-6)?;
//! let norms = NormTensor::from_vec(&[2, 2], vec![4.0, 0.0, 0.0, 4.0])?;
//! let a = SparseShape::with_policy(norms, range, threshold)?;
//!
//! // block-diagonal times block-diagonal stays block-diagonal
//! let helper = GemmHelper::new(Transpose::NoTrans, Transpose::NoTrans, 2, 2, 2)?;
//! let c = a.gemm(&a, 1.0, &helper)?;
//! assert!(!c.is_zero(0)?);
//! assert!(c.is_zero(1)?);
//! assert_eq!(c.sparsity()?, 0.5);
//! # Ok::<(), anyhow::Error>(())
//! ```
//!
//! ## Components
//!
//! ### Tile Geometry ([`range`])
//!
//! Tiled index ranges, tile ordinals, volumes and axis permutations.
//!
//! ```
//! use tilenorm::range::{Permutation, TiledRange};
//!
//! let tr = TiledRange::from_tile_sizes(&[&[2, 3], &[3, 3, 3]]).unwrap();
//! let swap = Permutation::new(vec![1, 0]).unwrap();
//! assert_eq!(tr.permute(&swap).unwrap().tile_extents(), &[3, 2]);
//! ```
//!
//! ### Shapes ([`shape`])
//!
//! Sparse and dense shapes, norm bounds for every tensor operation, and
//! construction of one shape from norms computed by several participants.
//!
//! ```
//! use std::sync::Arc;
//!
//! use tilenorm::range::TiledRange;
//! use tilenorm::shape::{DistributedShapeBuilder, NormTensor, SingleProcess};
//!
//! let range = Arc::new(TiledRange::from_tile_sizes(&[&[2, 3]]).unwrap());
//! let local = NormTensor::from_vec(&[2], vec![4.0, 0.0]).unwrap();
//! let shape = DistributedShapeBuilder::new(&SingleProcess).build(local, range).unwrap();
//! assert_eq!(shape.data().unwrap().as_slice(), &[2.0, 0.0]);
//! ```
//!
//! ## Features
//!
//! - `parallel` (default): parallel per-tile bounds on large tile grids
//! - `serde`: serialization support
//! - `subscriber`: `tracing` subscriber setup helpers
//! - `full`: Enable all features

pub use tilenorm_range as range;
pub use tilenorm_shape as shape;

pub mod prelude {
    //! Prelude module for convenient imports
    //!
    //! # Example
    //!
    //! ```
    //! use tilenorm::prelude::*;
    //!
    //! let threshold = Threshold::<f64>::default();
    //! assert!(threshold.is_zero(0.0));
    //! ```

    // Geometry
    pub use crate::range::{Permutation, TiledRange, TiledRange1};

    // Shapes
    pub use crate::shape::{DenseShape, Shape, SparseShape};

    // Norms and thresholds
    pub use crate::shape::{NormScalar, NormTensor, ShapeConfig, Threshold};

    // Contraction
    pub use crate::shape::{GemmHelper, Transpose};

    // Distributed construction
    pub use crate::shape::{Collective, DistributedShapeBuilder, LocalGroup, SingleProcess};

    // Errors
    pub use crate::shape::{ShapeError, ShapeResult};
}
