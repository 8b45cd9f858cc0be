//! # tilenorm-shape
//!
//! Sparsity shapes for block-sparse tensors.
//!
//! A tensor is cut into tiles; its *shape* records which tiles are
//! negligible. [`SparseShape`] keeps one number per tile, the tile's
//! Frobenius norm divided by its element count, and snaps values below a
//! [`Threshold`] to zero. Operations on tensors have counterparts on shapes
//! that bound the norms of the result without looking at tile data, so a
//! tensor library can decide which result tiles to skip before computing
//! anything.
//!
//! This crate provides:
//!
//! - [`NormTensor`]: dense per-tile norm storage with permutation and block
//!   extraction
//! - [`Threshold`]: the zero-threshold policy carried by every shape
//! - [`algebra`]: per-tile norm bounds for scaling, addition, elementwise
//!   products, masking and contraction
//! - [`GemmHelper`]: axis partition of a contraction
//! - [`SparseShape`], [`DenseShape`] and the closed [`Shape`] enum
//! - [`Collective`], [`LocalGroup`] and [`DistributedShapeBuilder`] for
//!   building one shape from norms computed by several participants
//!
//! ## Quick Start
//!
//! ```
//! use std::sync::Arc;
//!
//! use tilenorm_range::TiledRange;
//! use tilenorm_shape::{NormTensor, SparseShape, Threshold};
//!
//! // two 1-D tiles of 2 and 3 elements
//! let range = Arc::new(TiledRange::from_tile_sizes(&[&[2, 3]]).unwrap());
//! let threshold = Threshold::new(1e-6).unwrap();
//!
//! let a = SparseShape::with_policy(
//!     NormTensor::from_vec(&[2], vec![4.0, 0.0]).unwrap(),
//!     Arc::clone(&range),
//!     threshold,
//! )
//! .unwrap();
//! let b = SparseShape::with_policy(NormTensor::zeros(&[2]), range, threshold).unwrap();
//!
//! assert_eq!(a.add(&b).unwrap().data().unwrap().as_slice(), &[2.0, 0.0]);
//! assert_eq!(a.mult(&b).unwrap().sparsity().unwrap(), 1.0);
//! ```
//!
//! ## Features
//!
//! - `parallel` (default): evaluate per-tile bounds of large tile grids on
//!   the rayon pool (through scirs2-core)
//! - `serde`: serialization of norms, thresholds and configuration
//! - `subscriber`: [`telemetry`] helpers to install a `tracing` subscriber

pub mod algebra;
pub mod collective;
pub mod config;
pub mod dense;
pub mod distributed;
pub mod error;
pub mod gemm;
pub mod norm_tensor;
pub mod shape;
pub mod sparse;
#[cfg(feature = "subscriber")]
pub mod telemetry;
pub mod threshold;

#[cfg(test)]
mod property_tests;

pub use collective::{BlockedOwnership, Collective, LocalComm, LocalGroup, SingleProcess};
pub use config::ShapeConfig;
pub use dense::DenseShape;
pub use distributed::DistributedShapeBuilder;
pub use error::*;
pub use gemm::{GemmHelper, Transpose};
pub use norm_tensor::{NormScalar, NormTensor};
pub use shape::Shape;
pub use sparse::SparseShape;
pub use threshold::Threshold;
