//! Property-based tests for shape algebra
//!
//! These check the bounds and invariants that hold for every shape, over
//! randomly generated tile grids and norms.

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use proptest::prelude::*;
    use scirs2_core::random::{Rng, SeedableRng, StdRng};
    use tilenorm_range::{Permutation, TiledRange};

    use crate::{NormTensor, SparseShape, Threshold};

    const THRESHOLD: f64 = 1e-3;

    /// Tile sizes for 1 to 3 axes, 1 to 4 tiles per axis.
    fn tile_sizes_strategy() -> impl Strategy<Value = Vec<Vec<usize>>> {
        prop::collection::vec(prop::collection::vec(1usize..5, 1..=4), 1..=3)
    }

    fn make_range(sizes: &[Vec<usize>]) -> Arc<TiledRange> {
        let sizes: Vec<&[usize]> = sizes.iter().map(Vec::as_slice).collect();
        Arc::new(TiledRange::from_tile_sizes(&sizes).unwrap())
    }

    /// Tile grid plus two sets of unscaled norms on it; about a third of the
    /// tiles are zero.
    fn two_shapes_strategy() -> impl Strategy<Value = (Vec<Vec<usize>>, Vec<f64>, Vec<f64>)> {
        tile_sizes_strategy().prop_flat_map(|sizes| {
            let count: usize = sizes.iter().map(Vec::len).product();
            let norm = prop_oneof![Just(0.0), 1e-4..10.0f64, 1e-4..10.0f64];
            (
                Just(sizes),
                prop::collection::vec(norm.clone(), count),
                prop::collection::vec(norm, count),
            )
        })
    }

    fn build(range: &Arc<TiledRange>, norms: Vec<f64>) -> SparseShape<f64> {
        let norms = NormTensor::from_vec(range.tile_extents(), norms).unwrap();
        SparseShape::with_policy(norms, Arc::clone(range), Threshold::new(THRESHOLD).unwrap())
            .unwrap()
    }

    fn assert_snapped(shape: &SparseShape<f64>) -> Result<(), TestCaseError> {
        for &v in shape.data().unwrap().as_slice() {
            prop_assert!(v == 0.0 || v >= THRESHOLD, "unsnapped value {}", v);
        }
        Ok(())
    }

    fn frobenius(tile: &[f64]) -> f64 {
        tile.iter().map(|x| x * x).sum::<f64>().sqrt()
    }

    /// `len` tile elements in `[-1, 1]`.
    fn random_tile(rng: &mut StdRng, len: usize) -> Vec<f64> {
        (0..len).map(|_| rng.gen_range(-1.0..=1.0)).collect()
    }

    /// A permutation of `rank` axes chosen by rotating the identity.
    fn rotation(rank: usize, by: usize) -> Permutation {
        Permutation::new((0..rank).map(|i| (i + by) % rank).collect()).unwrap()
    }

    proptest! {
        #[test]
        fn prop_every_result_is_snapped((sizes, a, b) in two_shapes_strategy(), s in -4.0f64..4.0) {
            let range = make_range(&sizes);
            let a = build(&range, a);
            let b = build(&range, b);
            for shape in [
                a.clone(),
                a.scale(s).unwrap(),
                a.add_scaled(&b, s).unwrap(),
                a.subt(&b).unwrap(),
                a.add_const(s).unwrap(),
                a.mult_scaled(&b, s).unwrap(),
                a.mask(&b).unwrap(),
            ] {
                assert_snapped(&shape)?;
                prop_assert_eq!(shape.rethreshold().unwrap(), shape);
            }
        }

        #[test]
        fn prop_scale_composes((sizes, a, _b) in two_shapes_strategy(), s in 1.0f64..3.0, t in -3.0f64..-1.0) {
            let range = make_range(&sizes);
            let a = build(&range, a);
            let nested = a.scale(s).unwrap().scale(t).unwrap();
            let direct = a.scale(s * t).unwrap();
            // |s| >= 1 keeps every surviving value above the threshold in the
            // intermediate shape
            for (x, y) in nested.data().unwrap().as_slice().iter().zip(direct.data().unwrap().as_slice()) {
                prop_assert!((x - y).abs() <= 1e-12 * y.abs().max(1.0));
            }
        }

        #[test]
        fn prop_permutation_round_trip((sizes, a, _b) in two_shapes_strategy(), by in 0usize..3) {
            let range = make_range(&sizes);
            let a = build(&range, a);
            let perm = rotation(range.rank(), by);
            let back = a.perm(&perm).unwrap().perm(&perm.inverse()).unwrap();
            prop_assert_eq!(back, a);
        }

        #[test]
        fn prop_mask_only_removes_tiles((sizes, a, b) in two_shapes_strategy()) {
            let range = make_range(&sizes);
            let a = build(&range, a);
            let b = build(&range, b);
            let masked = a.mask(&b).unwrap();
            for i in 0..range.tile_count() {
                if a.is_zero(i).unwrap() || b.is_zero(i).unwrap() {
                    prop_assert!(masked.is_zero(i).unwrap());
                } else {
                    prop_assert_eq!(masked.get(i).unwrap(), a.get(i).unwrap());
                }
            }
            prop_assert!(masked.sparsity().unwrap() >= a.sparsity().unwrap());
        }

        #[test]
        fn prop_add_bound_is_sound(sizes in tile_sizes_strategy(), seed in 0u64..10_000) {
            let range = make_range(&sizes);
            let volumes = range.tile_volumes();
            let mut rng = StdRng::seed_from_u64(seed);
            let mut tiles_a = Vec::new();
            let mut tiles_b = Vec::new();
            for &v in &volumes {
                tiles_a.push(random_tile(&mut rng, v));
                tiles_b.push(random_tile(&mut rng, v));
            }

            let a = build(&range, tiles_a.iter().map(|t| frobenius(t)).collect());
            let b = build(&range, tiles_b.iter().map(|t| frobenius(t)).collect());
            let sum = a.add(&b).unwrap();

            for (i, &v) in volumes.iter().enumerate() {
                let exact: Vec<f64> = tiles_a[i].iter().zip(&tiles_b[i]).map(|(x, y)| x + y).collect();
                let true_scaled = frobenius(&exact) / v as f64;
                let bound = sum.get(i).unwrap();
                // each operand loses at most one threshold to snapping
                prop_assert!(
                    true_scaled <= bound + 2.0 * THRESHOLD + 1e-9,
                    "tile {}: true {} bound {}", i, true_scaled, bound
                );
            }
        }
    }
}
