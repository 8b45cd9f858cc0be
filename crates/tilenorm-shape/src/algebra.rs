//! Per-tile norm propagation rules.
//!
//! Each kernel computes the scaled norms of an operation's result from the
//! scaled norms of its operands, never touching tile data, and snaps the
//! output with the caller's [`Threshold`]. The bounds are conservative: a
//! kernel may keep a tile that turns out to be zero but never drops one
//! that is not.
//!
//! | Operation | Per-tile result |
//! |---|---|
//! | [`scale`] | `|s| * a` |
//! | [`add`] (also subtraction) | `(a + b) * |s|` |
//! | [`add_const`] | `a + sqrt(c² · v) / v` |
//! | [`mult`] | `a * b * v * |s|` |
//! | [`mask`] | `a`, or `0` where `b` is below its own threshold and `a` is not |
//! | [`gemm`] | `|s| * Σ_k (a · v_a)(b · v_b) / v` |
//!
//! where `v` is the tile volume. Entries are independent, so large grids are
//! evaluated on the rayon pool when the `parallel` feature is on; the result
//! is identical to the sequential one.

#[cfg(feature = "parallel")]
use scirs2_core::parallel_ops::*;

use crate::error::{ShapeError, ShapeResult};
use crate::gemm::GemmHelper;
use crate::norm_tensor::{NormScalar, NormTensor};
use crate::threshold::Threshold;

/// Grids smaller than this are always evaluated sequentially.
pub const PARALLEL_MIN_TILES: usize = 4096;

/// Scale every norm by `|factor|`.
pub fn scale<T: NormScalar>(norms: &NormTensor<T>, factor: T, threshold: Threshold<T>) -> NormTensor<T> {
    let factor = factor.abs();
    let a = norms.as_slice();
    norms.with_values(map_tiles(a.len(), |i| threshold.snap(a[i] * factor)))
}

/// Triangle-inequality bound for `left ± right`, scaled by `|factor|`.
pub fn add<T: NormScalar>(
    left: &NormTensor<T>,
    right: &NormTensor<T>,
    factor: T,
    threshold: Threshold<T>,
) -> ShapeResult<NormTensor<T>> {
    check_extents("add", left, right)?;
    let factor = factor.abs();
    let (a, b) = (left.as_slice(), right.as_slice());
    Ok(left.with_values(map_tiles(a.len(), |i| {
        threshold.snap((a[i] + b[i]) * factor)
    })))
}

/// Bound for adding (or subtracting) the constant `constant` to every
/// element.
///
/// A constant `c` over a tile of `v` elements has Frobenius norm
/// `|c| * sqrt(v)`; divided by `v` it becomes a scaled norm. Adding it to the
/// operand's scaled norm assumes the worst alignment. The formula is a
/// heuristic upper bound, not a tight one.
pub fn add_const<T: NormScalar>(
    norms: &NormTensor<T>,
    volumes: &[usize],
    constant: T,
    threshold: Threshold<T>,
) -> ShapeResult<NormTensor<T>> {
    check_volumes("add_const", norms, volumes)?;
    let c2 = constant * constant;
    let a = norms.as_slice();
    Ok(norms.with_values(map_tiles(a.len(), |i| {
        let v = T::from_volume(volumes[i]);
        threshold.snap(a[i] + (c2 * v).sqrt() / v)
    })))
}

/// Bound for the elementwise (Hadamard) product, scaled by `|factor|`.
pub fn mult<T: NormScalar>(
    left: &NormTensor<T>,
    right: &NormTensor<T>,
    volumes: &[usize],
    factor: T,
    threshold: Threshold<T>,
) -> ShapeResult<NormTensor<T>> {
    check_extents("mult", left, right)?;
    check_volumes("mult", left, volumes)?;
    let factor = factor.abs();
    let (a, b) = (left.as_slice(), right.as_slice());
    Ok(left.with_values(map_tiles(a.len(), |i| {
        threshold.snap(a[i] * b[i] * T::from_volume(volumes[i]) * factor)
    })))
}

/// Zero the tiles that `mask` considers negligible but `norms` does not.
///
/// Each operand is judged by its own threshold: `mask_threshold` decides
/// which mask tiles are negligible, `threshold` snaps the result.
pub fn mask<T: NormScalar>(
    norms: &NormTensor<T>,
    mask: &NormTensor<T>,
    mask_threshold: Threshold<T>,
    threshold: Threshold<T>,
) -> ShapeResult<NormTensor<T>> {
    check_extents("mask", norms, mask)?;
    let (a, b) = (norms.as_slice(), mask.as_slice());
    Ok(norms.with_values(map_tiles(a.len(), |i| {
        if !threshold.is_zero(a[i]) && mask_threshold.is_zero(b[i]) {
            T::zero()
        } else {
            threshold.snap(a[i])
        }
    })))
}

/// Bound for a contraction, scaled by `|factor|`.
///
/// Both operands are converted to unscaled norms, multiplied as matrices
/// over the contracted tiles, and the product is converted back with the
/// result tile volumes before snapping. The sum runs over unscaled norms
/// because the bound adds up whole-tile contributions along the contracted
/// axes.
#[allow(clippy::too_many_arguments)]
pub fn gemm<T: NormScalar>(
    helper: &GemmHelper,
    left: &NormTensor<T>,
    left_volumes: &[usize],
    right: &NormTensor<T>,
    right_volumes: &[usize],
    result_volumes: &[usize],
    factor: T,
    threshold: Threshold<T>,
) -> ShapeResult<NormTensor<T>> {
    let left = unscale(left, left_volumes)?;
    let right = unscale(right, right_volumes)?;
    let factor = factor.abs();
    let product = helper.contract(&left, &right)?.map(|v| v * factor);
    rescale(&product, result_volumes, threshold)
}

/// Scaled norms to unscaled norms: multiply each entry by its tile volume.
pub fn unscale<T: NormScalar>(norms: &NormTensor<T>, volumes: &[usize]) -> ShapeResult<NormTensor<T>> {
    check_volumes("unscale", norms, volumes)?;
    let a = norms.as_slice();
    Ok(norms.with_values(map_tiles(a.len(), |i| a[i] * T::from_volume(volumes[i]))))
}

/// Unscaled norms to thresholded scaled norms: divide each entry by its
/// tile volume and snap.
pub fn rescale<T: NormScalar>(
    norms: &NormTensor<T>,
    volumes: &[usize],
    threshold: Threshold<T>,
) -> ShapeResult<NormTensor<T>> {
    check_volumes("rescale", norms, volumes)?;
    let a = norms.as_slice();
    Ok(norms.with_values(map_tiles(a.len(), |i| {
        threshold.snap(a[i] / T::from_volume(volumes[i]))
    })))
}

/// Snap every entry with `threshold`.
pub fn snap<T: NormScalar>(norms: &NormTensor<T>, threshold: Threshold<T>) -> NormTensor<T> {
    let a = norms.as_slice();
    norms.with_values(map_tiles(a.len(), |i| threshold.snap(a[i])))
}

fn check_extents<T: NormScalar>(
    operation: &'static str,
    left: &NormTensor<T>,
    right: &NormTensor<T>,
) -> ShapeResult<()> {
    if left.extents() != right.extents() {
        return Err(ShapeError::shape_mismatch(
            operation,
            left.extents(),
            right.extents(),
        ));
    }
    Ok(())
}

fn check_volumes<T: NormScalar>(
    operation: &'static str,
    norms: &NormTensor<T>,
    volumes: &[usize],
) -> ShapeResult<()> {
    if norms.len() != volumes.len() {
        return Err(ShapeError::shape_mismatch(
            operation,
            &[norms.len()],
            &[volumes.len()],
        ));
    }
    Ok(())
}

#[cfg(feature = "parallel")]
fn map_tiles<T, F>(len: usize, op: F) -> Vec<T>
where
    T: Send,
    F: Fn(usize) -> T + Send + Sync,
{
    if len >= PARALLEL_MIN_TILES {
        (0..len).into_par_iter().map(op).collect()
    } else {
        (0..len).map(op).collect()
    }
}

#[cfg(not(feature = "parallel"))]
fn map_tiles<T, F>(len: usize, op: F) -> Vec<T>
where
    F: Fn(usize) -> T,
{
    (0..len).map(op).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(values: &[f64]) -> NormTensor<f64> {
        NormTensor::from_vec(&[values.len()], values.to_vec()).unwrap()
    }

    fn eps() -> Threshold<f64> {
        Threshold::new(1e-6).unwrap()
    }

    #[test]
    fn test_scale_uses_magnitude() {
        let r = scale(&t(&[2.0, 0.0, 1e-7]), -2.0, eps());
        assert_eq!(r.as_slice(), &[4.0, 0.0, 0.0]);
    }

    #[test]
    fn test_add_is_sum_of_norms() {
        let r = add(&t(&[2.0, 0.0]), &t(&[0.5, 0.0]), -3.0, eps()).unwrap();
        assert_eq!(r.as_slice(), &[7.5, 0.0]);
    }

    #[test]
    fn test_add_const_formula() {
        let r = add_const(&t(&[1.0, 0.0]), &[4, 9], -2.0, eps()).unwrap();
        // sqrt(4 * 4) / 4 = 1, sqrt(4 * 9) / 9 = 2/3
        assert!((r.as_slice()[0] - 2.0).abs() < 1e-12);
        assert!((r.as_slice()[1] - 2.0 / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_mult_scales_by_volume() {
        let r = mult(&t(&[2.0, 3.0]), &t(&[0.5, 0.0]), &[4, 4], 1.0, eps()).unwrap();
        assert_eq!(r.as_slice(), &[4.0, 0.0]);
    }

    #[test]
    fn test_mask() {
        let r = mask(&t(&[2.0, 3.0, 0.0]), &t(&[0.0, 1.0, 1.0]), eps(), eps()).unwrap();
        assert_eq!(r.as_slice(), &[0.0, 3.0, 0.0]);
    }

    #[test]
    fn test_mask_uses_mask_threshold() {
        let coarse = Threshold::new(0.5).unwrap();
        let fine = Threshold::new(0.01).unwrap();
        // 0.1 survives the mask's own threshold even though it is below 0.5
        let r = mask(&t(&[1.0, 1.0]), &t(&[0.1, 0.0]), fine, coarse).unwrap();
        assert_eq!(r.as_slice(), &[1.0, 0.0]);
        let r = mask(&t(&[1.0, 1.0]), &t(&[0.1, 0.0]), coarse, coarse).unwrap();
        assert_eq!(r.as_slice(), &[0.0, 0.0]);
    }

    #[test]
    fn test_unscale_rescale_round_trip() {
        let a = t(&[0.25, 2.0]);
        let u = unscale(&a, &[4, 3]).unwrap();
        assert_eq!(u.as_slice(), &[1.0, 6.0]);
        assert_eq!(rescale(&u, &[4, 3], eps()).unwrap(), a);
    }

    #[test]
    fn test_gemm_unscale_contract_rescale() {
        use crate::gemm::Transpose;

        let helper = GemmHelper::new(Transpose::NoTrans, Transpose::NoTrans, 2, 2, 2).unwrap();
        // (1 x 2) x (2 x 1) tile grids
        let left = NormTensor::from_vec(&[1, 2], vec![1.0, 0.5]).unwrap();
        let right = NormTensor::from_vec(&[2, 1], vec![2.0, 0.0]).unwrap();
        let r = gemm(&helper, &left, &[4, 6], &right, &[8, 12], &[6], -0.5, eps()).unwrap();
        // (1 * 4) * (2 * 8) + (0.5 * 6) * 0 = 64, * 0.5 / 6
        assert_eq!(r.extents(), &[1, 1]);
        assert!((r.as_slice()[0] - 64.0 * 0.5 / 6.0).abs() < 1e-12);
    }

    #[test]
    fn test_extent_mismatch() {
        let err = add(&t(&[1.0]), &t(&[1.0, 2.0]), 1.0, eps()).unwrap_err();
        assert!(matches!(err, ShapeError::ShapeMismatch { .. }));
        assert!(mult(&t(&[1.0]), &t(&[1.0]), &[1, 2], 1.0, eps()).is_err());
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let n = PARALLEL_MIN_TILES * 2 + 3;
        let values: Vec<f64> = (0..n).map(|i| (i % 17) as f64 * 1e-3).collect();
        let a = t(&values);
        let r = scale(&a, 0.5, eps());
        for (i, v) in r.as_slice().iter().enumerate() {
            assert_eq!(*v, eps().snap(values[i] * 0.5));
        }
    }
}
