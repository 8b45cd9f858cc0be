//! Benchmarks for shape algebra
//!
//! Measures elementwise bound propagation and contraction bounds over tile
//! grids of increasing size and sparsity.

use std::hint::black_box;
use std::sync::Arc;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use tilenorm_range::{Permutation, TiledRange};
use tilenorm_shape::{GemmHelper, NormTensor, SparseShape, Threshold, Transpose};

/// Square 2-D tile grid of `tiles x tiles` tiles of `tile_size` elements per
/// side.
fn grid(tiles: usize, tile_size: usize) -> Arc<TiledRange> {
    let sizes = vec![tile_size; tiles];
    Arc::new(TiledRange::from_tile_sizes(&[&sizes, &sizes]).expect("valid tiling"))
}

/// Shape with roughly `density` of its tiles nonzero.
fn random_shape(range: &Arc<TiledRange>, density: f64, mut seed: u64) -> SparseShape<f64> {
    let values = (0..range.tile_count())
        .map(|_| {
            seed = seed.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
            let u = (seed >> 11) as f64 / (1u64 << 53) as f64;
            if u < density {
                1.0 + 100.0 * u
            } else {
                0.0
            }
        })
        .collect();
    let norms = NormTensor::from_vec(range.tile_extents(), values).expect("matching extents");
    SparseShape::with_policy(norms, Arc::clone(range), Threshold::new(1e-8).expect("valid"))
        .expect("valid shape")
}

fn bench_elementwise(c: &mut Criterion) {
    let mut group = c.benchmark_group("elementwise");

    for tiles in [16, 64, 256].iter() {
        let range = grid(*tiles, 32);
        let a = random_shape(&range, 0.3, 1);
        let b = random_shape(&range, 0.3, 2);
        group.throughput(Throughput::Elements((tiles * tiles) as u64));

        group.bench_with_input(BenchmarkId::new("add", tiles), tiles, |bench, _| {
            bench.iter(|| black_box(a.add(black_box(&b)).expect("add")))
        });
        group.bench_with_input(BenchmarkId::new("mult", tiles), tiles, |bench, _| {
            bench.iter(|| black_box(a.mult(black_box(&b)).expect("mult")))
        });
        group.bench_with_input(BenchmarkId::new("mask", tiles), tiles, |bench, _| {
            bench.iter(|| black_box(a.mask(black_box(&b)).expect("mask")))
        });
    }

    group.finish();
}

fn bench_permute(c: &mut Criterion) {
    let mut group = c.benchmark_group("permute");
    let swap = Permutation::new(vec![1, 0]).expect("valid permutation");

    for tiles in [16, 64, 256].iter() {
        let range = grid(*tiles, 32);
        let a = random_shape(&range, 0.5, 3);
        group.bench_with_input(BenchmarkId::new("perm", tiles), tiles, |bench, _| {
            bench.iter(|| black_box(a.perm(black_box(&swap)).expect("perm")))
        });
    }

    group.finish();
}

fn bench_gemm(c: &mut Criterion) {
    let mut group = c.benchmark_group("gemm");
    let helper = GemmHelper::new(Transpose::NoTrans, Transpose::NoTrans, 2, 2, 2).expect("valid");

    for tiles in [16, 64, 128].iter() {
        for density in [0.05, 0.3, 1.0].iter() {
            let range = grid(*tiles, 16);
            let a = random_shape(&range, *density, 4);
            let b = random_shape(&range, *density, 5);
            let id = BenchmarkId::new(format!("density_{density}"), tiles);
            group.bench_with_input(id, tiles, |bench, _| {
                bench.iter(|| black_box(a.gemm(black_box(&b), 1.0, &helper).expect("gemm")))
            });
        }
    }

    group.finish();
}

criterion_group!(benches, bench_elementwise, bench_permute, bench_gemm);
criterion_main!(benches);
