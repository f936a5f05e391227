//! Benchmarks for per-cell temporal reductions.
//!
//! Run with: cargo bench --package grid-processor --bench anomaly_benchmarks

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use grid_processor::{compute_statistics, ensemble_mean, MissingPolicy};
use test_utils::{active_window, field_from_fn};

fn bench_statistics(c: &mut Criterion) {
    let mut group = c.benchmark_group("anomaly_statistics");
    for &(nlon, nlat) in &[(96usize, 48usize), (192, 96)] {
        let field = field_from_fn("tas", nlon, nlat, 400, |t, j, i| {
            280.0 + j as f64 * 0.5 + ((t + i) % 17) as f64 * 0.1
        });
        let active = active_window(400, 100, 160);
        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{}x{}x400", nlon, nlat)),
            &field,
            |b, field| b.iter(|| compute_statistics(black_box(field), black_box(&active))),
        );
    }
    group.finish();
}

fn bench_ensemble(c: &mut Criterion) {
    let a = field_from_fn("r1", 96, 48, 1000, |t, j, _| (t + j) as f64);
    let b = field_from_fn("r2", 96, 48, 1000, |t, _, i| (t + i) as f64);
    c.bench_function("ensemble_mean_96x48x1000", |bench| {
        bench.iter(|| ensemble_mean(black_box(&[&a, &b]), MissingPolicy::Skip))
    });
}

criterion_group!(benches, bench_statistics, bench_ensemble);
criterion_main!(benches);
