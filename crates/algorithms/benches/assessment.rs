//! Benchmarks for the PCA engine and the spatial interpolator

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use ndarray::Array2;
use siteassay_algorithms::execution::ExecutionMode;
use siteassay_algorithms::interpolation::{interpolate, InterpolationMethod, InterpolationParams, SamplePoint};
use siteassay_algorithms::pca::{pca_from_matrix, PcaParams};
use siteassay_core::{GridSpec, SiteBoundary};

fn create_matrix(points: usize, fields: usize) -> Array2<f64> {
    Array2::from_shape_fn((points, fields), |(i, j)| {
        let base = (i as f64 * 0.37).sin() * (j + 1) as f64;
        let variation = ((i * 7 + j * 13) % 100) as f64 / 10.0;
        base + variation
    })
}

fn create_samples(n: usize) -> Vec<SamplePoint> {
    (0..n)
        .map(|i| {
            let x = ((i * 37) % 997) as f64 / 997.0 * 1000.0;
            let y = ((i * 53) % 991) as f64 / 991.0 * 1000.0;
            SamplePoint::new(x, y, ((i * 11) % 50) as f64)
        })
        .collect()
}

fn bench_pca(c: &mut Criterion) {
    let mut group = c.benchmark_group("pca");
    let params = PcaParams::default();

    for fields in [3, 8, 16].iter() {
        let matrix = create_matrix(500, *fields);
        let names: Vec<String> = (0..*fields).map(|j| format!("F{}", j)).collect();

        group.bench_with_input(BenchmarkId::from_parameter(fields), fields, |b, _| {
            b.iter(|| pca_from_matrix(black_box(&matrix), &names, &params).unwrap())
        });
    }

    group.finish();
}

fn bench_interpolation(c: &mut Criterion) {
    let mut group = c.benchmark_group("idw");
    let boundary =
        SiteBoundary::from_exterior(vec![(0.0, 0.0), (1000.0, 0.0), (1000.0, 1000.0), (0.0, 1000.0)])
            .unwrap();
    let samples = create_samples(200);

    for size in [64, 128, 256].iter() {
        for (label, execution) in [("sequential", ExecutionMode::Sequential), ("parallel", ExecutionMode::Parallel)] {
            let params = InterpolationParams {
                grid: GridSpec::Cells { rows: *size, cols: *size },
                execution,
                ..Default::default()
            };

            group.bench_with_input(BenchmarkId::new(label, size), size, |b, _| {
                b.iter(|| interpolate(black_box(&samples), &boundary, &params).unwrap())
            });
        }
    }

    group.finish();
}

fn bench_methods(c: &mut Criterion) {
    let mut group = c.benchmark_group("method");
    let boundary =
        SiteBoundary::from_exterior(vec![(0.0, 0.0), (1000.0, 0.0), (1000.0, 1000.0), (0.0, 1000.0)])
            .unwrap();
    let samples = create_samples(200);

    for (label, method) in [
        ("idw", InterpolationMethod::Idw),
        ("linear", InterpolationMethod::Linear),
        ("ordinary_kriging", InterpolationMethod::OrdinaryKriging),
    ] {
        let params = InterpolationParams {
            method,
            grid: GridSpec::Cells { rows: 128, cols: 128 },
            execution: ExecutionMode::Parallel,
            ..Default::default()
        };
        group.bench_function(label, |b| {
            b.iter(|| interpolate(black_box(&samples), &boundary, &params).unwrap())
        });
    }

    group.finish();
}

criterion_group!(benches, bench_pca, bench_interpolation, bench_methods);
criterion_main!(benches);
