//! Point location benchmarks: walking with and without hints versus the
//! bounding-box locator.

#![allow(missing_docs)]

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use fmesh::prelude::*;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::hint::black_box;

const COUNTS: &[usize] = &[1_000, 10_000];
const QUERIES: usize = 1_000;
const SEED: u64 = 0x10ca_7e;

fn random_points(count: usize, seed: u64) -> Vec<Point> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..count)
        .map(|_| Point::new2(rng.random_range(-50.0..50.0), rng.random_range(-50.0..50.0)))
        .collect()
}

fn bench_locate(c: &mut Criterion) {
    let mut group = c.benchmark_group("locate");
    for &count in COUNTS {
        let mesh = Mesh::new(&random_points(count, SEED), MeshConfig::default()).unwrap();
        let mut queries = random_points(QUERIES, SEED.wrapping_add(count as u64));
        group.throughput(Throughput::Elements(QUERIES as u64));

        group.bench_with_input(BenchmarkId::new("walk_cold", count), &queries, |b, queries| {
            b.iter(|| {
                for q in queries {
                    black_box(mesh.locate(q, None));
                }
            });
        });

        // Spatially coherent queries profit from reusing the previous dart.
        queries.sort_by(|a, b| a.x().total_cmp(&b.x()));
        group.bench_with_input(BenchmarkId::new("walk_hinted", count), &queries, |b, queries| {
            b.iter(|| {
                let mut hint = None;
                for q in queries {
                    hint = mesh.locate(q, hint).or(hint);
                    black_box(hint);
                }
            });
        });

        let locator = mesh.triangle_locator();
        group.bench_with_input(BenchmarkId::new("locator", count), &queries, |b, queries| {
            b.iter(|| {
                for q in queries {
                    black_box(locator.locate(q));
                }
            });
        });

        group.bench_function(BenchmarkId::new("locator_build", count), |b| {
            b.iter(|| black_box(mesh.triangle_locator().len()));
        });
    }
    group.finish();
}

criterion_group!(benches, bench_locate);
criterion_main!(benches);
