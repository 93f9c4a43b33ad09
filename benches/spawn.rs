use std::hint::black_box;

use criterion::*;
use decs_sim::ExecutionMode;

mod common;
use common::*;

fn spawn_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("spawn");
    group.sample_size(10);

    group.bench_function("spawn_1M_points", |b| {
        b.iter(|| {
            let ecs = populated_world(PARTICLES_LARGE, ExecutionMode::Sequential, false).unwrap();
            black_box(ecs.entity_count());
        });
    });

    group.bench_function("spawn_100k_spheres", |b| {
        b.iter(|| {
            let ecs = populated_world(PARTICLES_MED, ExecutionMode::Sequential, true).unwrap();
            black_box(ecs.entity_count());
        });
    });

    group.finish();
}

criterion_group!(benches, spawn_benchmark);
criterion_main!(benches);
