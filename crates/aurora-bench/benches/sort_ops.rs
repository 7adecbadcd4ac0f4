//! Criterion micro-benchmarks for the cell sort.

use std::hint::black_box;

use criterion::{criterion_group, criterion_main, BatchSize, Criterion};

use aurora_arena::MemType;
use aurora_bench::thermal_particles;
use aurora_exec::{Backend, LaunchContext, Policy};
use aurora_particles::{sort_by_cell, Particle, ParticleArray};
use aurora_space::{Grid, GridConfig};

const PARTICLES: usize = 200_000;

fn filled(records: &[Particle]) -> ParticleArray {
    let mut ptc = ParticleArray::new(records.len(), MemType::HostOnly);
    ptc.append_records(records).unwrap();
    ptc
}

/// Benchmark: sort 200K randomly placed particles on a 32³ mesh, with a
/// tenth of the slots dead.
fn bench_sort_200k(c: &mut Criterion) {
    let grid = Grid::<3>::new(&GridConfig::uniform(32, 2)).unwrap();
    let max_cell = grid.cell_count() as u32;
    let mut records = thermal_particles(&grid, PARTICLES, 0.0, 5);
    for r in records.iter_mut().step_by(10) {
        r.cell = aurora_core::EMPTY_CELL;
    }
    let ctx = LaunchContext::new(grid.descriptor(), 0.4);

    for backend in [Backend::Serial, Backend::Threaded { threads: None }] {
        let policy = Policy::from_backend(backend, ctx).unwrap();
        c.bench_function(&format!("sort_200k_{backend}"), |b| {
            b.iter_batched(
                || filled(&records),
                |mut ptc| {
                    let part = sort_by_cell(&mut ptc, &policy, max_cell).unwrap();
                    black_box(part.live());
                },
                BatchSize::LargeInput,
            );
        });
    }
}

/// Benchmark: re-sort an already sorted array.
fn bench_resort_sorted(c: &mut Criterion) {
    let grid = Grid::<3>::new(&GridConfig::uniform(32, 2)).unwrap();
    let max_cell = grid.cell_count() as u32;
    let records = thermal_particles(&grid, PARTICLES, 0.0, 6);
    let policy = Policy::from_backend(Backend::Serial, LaunchContext::new(grid.descriptor(), 0.4))
        .unwrap();
    let mut ptc = filled(&records);
    sort_by_cell(&mut ptc, &policy, max_cell).unwrap();

    c.bench_function("resort_sorted_200k", |b| {
        b.iter(|| {
            let part = sort_by_cell(&mut ptc, &policy, max_cell).unwrap();
            black_box(part.live());
        });
    });
}

criterion_group!(benches, bench_sort_200k, bench_resort_sorted);
criterion_main!(benches);
