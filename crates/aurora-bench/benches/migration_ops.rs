//! Criterion micro-benchmarks for migration and the full engine step.

use std::hint::black_box;

use criterion::{criterion_group, criterion_main, BatchSize, Criterion};

use aurora_arena::MemType;
use aurora_bench::{reference_profile, thermal_particles};
use aurora_comm::{DomainComm, SelfComm};
use aurora_engine::Engine;
use aurora_exec::{LaunchContext, Serial};
use aurora_particles::{sort_by_cell, Particle, ParticleArray};
use aurora_space::{DomainInfo, Grid, GridConfig};

const PARTICLES: usize = 100_000;

/// Thermal particles with every fourth one pushed into a guard cell.
fn with_skirt(grid: &Grid<2>) -> Vec<Particle> {
    let mut records = thermal_particles(grid, PARTICLES, 0.0, 23);
    let dims = grid.dims();
    for (k, r) in records.iter_mut().enumerate().step_by(4) {
        let mut pos = grid.cell_pos(r.cell);
        let axis = (k / 4) % 2;
        pos[axis] = if (k / 8) % 2 == 0 { 0 } else { dims[axis] - 1 };
        r.cell = grid.cell_index(pos);
    }
    records
}

/// Benchmark: migrate 25K skirt particles out of 100K on a single
/// periodic rank (every exchange wraps onto itself).
fn bench_migrate_single_rank(c: &mut Criterion) {
    let grid = Grid::<2>::new(&GridConfig::uniform(256, 2)).unwrap();
    let records = with_skirt(&grid);
    let policy = Serial::new(LaunchContext::new(grid.descriptor(), 0.4));
    let max_cell = grid.cell_count() as u32;
    let mut comm =
        DomainComm::new(DomainInfo::single([true; 2]), Box::new(SelfComm::new()), 1 << 15).unwrap();

    c.bench_function("migrate_single_rank_100k", |b| {
        b.iter_batched(
            || {
                let mut ptc = ParticleArray::new(2 * PARTICLES, MemType::HostOnly);
                ptc.append_records(&records).unwrap();
                let part = sort_by_cell(&mut ptc, &policy, max_cell).unwrap();
                (ptc, part)
            },
            |(mut ptc, part)| {
                let report = comm.migrate(&mut ptc, &grid, &part).unwrap();
                black_box(report);
            },
            BatchSize::LargeInput,
        );
    });
}

/// Benchmark: one full engine step on the reference profile with four
/// particles per cell.
fn bench_engine_step_reference(c: &mut Criterion) {
    let mut engine = Engine::new(reference_profile(42), Box::new(SelfComm::new())).unwrap();
    engine.fill_multiplicity(2, 1.0).unwrap();
    let mut kick = thermal_particles(engine.grid(), 1024, 0.8, 1);
    for r in &mut kick {
        r.weight = 0.0;
    }
    engine.inject(&kick).unwrap();

    c.bench_function("engine_step_reference", |b| {
        b.iter(|| {
            let out = engine.step().unwrap();
            black_box(out.metrics);
        });
    });
}

criterion_group!(
    benches,
    bench_migrate_single_rank,
    bench_engine_step_reference
);
criterion_main!(benches);
