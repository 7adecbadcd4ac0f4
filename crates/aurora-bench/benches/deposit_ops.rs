//! Criterion micro-benchmarks for current deposition.

use std::hint::black_box;

use criterion::{criterion_group, criterion_main, Criterion};

use aurora_arena::MemType;
use aurora_bench::{free_motions, thermal_particles};
use aurora_deposit::{CloudInCell, CurrentMesh, Depositor, PiecewiseCubic, Shape, TriangularShapedCloud};
use aurora_exec::{Backend, ExecPolicy, LaunchContext, Policy};
use aurora_particles::ParticleArray;
use aurora_space::{Grid, GridConfig};

const DT: f64 = 0.4;
const PARTICLES: usize = 100_000;

fn bench_shape<S: Shape, P: ExecPolicy>(c: &mut Criterion, name: &str, policy: &P, grid: &Grid<3>) {
    let records = thermal_particles(grid, PARTICLES, 1.0, 17);
    let motions = free_motions(grid, &records, DT as _);
    let mut ptc = ParticleArray::new(PARTICLES, MemType::HostOnly);
    ptc.append_records(&records).unwrap();
    let dep = Depositor::<S, 3>::new(grid, &[-1.0, 1.0]).unwrap();
    let mut mesh = CurrentMesh::for_grid(grid, 0).unwrap();

    c.bench_function(name, |b| {
        b.iter(|| {
            mesh.clear();
            let summary = dep.deposit(policy, &ptc, &motions, &mesh, false).unwrap();
            black_box(summary);
        });
    });
}

/// Benchmark: deposit 100K thermal particles on a 32³ mesh, per shape
/// and backend.
fn bench_deposit_3d(c: &mut Criterion) {
    let grid = Grid::<3>::new(&GridConfig::uniform(32, 3)).unwrap();
    let ctx = LaunchContext::new(grid.descriptor(), DT as _);
    for backend in [Backend::Serial, Backend::Threaded { threads: None }] {
        let policy = Policy::from_backend(backend, ctx).unwrap();
        bench_shape::<CloudInCell, _>(c, &format!("deposit_cic_100k_{backend}"), &policy, &grid);
        bench_shape::<TriangularShapedCloud, _>(
            c,
            &format!("deposit_tsc_100k_{backend}"),
            &policy,
            &grid,
        );
    }
    let serial = Policy::from_backend(Backend::Serial, ctx).unwrap();
    bench_shape::<PiecewiseCubic, _>(c, "deposit_pcs_100k_serial", &serial, &grid);
}

criterion_group!(benches, bench_deposit_3d);
criterion_main!(benches);
