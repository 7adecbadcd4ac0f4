//! Multi-rank engine runs over the in-process communicator.

use aurora_comm::Communicator;
use aurora_core::{ParticleId, PtcType, Scalar};
use aurora_engine::{Engine, EngineConfig, UniformBoris};
use aurora_exec::Backend;
use aurora_particles::Particle;
use aurora_space::{DomainConfig, Grid, GridConfig};
use aurora_test_utils::fixtures::particle;
use aurora_test_utils::{assert_close, run_ranks};

fn global<const D: usize>(grid: &Grid<D>, p: &Particle) -> [Scalar; D] {
    let mut frac = [0.0; D];
    frac.copy_from_slice(&p.x[..D]);
    grid.local_to_global(grid.cell_pos(p.cell), frac)
}

#[test]
fn electron_crosses_into_the_neighbouring_rank() {
    let results = run_ranks(2, |comm| {
        let rank = comm.rank();
        let cfg = EngineConfig::<3> {
            grid: GridConfig::uniform(64, 2),
            domain: DomainConfig {
                ranks: [2, 1, 1],
                periodic: [true; 3],
            },
            capacity: 16,
            staging_capacity: 8,
            dt: 0.5,
            ..Default::default()
        };
        let mut engine = Engine::new(cfg, Box::new(comm)).unwrap();
        let grid = engine.grid().clone();
        assert_eq!(grid.dims(), [36, 68, 68]);

        let resting = particle(&grid, PtcType::Positron, [10, 20, 20], [0.5; 3], [0.0; 3], 0);
        let mut seed = vec![resting];
        if rank == 0 {
            // Rightmost interior cell along x, heading +x.
            seed.push(particle(
                &grid,
                PtcType::Electron,
                [33, 10, 10],
                [0.9, 0.5, 0.5],
                [1.0, 0.0, 0.0],
                0,
            ));
        }
        engine.inject(&seed).unwrap();
        let before = engine.particles().live_count();
        let outcome = engine.step().unwrap();
        let held: Vec<(Particle, [Scalar; 3])> = engine
            .particles()
            .snapshot()
            .into_iter()
            .map(|p| (p, global(&grid, &p)))
            .collect();
        (before, outcome, held)
    });

    let (before0, out0, held0) = &results[0];
    let (before1, out1, held1) = &results[1];
    assert_eq!((*before0, *before1), (2, 1));
    assert_eq!(held0.len(), 1);
    assert_eq!(held1.len(), 2);

    let m0 = out0.migration.unwrap();
    let m1 = out1.migration.unwrap();
    assert_eq!((m0.sent, m0.received), (1, 0));
    assert_eq!((m1.sent, m1.received), (0, 1));

    let (arrived, x) = held1
        .iter()
        .find(|(p, _)| ParticleId(p.id).rank() == 0)
        .expect("electron arrived on rank 1");
    assert_eq!(arrived.species(), Some(PtcType::Electron));
    let v = 1.0 / (2.0 as Scalar).sqrt();
    assert_close(x[0], 31.9 + 0.5 * v, 1e-12);
    assert_close(x[1], 8.5, 1e-12);
    assert_close(x[2], 8.5, 1e-12);

    // Each rank deposited what it held before the exchange.
    let j0 = out0.deposit.deposited;
    let j1 = out1.deposit.deposited;
    assert_eq!((j0, j1), (2, 1));
}

#[test]
fn particle_count_is_conserved_across_ranks() {
    const STEPS: u64 = 12;
    let results = run_ranks(4, |comm| {
        let cfg = EngineConfig::<2> {
            grid: GridConfig::uniform(16, 2),
            domain: DomainConfig {
                ranks: [2, 2],
                periodic: [true, true],
            },
            capacity: 2048,
            staging_capacity: 256,
            dt: 0.5,
            seed: 3,
            backend: Backend::Threaded { threads: Some(2) },
            ..Default::default()
        };
        let pusher = UniformBoris {
            e: [0.15, -0.1, 0.0],
            b: [0.0, 0.0, 0.4],
        };
        let mut engine = Engine::with_pusher(cfg, Box::new(comm), pusher).unwrap();
        let injected = engine.fill_multiplicity(2, 1.0).unwrap();
        let mut traffic = 0;
        for _ in 0..STEPS {
            let out = engine.step().unwrap();
            traffic += out.metrics.sent;
            let grid = engine.grid();
            for p in engine.particles().snapshot() {
                assert!(grid.skirt_zone(grid.cell_pos(p.cell)).is_none());
            }
        }
        (injected, engine.particles().live_count(), traffic)
    });

    let injected: usize = results.iter().map(|r| r.0).sum();
    let held: usize = results.iter().map(|r| r.1).sum();
    let traffic: usize = results.iter().map(|r| r.2).sum();
    assert_eq!(injected, 16 * 16 * 4);
    assert_eq!(held, injected);
    assert!(traffic > 0);
}

#[test]
fn non_periodic_edges_keep_particles_by_default() {
    let results = run_ranks(2, |comm| {
        let cfg = EngineConfig::<1> {
            grid: GridConfig::uniform(16, 2),
            domain: DomainConfig {
                ranks: [2],
                periodic: [false],
            },
            capacity: 8,
            staging_capacity: 4,
            ..Default::default()
        };
        let rank = comm.rank();
        let mut engine = Engine::new(cfg, Box::new(comm)).unwrap();
        let grid = engine.grid().clone();
        // Rank 0 pushes left into the physical edge, rank 1 right.
        let (pos, p) = if rank == 0 { (2, -1.0) } else { (9, 1.0) };
        let frac = [0.5 + 0.4 * p];
        let ptc = particle(&grid, PtcType::Electron, [pos], frac, [p, 0.0, 0.0], 0);
        engine.inject(&[ptc]).unwrap();
        let out = engine.step().unwrap();
        (out.migration.unwrap(), engine.particles().live_count())
    });
    for (report, live) in results {
        assert_eq!(report.edge_kept, 1);
        assert_eq!(report.sent, 0);
        assert_eq!(live, 1);
    }
}
