//! Benchmark profiles and particle generators for Aurora.
//!
//! - [`reference_profile`]: 32³ periodic mesh, serial backend
//! - [`stress_profile`]: 64³ periodic mesh, threaded backend
//! - [`thermal_particles`]: seeded particles with random positions and momenta
//! - [`free_motions`]: the free-streaming motions of a particle set

#![forbid(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use aurora_core::{set_ptc_type_flag, PtcType, Scalar};
use aurora_deposit::Motion;
use aurora_engine::{EngineConfig, FreeStreaming, PushContext, Pusher, SpeciesTable};
use aurora_exec::Backend;
use aurora_particles::Particle;
use aurora_space::{Grid, GridConfig};

/// Reference profile: 32³ cells, CIC, serial, room for 8 particles per cell.
pub fn reference_profile(seed: u64) -> EngineConfig<3> {
    EngineConfig {
        grid: GridConfig::uniform(32, 2),
        capacity: 32 * 32 * 32 * 8,
        staging_capacity: 1 << 14,
        dt: 0.4,
        seed,
        ..Default::default()
    }
}

/// Stress profile: 64³ cells, CIC, threaded, room for 8 particles per cell.
pub fn stress_profile(seed: u64) -> EngineConfig<3> {
    EngineConfig {
        grid: GridConfig::uniform(64, 2),
        capacity: 64 * 64 * 64 * 8,
        staging_capacity: 1 << 16,
        dt: 0.4,
        backend: Backend::Threaded { threads: None },
        seed,
        ..Default::default()
    }
}

/// `n` electrons and positrons in random interior cells with momenta
/// uniform in `[-spread, spread)` per component.
pub fn thermal_particles<const D: usize>(
    grid: &Grid<D>,
    n: usize,
    spread: Scalar,
    seed: u64,
) -> Vec<Particle> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let reduced = grid.reduced_dims();
    let guard = grid.guard();
    (0..n)
        .map(|i| {
            let mut pos = [0u32; D];
            let mut x = [0.0; 3];
            for d in 0..D {
                pos[d] = guard[d] + rng.random_range(0..reduced[d]);
                x[d] = rng.random::<Scalar>();
            }
            let p: [Scalar; 3] =
                std::array::from_fn(|_| spread * (2.0 * rng.random::<Scalar>() - 1.0));
            let ty = if i % 2 == 0 {
                PtcType::Electron
            } else {
                PtcType::Positron
            };
            Particle {
                x,
                p,
                energy: (1.0 + p[0] * p[0] + p[1] * p[1] + p[2] * p[2]).sqrt(),
                weight: 1.0,
                cell: grid.cell_index(pos),
                flag: set_ptc_type_flag(0, ty),
                id: i as u64,
            }
        })
        .collect()
}

/// Free-streaming motions of `particles` over one step of `dt`.
pub fn free_motions<const D: usize>(
    grid: &Grid<D>,
    particles: &[Particle],
    dt: Scalar,
) -> Vec<Motion> {
    let species = SpeciesTable::default();
    let ctx = PushContext {
        grid,
        species: &species,
        dt,
    };
    particles
        .iter()
        .map(|p| FreeStreaming.push(p, &ctx))
        .collect()
}
