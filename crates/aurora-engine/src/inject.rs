//! Uniform pair injection.
//!
//! Interior cells are split into fixed chunks, one producer task per
//! chunk. Each task draws from its own ChaCha8 stream keyed by the seed,
//! the rank and the chunk, so the set of particles created is the same
//! under every backend; only their slot order depends on scheduling.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use aurora_core::{
    set_flag, set_ptc_type_flag, CapacityError, ParticleId, PtcFlag, PtcType, Scalar,
};
use aurora_exec::ExecPolicy;
use aurora_particles::{Particle, ParticleArray};
use aurora_space::Grid;

const CELLS_PER_TASK: usize = 64;

/// Parameters of a uniform fill.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Multiplicity {
    /// Electron-positron pairs per interior cell.
    pub pairs_per_cell: usize,
    /// Statistical weight of every particle.
    pub weight: Scalar,
    /// RNG seed shared by all ranks.
    pub seed: u64,
    /// Serial of the first id handed out on this rank.
    pub first_serial: u64,
}

impl Multiplicity {
    /// Particles a fill creates on `grid`.
    pub fn total<const D: usize>(&self, grid: &Grid<D>) -> usize {
        interior_cells(grid) * self.pairs_per_cell * 2
    }
}

fn interior_cells<const D: usize>(grid: &Grid<D>) -> usize {
    grid.reduced_dims().iter().map(|&n| n as usize).product()
}

/// Local position of the `ordinal`-th interior cell, axis 0 fastest.
fn interior_pos<const D: usize>(grid: &Grid<D>, mut ordinal: usize) -> [u32; D] {
    let reduced = grid.reduced_dims();
    let guard = grid.guard();
    let mut pos = [0u32; D];
    for d in 0..D {
        let n = reduced[d] as usize;
        pos[d] = guard[d] + (ordinal % n) as u32;
        ordinal /= n;
    }
    pos
}

/// Append `pairs_per_cell` electron-positron pairs at rest to every
/// interior cell of `grid`, each pair sharing a random sub-cell
/// position.
///
/// Returns the number of particles appended. If they do not all fit,
/// nothing is appended.
pub fn fill_multiplicity<P: ExecPolicy, const D: usize>(
    policy: &P,
    ptc: &mut ParticleArray,
    grid: &Grid<D>,
    rank: usize,
    fill: &Multiplicity,
) -> Result<usize, CapacityError> {
    let cells = interior_cells(grid);
    let tasks = cells.div_ceil(CELLS_PER_TASK);
    let rank_key = (rank as u64).rotate_left(32);

    let mut electron = set_ptc_type_flag(0, PtcType::Electron);
    let mut positron = set_ptc_type_flag(0, PtcType::Positron);
    set_flag(&mut electron, PtcFlag::Primary);
    set_flag(&mut positron, PtcFlag::Primary);

    let added = ptc.append_concurrent(policy, tasks, |task, out| {
        let mut rng = ChaCha8Rng::seed_from_u64(fill.seed ^ rank_key);
        rng.set_stream(task as u64);
        let first = task * CELLS_PER_TASK;
        let last = (first + CELLS_PER_TASK).min(cells);
        out.reserve((last - first) * fill.pairs_per_cell * 2);
        for ordinal in first..last {
            let cell = grid.cell_index(interior_pos(grid, ordinal));
            for k in 0..fill.pairs_per_cell {
                let mut x = [0.0; 3];
                for v in x.iter_mut().take(D) {
                    *v = rng.random::<Scalar>();
                }
                let serial = fill.first_serial + 2 * (ordinal * fill.pairs_per_cell + k) as u64;
                for (offset, flag) in [(0, electron), (1, positron)] {
                    out.push(Particle {
                        x,
                        p: [0.0; 3],
                        energy: 1.0,
                        weight: fill.weight,
                        cell,
                        flag,
                        id: ParticleId::compose(rank, serial + offset).0,
                    });
                }
            }
        }
    })?;
    tracing::debug!(
        rank,
        added,
        pairs_per_cell = fill.pairs_per_cell,
        "uniform injection"
    );
    Ok(added)
}
