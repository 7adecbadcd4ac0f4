//! Standard grids, decompositions and particle builders.

use aurora_core::{set_ptc_type_flag, PtcType, Scalar};
use aurora_particles::Particle;
use aurora_space::{DomainConfig, DomainInfo, Grid, GridConfig};

/// Single-rank periodic grid with `n` interior cells and `guard` guards
/// per axis, unit cell size.
pub fn periodic_grid<const D: usize>(n: u32, guard: u32) -> Grid<D> {
    Grid::new(&GridConfig::uniform(n, guard)).expect("valid fixture grid")
}

/// Decomposition of `n` cells per axis over `ranks`, periodic on every
/// axis, seen from `rank`.
pub fn decomposed<const D: usize>(
    n: u32,
    guard: u32,
    ranks: [u32; D],
    rank: usize,
) -> (DomainInfo<D>, Grid<D>) {
    decomposed_with(n, guard, ranks, [true; D], rank)
}

/// As [`decomposed`] with explicit periodicity.
pub fn decomposed_with<const D: usize>(
    n: u32,
    guard: u32,
    ranks: [u32; D],
    periodic: [bool; D],
    rank: usize,
) -> (DomainInfo<D>, Grid<D>) {
    let grid_cfg = GridConfig::uniform(n, guard);
    let domain = DomainInfo::decompose(&DomainConfig { ranks, periodic }, &grid_cfg, rank)
        .expect("valid fixture decomposition");
    let grid = Grid::decompose(&grid_cfg, &domain).expect("valid fixture grid");
    (domain, grid)
}

/// A particle of species `ty` at local cell `pos` and sub-cell offset
/// `frac`, with unit weight and the given momentum.
pub fn particle<const D: usize>(
    grid: &Grid<D>,
    ty: PtcType,
    pos: [u32; D],
    frac: [Scalar; D],
    p: [Scalar; 3],
    id: u64,
) -> Particle {
    let mut x = [0.0; 3];
    x[..D].copy_from_slice(&frac);
    Particle {
        x,
        p,
        energy: (1.0 + p[0] * p[0] + p[1] * p[1] + p[2] * p[2]).sqrt(),
        weight: 1.0,
        cell: grid.cell_index(pos),
        flag: set_ptc_type_flag(0, ty),
        id,
    }
}

/// An electron at rest in the middle of cell `pos`.
pub fn electron_at<const D: usize>(grid: &Grid<D>, pos: [u32; D], id: u64) -> Particle {
    particle(grid, PtcType::Electron, pos, [0.5; D], [0.0; 3], id)
}
