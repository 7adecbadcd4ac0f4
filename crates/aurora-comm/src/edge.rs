//! Boundary policy hook for non-periodic physical edges.
//!
//! A skirt particle whose zone has no neighbouring rank has reached the
//! edge of the global domain. What happens to it is problem-specific,
//! so migration hands it to an [`EdgeHandler`] and records the outcome
//! in the [`MigrationReport`](crate::MigrationReport). Three reference
//! handlers are provided; [`KeepAtEdge`] is the default.

use std::fmt;

use aurora_core::Scalar;
use aurora_particles::Particle;
use aurora_space::{Grid, Zone};

/// What migration should do with an edge particle after the handler ran.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EdgeAction {
    /// Keep the (possibly modified) particle in the local array.
    Keep,
    /// Erase the particle.
    Remove,
}

/// Where a particle left the domain.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EdgeCrossing<const D: usize> {
    /// Skirt zone the particle occupies.
    pub zone: Zone<D>,
    /// Axes along which the crossing hits a physical edge.
    pub axes: [bool; D],
}

/// Decides the fate of particles crossing a non-periodic physical edge.
///
/// The handler may rewrite the particle (position, cell, momentum). If
/// it keeps a particle that then lies in a skirt zone with a neighbour,
/// migration ships it there.
pub trait EdgeHandler<const D: usize>: Send + Sync + fmt::Debug {
    /// Handle one particle.
    fn handle(&self, ptc: &mut Particle, crossing: EdgeCrossing<D>, grid: &Grid<D>) -> EdgeAction;
}

/// Leave the particle where it is. It stays in the guard cells and is
/// counted in the report on every pass until something else moves it.
#[derive(Clone, Copy, Debug, Default)]
pub struct KeepAtEdge;

impl<const D: usize> EdgeHandler<D> for KeepAtEdge {
    fn handle(&self, _: &mut Particle, _: EdgeCrossing<D>, _: &Grid<D>) -> EdgeAction {
        EdgeAction::Keep
    }
}

/// Absorb: erase every particle that reaches a physical edge.
#[derive(Clone, Copy, Debug, Default)]
pub struct RemoveAtEdge;

impl<const D: usize> EdgeHandler<D> for RemoveAtEdge {
    fn handle(&self, _: &mut Particle, _: EdgeCrossing<D>, _: &Grid<D>) -> EdgeAction {
        EdgeAction::Remove
    }
}

/// Specular reflection off the physical boundary plane.
///
/// Along each physical-edge axis the position is mirrored about the
/// first guard face and the momentum component negated.
#[derive(Clone, Copy, Debug, Default)]
pub struct ReflectAtEdge;

impl<const D: usize> EdgeHandler<D> for ReflectAtEdge {
    fn handle(&self, ptc: &mut Particle, crossing: EdgeCrossing<D>, grid: &Grid<D>) -> EdgeAction {
        let mut pos = grid.cell_pos(ptc.cell);
        let dims = grid.dims();
        let guard = grid.guard();
        for d in 0..D {
            if !crossing.axes[d] {
                continue;
            }
            let face = if crossing.zone.along(d) < 0 {
                guard[d]
            } else {
                dims[d] - guard[d]
            } as Scalar;
            let u = pos[d] as Scalar + ptc.x[d];
            let mirrored = (2.0 * face - u).clamp(0.0, dims[d] as Scalar - Scalar::EPSILON);
            let n = mirrored.floor();
            pos[d] = n as u32;
            ptc.x[d] = mirrored - n;
            ptc.p[d] = -ptc.p[d];
        }
        ptc.cell = grid.cell_index(pos);
        EdgeAction::Keep
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aurora_space::GridConfig;

    #[test]
    fn reflect_mirrors_about_lower_face() {
        let grid = Grid::<1>::new(&GridConfig::uniform(8, 2)).unwrap();
        let mut p = Particle {
            x: [0.75, 0.0, 0.0],
            p: [-1.0, 0.5, 0.0],
            cell: grid.cell_index([1]),
            ..Particle::default()
        };
        let zone = Zone::from_offset([-1]).unwrap();
        let action = ReflectAtEdge.handle(&mut p, EdgeCrossing { zone, axes: [true] }, &grid);
        assert_eq!(action, EdgeAction::Keep);
        // u = 1.75 mirrored about 2.0 is 2.25.
        assert_eq!(grid.cell_pos(p.cell), [2]);
        assert!((p.x[0] - 0.25).abs() < 1e-12);
        assert_eq!(p.p, [1.0, 0.5, 0.0]);
    }

    #[test]
    fn reflect_mirrors_about_upper_face() {
        let grid = Grid::<2>::new(&GridConfig::uniform(8, 2)).unwrap();
        let mut p = Particle {
            x: [0.5, 0.25, 0.0],
            p: [0.0, 2.0, 0.0],
            cell: grid.cell_index([4, 10]),
            ..Particle::default()
        };
        let zone = Zone::from_offset([0, 1]).unwrap();
        ReflectAtEdge.handle(
            &mut p,
            EdgeCrossing {
                zone,
                axes: [false, true],
            },
            &grid,
        );
        // u = 10.25 mirrored about 10.0 is 9.75.
        assert_eq!(grid.cell_pos(p.cell), [4, 9]);
        assert!((p.x[1] - 0.75).abs() < 1e-12);
        assert_eq!(p.p[1], -2.0);
        assert_eq!(p.x[0], 0.5);
    }

    #[test]
    fn keep_and_remove() {
        let grid = Grid::<1>::new(&GridConfig::uniform(8, 2)).unwrap();
        let zone = Zone::from_offset([1]).unwrap();
        let crossing = EdgeCrossing { zone, axes: [true] };
        let mut p = Particle::default();
        assert_eq!(KeepAtEdge.handle(&mut p, crossing, &grid), EdgeAction::Keep);
        assert_eq!(RemoveAtEdge.handle(&mut p, crossing, &grid), EdgeAction::Remove);
        assert_eq!(p, Particle::default());
    }
}
