//! Cross-domain particle migration.
//!
//! ```text
//! scan      skirt cells of every zone → send[zone], erase local slot
//! sizes     isend u64 count per zone, irecv per zone, wait_all
//! payload   isend records (count > 0), irecv (count > 0), wait_all
//! wrap      neighbour == self: send[z] copied straight to recv[-z]
//! receive   recv[z]: cell += z * reduced, append to the local array
//! ```
//!
//! Messages are tagged by the direction of travel: the size of the
//! batch sent through zone `z` goes under `2 * z.index()`, the payload
//! under `2 * z.index() + 1`. A receiver expecting data from its
//! neighbour in zone `z` therefore listens on the tags of `-z`.

use std::fmt;

use aurora_arena::MemType;
use aurora_core::{CommError, ConfigError};
use aurora_particles::{CellPartition, Particle, ParticleArray};
use aurora_space::{DomainInfo, Grid, Zone};

use crate::comm::{Communicator, RecvHandle};
use crate::edge::{EdgeAction, EdgeCrossing, EdgeHandler, KeepAtEdge};
use crate::error::MigrationError;

const SIZE_BYTES: usize = std::mem::size_of::<u64>();

/// Counts from one migration pass.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MigrationReport {
    /// Particles shipped to other ranks.
    pub sent: usize,
    /// Particles received from other ranks.
    pub received: usize,
    /// Particles that wrapped around a periodic axis onto this rank.
    pub wrapped: usize,
    /// Physical-edge particles the edge handler kept.
    pub edge_kept: usize,
    /// Physical-edge particles the edge handler removed.
    pub edge_removed: usize,
}

impl MigrationReport {
    /// Particles that left the local array, wrapped ones included.
    pub fn outgoing(&self) -> usize {
        self.sent + self.wrapped + self.edge_removed
    }

    /// Particles appended to the local array, wrapped ones included.
    pub fn incoming(&self) -> usize {
        self.received + self.wrapped
    }
}

/// Domain decomposition, communicator and migration staging for one rank.
pub struct DomainComm<const D: usize> {
    domain: DomainInfo<D>,
    comm: Box<dyn Communicator>,
    send: Vec<ParticleArray>,
    recv: Vec<ParticleArray>,
    edge: Box<dyn EdgeHandler<D>>,
}

impl<const D: usize> fmt::Debug for DomainComm<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DomainComm")
            .field("domain", &self.domain)
            .field("rank", &self.comm.rank())
            .field("size", &self.comm.size())
            .field("staging", &self.staging_capacity())
            .field("edge", &self.edge)
            .finish()
    }
}

impl<const D: usize> DomainComm<D> {
    /// Bind `domain` to `comm` with `capacity` staging slots per zone and
    /// direction.
    ///
    /// Fails if the communicator's size or rank disagrees with the
    /// decomposition, or if `capacity` is zero.
    pub fn new(
        domain: DomainInfo<D>,
        comm: Box<dyn Communicator>,
        capacity: usize,
    ) -> Result<Self, ConfigError> {
        if comm.size() != domain.size() {
            return Err(ConfigError::RankCountMismatch {
                expected: domain.size(),
                actual: comm.size(),
            });
        }
        if comm.rank() != domain.rank() {
            return Err(ConfigError::InvalidParameter {
                reason: format!(
                    "communicator rank {} does not match domain rank {}",
                    comm.rank(),
                    domain.rank()
                ),
            });
        }
        if capacity == 0 {
            return Err(ConfigError::ZeroCapacity);
        }
        let staging = || {
            (0..Zone::<D>::COUNT)
                .map(|_| ParticleArray::new(capacity, MemType::HostOnly))
                .collect::<Vec<_>>()
        };
        Ok(Self {
            domain,
            comm,
            send: staging(),
            recv: staging(),
            edge: Box::new(KeepAtEdge),
        })
    }

    /// Replace the physical-edge policy.
    pub fn with_edge_handler(mut self, handler: impl EdgeHandler<D> + 'static) -> Self {
        self.edge = Box::new(handler);
        self
    }

    /// Decomposition this rank belongs to.
    pub fn domain(&self) -> &DomainInfo<D> {
        &self.domain
    }

    /// This rank.
    pub fn rank(&self) -> usize {
        self.domain.rank()
    }

    /// Staging slots per zone and direction.
    pub fn staging_capacity(&self) -> usize {
        self.send.first().map_or(0, ParticleArray::size)
    }

    /// Move every skirt particle of `ptc` to the rank that owns it.
    ///
    /// `partition` must come from a sort of `ptc` over `grid`'s cells
    /// with no changes to `ptc` since. On error the step is lost: the
    /// local array may already have been modified.
    pub fn migrate(
        &mut self,
        ptc: &mut ParticleArray,
        grid: &Grid<D>,
        partition: &CellPartition,
    ) -> Result<MigrationReport, MigrationError> {
        if partition.num_cells() != grid.cell_count() {
            return Err(ConfigError::ExtentMismatch {
                expected: grid.cell_count(),
                actual: partition.num_cells(),
            }
            .into());
        }
        for buf in self.send.iter_mut().chain(self.recv.iter_mut()) {
            buf.init();
        }

        let mut report = MigrationReport::default();
        self.stage(ptc, grid, partition, &mut report)?;
        if let Err(e) = self.exchange(&mut report) {
            tracing::error!(rank = self.rank(), error = %e, "particle exchange failed");
            return Err(e);
        }
        self.unpack(ptc, grid)?;

        tracing::info!(
            rank = self.rank(),
            sent = report.sent,
            received = report.received,
            wrapped = report.wrapped,
            edge_kept = report.edge_kept,
            edge_removed = report.edge_removed,
            number = ptc.number(),
            "migration"
        );
        Ok(report)
    }

    /// Erase every particle sitting in a skirt zone that has no
    /// neighbour. Unlike [`migrate`](Self::migrate) this scans the
    /// whole array and needs no partition. Returns the number erased.
    pub fn clear_guard_cells(&self, ptc: &mut ParticleArray, grid: &Grid<D>) -> usize {
        let max_cell = grid.cell_count() as u32;
        let mut cleared = 0;
        for i in 0..ptc.number() {
            let cell = ptc.cell(i);
            if cell >= max_cell {
                continue;
            }
            let orphaned = grid
                .skirt_zone(grid.cell_pos(cell))
                .is_some_and(|z| self.domain.is_physical_edge(z));
            if orphaned {
                ptc.erase(i, 1);
                cleared += 1;
            }
        }
        if cleared > 0 {
            tracing::debug!(rank = self.rank(), cleared, "guard cells cleared");
        }
        cleared
    }

    fn stage(
        &mut self,
        ptc: &mut ParticleArray,
        grid: &Grid<D>,
        partition: &CellPartition,
        report: &mut MigrationReport,
    ) -> Result<(), MigrationError> {
        for zone in Zone::<D>::all() {
            let neighbor = self.domain.neighbor(zone);
            for cell in grid.skirt_cells(zone) {
                for slot in partition.range(cell) {
                    let mut p = ptc.get(slot);
                    if p.is_dead() {
                        continue;
                    }
                    if neighbor.is_some() {
                        self.send[zone.index()].append_particle(&p)?;
                        ptc.erase(slot, 1);
                        continue;
                    }

                    let crossing = EdgeCrossing {
                        zone,
                        axes: self.physical_axes(zone),
                    };
                    match self.edge.handle(&mut p, crossing, grid) {
                        EdgeAction::Remove => {
                            ptc.erase(slot, 1);
                            report.edge_removed += 1;
                        }
                        EdgeAction::Keep => {
                            let landed = grid.skirt_zone(grid.cell_pos(p.cell));
                            let target = landed.and_then(|z| self.route(z));
                            if let Some(z) = target {
                                self.send[z.index()].append_particle(&p)?;
                                ptc.erase(slot, 1);
                            } else {
                                ptc.set(slot, &p);
                            }
                            if target.is_none() || target != landed {
                                report.edge_kept += 1;
                            }
                        }
                    }
                }
            }
        }
        if report.edge_kept + report.edge_removed > 0 {
            tracing::warn!(
                rank = self.rank(),
                kept = report.edge_kept,
                removed = report.edge_removed,
                "particles reached a physical edge"
            );
        }
        Ok(())
    }

    /// Zone a kept particle is forwarded through. A corner or edge zone
    /// touching a wall drops its wall axes so the particle still wraps
    /// or migrates along the axes that have a neighbour.
    fn route(&self, zone: Zone<D>) -> Option<Zone<D>> {
        if self.domain.neighbor(zone).is_some() {
            return Some(zone);
        }
        let walls = self.physical_axes(zone);
        let mut offset = zone.offset();
        for (step, wall) in offset.iter_mut().zip(walls) {
            if wall {
                *step = 0;
            }
        }
        Zone::from_offset(offset).filter(|&z| self.domain.neighbor(z).is_some())
    }

    fn physical_axes(&self, zone: Zone<D>) -> [bool; D] {
        let mut axes = [false; D];
        for (d, axis) in axes.iter_mut().enumerate() {
            let step = zone.along(d);
            if step == 0 {
                continue;
            }
            let mut offset = [0i8; D];
            offset[d] = step;
            *axis = Zone::from_offset(offset).is_some_and(|z| self.domain.is_physical_edge(z));
        }
        axes
    }

    fn exchange(&mut self, report: &mut MigrationReport) -> Result<(), MigrationError> {
        let rank = self.rank();
        let mut incoming: Vec<(Zone<D>, usize)> = Vec::new();

        for zone in Zone::<D>::all() {
            let Some(dest) = self.domain.neighbor(zone) else {
                continue;
            };
            let count = self.send[zone.index()].number();
            if dest == rank {
                let into = &mut self.recv[zone.opposite().index()];
                into.copy_range(&self.send[zone.index()], count, 0, 0);
                report.wrapped += count;
            } else {
                let tag = size_tag(zone);
                self.comm
                    .isend(dest, tag, (count as u64).to_le_bytes().to_vec())?;
                incoming.push((zone, dest));
            }
        }

        let handles = incoming
            .iter()
            .map(|&(zone, src)| self.comm.irecv(src, size_tag(zone.opposite())))
            .collect::<Result<Vec<_>, CommError>>()?;
        let sizes = self.comm.wait_all(&handles)?;
        let counts = handles
            .iter()
            .zip(&sizes)
            .map(|(h, bytes)| decode_count(h, bytes))
            .collect::<Result<Vec<_>, CommError>>()?;

        for &(zone, dest) in &incoming {
            let batch = &self.send[zone.index()];
            if batch.number() > 0 {
                let payload = Particle::as_bytes(&batch.snapshot()).to_vec();
                self.comm.isend(dest, payload_tag(zone), payload)?;
                report.sent += batch.number();
            }
        }

        let mut posted: Vec<(Zone<D>, RecvHandle, usize)> = Vec::new();
        for (&(zone, src), &count) in incoming.iter().zip(&counts) {
            if count > 0 {
                let handle = self.comm.irecv(src, payload_tag(zone.opposite()))?;
                posted.push((zone, handle, count));
            }
        }
        let handles: Vec<RecvHandle> = posted.iter().map(|&(_, h, _)| h).collect();
        let payloads = self.comm.wait_all(&handles)?;
        for ((zone, handle, count), bytes) in posted.into_iter().zip(payloads) {
            let records = Particle::from_bytes(&bytes, handle.src, handle.tag)?;
            if records.len() != count {
                return Err(CommError::Malformed {
                    peer: handle.src,
                    tag: handle.tag,
                    reason: format!("announced {count} particles, received {}", records.len()),
                }
                .into());
            }
            self.recv[zone.index()].append_records(&records)?;
            report.received += count;
        }
        Ok(())
    }

    fn unpack(&mut self, ptc: &mut ParticleArray, grid: &Grid<D>) -> Result<(), MigrationError> {
        let dims = grid.dims();
        let reduced = grid.reduced_dims();
        for zone in Zone::<D>::all() {
            let batch = &self.recv[zone.index()];
            if batch.number() == 0 {
                continue;
            }
            let peer = self.domain.neighbor(zone).unwrap_or(self.rank());
            let tag = payload_tag(zone.opposite());
            let mut records = batch.snapshot();
            for p in &mut records {
                let pos = grid.cell_pos(p.cell);
                let mut moved = [0u32; D];
                for d in 0..D {
                    let shifted =
                        i64::from(pos[d]) + i64::from(zone.along(d)) * i64::from(reduced[d]);
                    if !(0..i64::from(dims[d])).contains(&shifted) {
                        return Err(CommError::Malformed {
                            peer,
                            tag,
                            reason: format!(
                                "particle in cell {} lands outside the local grid from zone {zone}",
                                p.cell
                            ),
                        }
                        .into());
                    }
                    moved[d] = shifted as u32;
                }
                p.cell = grid.cell_index(moved);
            }
            ptc.append_records(&records)?;
        }
        Ok(())
    }
}

fn size_tag<const D: usize>(zone: Zone<D>) -> u32 {
    2 * zone.index() as u32
}

fn payload_tag<const D: usize>(zone: Zone<D>) -> u32 {
    2 * zone.index() as u32 + 1
}

fn decode_count(handle: &RecvHandle, bytes: &[u8]) -> Result<usize, CommError> {
    let raw: [u8; SIZE_BYTES] = bytes.try_into().map_err(|_| CommError::Malformed {
        peer: handle.src,
        tag: handle.tag,
        reason: format!("size message is {} bytes, expected {SIZE_BYTES}", bytes.len()),
    })?;
    Ok(u64::from_le_bytes(raw) as usize)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::comm::SelfComm;
    use crate::edge::{ReflectAtEdge, RemoveAtEdge};
    use aurora_exec::Serial;
    use aurora_particles::sort_by_cell;
    use aurora_space::{DomainConfig, GridConfig};

    fn single(periodic: [bool; 2]) -> (Grid<2>, DomainComm<2>) {
        let grid = Grid::new(&GridConfig::uniform(8, 2)).unwrap();
        let comm =
            DomainComm::new(DomainInfo::single(periodic), Box::new(SelfComm::new()), 64).unwrap();
        (grid, comm)
    }

    fn with_cells(grid: &Grid<2>, cells: &[[u32; 2]]) -> ParticleArray {
        let mut ptc = ParticleArray::new(64, MemType::HostOnly);
        for (i, &pos) in cells.iter().enumerate() {
            ptc.append_particle(&Particle {
                x: [0.5, 0.25, 0.0],
                cell: grid.cell_index(pos),
                weight: 1.0,
                id: i as u64,
                ..Particle::default()
            })
            .unwrap();
        }
        ptc
    }

    fn run(comm: &mut DomainComm<2>, ptc: &mut ParticleArray, grid: &Grid<2>) -> MigrationReport {
        let part = sort_by_cell(ptc, &Serial::default(), grid.cell_count() as u32).unwrap();
        comm.migrate(ptc, grid, &part).unwrap()
    }

    fn positions(ptc: &ParticleArray, grid: &Grid<2>) -> Vec<(u64, [u32; 2])> {
        let mut out: Vec<_> = ptc
            .snapshot()
            .iter()
            .map(|p| (p.id, grid.cell_pos(p.cell)))
            .collect();
        out.sort_unstable();
        out
    }

    #[test]
    fn periodic_wrap_translates_cells() {
        let (grid, mut comm) = single([true; 2]);
        // dims 12, reduced 8: +x skirt starts at 10, -y skirt below 2.
        let mut ptc = with_cells(&grid, &[[10, 5], [5, 1], [11, 0], [5, 5]]);
        let report = run(&mut comm, &mut ptc, &grid);
        assert_eq!(report.wrapped, 3);
        assert_eq!(report.sent, 0);
        assert_eq!(ptc.live_count(), 4);
        assert_eq!(
            positions(&ptc, &grid),
            vec![(0, [2, 5]), (1, [5, 9]), (2, [3, 8]), (3, [5, 5])]
        );
        let moved = ptc.snapshot().into_iter().find(|p| p.id == 0).unwrap();
        assert_eq!(moved.x, [0.5, 0.25, 0.0]);
    }

    #[test]
    fn interior_particles_are_untouched() {
        let (grid, mut comm) = single([true; 2]);
        let mut ptc = with_cells(&grid, &[[2, 2], [9, 9], [4, 7]]);
        let report = run(&mut comm, &mut ptc, &grid);
        assert_eq!(report, MigrationReport::default());
        assert_eq!(ptc.number(), 3);
        assert_eq!(ptc.live_count(), 3);
    }

    #[test]
    fn physical_edge_keeps_by_default() {
        let (grid, mut comm) = single([false, true]);
        let mut ptc = with_cells(&grid, &[[0, 5], [11, 11]]);
        let report = run(&mut comm, &mut ptc, &grid);
        assert_eq!(report.edge_kept, 2);
        assert_eq!(report.wrapped, 0);
        assert_eq!(positions(&ptc, &grid), vec![(0, [0, 5]), (1, [11, 11])]);
    }

    #[test]
    fn remove_at_edge_erases() {
        let (grid, comm) = single([false, true]);
        let mut comm = comm.with_edge_handler(RemoveAtEdge);
        let mut ptc = with_cells(&grid, &[[0, 5], [5, 0], [5, 5]]);
        let report = run(&mut comm, &mut ptc, &grid);
        assert_eq!(report.edge_removed, 1);
        assert_eq!(report.wrapped, 1);
        assert_eq!(positions(&ptc, &grid), vec![(1, [5, 8]), (2, [5, 5])]);
    }

    #[test]
    fn reflected_corner_particle_still_wraps_periodic_axis() {
        let (grid, comm) = single([false, true]);
        let mut comm = comm.with_edge_handler(ReflectAtEdge);
        // Corner (-x, +y): x is a wall, y wraps.
        let mut ptc = with_cells(&grid, &[[1, 10]]);
        let report = run(&mut comm, &mut ptc, &grid);
        assert_eq!(report.wrapped, 1);
        assert_eq!(report.edge_kept, 0);
        // x: 1.5 mirrored about 2 is 2.5; y: 10 wraps to 2.
        assert_eq!(positions(&ptc, &grid), vec![(0, [2, 2])]);
    }

    #[test]
    fn kept_corner_particle_still_wraps_periodic_axis() {
        let (grid, mut comm) = single([false, true]);
        // Default handler leaves x in the wall guard; y must still wrap.
        let mut ptc = with_cells(&grid, &[[1, 10]]);
        let report = run(&mut comm, &mut ptc, &grid);
        assert_eq!(report.wrapped, 1);
        assert_eq!(report.edge_kept, 1);
        assert_eq!(positions(&ptc, &grid), vec![(0, [1, 2])]);
        let again = run(&mut comm, &mut ptc, &grid);
        assert_eq!(again.wrapped, 0);
        assert_eq!(positions(&ptc, &grid), vec![(0, [1, 2])]);
    }

    #[test]
    fn second_pass_is_a_no_op() {
        let (grid, mut comm) = single([true; 2]);
        let mut ptc = with_cells(&grid, &[[10, 5], [0, 0], [6, 6]]);
        run(&mut comm, &mut ptc, &grid);
        let first = positions(&ptc, &grid);
        let again = run(&mut comm, &mut ptc, &grid);
        assert_eq!(again, MigrationReport::default());
        assert_eq!(positions(&ptc, &grid), first);
        assert_eq!(ptc.number(), 3);
    }

    #[test]
    fn staging_overflow_is_reported() {
        let grid = Grid::new(&GridConfig::uniform(8, 2)).unwrap();
        let mut comm =
            DomainComm::new(DomainInfo::single([true; 2]), Box::new(SelfComm::new()), 1).unwrap();
        let mut ptc = with_cells(&grid, &[[10, 5], [11, 5]]);
        let part = sort_by_cell(&mut ptc, &Serial::default(), grid.cell_count() as u32).unwrap();
        let err = comm.migrate(&mut ptc, &grid, &part).unwrap_err();
        assert!(matches!(err, MigrationError::Capacity(_)));
    }

    #[test]
    fn stale_partition_rejected() {
        let (grid, mut comm) = single([true; 2]);
        let mut ptc = with_cells(&grid, &[[2, 0]]);
        let part = sort_by_cell(&mut ptc, &Serial::default(), 10).unwrap();
        let err = comm.migrate(&mut ptc, &grid, &part).unwrap_err();
        assert!(matches!(
            err,
            MigrationError::Config(ConfigError::ExtentMismatch { .. })
        ));
    }

    #[test]
    fn rank_count_must_match() {
        let cfg = DomainConfig {
            ranks: [2, 1],
            periodic: [true; 2],
        };
        let domain = DomainInfo::new(&cfg, 0).unwrap();
        let err = DomainComm::new(domain, Box::new(SelfComm::new()), 8).unwrap_err();
        assert_eq!(
            err,
            ConfigError::RankCountMismatch {
                expected: 2,
                actual: 1
            }
        );
    }

    #[test]
    fn clear_guard_cells_only_touches_walls() {
        let (grid, comm) = single([false, true]);
        let mut ptc = with_cells(&grid, &[[0, 5], [5, 0], [5, 5], [11, 3]]);
        assert_eq!(comm.clear_guard_cells(&mut ptc, &grid), 2);
        let ids: Vec<u64> = ptc.snapshot().iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![1, 2]);
    }
}
