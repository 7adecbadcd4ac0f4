//! Counting sort of particles by cell id.
//!
//! ```text
//! pass 1  count      counts[key(i)] += 1            (atomic)
//! pass 2  scan       offsets = exclusive_prefix_sum(counts)
//! pass 3  scatter    dest[i] = cursor[key(i)]++     (atomic)
//!         gather     field'[dest[i]] = field[i]     (per attribute)
//! ```
//!
//! The sentinel [`EMPTY_CELL`] is keyed as `max_cell`, one past the last
//! real cell, so dead slots land after every live particle. Only
//! grouping is guaranteed; order within a cell depends on the backend.

use std::ops::Range;
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};

use aurora_arena::{Buffer, MemSpace};
use aurora_core::EMPTY_CELL;
use aurora_exec::ExecPolicy;

use crate::array::ParticleArray;
use crate::error::SortError;

/// Result of one sort: where each cell's particles sit.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CellPartition {
    /// `offsets[c]..offsets[c + 1]` holds cell `c`; entry `max_cell`
    /// starts the dead range, the last entry is the pre-sort `number`.
    offsets: Vec<usize>,
}

impl CellPartition {
    /// Number of real cells.
    pub fn num_cells(&self) -> usize {
        self.offsets.len() - 2
    }

    /// Slots holding particles of `cell`. Empty for an out-of-range cell.
    pub fn range(&self, cell: u32) -> Range<usize> {
        let c = cell as usize;
        if c >= self.num_cells() {
            return 0..0;
        }
        self.offsets[c]..self.offsets[c + 1]
    }

    /// Particles in `cell`.
    pub fn count(&self, cell: u32) -> usize {
        self.range(cell).len()
    }

    /// Number of live particles.
    pub fn live(&self) -> usize {
        self.offsets[self.num_cells()]
    }

    /// Slots holding dead particles, directly after the live ones.
    pub fn dead_range(&self) -> Range<usize> {
        self.live()..self.offsets[self.num_cells() + 1]
    }
}

#[inline]
fn key(cell: u32, max_cell: u32) -> Option<usize> {
    if cell == EMPTY_CELL {
        Some(max_cell as usize)
    } else if cell < max_cell {
        Some(cell as usize)
    } else {
        None
    }
}

/// Sort `ptc` in `policy.space()` so live particles are grouped by cell
/// in nondecreasing order and dead slots trail them.
///
/// Afterwards `ptc.number()` equals the live count. Fails without
/// moving anything if a live cell id is `>= max_cell`.
pub fn sort_by_cell<P: ExecPolicy>(
    ptc: &mut ParticleArray,
    policy: &P,
    max_cell: u32,
) -> Result<CellPartition, SortError> {
    let space = policy.space();
    let n = ptc.number();
    let buckets = max_cell as usize + 1;

    let counts: Vec<AtomicU32> = (0..buckets).map(|_| AtomicU32::new(0)).collect();
    let first_bad = AtomicUsize::new(usize::MAX);
    {
        let view = ptc.view(space);
        let cells = &view.cell[..n];
        policy.parallel_for(0..n, |i| match key(cells[i], max_cell) {
            Some(k) => {
                counts[k].fetch_add(1, Ordering::Relaxed);
            }
            None => {
                first_bad.fetch_min(i, Ordering::Relaxed);
            }
        });
        let bad = first_bad.load(Ordering::Relaxed);
        if bad != usize::MAX {
            return Err(SortError::CellOutOfRange {
                index: bad,
                cell: cells[bad],
                max_cell,
            });
        }
    }

    let mut offsets = Vec::with_capacity(buckets + 1);
    let mut acc = 0usize;
    offsets.push(0);
    for c in &counts {
        acc += c.load(Ordering::Relaxed) as usize;
        offsets.push(acc);
    }

    let cursors: Vec<AtomicUsize> = offsets[..buckets]
        .iter()
        .map(|&o| AtomicUsize::new(o))
        .collect();
    let mut source = vec![0usize; n];
    {
        let view = ptc.view(space);
        let cells = &view.cell[..n];
        let slots: Vec<AtomicUsize> = (0..n).map(|_| AtomicUsize::new(0)).collect();
        policy.parallel_for(0..n, |i| {
            // Every cell was validated by pass 1.
            let k = key(cells[i], max_cell).unwrap_or(max_cell as usize);
            let dest = cursors[k].fetch_add(1, Ordering::Relaxed);
            slots[dest].store(i, Ordering::Relaxed);
        });
        policy.parallel_fill(&mut source, |j| slots[j].load(Ordering::Relaxed));
    }

    ptc.for_each_buffer(
        |b| gather(policy, b, space, &source),
        |b| gather(policy, b, space, &source),
        |b| gather(policy, b, space, &source),
    );

    let partition = CellPartition { offsets };
    ptc.set_num(partition.live());
    tracing::debug!(
        backend = policy.name(),
        sorted = n,
        live = partition.live(),
        dead = partition.dead_range().len(),
        "cell sort"
    );
    Ok(partition)
}

fn gather<T, P>(policy: &P, buf: &mut Buffer<T>, space: MemSpace, source: &[usize])
where
    T: Copy + Default + Send + Sync,
    P: ExecPolicy,
{
    let mut sorted = vec![T::default(); source.len()];
    {
        let old = buf.slice(space);
        policy.parallel_fill(&mut sorted, |j| old[source[j]]);
    }
    buf.slice_mut(space)[..source.len()].copy_from_slice(&sorted);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::Particle;
    use aurora_arena::MemType;
    use aurora_exec::{Device, LaunchContext, Serial, Threaded};
    use proptest::prelude::*;

    const E: u32 = EMPTY_CELL;

    fn filled(cells: &[u32], mem_type: MemType) -> ParticleArray {
        let mut a = ParticleArray::new(cells.len() + 4, mem_type);
        for (i, &c) in cells.iter().enumerate() {
            a.append_particle(&Particle {
                x: [0.1 * (i + 1) as aurora_core::Scalar, 0.0, 0.0],
                cell: c,
                id: i as u64,
                ..Particle::default()
            })
            .unwrap();
        }
        a
    }

    fn assert_grouped(a: &ParticleArray, p: &CellPartition, max_cell: u32) {
        let snap: Vec<u32> = (0..a.number()).map(|i| a.cell(i)).collect();
        assert!(snap.windows(2).all(|w| w[0] <= w[1]));
        assert!(snap.iter().all(|&c| c < max_cell));
        for c in 0..max_cell {
            for i in p.range(c) {
                assert_eq!(a.cell(i), c);
            }
        }
        for i in p.dead_range() {
            assert_eq!(a.cell(i), E);
        }
    }

    #[test]
    fn sorts_and_drops_dead_count() {
        let cells = [34, 24, 4, E, 14, 90, 12, 35, 9, 50, 42, E, E, 70, 99];
        let mut a = filled(&cells, MemType::HostOnly);
        let part = sort_by_cell(&mut a, &Serial::default(), 100).unwrap();
        assert_eq!(a.number(), 12);
        assert_eq!(part.live(), 12);
        assert_eq!(part.dead_range(), 12..15);
        assert_eq!((a.cell(0), a.cell(1), a.cell(2)), (4, 9, 12));
        // The particle originally in slot 2 (cell 4) moved to the front.
        assert_eq!(a.get(0).id, 2);
        assert!((a.get(0).x[0] - 0.3).abs() < 1e-6);
        assert_grouped(&a, &part, 100);
    }

    #[test]
    fn first_three_cells_keep_their_payload() {
        let cells = [34, 24, 4, E, 14, 90, 12, 35, 9, 50, 42, E, E, 70, 99];
        let mut a = filled(&cells, MemType::HostOnly);
        sort_by_cell(&mut a, &Serial::default(), 100).unwrap();
        let pos = |cell: u32| (0..a.number()).find(|&i| a.cell(i) == cell).unwrap();
        assert_eq!(a.get(pos(4)).id, 2);
        assert_eq!(a.get(pos(24)).id, 1);
        assert_eq!(a.get(pos(34)).id, 0);
    }

    #[test]
    fn out_of_range_cell_rejected() {
        let mut a = filled(&[1, 2, 200, 3], MemType::HostOnly);
        let err = sort_by_cell(&mut a, &Serial::default(), 100).unwrap_err();
        assert_eq!(
            err,
            SortError::CellOutOfRange {
                index: 2,
                cell: 200,
                max_cell: 100
            }
        );
        assert_eq!(a.number(), 4);
        assert_eq!(a.cell(2), 200);
    }

    #[test]
    fn device_sort_touches_device_memory_only() {
        let mut a = filled(&[3, 1, E, 2], MemType::HostDevice);
        let dev = Device::new(LaunchContext::default(), 2).unwrap();
        sort_by_cell(&mut a, &dev, 4).unwrap();
        assert_eq!(a.cell(0), 3, "host mirror untouched until copied");
        a.copy_to_host();
        assert_eq!((a.cell(0), a.cell(1), a.cell(2)), (1, 2, 3));
        assert_eq!(a.number(), 3);
    }

    #[test]
    fn sort_of_empty_array() {
        let mut a = ParticleArray::new(4, MemType::HostOnly);
        let part = sort_by_cell(&mut a, &Serial::default(), 10).unwrap();
        assert_eq!(part.live(), 0);
        assert!(part.dead_range().is_empty());
    }

    proptest! {
        #[test]
        fn every_backend_groups_cells(
            cells in prop::collection::vec(prop_oneof![4 => 0u32..32, 1 => Just(E)], 0..200),
        ) {
            let live = cells.iter().filter(|&&c| c != E).count();
            let threaded = Threaded::new(LaunchContext::default(), Some(3)).unwrap();
            let device = Device::new(LaunchContext::default(), 16).unwrap();

            let mut a = filled(&cells, MemType::HostOnly);
            let p = sort_by_cell(&mut a, &threaded, 32).unwrap();
            prop_assert_eq!(a.number(), live);
            assert_grouped(&a, &p, 32);

            let mut b = filled(&cells, MemType::DeviceManaged);
            let q = sort_by_cell(&mut b, &device, 32).unwrap();
            prop_assert_eq!(&p, &q);

            let mut ids: Vec<u64> = a.snapshot().iter().map(|r| r.id).collect();
            ids.sort_unstable();
            let expect: Vec<u64> = cells
                .iter()
                .enumerate()
                .filter(|(_, &c)| c != E)
                .map(|(i, _)| i as u64)
                .collect();
            prop_assert_eq!(ids, expect);
        }
    }
}
