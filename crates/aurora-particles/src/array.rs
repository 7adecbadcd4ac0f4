//! Structure-of-arrays particle container.

use std::sync::atomic::{AtomicUsize, Ordering};

use aurora_arena::{Buffer, MemSpace, MemType};
use aurora_core::{CapacityError, Scalar, EMPTY_CELL};
use aurora_exec::ExecPolicy;

use crate::record::Particle;

/// Fixed-capacity particle storage, one buffer per attribute.
///
/// `size` is the capacity, `number` the logical length. Slots in
/// `0..number` may be dead (cell id [`EMPTY_CELL`]); slots at or beyond
/// `number` are always dead. Element-wise writes (`append`, `set`,
/// `erase`) go to every allocated address space; reads go through host
/// memory, falling back to device memory for `DeviceOnly` arrays.
#[derive(Debug)]
pub struct ParticleArray {
    x1: Buffer<Scalar>,
    x2: Buffer<Scalar>,
    x3: Buffer<Scalar>,
    p1: Buffer<Scalar>,
    p2: Buffer<Scalar>,
    p3: Buffer<Scalar>,
    energy: Buffer<Scalar>,
    weight: Buffer<Scalar>,
    cell: Buffer<u32>,
    flag: Buffer<u32>,
    id: Buffer<u64>,
    number: usize,
    mem_type: MemType,
}

/// Read-only slices of every attribute in one address space.
#[derive(Clone, Copy, Debug)]
pub struct ParticleView<'a> {
    /// Sub-cell positions.
    pub x: [&'a [Scalar]; 3],
    /// Momenta.
    pub p: [&'a [Scalar]; 3],
    /// Energies.
    pub energy: &'a [Scalar],
    /// Weights.
    pub weight: &'a [Scalar],
    /// Cell ids.
    pub cell: &'a [u32],
    /// Flag words.
    pub flag: &'a [u32],
    /// Tracking ids.
    pub id: &'a [u64],
}

impl ParticleView<'_> {
    /// Record at slot `i`.
    #[inline]
    pub fn get(&self, i: usize) -> Particle {
        Particle {
            x: [self.x[0][i], self.x[1][i], self.x[2][i]],
            p: [self.p[0][i], self.p[1][i], self.p[2][i]],
            energy: self.energy[i],
            weight: self.weight[i],
            cell: self.cell[i],
            flag: self.flag[i],
            id: self.id[i],
        }
    }
}

/// Mutable slices of the attributes a push updates, in one address space.
#[derive(Debug)]
pub struct ParticleViewMut<'a> {
    /// Sub-cell positions.
    pub x: [&'a mut [Scalar]; 3],
    /// Momenta.
    pub p: [&'a mut [Scalar]; 3],
    /// Energies.
    pub energy: &'a mut [Scalar],
    /// Cell ids.
    pub cell: &'a mut [u32],
}

impl ParticleArray {
    /// Allocate `size` dead slots under `mem_type`.
    pub fn new(size: usize, mem_type: MemType) -> Self {
        let mut cell = Buffer::new(size, mem_type);
        cell.assign(EMPTY_CELL);
        tracing::debug!(size, %mem_type, "particle array allocated");
        Self {
            x1: Buffer::new(size, mem_type),
            x2: Buffer::new(size, mem_type),
            x3: Buffer::new(size, mem_type),
            p1: Buffer::new(size, mem_type),
            p2: Buffer::new(size, mem_type),
            p3: Buffer::new(size, mem_type),
            energy: Buffer::new(size, mem_type),
            weight: Buffer::new(size, mem_type),
            cell,
            flag: Buffer::new(size, mem_type),
            id: Buffer::new(size, mem_type),
            number: 0,
            mem_type,
        }
    }

    /// Capacity.
    pub fn size(&self) -> usize {
        self.cell.len()
    }

    /// Logical length, dead slots included.
    pub fn number(&self) -> usize {
        self.number
    }

    /// Residency of every attribute buffer.
    pub fn mem_type(&self) -> MemType {
        self.mem_type
    }

    /// Set the logical length, clamped to the capacity.
    pub fn set_num(&mut self, n: usize) {
        self.number = n.min(self.size());
    }

    /// Grow the logical length by `n`, clamped to the capacity.
    pub fn add_num(&mut self, n: usize) {
        self.set_num(self.number + n);
    }

    fn read_space(&self) -> MemSpace {
        if self.mem_type.has_host() {
            MemSpace::Host
        } else {
            MemSpace::Device
        }
    }

    fn check_capacity(&self, extra: usize) -> Result<(), CapacityError> {
        let requested = self.number + extra;
        if requested > self.size() {
            return Err(CapacityError {
                requested,
                capacity: self.size(),
            });
        }
        Ok(())
    }

    /// Write a particle at slot `number` and advance `number`.
    ///
    /// Returns the slot written. Fails without writing when full.
    pub fn append(
        &mut self,
        x: [Scalar; 3],
        p: [Scalar; 3],
        cell: u32,
        weight: Scalar,
        flag: u32,
    ) -> Result<usize, CapacityError> {
        self.append_particle(&Particle {
            x,
            p,
            energy: 0.0,
            weight,
            cell,
            flag,
            id: 0,
        })
    }

    /// Append a full record.
    pub fn append_particle(&mut self, ptc: &Particle) -> Result<usize, CapacityError> {
        self.check_capacity(1)?;
        let slot = self.number;
        self.set(slot, ptc);
        self.number += 1;
        Ok(slot)
    }

    /// Append every record, or none if they do not all fit.
    pub fn append_records(&mut self, records: &[Particle]) -> Result<(), CapacityError> {
        self.check_capacity(records.len())?;
        for r in records {
            let slot = self.number;
            self.set(slot, r);
            self.number += 1;
        }
        Ok(())
    }

    /// Append from `tasks` concurrent producers.
    ///
    /// Each task fills a local batch, then reserves a contiguous slot
    /// range from a shared atomic counter. The total is checked against
    /// the capacity before anything is committed, so a failing call
    /// leaves the array untouched. Returns the number appended.
    pub fn append_concurrent<P, F>(
        &mut self,
        policy: &P,
        tasks: usize,
        producer: F,
    ) -> Result<usize, CapacityError>
    where
        P: ExecPolicy,
        F: Fn(usize, &mut Vec<Particle>) + Sync + Send,
    {
        let cursor = AtomicUsize::new(self.number);
        let mut batches: Vec<(usize, Vec<Particle>)> = Vec::new();
        batches.resize_with(tasks, || (0, Vec::new()));
        policy.parallel_fill(&mut batches, |task| {
            let mut out = Vec::new();
            producer(task, &mut out);
            let base = cursor.fetch_add(out.len(), Ordering::Relaxed);
            (base, out)
        });
        let end = cursor.into_inner();
        if end > self.size() {
            return Err(CapacityError {
                requested: end,
                capacity: self.size(),
            });
        }
        for (base, batch) in &batches {
            for (k, r) in batch.iter().enumerate() {
                self.set(base + k, r);
            }
        }
        let added = end - self.number;
        self.number = end;
        Ok(added)
    }

    /// Mark `start..start + count` dead. Does not compact or change `number`.
    pub fn erase(&mut self, start: usize, count: usize) {
        self.cell
            .assign_range(start, start.saturating_add(count), EMPTY_CELL);
    }

    /// Mark every slot dead and reset `number` to zero.
    pub fn init(&mut self) {
        self.erase(0, self.size());
        self.number = 0;
    }

    /// Change the capacity. Slots below the new capacity keep their data;
    /// new slots are dead.
    pub fn resize(&mut self, size: usize) {
        let old = self.size();
        self.for_each_buffer(|b| b.resize(size), |b| b.resize(size), |b| b.resize(size));
        if size > old {
            self.cell.assign_range(old, size, EMPTY_CELL);
        }
        self.number = self.number.min(size);
    }

    /// Copy `count` slots of `other` starting at `src_offset` into this
    /// array at `dst_offset`, truncated to fit both. `number` grows to
    /// cover the copied range. Returns the number of slots copied.
    pub fn copy_range(
        &mut self,
        other: &ParticleArray,
        count: usize,
        src_offset: usize,
        dst_offset: usize,
    ) -> usize {
        let n = self.cell.copy_from(&other.cell, count, src_offset, dst_offset);
        for (dst, src) in [
            (&mut self.x1, &other.x1),
            (&mut self.x2, &other.x2),
            (&mut self.x3, &other.x3),
            (&mut self.p1, &other.p1),
            (&mut self.p2, &other.p2),
            (&mut self.p3, &other.p3),
            (&mut self.energy, &other.energy),
            (&mut self.weight, &other.weight),
        ] {
            dst.copy_from(src, n, src_offset, dst_offset);
        }
        self.flag.copy_from(&other.flag, n, src_offset, dst_offset);
        self.id.copy_from(&other.id, n, src_offset, dst_offset);
        if n > 0 {
            self.number = self.number.max(dst_offset + n);
        }
        n
    }

    /// Replace the contents with `other`'s first `number` slots.
    pub fn copy_from(&mut self, other: &ParticleArray) {
        self.init();
        self.copy_range(other, other.number(), 0, 0);
        self.number = other.number().min(self.size());
    }

    /// Record at slot `i`.
    #[track_caller]
    pub fn get(&self, i: usize) -> Particle {
        self.view(self.read_space()).get(i)
    }

    /// Overwrite slot `i` in every address space.
    #[track_caller]
    pub fn set(&mut self, i: usize, ptc: &Particle) {
        self.x1.write(i, ptc.x[0]);
        self.x2.write(i, ptc.x[1]);
        self.x3.write(i, ptc.x[2]);
        self.p1.write(i, ptc.p[0]);
        self.p2.write(i, ptc.p[1]);
        self.p3.write(i, ptc.p[2]);
        self.energy.write(i, ptc.energy);
        self.weight.write(i, ptc.weight);
        self.cell.write(i, ptc.cell);
        self.flag.write(i, ptc.flag);
        self.id.write(i, ptc.id);
    }

    /// Cell id of slot `i`.
    #[track_caller]
    pub fn cell(&self, i: usize) -> u32 {
        self.cell.slice(self.read_space())[i]
    }

    /// Live records in `0..number`, in slot order.
    pub fn snapshot(&self) -> Vec<Particle> {
        let view = self.view(self.read_space());
        (0..self.number)
            .filter(|&i| view.cell[i] != EMPTY_CELL)
            .map(|i| view.get(i))
            .collect()
    }

    /// Number of live slots in `0..number`.
    pub fn live_count(&self) -> usize {
        self.cell.slice(self.read_space())[..self.number]
            .iter()
            .filter(|&&c| c != EMPTY_CELL)
            .count()
    }

    /// True if every live cell id is below `max_cell`.
    pub fn cells_in_range(&self, max_cell: u32) -> bool {
        self.cell.slice(self.read_space())[..self.number]
            .iter()
            .all(|&c| c == EMPTY_CELL || c < max_cell)
    }

    /// Read-only slices in `space`.
    ///
    /// # Panics
    ///
    /// If `space` is not allocated under this array's residency.
    #[track_caller]
    pub fn view(&self, space: MemSpace) -> ParticleView<'_> {
        ParticleView {
            x: [
                self.x1.slice(space),
                self.x2.slice(space),
                self.x3.slice(space),
            ],
            p: [
                self.p1.slice(space),
                self.p2.slice(space),
                self.p3.slice(space),
            ],
            energy: self.energy.slice(space),
            weight: self.weight.slice(space),
            cell: self.cell.slice(space),
            flag: self.flag.slice(space),
            id: self.id.slice(space),
        }
    }

    /// Mutable slices of the pushed attributes in `space`.
    ///
    /// # Panics
    ///
    /// If `space` is not allocated under this array's residency.
    #[track_caller]
    pub fn view_mut(&mut self, space: MemSpace) -> ParticleViewMut<'_> {
        let Self {
            x1,
            x2,
            x3,
            p1,
            p2,
            p3,
            energy,
            cell,
            ..
        } = self;
        ParticleViewMut {
            x: [
                x1.slice_mut(space),
                x2.slice_mut(space),
                x3.slice_mut(space),
            ],
            p: [
                p1.slice_mut(space),
                p2.slice_mut(space),
                p3.slice_mut(space),
            ],
            energy: energy.slice_mut(space),
            cell: cell.slice_mut(space),
        }
    }

    /// Copy every attribute from device to host. No-op unless `HostDevice`.
    pub fn copy_to_host(&mut self) {
        self.for_each_buffer(Buffer::copy_to_host, Buffer::copy_to_host, Buffer::copy_to_host);
    }

    /// Copy every attribute from host to device. No-op unless `HostDevice`.
    pub fn copy_to_device(&mut self) {
        self.for_each_buffer(
            Buffer::copy_to_device,
            Buffer::copy_to_device,
            Buffer::copy_to_device,
        );
    }

    /// Move the storage out, leaving an empty array of the same residency.
    pub fn take(&mut self) -> Self {
        let empty = Self::new(0, self.mem_type);
        std::mem::replace(self, empty)
    }

    pub(crate) fn for_each_buffer(
        &mut self,
        mut scalars: impl FnMut(&mut Buffer<Scalar>),
        mut words: impl FnMut(&mut Buffer<u32>),
        mut ids: impl FnMut(&mut Buffer<u64>),
    ) {
        for b in [
            &mut self.x1,
            &mut self.x2,
            &mut self.x3,
            &mut self.p1,
            &mut self.p2,
            &mut self.p3,
            &mut self.energy,
            &mut self.weight,
        ] {
            scalars(b);
        }
        words(&mut self.cell);
        words(&mut self.flag);
        ids(&mut self.id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aurora_exec::{LaunchContext, Serial, Threaded};

    fn rec(cell: u32, tag: Scalar) -> Particle {
        Particle {
            x: [tag, 0.5, 0.5],
            p: [1.0, 2.0, 3.0],
            energy: 1.0,
            weight: 2.0,
            cell,
            flag: 0,
            id: cell as u64,
        }
    }

    #[test]
    fn new_array_is_all_dead() {
        let a = ParticleArray::new(8, MemType::HostOnly);
        assert_eq!(a.size(), 8);
        assert_eq!(a.number(), 0);
        assert!((0..8).all(|i| a.cell(i) == EMPTY_CELL));
    }

    #[test]
    fn append_until_full() {
        let mut a = ParticleArray::new(2, MemType::HostOnly);
        assert_eq!(a.append([0.1; 3], [0.0; 3], 3, 1.0, 0), Ok(0));
        assert_eq!(a.append([0.2; 3], [0.0; 3], 4, 1.0, 0), Ok(1));
        assert_eq!(
            a.append([0.3; 3], [0.0; 3], 5, 1.0, 0),
            Err(CapacityError {
                requested: 3,
                capacity: 2
            })
        );
        assert_eq!(a.number(), 2);
        assert_eq!(a.get(1).x[0], 0.2);
    }

    #[test]
    fn erase_marks_without_compacting() {
        let mut a = ParticleArray::new(4, MemType::HostOnly);
        a.append_records(&[rec(1, 0.1), rec(2, 0.2), rec(3, 0.3)])
            .unwrap();
        a.erase(1, 1);
        assert_eq!(a.number(), 3);
        assert_eq!(a.live_count(), 2);
        assert_eq!(a.cell(1), EMPTY_CELL);
        let snap = a.snapshot();
        assert_eq!(snap.len(), 2);
        assert_eq!(snap[1].cell, 3);
    }

    #[test]
    fn append_records_is_all_or_nothing() {
        let mut a = ParticleArray::new(2, MemType::HostOnly);
        assert!(a
            .append_records(&[rec(1, 0.1), rec(2, 0.2), rec(3, 0.3)])
            .is_err());
        assert_eq!(a.number(), 0);
    }

    #[test]
    fn resize_keeps_data_and_kills_new_slots() {
        let mut a = ParticleArray::new(2, MemType::HostDevice);
        a.append_records(&[rec(1, 0.1), rec(2, 0.2)]).unwrap();
        a.resize(4);
        assert_eq!(a.size(), 4);
        assert_eq!(a.get(1), rec(2, 0.2));
        assert_eq!(a.cell(3), EMPTY_CELL);
        a.resize(1);
        assert_eq!(a.number(), 1);
    }

    #[test]
    fn copy_range_truncates_and_extends_number() {
        let mut src = ParticleArray::new(4, MemType::HostOnly);
        src.append_records(&[rec(1, 0.1), rec(2, 0.2), rec(3, 0.3)])
            .unwrap();
        let mut dst = ParticleArray::new(3, MemType::HostOnly);
        let n = dst.copy_range(&src, 10, 1, 1);
        assert_eq!(n, 2);
        assert_eq!(dst.number(), 3);
        assert_eq!(dst.cell(0), EMPTY_CELL);
        assert_eq!(dst.get(2), rec(3, 0.3));
    }

    #[test]
    fn set_num_clamps() {
        let mut a = ParticleArray::new(3, MemType::HostOnly);
        a.set_num(10);
        assert_eq!(a.number(), 3);
        a.init();
        assert_eq!(a.number(), 0);
    }

    #[test]
    fn writes_reach_device_mirror() {
        let mut a = ParticleArray::new(2, MemType::HostDevice);
        a.append_particle(&rec(7, 0.7)).unwrap();
        assert_eq!(a.view(MemSpace::Device).get(0), rec(7, 0.7));
    }

    #[test]
    fn device_only_reads_device() {
        let mut a = ParticleArray::new(2, MemType::DeviceOnly);
        a.append_particle(&rec(7, 0.7)).unwrap();
        assert_eq!(a.get(0).cell, 7);
    }

    #[test]
    fn take_leaves_empty() {
        let mut a = ParticleArray::new(2, MemType::HostOnly);
        a.append_particle(&rec(1, 0.1)).unwrap();
        let b = a.take();
        assert_eq!(b.number(), 1);
        assert_eq!(a.size(), 0);
    }

    #[test]
    fn concurrent_append_reserves_disjoint_slots() {
        let policy = Threaded::new(LaunchContext::default(), Some(4)).unwrap();
        let mut a = ParticleArray::new(100, MemType::HostOnly);
        a.append_particle(&rec(1000, 0.0)).unwrap();
        let added = a
            .append_concurrent(&policy, 8, |task, out| {
                for k in 0..(task + 1) {
                    out.push(rec((task * 10 + k) as u32, 0.0));
                }
            })
            .unwrap();
        assert_eq!(added, 36);
        assert_eq!(a.number(), 37);
        let mut cells: Vec<u32> = a.snapshot().iter().map(|p| p.cell).collect();
        cells.sort_unstable();
        cells.dedup();
        assert_eq!(cells.len(), 37);
    }

    #[test]
    fn concurrent_append_over_capacity_writes_nothing() {
        let policy = Serial::default();
        let mut a = ParticleArray::new(5, MemType::HostOnly);
        let r = a.append_concurrent(&policy, 3, |_, out| {
            out.push(rec(1, 0.0));
            out.push(rec(2, 0.0));
        });
        assert_eq!(
            r,
            Err(CapacityError {
                requested: 6,
                capacity: 5
            })
        );
        assert_eq!(a.number(), 0);
        assert_eq!(a.live_count(), 0);
    }
}
