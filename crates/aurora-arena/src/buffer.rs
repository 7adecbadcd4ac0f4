//! Residency-tagged linear buffer.
//!
//! A [`Buffer`] owns up to two allocations, one per address space, as
//! dictated by its [`MemType`]. Buffers are move-only: there is no
//! `Clone`, and [`Buffer::take`] hands the allocation to a new owner
//! while leaving an empty buffer of the same residency behind.
//!
//! There is no validity tracking between the host and device copies of
//! a mirrored buffer. Whoever writes one side is responsible for calling
//! [`copy_to_host`](Buffer::copy_to_host) or
//! [`copy_to_device`](Buffer::copy_to_device) before the other side is
//! read.

use std::ops::{Index, IndexMut};

use crate::mem::{MemSpace, MemType};

/// Linear memory of `len` elements in one or both address spaces.
#[derive(Debug)]
pub struct Buffer<T> {
    mem_type: MemType,
    len: usize,
    host: Option<Vec<T>>,
    /// Device allocation. Also serves host access for `DeviceManaged`.
    device: Option<Vec<T>>,
}

#[cold]
#[track_caller]
fn unallocated(mem_type: MemType, space: MemSpace) -> ! {
    panic!("{space} memory is not allocated for a {mem_type} buffer")
}

impl<T: Copy + Default> Buffer<T> {
    /// Allocate `len` default-initialised elements under `mem_type`.
    pub fn new(len: usize, mem_type: MemType) -> Self {
        let alloc = || Some(vec![T::default(); len]);
        let (host, device) = match mem_type {
            MemType::HostOnly => (alloc(), None),
            MemType::HostDevice => (alloc(), alloc()),
            MemType::DeviceManaged | MemType::DeviceOnly => (None, alloc()),
        };
        Self {
            mem_type,
            len,
            host,
            device,
        }
    }

    /// An empty buffer with the given residency.
    pub fn empty(mem_type: MemType) -> Self {
        Self::new(0, mem_type)
    }

    /// Build a buffer whose every allocated space holds `data`.
    pub fn from_slice(data: &[T], mem_type: MemType) -> Self {
        let mut buf = Self::new(data.len(), mem_type);
        for v in buf.allocations_mut() {
            v.copy_from_slice(data);
        }
        buf
    }

    /// Number of elements.
    pub fn len(&self) -> usize {
        self.len
    }

    /// True if the buffer holds no elements.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Residency tag.
    pub fn mem_type(&self) -> MemType {
        self.mem_type
    }

    /// Host view, or `None` if host memory is not allocated.
    pub fn host_ptr(&self) -> Option<&[T]> {
        match self.mem_type {
            MemType::HostOnly | MemType::HostDevice => self.host.as_deref(),
            MemType::DeviceManaged => self.device.as_deref(),
            MemType::DeviceOnly => None,
        }
    }

    /// Mutable host view, or `None` if host memory is not allocated.
    pub fn host_ptr_mut(&mut self) -> Option<&mut [T]> {
        match self.mem_type {
            MemType::HostOnly | MemType::HostDevice => self.host.as_deref_mut(),
            MemType::DeviceManaged => self.device.as_deref_mut(),
            MemType::DeviceOnly => None,
        }
    }

    /// Device view, or `None` if device memory is not allocated.
    pub fn dev_ptr(&self) -> Option<&[T]> {
        self.device.as_deref()
    }

    /// Mutable device view, or `None` if device memory is not allocated.
    pub fn dev_ptr_mut(&mut self) -> Option<&mut [T]> {
        self.device.as_deref_mut()
    }

    /// View of `space`, or `None` if it is not allocated.
    pub fn ptr(&self, space: MemSpace) -> Option<&[T]> {
        match space {
            MemSpace::Host => self.host_ptr(),
            MemSpace::Device => self.dev_ptr(),
        }
    }

    /// Mutable view of `space`, or `None` if it is not allocated.
    pub fn ptr_mut(&mut self, space: MemSpace) -> Option<&mut [T]> {
        match space {
            MemSpace::Host => self.host_ptr_mut(),
            MemSpace::Device => self.dev_ptr_mut(),
        }
    }

    /// Host view.
    ///
    /// # Panics
    ///
    /// If the residency tag has no host allocation.
    #[track_caller]
    pub fn host(&self) -> &[T] {
        self.slice(MemSpace::Host)
    }

    /// Mutable host view.
    ///
    /// # Panics
    ///
    /// If the residency tag has no host allocation.
    #[track_caller]
    pub fn host_mut(&mut self) -> &mut [T] {
        self.slice_mut(MemSpace::Host)
    }

    /// Device view.
    ///
    /// # Panics
    ///
    /// If the residency tag has no device allocation.
    #[track_caller]
    pub fn device(&self) -> &[T] {
        self.slice(MemSpace::Device)
    }

    /// Mutable device view.
    ///
    /// # Panics
    ///
    /// If the residency tag has no device allocation.
    #[track_caller]
    pub fn device_mut(&mut self) -> &mut [T] {
        self.slice_mut(MemSpace::Device)
    }

    /// View of `space`.
    ///
    /// # Panics
    ///
    /// If `space` is not allocated under this residency tag.
    #[track_caller]
    pub fn slice(&self, space: MemSpace) -> &[T] {
        match self.ptr(space) {
            Some(s) => s,
            None => unallocated(self.mem_type, space),
        }
    }

    /// Mutable view of `space`.
    ///
    /// # Panics
    ///
    /// If `space` is not allocated under this residency tag.
    #[track_caller]
    pub fn slice_mut(&mut self, space: MemSpace) -> &mut [T] {
        let mem_type = self.mem_type;
        match self.ptr_mut(space) {
            Some(s) => s,
            None => unallocated(mem_type, space),
        }
    }

    fn allocations_mut(&mut self) -> impl Iterator<Item = &mut Vec<T>> {
        self.host.iter_mut().chain(self.device.iter_mut())
    }

    /// Reallocate every address space to `len` elements.
    ///
    /// Elements below `min(len, old_len)` keep their values; new
    /// elements are default-initialised. All previously borrowed views
    /// are invalidated.
    pub fn resize(&mut self, len: usize) {
        for v in self.allocations_mut() {
            v.resize(len, T::default());
            v.shrink_to_fit();
        }
        tracing::trace!(from = self.len, to = len, mem_type = %self.mem_type, "buffer resized");
        self.len = len;
    }

    /// Fill every allocated address space with `value`.
    pub fn assign(&mut self, value: T) {
        self.assign_range(0, self.len, value);
    }

    /// Fill `start..end` in every allocated address space.
    ///
    /// `end` is clamped to the buffer length; an empty range is a no-op.
    pub fn assign_range(&mut self, start: usize, end: usize, value: T) {
        let end = end.min(self.len);
        if start >= end {
            return;
        }
        for v in self.allocations_mut() {
            v[start..end].fill(value);
        }
    }

    /// Write one element in every allocated address space.
    #[track_caller]
    pub fn write(&mut self, i: usize, value: T) {
        for v in self.allocations_mut() {
            v[i] = value;
        }
    }

    /// Copy `count` elements from `other[src_off..]` into `self[dst_off..]`.
    ///
    /// `count` is truncated so the copy stays inside both buffers. The
    /// copy runs in every address space both buffers share; if they share
    /// none, the single source allocation is copied across spaces.
    /// Returns the number of elements copied.
    pub fn copy_from(
        &mut self,
        other: &Buffer<T>,
        count: usize,
        src_off: usize,
        dst_off: usize,
    ) -> usize {
        if src_off >= other.len || dst_off >= self.len {
            return 0;
        }
        let n = count.min(other.len - src_off).min(self.len - dst_off);
        if n == 0 {
            return 0;
        }
        let mut copied = false;
        for space in [MemSpace::Host, MemSpace::Device] {
            if let (Some(src), Some(dst)) = (other.ptr(space), self.ptr_mut(space)) {
                dst[dst_off..dst_off + n].copy_from_slice(&src[src_off..src_off + n]);
                copied = true;
            }
        }
        if !copied {
            let src = other.host_ptr().or_else(|| other.dev_ptr());
            if let (Some(src), Some(dst)) = (src, self.allocations_mut().next()) {
                dst[dst_off..dst_off + n].copy_from_slice(&src[src_off..src_off + n]);
            }
        }
        n
    }

    /// Copy device contents to the host mirror. No-op unless `HostDevice`.
    pub fn copy_to_host(&mut self) {
        if let (Some(h), Some(d)) = (self.host.as_mut(), self.device.as_ref()) {
            h.copy_from_slice(d);
        }
    }

    /// Copy host contents to the device mirror. No-op unless `HostDevice`.
    pub fn copy_to_device(&mut self) {
        if let (Some(h), Some(d)) = (self.host.as_ref(), self.device.as_mut()) {
            d.copy_from_slice(h);
        }
    }

    /// Write `values` into host memory starting at `pos`, stopping at the
    /// end of the buffer. Returns the number of elements written.
    ///
    /// # Panics
    ///
    /// If the residency tag has no host allocation.
    #[track_caller]
    pub fn emplace(&mut self, pos: usize, values: &[T]) -> usize {
        let host = self.host_mut();
        if pos >= host.len() {
            return 0;
        }
        let n = values.len().min(host.len() - pos);
        host[pos..pos + n].copy_from_slice(&values[..n]);
        n
    }

    /// Move the allocation out, leaving an empty buffer of the same tag.
    pub fn take(&mut self) -> Self {
        let mem_type = self.mem_type;
        std::mem::replace(self, Self::empty(mem_type))
    }
}

impl<T: Copy + Default> Default for Buffer<T> {
    fn default() -> Self {
        Self::empty(MemType::HostOnly)
    }
}

impl<T: Copy + Default> Index<usize> for Buffer<T> {
    type Output = T;

    #[track_caller]
    fn index(&self, i: usize) -> &T {
        &self.host()[i]
    }
}

impl<T: Copy + Default> IndexMut<usize> for Buffer<T> {
    #[track_caller]
    fn index_mut(&mut self, i: usize) -> &mut T {
        &mut self.host_mut()[i]
    }
}
