//! Multi-dimensional array over a residency-tagged buffer.

use std::marker::PhantomData;
use std::ops::{Index, IndexMut};

use aurora_core::{ConfigError, Scalar};

use crate::buffer::Buffer;
use crate::extent::Extent;
use crate::index::{Indexing, RowMajor};
use crate::mem::{MemSpace, MemType};

/// A [`Buffer`] interpreted through an [`Extent`] and an [`Indexing`] scheme.
///
/// Invariant: `extent.size() == buffer.len()`. Element accessors
/// (`get`, `Index`) go through host memory.
#[derive(Debug)]
pub struct MultiArray<T, const D: usize, I: Indexing = RowMajor> {
    buf: Buffer<T>,
    extent: Extent<D>,
    _indexing: PhantomData<I>,
}

impl<T: Copy + Default, const D: usize, I: Indexing> MultiArray<T, D, I> {
    /// Allocate a default-initialised array.
    ///
    /// Fails if an axis is zero or the indexing scheme rejects the extent.
    pub fn new(extent: impl Into<Extent<D>>, mem_type: MemType) -> Result<Self, ConfigError> {
        let extent = extent.into();
        I::validate(&extent)?;
        Ok(Self {
            buf: Buffer::new(extent.size(), mem_type),
            extent,
            _indexing: PhantomData,
        })
    }

    /// Interpret an existing buffer with `extent`.
    pub fn from_buffer(buf: Buffer<T>, extent: impl Into<Extent<D>>) -> Result<Self, ConfigError> {
        let extent = extent.into();
        I::validate(&extent)?;
        if extent.size() != buf.len() {
            return Err(ConfigError::ExtentMismatch {
                expected: extent.size(),
                actual: buf.len(),
            });
        }
        Ok(Self {
            buf,
            extent,
            _indexing: PhantomData,
        })
    }

    /// Per-axis lengths.
    pub fn extent(&self) -> Extent<D> {
        self.extent
    }

    /// Total number of elements.
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    /// True if the array holds no elements.
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Residency tag of the backing buffer.
    pub fn mem_type(&self) -> MemType {
        self.buf.mem_type()
    }

    /// Linear offset of `pos`.
    #[inline]
    pub fn idx(&self, pos: [u32; D]) -> usize {
        I::linear(pos, &self.extent)
    }

    /// Position of linear offset `linear`.
    #[inline]
    pub fn pos_at(&self, linear: usize) -> [u32; D] {
        I::position(linear, &self.extent)
    }

    /// Host value at `pos`.
    #[track_caller]
    pub fn get(&self, pos: [u32; D]) -> T {
        self.buf.host()[self.idx(pos)]
    }

    /// Mutable host reference at `pos`.
    #[track_caller]
    pub fn get_mut(&mut self, pos: [u32; D]) -> &mut T {
        let i = self.idx(pos);
        &mut self.buf.host_mut()[i]
    }

    /// The backing buffer.
    pub fn buffer(&self) -> &Buffer<T> {
        &self.buf
    }

    /// Mutable backing buffer. Its length must not be changed.
    pub fn buffer_mut(&mut self) -> &mut Buffer<T> {
        &mut self.buf
    }

    /// Linear view of `space`.
    #[track_caller]
    pub fn slice(&self, space: MemSpace) -> &[T] {
        self.buf.slice(space)
    }

    /// Mutable linear view of `space`.
    #[track_caller]
    pub fn slice_mut(&mut self, space: MemSpace) -> &mut [T] {
        self.buf.slice_mut(space)
    }

    /// Reshape and reallocate. Contents are reset to the default value.
    pub fn resize(&mut self, extent: impl Into<Extent<D>>) -> Result<(), ConfigError> {
        let extent = extent.into();
        I::validate(&extent)?;
        self.buf.resize(extent.size());
        self.buf.assign(T::default());
        self.extent = extent;
        Ok(())
    }

    /// Fill every allocated address space with `value`.
    pub fn assign(&mut self, value: T) {
        self.buf.assign(value);
    }

    /// Copy the overlapping prefix of `other` into `self`.
    pub fn copy_from(&mut self, other: &MultiArray<T, D, I>) -> usize {
        self.buf.copy_from(&other.buf, other.len(), 0, 0)
    }

    /// See [`Buffer::copy_to_host`].
    pub fn copy_to_host(&mut self) {
        self.buf.copy_to_host();
    }

    /// See [`Buffer::copy_to_device`].
    pub fn copy_to_device(&mut self) {
        self.buf.copy_to_device();
    }

    /// Every position, in storage order.
    pub fn indices(&self) -> impl Iterator<Item = [u32; D]> + '_ {
        (0..self.len()).map(move |i| self.pos_at(i))
    }

    /// Move the storage out, leaving an empty array with the same extent tag.
    pub fn take(&mut self) -> Self {
        Self {
            buf: self.buf.take(),
            extent: std::mem::replace(&mut self.extent, Extent::new([0; D])),
            _indexing: PhantomData,
        }
    }

    /// Copy a `size` box from `src` at `src_pos` into `self` at `dst_pos`
    /// on the host. Cells falling outside either array are skipped.
    pub fn copy_region(
        &mut self,
        src: &MultiArray<T, D, I>,
        dst_pos: [u32; D],
        src_pos: [u32; D],
        size: Extent<D>,
    ) {
        self.zip_region(src, dst_pos, src_pos, size, |d, s| *d = s);
    }

    fn zip_region(
        &mut self,
        src: &MultiArray<T, D, I>,
        dst_pos: [u32; D],
        src_pos: [u32; D],
        size: Extent<D>,
        mut op: impl FnMut(&mut T, T),
    ) {
        let (dst_ext, src_ext) = (self.extent, src.extent);
        let src_host = src.buf.host();
        let dst_host = self.buf.host_mut();
        for rel in size.positions() {
            let mut d = [0u32; D];
            let mut s = [0u32; D];
            for k in 0..D {
                d[k] = dst_pos[k] + rel[k];
                s[k] = src_pos[k] + rel[k];
            }
            if dst_ext.contains(d) && src_ext.contains(s) {
                op(
                    &mut dst_host[I::linear(d, &dst_ext)],
                    src_host[I::linear(s, &src_ext)],
                );
            }
        }
    }
}

impl<const D: usize, I: Indexing> MultiArray<Scalar, D, I> {
    /// Add `scale * src` over a `size` box on the host.
    pub fn add_region(
        &mut self,
        src: &MultiArray<Scalar, D, I>,
        dst_pos: [u32; D],
        src_pos: [u32; D],
        size: Extent<D>,
        scale: Scalar,
    ) {
        self.zip_region(src, dst_pos, src_pos, size, |d, s| *d += scale * s);
    }

    /// Sum of all host values.
    pub fn sum(&self) -> Scalar {
        self.buf.host().iter().sum()
    }
}

impl<T: Copy + Default, const D: usize, I: Indexing> Index<[u32; D]> for MultiArray<T, D, I> {
    type Output = T;

    #[track_caller]
    fn index(&self, pos: [u32; D]) -> &T {
        &self.buf.host()[self.idx(pos)]
    }
}

impl<T: Copy + Default, const D: usize, I: Indexing> IndexMut<[u32; D]> for MultiArray<T, D, I> {
    #[track_caller]
    fn index_mut(&mut self, pos: [u32; D]) -> &mut T {
        self.get_mut(pos)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::Morton;

    #[test]
    fn morton_array_rejects_bad_extent() {
        let r = MultiArray::<f32, 3, Morton>::new([8, 8, 6], MemType::HostOnly);
        assert_eq!(
            r.err(),
            Some(ConfigError::NonPowerOfTwoExtent { axis: 2, len: 6 })
        );
    }

    #[test]
    fn row_major_accepts_any_extent() {
        let a = MultiArray::<f32, 2>::new([5, 3], MemType::HostOnly).unwrap();
        assert_eq!(a.len(), 15);
    }

    #[test]
    fn from_buffer_checks_length() {
        let buf = Buffer::<u32>::new(10, MemType::HostOnly);
        let r = MultiArray::<u32, 2>::from_buffer(buf, [4, 3]);
        assert_eq!(
            r.err(),
            Some(ConfigError::ExtentMismatch {
                expected: 12,
                actual: 10
            })
        );
    }

    #[test]
    fn index_round_trip_through_scheme() {
        let mut a = MultiArray::<u32, 2, Morton>::new([4, 4], MemType::HostOnly).unwrap();
        a[[3, 1]] = 42;
        let l = a.idx([3, 1]);
        assert_eq!(a.pos_at(l), [3, 1]);
        assert_eq!(a.buffer().host()[l], 42);
        assert_eq!(a.indices().count(), 16);
    }

    #[test]
    fn regions_clip_to_bounds() {
        let mut dst = MultiArray::<Scalar, 2>::new([4, 4], MemType::HostOnly).unwrap();
        let mut src = MultiArray::<Scalar, 2>::new([2, 2], MemType::HostOnly).unwrap();
        src.assign(1.0);
        dst.add_region(&src, [3, 3], [0, 0], Extent::new([2, 2]), 2.0);
        assert_eq!(dst.sum(), 2.0);
        dst.copy_region(&src, [0, 0], [0, 0], Extent::new([2, 2]));
        assert_eq!(dst[[1, 1]], 1.0);
        assert_eq!(dst.sum(), 6.0);
    }

    #[test]
    fn resize_resets_contents() {
        let mut a = MultiArray::<u32, 1>::new([4], MemType::HostDevice).unwrap();
        a.assign(3);
        a.resize([6]).unwrap();
        assert_eq!(a.len(), 6);
        assert!(a.buffer().host().iter().all(|&v| v == 0));
        assert!(a.buffer().device().iter().all(|&v| v == 0));
    }
}
