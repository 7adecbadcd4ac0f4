//! Atomic floating-point accumulators for concurrent deposition.
//!
//! Many particle threads scatter into overlapping mesh cells at once.
//! [`AtomicScalar`] provides a lock-free `fetch_add` over the bit pattern
//! of a [`Scalar`]; [`AtomicArray`] lays those out on a mesh extent and
//! hands the accumulated result to a regular [`MultiArray`] afterwards.
//! Summation order is not deterministic, so results agree across
//! backends only to within floating-point rounding.

use std::marker::PhantomData;
#[cfg(feature = "single-precision")]
use std::sync::atomic::AtomicU32 as AtomicBits;
#[cfg(not(feature = "single-precision"))]
use std::sync::atomic::AtomicU64 as AtomicBits;
use std::sync::atomic::Ordering;

use aurora_core::{ConfigError, Scalar};

use crate::extent::Extent;
use crate::index::{Indexing, RowMajor};
use crate::mem::{MemSpace, MemType};
use crate::multi_array::MultiArray;

/// A [`Scalar`] supporting atomic addition.
#[derive(Debug, Default)]
pub struct AtomicScalar(AtomicBits);

impl AtomicScalar {
    /// New accumulator holding `v`.
    pub fn new(v: Scalar) -> Self {
        Self(AtomicBits::new(v.to_bits()))
    }

    /// Current value.
    #[inline]
    pub fn load(&self) -> Scalar {
        Scalar::from_bits(self.0.load(Ordering::Relaxed))
    }

    /// Overwrite the value.
    #[inline]
    pub fn store(&self, v: Scalar) {
        self.0.store(v.to_bits(), Ordering::Relaxed);
    }

    /// Atomically add `v`, returning the previous value.
    #[inline]
    pub fn fetch_add(&self, v: Scalar) -> Scalar {
        let mut current = self.0.load(Ordering::Relaxed);
        loop {
            let next = (Scalar::from_bits(current) + v).to_bits();
            match self
                .0
                .compare_exchange_weak(current, next, Ordering::Relaxed, Ordering::Relaxed)
            {
                Ok(prev) => return Scalar::from_bits(prev),
                Err(actual) => current = actual,
            }
        }
    }
}

/// Mesh-shaped array of [`AtomicScalar`] accumulators.
#[derive(Debug)]
pub struct AtomicArray<const D: usize, I: Indexing = RowMajor> {
    extent: Extent<D>,
    cells: Vec<AtomicScalar>,
    _indexing: PhantomData<I>,
}

impl<const D: usize, I: Indexing> AtomicArray<D, I> {
    /// Zeroed accumulators over `extent`.
    pub fn new(extent: impl Into<Extent<D>>) -> Result<Self, ConfigError> {
        let extent = extent.into();
        I::validate(&extent)?;
        let cells = (0..extent.size()).map(|_| AtomicScalar::default()).collect();
        Ok(Self {
            extent,
            cells,
            _indexing: PhantomData,
        })
    }

    /// Per-axis lengths.
    pub fn extent(&self) -> Extent<D> {
        self.extent
    }

    /// Number of accumulators.
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    /// True if there are no accumulators.
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Linear offset of `pos`.
    #[inline]
    pub fn idx(&self, pos: [u32; D]) -> usize {
        I::linear(pos, &self.extent)
    }

    /// Accumulator at `pos`.
    #[inline]
    pub fn at(&self, pos: [u32; D]) -> &AtomicScalar {
        &self.cells[self.idx(pos)]
    }

    /// Accumulator at linear offset `i`.
    #[inline]
    pub fn at_linear(&self, i: usize) -> &AtomicScalar {
        &self.cells[i]
    }

    /// Current value at `pos`.
    pub fn load(&self, pos: [u32; D]) -> Scalar {
        self.at(pos).load()
    }

    /// Sum over every cell.
    pub fn total(&self) -> Scalar {
        self.cells.iter().map(AtomicScalar::load).sum()
    }

    /// Reset every accumulator to zero.
    pub fn clear(&mut self) {
        for c in &mut self.cells {
            *c.0.get_mut() = Scalar::to_bits(0.0);
        }
    }

    /// Copy the accumulated values into a new array with `mem_type`.
    pub fn to_multi_array(&self, mem_type: MemType) -> Result<MultiArray<Scalar, D, I>, ConfigError> {
        let mut out = MultiArray::new(self.extent, mem_type)?;
        self.accumulate_into(&mut out)?;
        Ok(out)
    }

    /// Add the accumulated values into every allocated space of `target`.
    pub fn accumulate_into(&self, target: &mut MultiArray<Scalar, D, I>) -> Result<(), ConfigError> {
        if target.extent() != self.extent {
            return Err(ConfigError::ExtentMismatch {
                expected: self.extent.size(),
                actual: target.len(),
            });
        }
        let mem_type = target.mem_type();
        for space in [MemSpace::Host, MemSpace::Device] {
            let shared_with_host = space == MemSpace::Device && mem_type == MemType::DeviceManaged;
            if !mem_type.has(space) || shared_with_host {
                continue;
            }
            for (dst, src) in target.slice_mut(space).iter_mut().zip(&self.cells) {
                *dst += src.load();
            }
        }
        Ok(())
    }
}
