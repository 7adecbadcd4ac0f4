//! Per-axis array lengths.

use std::fmt;
use std::ops::Index;

use aurora_core::ConfigError;

/// Length of each of the `D` axes of a multi-dimensional array.
///
/// Axis 0 is the fastest-varying axis in row-major layout.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Extent<const D: usize>(pub [u32; D]);

impl<const D: usize> Extent<D> {
    /// Wrap per-axis lengths.
    pub const fn new(dims: [u32; D]) -> Self {
        Self(dims)
    }

    /// Per-axis lengths.
    pub fn dims(&self) -> [u32; D] {
        self.0
    }

    /// Total number of elements.
    pub fn size(&self) -> usize {
        self.0.iter().map(|&n| n as usize).product()
    }

    /// True if every axis length is a power of two.
    pub fn is_power_of_two(&self) -> bool {
        self.0.iter().all(|n| n.is_power_of_two())
    }

    /// True if `pos` lies inside the extent.
    pub fn contains(&self, pos: [u32; D]) -> bool {
        pos.iter().zip(self.0.iter()).all(|(p, n)| p < n)
    }

    /// Reject extents with a zero-length axis.
    pub fn validate(&self) -> Result<(), ConfigError> {
        match self.0.iter().position(|&n| n == 0) {
            Some(axis) => Err(ConfigError::ZeroExtent { axis }),
            None => Ok(()),
        }
    }

    /// Iterate over every position in row-major order.
    pub fn positions(self) -> impl Iterator<Item = [u32; D]> {
        (0..self.size()).map(move |i| self.unravel(i))
    }

    /// Row-major position of linear index `i`.
    pub(crate) fn unravel(&self, mut i: usize) -> [u32; D] {
        let mut pos = [0u32; D];
        for (p, &n) in pos.iter_mut().zip(self.0.iter()) {
            *p = (i % n as usize) as u32;
            i /= n as usize;
        }
        pos
    }
}

impl<const D: usize> Index<usize> for Extent<D> {
    type Output = u32;

    fn index(&self, axis: usize) -> &u32 {
        &self.0[axis]
    }
}

impl<const D: usize> From<[u32; D]> for Extent<D> {
    fn from(dims: [u32; D]) -> Self {
        Self(dims)
    }
}

impl<const D: usize> fmt::Display for Extent<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.0.iter().map(u32::to_string).collect();
        f.write_str(&parts.join("x"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn size_and_display() {
        let e = Extent::new([4, 3, 2]);
        assert_eq!(e.size(), 24);
        assert_eq!(e.to_string(), "4x3x2");
        assert!(!e.is_power_of_two());
        assert!(Extent::new([8, 1, 16]).is_power_of_two());
    }

    #[test]
    fn zero_axis_rejected() {
        assert_eq!(
            Extent::new([4, 0]).validate(),
            Err(ConfigError::ZeroExtent { axis: 1 })
        );
    }

    #[test]
    fn positions_walk_axis_zero_first() {
        let e = Extent::new([2, 2]);
        let all: Vec<_> = e.positions().collect();
        assert_eq!(all, vec![[0, 0], [1, 0], [0, 1], [1, 1]]);
    }

    #[test]
    fn positions_outlive_the_extent() {
        let walk = {
            let e = Extent::new([3, 2]);
            e.positions()
        };
        assert_eq!(walk.last(), Some([2, 1]));
    }
}
