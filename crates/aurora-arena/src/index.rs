//! Indexing schemes mapping positions to linear offsets.
//!
//! [`RowMajor`] lays axis 0 out contiguously. [`Morton`] interleaves the
//! bits of every coordinate (a Z-order curve) so that small cubic
//! neighbourhoods land in nearby memory, which is what stencil loops
//! want. When axes differ in length, an axis stops contributing bits once
//! its own bits are exhausted, so the mapping stays a bijection onto
//! `0..extent.size()`.

use aurora_core::ConfigError;

use crate::extent::Extent;

/// Position ↔ linear-offset mapping for an [`Extent`].
pub trait Indexing: Copy + Default + Send + Sync + 'static {
    /// Short name for diagnostics.
    const NAME: &'static str;

    /// Check that `extent` is usable with this scheme.
    fn validate<const D: usize>(extent: &Extent<D>) -> Result<(), ConfigError>;

    /// Linear offset of `pos`.
    fn linear<const D: usize>(pos: [u32; D], extent: &Extent<D>) -> usize;

    /// Inverse of [`linear`](Indexing::linear).
    fn position<const D: usize>(linear: usize, extent: &Extent<D>) -> [u32; D];
}

/// Row-major layout with axis 0 fastest.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RowMajor;

impl Indexing for RowMajor {
    const NAME: &'static str = "row_major";

    fn validate<const D: usize>(extent: &Extent<D>) -> Result<(), ConfigError> {
        extent.validate()
    }

    #[inline]
    fn linear<const D: usize>(pos: [u32; D], extent: &Extent<D>) -> usize {
        let mut idx = 0usize;
        for d in (0..D).rev() {
            idx = idx * extent[d] as usize + pos[d] as usize;
        }
        idx
    }

    #[inline]
    fn position<const D: usize>(linear: usize, extent: &Extent<D>) -> [u32; D] {
        extent.unravel(linear)
    }
}

/// Cache-blocked Z-order layout. Every axis must be a power of two.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Morton;

fn axis_bits<const D: usize>(extent: &Extent<D>) -> [u32; D] {
    let mut bits = [0u32; D];
    for (b, &n) in bits.iter_mut().zip(extent.0.iter()) {
        *b = n.trailing_zeros();
    }
    bits
}

impl Indexing for Morton {
    const NAME: &'static str = "morton";

    fn validate<const D: usize>(extent: &Extent<D>) -> Result<(), ConfigError> {
        extent.validate()?;
        match extent.0.iter().position(|n| !n.is_power_of_two()) {
            Some(axis) => Err(ConfigError::NonPowerOfTwoExtent {
                axis,
                len: extent[axis],
            }),
            None => Ok(()),
        }
    }

    #[inline]
    fn linear<const D: usize>(pos: [u32; D], extent: &Extent<D>) -> usize {
        let bits = axis_bits(extent);
        let levels = bits.iter().copied().max().unwrap_or(0);
        let mut out = 0usize;
        let mut shift = 0;
        for level in 0..levels {
            for d in 0..D {
                if level < bits[d] {
                    out |= (((pos[d] >> level) & 1) as usize) << shift;
                    shift += 1;
                }
            }
        }
        out
    }

    #[inline]
    fn position<const D: usize>(linear: usize, extent: &Extent<D>) -> [u32; D] {
        let bits = axis_bits(extent);
        let levels = bits.iter().copied().max().unwrap_or(0);
        let mut pos = [0u32; D];
        let mut shift = 0;
        for level in 0..levels {
            for d in 0..D {
                if level < bits[d] {
                    pos[d] |= (((linear >> shift) & 1) as u32) << level;
                    shift += 1;
                }
            }
        }
        pos
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn row_major_axis_zero_fastest() {
        let e = Extent::new([4, 3, 2]);
        assert_eq!(RowMajor::linear([1, 0, 0], &e), 1);
        assert_eq!(RowMajor::linear([0, 1, 0], &e), 4);
        assert_eq!(RowMajor::linear([0, 0, 1], &e), 12);
        assert_eq!(RowMajor::position(23, &e), [3, 2, 1]);
    }

    #[test]
    fn morton_rejects_non_power_of_two() {
        let e = Extent::new([8, 6]);
        assert_eq!(
            Morton::validate(&e),
            Err(ConfigError::NonPowerOfTwoExtent { axis: 1, len: 6 })
        );
        assert!(Morton::validate(&Extent::new([8, 4, 2])).is_ok());
    }

    #[test]
    fn morton_interleaves_bits() {
        let e = Extent::new([4, 4]);
        assert_eq!(Morton::linear([0, 0], &e), 0);
        assert_eq!(Morton::linear([1, 0], &e), 1);
        assert_eq!(Morton::linear([0, 1], &e), 2);
        assert_eq!(Morton::linear([1, 1], &e), 3);
        assert_eq!(Morton::linear([2, 0], &e), 4);
        assert_eq!(Morton::linear([3, 3], &e), 15);
    }

    fn is_bijection<I: Indexing, const D: usize>(e: Extent<D>) -> bool {
        let mut seen = vec![false; e.size()];
        for pos in e.positions() {
            let l = I::linear(pos, &e);
            if l >= seen.len() || seen[l] || I::position(l, &e) != pos {
                return false;
            }
            seen[l] = true;
        }
        seen.into_iter().all(|s| s)
    }

    proptest! {
        #[test]
        fn morton_is_bijective_on_uneven_axes(a in 0u32..4, b in 0u32..4, c in 0u32..3) {
            let e = Extent::new([1 << a, 1 << b, 1 << c]);
            prop_assert!(is_bijection::<Morton, 3>(e));
        }

        #[test]
        fn row_major_is_bijective(a in 1u32..7, b in 1u32..7) {
            prop_assert!(is_bijection::<RowMajor, 2>(Extent::new([a, b])));
        }
    }
}
