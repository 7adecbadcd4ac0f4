//! Neighbour directions around a local domain.

use std::fmt;

/// One of the `3^D - 1` directions from the local interior to a
/// neighbouring domain, stored as per-axis offsets in `{-1, 0, +1}`.
///
/// The all-zero offset (the local interior itself) is not a zone.
/// Zones are enumerated with axis 0 varying fastest; [`Zone::index`]
/// gives a dense index in `0..Zone::<D>::COUNT` for table lookup.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Zone<const D: usize> {
    offset: [i8; D],
}

impl<const D: usize> Zone<D> {
    /// Number of zones in `D` dimensions.
    pub const COUNT: usize = 3usize.pow(D as u32) - 1;

    /// Raw base-3 index of the all-zero offset.
    const CENTER: usize = (3usize.pow(D as u32) - 1) / 2;

    /// Zone with the given per-axis offsets.
    ///
    /// Returns `None` for the all-zero offset or any component outside
    /// `{-1, 0, +1}`.
    pub fn from_offset(offset: [i8; D]) -> Option<Self> {
        if offset.iter().any(|o| !(-1..=1).contains(o)) || offset.iter().all(|&o| o == 0) {
            return None;
        }
        Some(Self { offset })
    }

    /// Zone at dense index `i`.
    pub fn from_index(i: usize) -> Option<Self> {
        if i >= Self::COUNT {
            return None;
        }
        let mut raw = if i < Self::CENTER { i } else { i + 1 };
        let mut offset = [0i8; D];
        for o in offset.iter_mut() {
            *o = (raw % 3) as i8 - 1;
            raw /= 3;
        }
        Some(Self { offset })
    }

    /// Dense index in `0..COUNT`.
    pub fn index(self) -> usize {
        let mut raw = 0usize;
        for &o in self.offset.iter().rev() {
            raw = raw * 3 + (o + 1) as usize;
        }
        if raw > Self::CENTER {
            raw - 1
        } else {
            raw
        }
    }

    /// Per-axis offsets.
    pub fn offset(self) -> [i8; D] {
        self.offset
    }

    /// Offset along `axis`.
    pub fn along(self, axis: usize) -> i8 {
        self.offset[axis]
    }

    /// The zone pointing the other way.
    pub fn opposite(self) -> Self {
        let mut offset = self.offset;
        for o in offset.iter_mut() {
            *o = -*o;
        }
        Self { offset }
    }

    /// Every zone, in index order.
    pub fn all() -> impl Iterator<Item = Self> {
        (0..Self::COUNT).filter_map(Self::from_index)
    }
}

impl<const D: usize> fmt::Display for Zone<D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("(")?;
        for (k, o) in self.offset.iter().enumerate() {
            if k > 0 {
                f.write_str(",")?;
            }
            write!(f, "{o:+}")?;
        }
        f.write_str(")")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_per_dimension() {
        assert_eq!(Zone::<1>::COUNT, 2);
        assert_eq!(Zone::<2>::COUNT, 8);
        assert_eq!(Zone::<3>::COUNT, 26);
        assert_eq!(Zone::<3>::all().count(), 26);
    }

    #[test]
    fn center_is_not_a_zone() {
        assert!(Zone::<3>::from_offset([0, 0, 0]).is_none());
        assert!(Zone::<2>::from_offset([2, 0]).is_none());
        assert!(Zone::<3>::all().all(|z| z.offset() != [0, 0, 0]));
    }

    #[test]
    fn index_round_trip() {
        for i in 0..Zone::<3>::COUNT {
            let z = Zone::<3>::from_index(i).unwrap();
            assert_eq!(z.index(), i);
            assert_eq!(Zone::from_offset(z.offset()), Some(z));
        }
    }

    #[test]
    fn one_dimensional_zones() {
        assert_eq!(Zone::<1>::from_index(0).unwrap().offset(), [-1]);
        assert_eq!(Zone::<1>::from_index(1).unwrap().offset(), [1]);
    }

    #[test]
    fn opposite_is_involution() {
        for z in Zone::<2>::all() {
            assert_ne!(z.opposite(), z);
            assert_eq!(z.opposite().opposite(), z);
        }
    }

    #[test]
    fn display_signs() {
        let z = Zone::from_offset([1, 0, -1]).unwrap();
        assert_eq!(z.to_string(), "(+1,+0,-1)");
    }
}
