//! Cartesian rank decomposition and the zone → neighbour table.

use smallvec::SmallVec;

use aurora_core::ConfigError;

use crate::config::{DomainConfig, GridConfig};
use crate::zone::Zone;

/// This rank's place in the decomposition, and who its neighbours are.
///
/// Ranks are numbered with axis 0 varying fastest:
/// `rank = c0 + r0 * (c1 + r1 * c2)`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DomainInfo<const D: usize> {
    rank: usize,
    ranks: [u32; D],
    coord: [u32; D],
    periodic: [bool; D],
    /// Indexed by `Zone::index()`. `None` marks a physical edge.
    neighbors: SmallVec<[Option<usize>; 26]>,
}

impl<const D: usize> DomainInfo<D> {
    /// Place `rank` in the decomposition described by `config`.
    pub fn new(config: &DomainConfig<D>, rank: usize) -> Result<Self, ConfigError> {
        if let Some(axis) = config.ranks.iter().position(|&r| r == 0) {
            return Err(ConfigError::ZeroExtent { axis });
        }
        let size = config.rank_count();
        if rank >= size {
            return Err(ConfigError::RankCountMismatch {
                expected: size,
                actual: rank + 1,
            });
        }
        let coord = coord_of(rank, &config.ranks);
        let neighbors = Zone::<D>::all()
            .map(|z| neighbor_rank(coord, z, &config.ranks, &config.periodic))
            .collect();
        Ok(Self {
            rank,
            ranks: config.ranks,
            coord,
            periodic: config.periodic,
            neighbors,
        })
    }

    /// A single-rank domain.
    pub fn single(periodic: [bool; D]) -> Self {
        let config = DomainConfig {
            ranks: [1; D],
            periodic,
        };
        let coord = [0; D];
        let neighbors = Zone::<D>::all()
            .map(|z| neighbor_rank(coord, z, &config.ranks, &periodic))
            .collect();
        Self {
            rank: 0,
            ranks: config.ranks,
            coord,
            periodic,
            neighbors,
        }
    }

    /// Validate `config` against `grid` and place `rank`.
    pub fn decompose(
        config: &DomainConfig<D>,
        grid: &GridConfig<D>,
        rank: usize,
    ) -> Result<Self, ConfigError> {
        config.validate(grid)?;
        Self::new(config, rank)
    }

    /// This rank.
    pub fn rank(&self) -> usize {
        self.rank
    }

    /// Total ranks in the decomposition.
    pub fn size(&self) -> usize {
        self.ranks.iter().map(|&r| r as usize).product()
    }

    /// Ranks per axis.
    pub fn ranks(&self) -> [u32; D] {
        self.ranks
    }

    /// This rank's coordinate in the rank grid.
    pub fn coord(&self) -> [u32; D] {
        self.coord
    }

    /// Periodicity per axis.
    pub fn periodic(&self) -> [bool; D] {
        self.periodic
    }

    /// Rank owning the domain in direction `zone`, or `None` at a
    /// non-periodic physical edge. May be this rank under periodic wrap.
    pub fn neighbor(&self, zone: Zone<D>) -> Option<usize> {
        self.neighbors.get(zone.index()).copied().flatten()
    }

    /// True if `zone` crosses a non-periodic physical edge.
    pub fn is_physical_edge(&self, zone: Zone<D>) -> bool {
        self.neighbor(zone).is_none()
    }

    /// Rank at `coord`.
    pub fn rank_of(&self, coord: [u32; D]) -> usize {
        rank_of(coord, &self.ranks)
    }
}

fn coord_of<const D: usize>(mut rank: usize, ranks: &[u32; D]) -> [u32; D] {
    let mut coord = [0u32; D];
    for (c, &r) in coord.iter_mut().zip(ranks.iter()) {
        *c = (rank % r as usize) as u32;
        rank /= r as usize;
    }
    coord
}

fn rank_of<const D: usize>(coord: [u32; D], ranks: &[u32; D]) -> usize {
    let mut rank = 0usize;
    for d in (0..D).rev() {
        rank = rank * ranks[d] as usize + coord[d] as usize;
    }
    rank
}

fn neighbor_rank<const D: usize>(
    coord: [u32; D],
    zone: Zone<D>,
    ranks: &[u32; D],
    periodic: &[bool; D],
) -> Option<usize> {
    let mut n = [0u32; D];
    for d in 0..D {
        let r = ranks[d] as i64;
        let c = coord[d] as i64 + zone.along(d) as i64;
        n[d] = if (0..r).contains(&c) {
            c as u32
        } else if periodic[d] {
            c.rem_euclid(r) as u32
        } else {
            return None;
        };
    }
    Some(rank_of(n, ranks))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_periodic_wraps_to_self() {
        let d = DomainInfo::<2>::single([true, true]);
        assert!(Zone::<2>::all().all(|z| d.neighbor(z) == Some(0)));
    }

    #[test]
    fn single_non_periodic_has_no_neighbors() {
        let d = DomainInfo::<2>::single([false, true]);
        let x = Zone::from_offset([1, 0]).unwrap();
        let y = Zone::from_offset([0, 1]).unwrap();
        let xy = Zone::from_offset([1, 1]).unwrap();
        assert!(d.is_physical_edge(x));
        assert_eq!(d.neighbor(y), Some(0));
        assert!(d.is_physical_edge(xy));
    }

    #[test]
    fn two_ranks_along_x() {
        let cfg = DomainConfig {
            ranks: [2, 1, 1],
            periodic: [true; 3],
        };
        let d0 = DomainInfo::new(&cfg, 0).unwrap();
        let d1 = DomainInfo::new(&cfg, 1).unwrap();
        assert_eq!(d1.coord(), [1, 0, 0]);
        let px = Zone::from_offset([1, 0, 0]).unwrap();
        let py = Zone::from_offset([0, 1, 0]).unwrap();
        assert_eq!(d0.neighbor(px), Some(1));
        assert_eq!(d0.neighbor(px.opposite()), Some(1));
        assert_eq!(d0.neighbor(py), Some(0));
        assert_eq!(d1.neighbor(px), Some(0));
    }

    #[test]
    fn rank_numbering_round_trips() {
        let cfg = DomainConfig {
            ranks: [2, 3],
            periodic: [false; 2],
        };
        for r in 0..6 {
            let d = DomainInfo::new(&cfg, r).unwrap();
            assert_eq!(d.rank_of(d.coord()), r);
        }
        assert!(DomainInfo::new(&cfg, 6).is_err());
    }
}
