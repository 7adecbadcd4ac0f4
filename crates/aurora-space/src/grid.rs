//! Local grid descriptor for one rank.

use aurora_arena::{Extent, Indexing, RowMajor};
use aurora_core::{ConfigError, Scalar, EMPTY_CELL, MAX_DIM};

use crate::config::GridConfig;
use crate::domain::DomainInfo;
use crate::zone::Zone;

/// One rank's view of the mesh: its interior cells plus the guard shell.
///
/// Cell ids are row-major linear indices over [`dims`](Grid::dims),
/// guard cells included. The guard shell is also the migration skirt.
#[derive(Clone, Debug, PartialEq)]
pub struct Grid<const D: usize> {
    dims: [u32; D],
    reduced: [u32; D],
    guard: [u32; D],
    skirt: [u32; D],
    offset: [u32; D],
    global: [u32; D],
    delta: [Scalar; D],
    inv_delta: [Scalar; D],
    lower: [Scalar; D],
    global_lower: [Scalar; D],
    global_size: [Scalar; D],
}

impl<const D: usize> Grid<D> {
    /// Grid for a single-rank run.
    pub fn new(config: &GridConfig<D>) -> Result<Self, ConfigError> {
        Self::decompose(config, &DomainInfo::single([true; D]))
    }

    /// The slab of `config` owned by `domain`'s rank.
    pub fn decompose(config: &GridConfig<D>, domain: &DomainInfo<D>) -> Result<Self, ConfigError> {
        config.validate()?;
        let ranks = domain.ranks();
        let coord = domain.coord();
        let mut grid = Self {
            dims: [0; D],
            reduced: [0; D],
            guard: config.guard,
            skirt: config.guard,
            offset: [0; D],
            global: config.n,
            delta: [0.0; D],
            inv_delta: [0.0; D],
            lower: [0.0; D],
            global_lower: config.lower,
            global_size: config.size,
        };
        for d in 0..D {
            if config.n[d] % ranks[d] != 0 {
                return Err(ConfigError::IndivisibleDecomposition {
                    axis: d,
                    cells: config.n[d],
                    ranks: ranks[d],
                });
            }
            let reduced = config.n[d] / ranks[d];
            if config.guard[d] > reduced {
                return Err(ConfigError::InvalidParameter {
                    reason: format!(
                        "guard {} on axis {d} exceeds the {reduced} local interior cells",
                        config.guard[d]
                    ),
                });
            }
            grid.reduced[d] = reduced;
            grid.dims[d] = reduced + 2 * config.guard[d];
            grid.offset[d] = coord[d] * reduced;
            grid.delta[d] = config.size[d] / config.n[d] as Scalar;
            grid.inv_delta[d] = 1.0 / grid.delta[d];
            grid.lower[d] = config.lower[d] + grid.offset[d] as Scalar * grid.delta[d];
        }
        let cells = grid
            .dims
            .iter()
            .try_fold(1usize, |acc, &n| acc.checked_mul(n as usize));
        match cells {
            Some(n) if n < EMPTY_CELL as usize => Ok(grid),
            _ => Err(ConfigError::InvalidParameter {
                reason: format!(
                    "local grid {:?} has more cells than a u32 cell id can address",
                    grid.dims
                ),
            }),
        }
    }

    /// Local cells per axis, guards included.
    pub fn dims(&self) -> [u32; D] {
        self.dims
    }

    /// Local interior cells per axis.
    pub fn reduced_dims(&self) -> [u32; D] {
        self.reduced
    }

    /// Guard width per axis.
    pub fn guard(&self) -> [u32; D] {
        self.guard
    }

    /// Skirt width per axis.
    pub fn skirt(&self) -> [u32; D] {
        self.skirt
    }

    /// Global index of this rank's first interior cell per axis.
    pub fn offset(&self) -> [u32; D] {
        self.offset
    }

    /// Global interior cells per axis.
    pub fn global_dims(&self) -> [u32; D] {
        self.global
    }

    /// Cell size per axis.
    pub fn delta(&self) -> [Scalar; D] {
        self.delta
    }

    /// Inverse cell size per axis.
    pub fn inv_delta(&self) -> [Scalar; D] {
        self.inv_delta
    }

    /// Physical lower corner of the local interior.
    pub fn lower(&self) -> [Scalar; D] {
        self.lower
    }

    /// Physical length of the global domain per axis.
    pub fn global_size(&self) -> [Scalar; D] {
        self.global_size
    }

    /// Local extent, guards included.
    pub fn extent(&self) -> Extent<D> {
        Extent::new(self.dims)
    }

    /// Number of local cells, guards included.
    pub fn cell_count(&self) -> usize {
        self.extent().size()
    }

    /// Linear cell id of `pos`.
    #[inline]
    pub fn cell_index(&self, pos: [u32; D]) -> u32 {
        RowMajor::linear(pos, &self.extent()) as u32
    }

    /// Position of cell id `cell`.
    #[inline]
    pub fn cell_pos(&self, cell: u32) -> [u32; D] {
        RowMajor::position(cell as usize, &self.extent())
    }

    /// True if `pos` is an interior cell.
    pub fn is_in_bound(&self, pos: [u32; D]) -> bool {
        (0..D).all(|d| pos[d] >= self.guard[d] && pos[d] < self.dims[d] - self.guard[d])
    }

    /// Skirt zone containing `pos`, or `None` for an interior cell.
    pub fn skirt_zone(&self, pos: [u32; D]) -> Option<Zone<D>> {
        let mut offset = [0i8; D];
        for d in 0..D {
            offset[d] = if pos[d] < self.skirt[d] {
                -1
            } else if pos[d] >= self.dims[d] - self.skirt[d] {
                1
            } else {
                0
            };
        }
        Zone::from_offset(offset)
    }

    /// Box of cells forming the skirt of `zone`, as `(start, size)`.
    pub fn zone_region(&self, zone: Zone<D>) -> ([u32; D], Extent<D>) {
        let mut start = [0u32; D];
        let mut size = [0u32; D];
        for d in 0..D {
            let (s, n) = match zone.along(d) {
                -1 => (0, self.skirt[d]),
                0 => (self.skirt[d], self.dims[d] - 2 * self.skirt[d]),
                _ => (self.dims[d] - self.skirt[d], self.skirt[d]),
            };
            start[d] = s;
            size[d] = n;
        }
        (start, Extent::new(size))
    }

    /// Cell ids in the skirt of `zone`, in row-major order.
    pub fn skirt_cells(&self, zone: Zone<D>) -> impl Iterator<Item = u32> + '_ {
        let (start, size) = self.zone_region(zone);
        size.positions().map(move |rel| {
            let mut pos = [0u32; D];
            for d in 0..D {
                pos[d] = start[d] + rel[d];
            }
            self.cell_index(pos)
        })
    }

    /// Physical coordinate of sub-cell position `frac` in cell `pos`.
    pub fn local_to_global(&self, pos: [u32; D], frac: [Scalar; D]) -> [Scalar; D] {
        let mut x = [0.0; D];
        for d in 0..D {
            x[d] = self.lower[d]
                + (pos[d] as Scalar - self.guard[d] as Scalar + frac[d]) * self.delta[d];
        }
        x
    }

    /// Cell and sub-cell position of physical coordinate `x`, or `None`
    /// if it lies outside the local grid (guards included).
    pub fn global_to_local(&self, x: [Scalar; D]) -> Option<([u32; D], [Scalar; D])> {
        let mut pos = [0u32; D];
        let mut frac = [0.0; D];
        for d in 0..D {
            let rel = (x[d] - self.lower[d]) * self.inv_delta[d] + self.guard[d] as Scalar;
            let n = rel.floor();
            if n < 0.0 || n >= self.dims[d] as Scalar {
                return None;
            }
            pos[d] = n as u32;
            frac[d] = rel - n;
        }
        Some((pos, frac))
    }

    /// Global cell index of local cell `pos`. Negative or past-the-end
    /// values denote guard cells beyond the global domain.
    pub fn global_cell(&self, pos: [u32; D]) -> [i64; D] {
        let mut g = [0i64; D];
        for d in 0..D {
            g[d] = self.offset[d] as i64 + pos[d] as i64 - self.guard[d] as i64;
        }
        g
    }

    /// Flattened, copyable view for kernel launches.
    pub fn descriptor(&self) -> GridDescriptor {
        let mut desc = GridDescriptor {
            dim: D,
            dims: [1; MAX_DIM],
            guard: [0; MAX_DIM],
            delta: [1.0; MAX_DIM],
            inv_delta: [1.0; MAX_DIM],
            lower: [0.0; MAX_DIM],
        };
        for d in 0..D.min(MAX_DIM) {
            desc.dims[d] = self.dims[d];
            desc.guard[d] = self.guard[d];
            desc.delta[d] = self.delta[d];
            desc.inv_delta[d] = self.inv_delta[d];
            desc.lower[d] = self.lower[d];
        }
        desc
    }
}

/// Grid parameters flattened to three axes, passed to every kernel
/// launch by value.
///
/// Axes at or beyond `dim` have one cell, no guard, and unit spacing.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GridDescriptor {
    /// Number of meaningful axes.
    pub dim: usize,
    /// Cells per axis, guards included.
    pub dims: [u32; MAX_DIM],
    /// Guard width per axis.
    pub guard: [u32; MAX_DIM],
    /// Cell size per axis.
    pub delta: [Scalar; MAX_DIM],
    /// Inverse cell size per axis.
    pub inv_delta: [Scalar; MAX_DIM],
    /// Physical lower corner of the local interior.
    pub lower: [Scalar; MAX_DIM],
}

impl Default for GridDescriptor {
    fn default() -> Self {
        Self {
            dim: 0,
            dims: [1; MAX_DIM],
            guard: [0; MAX_DIM],
            delta: [1.0; MAX_DIM],
            inv_delta: [1.0; MAX_DIM],
            lower: [0.0; MAX_DIM],
        }
    }
}

impl GridDescriptor {
    /// Total cells, guards included.
    pub fn cell_count(&self) -> usize {
        self.dims.iter().map(|&n| n as usize).product()
    }

    /// Row-major position of `cell` over all three axes.
    #[inline]
    pub fn cell_pos(&self, cell: u32) -> [u32; MAX_DIM] {
        RowMajor::position(cell as usize, &Extent::new(self.dims))
    }

    /// Row-major cell id of `pos`.
    #[inline]
    pub fn cell_index(&self, pos: [u32; MAX_DIM]) -> u32 {
        RowMajor::linear(pos, &Extent::new(self.dims)) as u32
    }
}
