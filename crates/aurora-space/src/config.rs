//! Mesh and decomposition configuration.

use aurora_core::{ConfigError, Scalar};

// ── GridConfig ─────────────────────────────────────────────────────

/// Global mesh description, before decomposition.
#[derive(Clone, Debug, PartialEq)]
pub struct GridConfig<const D: usize> {
    /// Global interior cells per axis. Default: 16.
    pub n: [u32; D],
    /// Guard (skirt) cells on each side of every axis. Default: 2.
    pub guard: [u32; D],
    /// Physical length of the global domain per axis. Default: 1.0.
    pub size: [Scalar; D],
    /// Physical lower corner of the global domain. Default: 0.0.
    pub lower: [Scalar; D],
}

impl<const D: usize> Default for GridConfig<D> {
    fn default() -> Self {
        Self {
            n: [16; D],
            guard: [2; D],
            size: [1.0; D],
            lower: [0.0; D],
        }
    }
}

impl<const D: usize> GridConfig<D> {
    /// Cubic mesh of `n` cells per axis with cell size 1.
    pub fn uniform(n: u32, guard: u32) -> Self {
        Self {
            n: [n; D],
            guard: [guard; D],
            size: [n as Scalar; D],
            lower: [0.0; D],
        }
    }

    /// Check structural invariants.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for axis in 0..D {
            if self.n[axis] == 0 {
                return Err(ConfigError::ZeroExtent { axis });
            }
            if self.guard[axis] == 0 {
                return Err(ConfigError::GuardTooSmall {
                    axis,
                    guard: 0,
                    required: 1,
                });
            }
            let s = self.size[axis];
            if !s.is_finite() || s <= 0.0 {
                return Err(ConfigError::InvalidParameter {
                    reason: format!("domain size on axis {axis} must be positive, got {s}"),
                });
            }
            if !self.lower[axis].is_finite() {
                return Err(ConfigError::InvalidParameter {
                    reason: format!("domain lower bound on axis {axis} is not finite"),
                });
            }
        }
        Ok(())
    }
}

// ── DomainConfig ───────────────────────────────────────────────────

/// Rank grid and boundary periodicity.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DomainConfig<const D: usize> {
    /// Ranks per axis. Default: 1.
    pub ranks: [u32; D],
    /// Periodic boundary per axis. Default: true.
    pub periodic: [bool; D],
}

impl<const D: usize> Default for DomainConfig<D> {
    fn default() -> Self {
        Self {
            ranks: [1; D],
            periodic: [true; D],
        }
    }
}

impl<const D: usize> DomainConfig<D> {
    /// Total number of ranks in the decomposition.
    pub fn rank_count(&self) -> usize {
        self.ranks.iter().map(|&r| r as usize).product()
    }

    /// Check structural invariants, including divisibility of `grid`.
    pub fn validate(&self, grid: &GridConfig<D>) -> Result<(), ConfigError> {
        for axis in 0..D {
            let ranks = self.ranks[axis];
            if ranks == 0 {
                return Err(ConfigError::ZeroExtent { axis });
            }
            if grid.n[axis] % ranks != 0 {
                return Err(ConfigError::IndivisibleDecomposition {
                    axis,
                    cells: grid.n[axis],
                    ranks,
                });
            }
        }
        Ok(())
    }
}
