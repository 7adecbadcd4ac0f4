//! Current mesh and the deposition pass over a particle array.

use std::marker::PhantomData;
use std::sync::atomic::{AtomicUsize, Ordering};

use aurora_arena::{AtomicArray, Extent, MultiArray};
use aurora_core::{check_flag, ptc_type, ConfigError, PtcFlag, Scalar, EMPTY_CELL, MAX_SPECIES};
use aurora_exec::ExecPolicy;
use aurora_particles::ParticleArray;
use aurora_space::Grid;

use crate::error::DepositError;
use crate::kernel::{deposit_1d, deposit_2d, deposit_3d, MeshTarget, Motion, Trajectory};
use crate::shape::{Shape, MAX_RADIUS};

/// Accumulation targets for one step: three current components and an
/// optional charge density per species.
///
/// `J[d]` at index `i` sits half a cell above node `i` along axis `d`;
/// charge density sits on the nodes.
#[derive(Debug)]
pub struct CurrentMesh<const D: usize> {
    j: [AtomicArray<D>; 3],
    rho: Vec<AtomicArray<D>>,
}

impl<const D: usize> CurrentMesh<D> {
    /// Zeroed mesh over `extent`, with charge density for the first
    /// `rho_species` species (zero disables it).
    pub fn new(extent: Extent<D>, rho_species: usize) -> Result<Self, ConfigError> {
        if rho_species > MAX_SPECIES {
            return Err(ConfigError::InvalidParameter {
                reason: format!("{rho_species} species exceeds the limit of {MAX_SPECIES}"),
            });
        }
        Ok(Self {
            j: [
                AtomicArray::new(extent)?,
                AtomicArray::new(extent)?,
                AtomicArray::new(extent)?,
            ],
            rho: (0..rho_species)
                .map(|_| AtomicArray::new(extent))
                .collect::<Result<_, _>>()?,
        })
    }

    /// Mesh covering every local cell of `grid`, guards included.
    pub fn for_grid(grid: &Grid<D>, rho_species: usize) -> Result<Self, ConfigError> {
        Self::new(grid.extent(), rho_species)
    }

    /// Per-axis lengths.
    pub fn extent(&self) -> Extent<D> {
        self.j[0].extent()
    }

    /// Current component `comp` (0, 1 or 2).
    #[track_caller]
    pub fn j(&self, comp: usize) -> &AtomicArray<D> {
        &self.j[comp]
    }

    /// Charge density of `species`, if tracked.
    pub fn rho(&self, species: usize) -> Option<&AtomicArray<D>> {
        self.rho.get(species)
    }

    /// Number of species with a charge density.
    pub fn rho_species(&self) -> usize {
        self.rho.len()
    }

    /// Total charge density over all tracked species at `pos`.
    pub fn total_rho(&self, pos: [u32; D]) -> Scalar {
        self.rho.iter().map(|r| r.load(pos)).sum()
    }

    /// Zero every accumulator.
    pub fn clear(&mut self) {
        for a in self.j.iter_mut().chain(self.rho.iter_mut()) {
            a.clear();
        }
    }

    /// Add the current into the field solver's arrays.
    pub fn accumulate_j_into(
        &self,
        targets: &mut [MultiArray<Scalar, D>; 3],
    ) -> Result<(), ConfigError> {
        for (src, dst) in self.j.iter().zip(targets.iter_mut()) {
            src.accumulate_into(dst)?;
        }
        Ok(())
    }
}

/// Outcome of a successful deposition pass.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct DepositSummary {
    /// Particles whose current was deposited.
    pub deposited: usize,
    /// Live particles skipped because they ignore current or carry an
    /// unknown species.
    pub ignored: usize,
}

/// Charge-conserving deposition with shape `S` on a `D`-dimensional mesh.
#[derive(Clone, Debug)]
pub struct Depositor<S: Shape, const D: usize> {
    charges: [Scalar; MAX_SPECIES],
    _shape: PhantomData<S>,
}

impl<S: Shape, const D: usize> Depositor<S, D> {
    /// Depositor for `grid` with per-species `charges`.
    ///
    /// Every guard must be at least `S::RADIUS + 1` wide so that the
    /// stencil of any interior particle stays on the local mesh.
    pub fn new(grid: &Grid<D>, charges: &[Scalar]) -> Result<Self, ConfigError> {
        if !(1..=3).contains(&D) {
            return Err(ConfigError::InvalidParameter {
                reason: format!("deposition supports 1 to 3 dimensions, not {D}"),
            });
        }
        if S::RADIUS > MAX_RADIUS {
            return Err(ConfigError::InvalidParameter {
                reason: format!(
                    "shape radius {} exceeds the supported {MAX_RADIUS}",
                    S::RADIUS
                ),
            });
        }
        if charges.len() > MAX_SPECIES {
            return Err(ConfigError::InvalidParameter {
                reason: format!("{} species exceeds the limit of {MAX_SPECIES}", charges.len()),
            });
        }
        let required = S::RADIUS as u32 + 1;
        for (axis, &guard) in grid.guard().iter().enumerate() {
            if guard < required {
                return Err(ConfigError::GuardTooSmall {
                    axis,
                    guard,
                    required,
                });
            }
        }
        let mut table = [0.0; MAX_SPECIES];
        table[..charges.len()].copy_from_slice(charges);
        Ok(Self {
            charges: table,
            _shape: PhantomData,
        })
    }

    /// Charge of `species`.
    pub fn charge(&self, species: usize) -> Scalar {
        self.charges.get(species).copied().unwrap_or(0.0)
    }

    /// Deposit the current of every live particle in `ptc` moving by
    /// `motions[i]`, reading particle data in `policy.space()`.
    ///
    /// The grid and timestep come from `policy.context()`. Charge
    /// density is deposited at the new positions when `rho` is set.
    /// Particles with a cell jump larger than one are skipped and
    /// reported as [`DepositError::CflViolation`] once the pass is done.
    pub fn deposit<P: ExecPolicy>(
        &self,
        policy: &P,
        ptc: &ParticleArray,
        motions: &[Motion],
        mesh: &CurrentMesh<D>,
        rho: bool,
    ) -> Result<DepositSummary, DepositError> {
        let ctx = *policy.context();
        let n = ptc.number();
        if motions.len() < n {
            return Err(DepositError::MotionCountMismatch {
                motions: motions.len(),
                particles: n,
            });
        }
        if ctx.dt.is_nan() || ctx.dt <= 0.0 {
            return Err(ConfigError::InvalidTimestep {
                value: ctx.dt as f64,
            }
            .into());
        }
        let dims = mesh.extent().dims();
        if ctx.grid.dim != D || ctx.grid.dims[..D] != dims[..] {
            return Err(ConfigError::ExtentMismatch {
                expected: mesh.extent().size(),
                actual: ctx.grid.cell_count(),
            }
            .into());
        }

        let view = ptc.view(policy.space());
        let deposited = AtomicUsize::new(0);
        let ignored = AtomicUsize::new(0);
        let violations = AtomicUsize::new(0);
        let first_violation = AtomicUsize::new(usize::MAX);
        policy.parallel_for(0..n, |i| {
            let cell = view.cell[i];
            if cell == EMPTY_CELL {
                return;
            }
            let flag = view.flag[i];
            let species = ptc_type(flag) as usize;
            if check_flag(flag, PtcFlag::IgnoreCurrent) || species >= MAX_SPECIES {
                ignored.fetch_add(1, Ordering::Relaxed);
                return;
            }
            let m = &motions[i];
            if m.violates_cfl() {
                violations.fetch_add(1, Ordering::Relaxed);
                first_violation.fetch_min(i, Ordering::Relaxed);
                return;
            }
            let t = Trajectory {
                x: [view.x[0][i], view.x[1][i], view.x[2][i]],
                new_x: m.new_x,
                dc: m.dc,
                weight: view.weight[i] * self.charges[species],
                species,
            };
            let target = MeshTarget::new(policy, mesh, ctx.grid.cell_pos(cell), rho);
            match D {
                1 => deposit_1d::<S, P, D>(&t, &target, ctx.dt),
                2 => deposit_2d::<S, P, D>(&t, &target, ctx.dt),
                _ => deposit_3d::<S, P, D>(&t, &target, ctx.dt),
            }
            deposited.fetch_add(1, Ordering::Relaxed);
        });

        let summary = DepositSummary {
            deposited: deposited.into_inner(),
            ignored: ignored.into_inner(),
        };
        let count = violations.into_inner();
        if count > 0 {
            let index = first_violation.into_inner();
            tracing::warn!(backend = policy.name(), count, index, "CFL violation in deposit");
            return Err(DepositError::CflViolation { count, index });
        }
        tracing::debug!(
            backend = policy.name(),
            deposited = summary.deposited,
            ignored = summary.ignored,
            rho,
            "current deposited"
        );
        Ok(summary)
    }
}
