//! Step engine: the per-rank particle loop.
//!
//! [`Engine`] owns one rank's particles, current mesh, execution policy
//! and migration channel, and advances them one step at a time:
//!
//! ```text
//! push ─► deposit ─► commit ─► [sort ─► host copy ─► migrate ─► device copy]
//!                               └──────── every sort_interval steps ───────┘
//! ```
//!
//! Every rank must call [`step()`](Engine::step) the same number of
//! times; migration is a collective exchange with the neighbours.

use std::fmt;
use std::time::Instant;

use aurora_arena::MemSpace;
use aurora_comm::{Communicator, DomainComm, EdgeHandler, MigrationReport};
use aurora_core::{CapacityError, ConfigError, ParticleId, Scalar, StepId, EMPTY_CELL};
use aurora_deposit::{
    CloudInCell, CurrentMesh, DepositError, DepositSummary, Depositor, Motion, NearestGridPoint,
    PiecewiseCubic, ShapeOrder, TriangularShapedCloud,
};
use aurora_exec::{ExecPolicy, LaunchContext, Policy};
use aurora_particles::{sort_by_cell, Particle, ParticleArray};
use aurora_space::{DomainInfo, Grid};

use crate::config::{EngineConfig, SpeciesTable};
use crate::error::StepError;
use crate::inject::{fill_multiplicity, Multiplicity};
use crate::metrics::StepMetrics;
use crate::push::{FreeStreaming, PushContext, Pusher};

// ── StepOutcome ─────────────────────────────────────────────────────

/// Result of a successful step.
#[derive(Clone, Debug, PartialEq)]
pub struct StepOutcome {
    /// Step just completed.
    pub step: StepId,
    /// Deposition counts.
    pub deposit: DepositSummary,
    /// Migration report, on sort steps.
    pub migration: Option<MigrationReport>,
    /// Timings and particle traffic.
    pub metrics: StepMetrics,
}

// ── Shape dispatch ──────────────────────────────────────────────────

#[derive(Clone, Debug)]
enum AnyDepositor<const D: usize> {
    Ngp(Depositor<NearestGridPoint, D>),
    Cic(Depositor<CloudInCell, D>),
    Tsc(Depositor<TriangularShapedCloud, D>),
    Pcs(Depositor<PiecewiseCubic, D>),
}

impl<const D: usize> AnyDepositor<D> {
    fn new(order: ShapeOrder, grid: &Grid<D>, charges: &[Scalar]) -> Result<Self, ConfigError> {
        Ok(match order {
            ShapeOrder::Ngp => Self::Ngp(Depositor::new(grid, charges)?),
            ShapeOrder::Cic => Self::Cic(Depositor::new(grid, charges)?),
            ShapeOrder::Tsc => Self::Tsc(Depositor::new(grid, charges)?),
            ShapeOrder::Pcs => Self::Pcs(Depositor::new(grid, charges)?),
        })
    }

    fn deposit<P: ExecPolicy>(
        &self,
        policy: &P,
        ptc: &ParticleArray,
        motions: &[Motion],
        mesh: &CurrentMesh<D>,
        rho: bool,
    ) -> Result<DepositSummary, DepositError> {
        match self {
            Self::Ngp(d) => d.deposit(policy, ptc, motions, mesh, rho),
            Self::Cic(d) => d.deposit(policy, ptc, motions, mesh, rho),
            Self::Tsc(d) => d.deposit(policy, ptc, motions, mesh, rho),
            Self::Pcs(d) => d.deposit(policy, ptc, motions, mesh, rho),
        }
    }
}

// ── Engine ──────────────────────────────────────────────────────────

/// One rank's share of a particle simulation.
pub struct Engine<const D: usize, U: Pusher<D> = FreeStreaming> {
    config: EngineConfig<D>,
    grid: Grid<D>,
    policy: Policy,
    particles: ParticleArray,
    motions: Vec<Motion>,
    mesh: CurrentMesh<D>,
    depositor: AnyDepositor<D>,
    comm: DomainComm<D>,
    pusher: U,
    current_step: StepId,
    next_serial: u64,
    last_metrics: StepMetrics,
}

impl<const D: usize> Engine<D> {
    /// Engine with the free-streaming pusher on the rank `comm` belongs to.
    pub fn new(
        config: EngineConfig<D>,
        comm: Box<dyn Communicator>,
    ) -> Result<Self, ConfigError> {
        Self::with_pusher(config, comm, FreeStreaming)
    }
}

impl<const D: usize, U: Pusher<D>> Engine<D, U> {
    /// Engine driving particles with `pusher`.
    ///
    /// Validates the configuration, places this rank in the
    /// decomposition, and allocates the particle array, current mesh,
    /// and migration staging buffers.
    pub fn with_pusher(
        config: EngineConfig<D>,
        comm: Box<dyn Communicator>,
        pusher: U,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let rank = comm.rank();
        let domain = DomainInfo::decompose(&config.domain, &config.grid, rank)?;
        let grid = Grid::decompose(&config.grid, &domain)?;
        let backend = config.resolved_backend();
        let ctx = LaunchContext::new(grid.descriptor(), config.dt);
        let policy = Policy::from_backend(backend, ctx)?;
        let particles = ParticleArray::new(config.capacity, config.mem_type());
        let mesh = CurrentMesh::for_grid(&grid, config.rho_species())?;
        let depositor = AnyDepositor::new(config.shape, &grid, config.species.charges())?;
        let comm = DomainComm::new(domain, comm, config.staging_capacity)?;

        tracing::info!(
            rank,
            backend = %backend,
            shape = %config.shape,
            pusher = pusher.name(),
            dims = ?grid.dims(),
            offset = ?grid.offset(),
            capacity = config.capacity,
            "engine ready"
        );
        Ok(Self {
            config,
            grid,
            policy,
            particles,
            motions: Vec::new(),
            mesh,
            depositor,
            comm,
            pusher,
            current_step: StepId(0),
            next_serial: 0,
            last_metrics: StepMetrics::default(),
        })
    }

    /// Replace the physical-edge policy used during migration.
    pub fn with_edge_handler(mut self, handler: impl EdgeHandler<D> + 'static) -> Self {
        self.comm = self.comm.with_edge_handler(handler);
        self
    }

    // ── Accessors ──────────────────────────────────────────────────

    /// Configuration the engine was built from.
    pub fn config(&self) -> &EngineConfig<D> {
        &self.config
    }

    /// This rank's local grid.
    pub fn grid(&self) -> &Grid<D> {
        &self.grid
    }

    /// This rank's place in the decomposition.
    pub fn domain(&self) -> &DomainInfo<D> {
        self.comm.domain()
    }

    /// This rank.
    pub fn rank(&self) -> usize {
        self.comm.rank()
    }

    /// Species table.
    pub fn species(&self) -> &SpeciesTable {
        &self.config.species
    }

    /// Execution policy.
    pub fn policy(&self) -> &Policy {
        &self.policy
    }

    /// Local particles.
    pub fn particles(&self) -> &ParticleArray {
        &self.particles
    }

    /// Local particles, mutable.
    pub fn particles_mut(&mut self) -> &mut ParticleArray {
        &mut self.particles
    }

    /// Current (and charge density) deposited by the last step. Cleared
    /// at the start of the next.
    pub fn mesh(&self) -> &CurrentMesh<D> {
        &self.mesh
    }

    /// Last completed step.
    pub fn current_step(&self) -> StepId {
        self.current_step
    }

    /// Metrics from the most recent successful step.
    pub fn last_metrics(&self) -> &StepMetrics {
        &self.last_metrics
    }

    // ── Injection ──────────────────────────────────────────────────

    /// Append `records`, giving each a fresh id unique across ranks.
    pub fn inject(&mut self, records: &[Particle]) -> Result<(), CapacityError> {
        let rank = self.rank();
        let first = self.next_serial;
        let tagged: Vec<Particle> = records
            .iter()
            .enumerate()
            .map(|(k, r)| Particle {
                id: ParticleId::compose(rank, first + k as u64).0,
                ..*r
            })
            .collect();
        self.particles.append_records(&tagged)?;
        self.next_serial += records.len() as u64;
        Ok(())
    }

    /// Fill every interior cell with `pairs_per_cell` electron-positron
    /// pairs of `weight` at rest. Returns the number appended.
    pub fn fill_multiplicity(
        &mut self,
        pairs_per_cell: usize,
        weight: Scalar,
    ) -> Result<usize, CapacityError> {
        let fill = Multiplicity {
            pairs_per_cell,
            weight,
            seed: self.config.seed,
            first_serial: self.next_serial,
        };
        let rank = self.rank();
        let added =
            fill_multiplicity(&self.policy, &mut self.particles, &self.grid, rank, &fill)?;
        self.next_serial += fill.total(&self.grid) as u64;
        Ok(added)
    }

    /// Erase particles left in guard cells at physical edges. Returns
    /// the number erased.
    pub fn clear_guard_cells(&mut self) -> usize {
        self.comm.clear_guard_cells(&mut self.particles, &self.grid)
    }

    // ── Stepping ───────────────────────────────────────────────────

    /// Advance every local particle by one timestep.
    ///
    /// Deposits current for the move, commits it, and on sort steps
    /// regroups particles by cell and exchanges skirt particles with
    /// the neighbouring ranks.
    pub fn step(&mut self) -> Result<StepOutcome, StepError> {
        let step_start = Instant::now();
        let step = self.current_step.next();
        let ctx = self.policy.context().at_step(step);
        self.policy.set_context(ctx);
        let space = self.policy.space();
        let n = self.particles.number();

        // 1. Push.
        let push_start = Instant::now();
        self.motions.resize(n, Motion::default());
        {
            let view = self.particles.view(space);
            let push_ctx = PushContext {
                grid: &self.grid,
                species: &self.config.species,
                dt: self.config.dt,
            };
            let pusher = &self.pusher;
            self.policy.parallel_fill(&mut self.motions[..n], |i| {
                if view.cell[i] == EMPTY_CELL {
                    Motion::default()
                } else {
                    pusher.push(&view.get(i), &push_ctx)
                }
            });
        }
        let push_us = push_start.elapsed().as_micros() as u64;

        // 2. Deposit from old and new positions.
        let deposit_start = Instant::now();
        self.mesh.clear();
        let rho = self.config.deposit_rho && step.0 % self.config.rho_interval == 0;
        let deposit = self
            .depositor
            .deposit(&self.policy, &self.particles, &self.motions, &self.mesh, rho)
            .map_err(|e| StepError::at(step, e))?;
        let deposit_us = deposit_start.elapsed().as_micros() as u64;

        // 3. Commit.
        let commit_start = Instant::now();
        let lost = commit(&mut self.particles, space, &self.motions[..n], &self.grid);
        if lost > 0 {
            tracing::warn!(
                rank = self.rank(),
                step = step.0,
                lost,
                "particles left the local grid"
            );
        }
        let commit_us = commit_start.elapsed().as_micros() as u64;

        // 4. Sort and migrate.
        let mut sort_us = 0;
        let mut migrate_us = 0;
        let mut migration = None;
        let mirrored = self.particles.mem_type().is_mirrored();
        if step.0 % self.config.sort_interval == 0 {
            let sort_start = Instant::now();
            let max_cell = self.grid.cell_count() as u32;
            let partition = sort_by_cell(&mut self.particles, &self.policy, max_cell)
                .map_err(|e| StepError::at(step, e))?;
            sort_us = sort_start.elapsed().as_micros() as u64;

            let migrate_start = Instant::now();
            if mirrored {
                self.particles.copy_to_host();
            }
            let report = self
                .comm
                .migrate(&mut self.particles, &self.grid, &partition)
                .map_err(|e| StepError::at(step, e))?;
            if mirrored {
                self.particles.copy_to_device();
            }
            migrate_us = migrate_start.elapsed().as_micros() as u64;
            migration = Some(report);
        } else if mirrored {
            self.particles.copy_to_host();
        }

        self.current_step = step;
        let report = migration.unwrap_or_default();
        let metrics = StepMetrics {
            total_us: step_start.elapsed().as_micros() as u64,
            push_us,
            deposit_us,
            commit_us,
            sort_us,
            migrate_us,
            sent: report.sent,
            received: report.received,
            edge_removed: report.edge_removed,
            lost,
            ignored: deposit.ignored,
            number: self.particles.number(),
        };
        tracing::debug!(
            rank = self.rank(),
            step = step.0,
            number = metrics.number,
            deposited = deposit.deposited,
            total_us = metrics.total_us,
            "step complete"
        );
        self.last_metrics = metrics.clone();
        Ok(StepOutcome {
            step,
            deposit,
            migration,
            metrics,
        })
    }

    /// Run `steps` steps, stopping at the first failure.
    pub fn run(&mut self, steps: u64) -> Result<StepMetrics, StepError> {
        for _ in 0..steps {
            self.step()?;
        }
        tracing::info!(
            rank = self.rank(),
            step = self.current_step.0,
            number = self.particles.number(),
            "run complete"
        );
        Ok(self.last_metrics.clone())
    }
}

/// Write each motion back to its particle. Returns the number of
/// particles whose new cell lies outside the local grid; those slots
/// are marked dead.
fn commit<const D: usize>(
    ptc: &mut ParticleArray,
    space: MemSpace,
    motions: &[Motion],
    grid: &Grid<D>,
) -> usize {
    let dims = grid.dims();
    let view = ptc.view_mut(space);
    let mut lost = 0;
    for (i, m) in motions.iter().enumerate() {
        let cell = view.cell[i];
        if cell == EMPTY_CELL {
            continue;
        }
        let pos = grid.cell_pos(cell);
        let mut next = [0u32; D];
        let mut inside = true;
        for d in 0..D {
            let c = pos[d] as i64 + m.dc[d] as i64;
            if c < 0 || c >= dims[d] as i64 {
                inside = false;
                break;
            }
            next[d] = c as u32;
        }
        for d in 0..3 {
            view.x[d][i] = m.new_x[d];
            view.p[d][i] = m.new_p[d];
        }
        view.energy[i] = m.energy;
        view.cell[i] = if inside {
            grid.cell_index(next)
        } else {
            lost += 1;
            EMPTY_CELL
        };
    }
    lost
}

impl<const D: usize, U: Pusher<D>> fmt::Debug for Engine<D, U> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Engine")
            .field("rank", &self.rank())
            .field("step", &self.current_step)
            .field("backend", &self.policy.name())
            .field("pusher", &self.pusher)
            .field("number", &self.particles.number())
            .finish_non_exhaustive()
    }
}
