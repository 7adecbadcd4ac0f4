//! Engine configuration, species tables, and validation.

use aurora_arena::MemType;
use aurora_core::{ConfigError, PtcType, Scalar, MAX_SPECIES};
use aurora_deposit::ShapeOrder;
use aurora_exec::Backend;
use aurora_space::{DomainConfig, GridConfig};

// ── SpeciesTable ───────────────────────────────────────────────────

/// Charge and mass per species, indexed by [`PtcType::index`].
#[derive(Clone, Debug, PartialEq)]
pub struct SpeciesTable {
    charges: Vec<Scalar>,
    masses: Vec<Scalar>,
}

impl Default for SpeciesTable {
    /// Electrons, positrons, and protons in normalized units.
    fn default() -> Self {
        let mut charges = vec![0.0; 3];
        let mut masses = vec![1.0; 3];
        charges[PtcType::Electron.index()] = -1.0;
        charges[PtcType::Positron.index()] = 1.0;
        charges[PtcType::Ion.index()] = 1.0;
        masses[PtcType::Ion.index()] = 1836.0;
        Self { charges, masses }
    }
}

impl SpeciesTable {
    /// Build a table from parallel charge and mass lists.
    pub fn new(charges: Vec<Scalar>, masses: Vec<Scalar>) -> Result<Self, ConfigError> {
        let table = Self { charges, masses };
        table.validate()?;
        Ok(table)
    }

    /// Number of species.
    pub fn len(&self) -> usize {
        self.charges.len()
    }

    /// True if no species is defined.
    pub fn is_empty(&self) -> bool {
        self.charges.is_empty()
    }

    /// Charges in species order.
    pub fn charges(&self) -> &[Scalar] {
        &self.charges
    }

    /// Masses in species order.
    pub fn masses(&self) -> &[Scalar] {
        &self.masses
    }

    /// Charge of `species`; zero for unknown species.
    pub fn charge(&self, species: usize) -> Scalar {
        self.charges.get(species).copied().unwrap_or(0.0)
    }

    /// Mass of `species`; one for unknown species.
    pub fn mass(&self, species: usize) -> Scalar {
        self.masses.get(species).copied().unwrap_or(1.0)
    }

    /// Charge-to-mass ratio of `species`.
    pub fn q_over_m(&self, species: usize) -> Scalar {
        self.charge(species) / self.mass(species)
    }

    /// Check that the lists agree, fit the flag encoding, and have
    /// positive finite masses.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.charges.len() != self.masses.len() {
            return Err(ConfigError::InvalidParameter {
                reason: format!(
                    "{} charges but {} masses",
                    self.charges.len(),
                    self.masses.len()
                ),
            });
        }
        if self.charges.is_empty() || self.charges.len() > MAX_SPECIES {
            return Err(ConfigError::InvalidParameter {
                reason: format!(
                    "species count {} outside 1..={MAX_SPECIES}",
                    self.charges.len()
                ),
            });
        }
        if let Some(sp) = self.charges.iter().position(|q| !q.is_finite()) {
            return Err(ConfigError::InvalidParameter {
                reason: format!("charge of species {sp} is not finite"),
            });
        }
        if let Some(sp) = self.masses.iter().position(|m| !m.is_finite() || *m <= 0.0) {
            return Err(ConfigError::InvalidParameter {
                reason: format!("mass of species {sp} must be positive"),
            });
        }
        Ok(())
    }
}

// ── EngineConfig ───────────────────────────────────────────────────

/// Everything needed to build an [`Engine`](crate::Engine) on one rank.
///
/// Construct with [`Default`] and override fields; the engine calls
/// [`validate`](Self::validate) before allocating anything.
#[derive(Clone, Debug, PartialEq)]
pub struct EngineConfig<const D: usize> {
    /// Global mesh.
    pub grid: GridConfig<D>,
    /// Rank grid and periodicity.
    pub domain: DomainConfig<D>,
    /// Particle slots per rank. Default: 2^20.
    pub capacity: usize,
    /// Migration staging slots per zone and direction. Default: 2^14.
    pub staging_capacity: usize,
    /// Charge and mass per species.
    pub species: SpeciesTable,
    /// Timestep. Default: 0.5.
    pub dt: Scalar,
    /// Sort (and migrate) every this many steps. Default: 1.
    pub sort_interval: u64,
    /// Deposit charge density every this many steps when
    /// [`deposit_rho`](Self::deposit_rho) is set. Default: 1.
    pub rho_interval: u64,
    /// Accumulate per-species charge density. Default: false.
    pub deposit_rho: bool,
    /// Execution backend. Default: [`Backend::Serial`].
    pub backend: Backend,
    /// Deposition shape function. Default: cloud-in-cell.
    pub shape: ShapeOrder,
    /// Seed for particle injection. Default: 0.
    pub seed: u64,
}

impl<const D: usize> Default for EngineConfig<D> {
    fn default() -> Self {
        Self {
            grid: GridConfig::default(),
            domain: DomainConfig::default(),
            capacity: 1 << 20,
            staging_capacity: 1 << 14,
            species: SpeciesTable::default(),
            dt: 0.5,
            sort_interval: 1,
            rho_interval: 1,
            deposit_rho: false,
            backend: Backend::Serial,
            shape: ShapeOrder::default(),
            seed: 0,
        }
    }
}

impl<const D: usize> EngineConfig<D> {
    /// Check every structural invariant.
    ///
    /// Particles leave the guard shell only on sort steps, so between
    /// two sorts they may drift `sort_interval - 1` cells into it; the
    /// guard must hold that drift plus the shape stencil.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if D == 0 || D > 3 {
            return Err(ConfigError::InvalidParameter {
                reason: format!("mesh dimension {D} outside 1..=3"),
            });
        }
        self.grid.validate()?;
        self.domain.validate(&self.grid)?;
        if self.capacity == 0 || self.staging_capacity == 0 {
            return Err(ConfigError::ZeroCapacity);
        }
        self.species.validate()?;
        if !self.dt.is_finite() || self.dt <= 0.0 {
            return Err(ConfigError::InvalidTimestep {
                value: self.dt as f64,
            });
        }
        if self.sort_interval == 0 {
            return Err(ConfigError::InvalidParameter {
                reason: "sort_interval must be at least 1".into(),
            });
        }
        if self.rho_interval == 0 {
            return Err(ConfigError::InvalidParameter {
                reason: "rho_interval must be at least 1".into(),
            });
        }
        let drift = u32::try_from(self.sort_interval).unwrap_or(u32::MAX);
        let required = (self.shape.radius() as u32).saturating_add(drift);
        for axis in 0..D {
            if self.grid.guard[axis] < required {
                return Err(ConfigError::GuardTooSmall {
                    axis,
                    guard: self.grid.guard[axis],
                    required,
                });
            }
        }
        Ok(())
    }

    /// Backend with the worker count resolved.
    ///
    /// Explicit thread counts are clamped to `[1, 64]`; `None` uses the
    /// available parallelism.
    pub fn resolved_backend(&self) -> Backend {
        match self.backend {
            Backend::Threaded { threads } => {
                let n = match threads {
                    Some(n) => n.clamp(1, 64),
                    None => std::thread::available_parallelism()
                        .map(|n| n.get())
                        .unwrap_or(4)
                        .clamp(1, 64),
                };
                Backend::Threaded { threads: Some(n) }
            }
            other => other,
        }
    }

    /// Residency the particle array needs under the configured backend.
    pub fn mem_type(&self) -> MemType {
        match self.backend {
            Backend::Device { .. } => MemType::HostDevice,
            Backend::Serial | Backend::Threaded { .. } => MemType::HostOnly,
        }
    }

    /// Species with a charge-density mesh, zero unless
    /// [`deposit_rho`](Self::deposit_rho) is set.
    pub fn rho_species(&self) -> usize {
        if self.deposit_rho {
            self.species.len()
        } else {
            0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_valid() {
        assert!(EngineConfig::<1>::default().validate().is_ok());
        assert!(EngineConfig::<2>::default().validate().is_ok());
        assert!(EngineConfig::<3>::default().validate().is_ok());
    }

    #[test]
    fn zero_sort_interval_rejected() {
        let cfg = EngineConfig::<2> {
            sort_interval: 0,
            ..Default::default()
        };
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::InvalidParameter { .. })
        ));
    }

    #[test]
    fn guard_must_hold_drift_and_stencil() {
        let mut cfg = EngineConfig::<2> {
            shape: ShapeOrder::Tsc,
            ..Default::default()
        };
        assert_eq!(
            cfg.validate(),
            Err(ConfigError::GuardTooSmall {
                axis: 0,
                guard: 2,
                required: 3
            })
        );
        cfg.grid.guard = [3, 3];
        assert!(cfg.validate().is_ok());
        cfg.sort_interval = 2;
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::GuardTooSmall { required: 4, .. })
        ));
    }

    #[test]
    fn bad_timestep_rejected() {
        for dt in [0.0, -1.0, Scalar::NAN, Scalar::INFINITY] {
            let cfg = EngineConfig::<1> {
                dt,
                ..Default::default()
            };
            assert!(matches!(
                cfg.validate(),
                Err(ConfigError::InvalidTimestep { .. })
            ));
        }
    }

    #[test]
    fn indivisible_domain_rejected() {
        let mut cfg = EngineConfig::<1>::default();
        cfg.domain.ranks = [3];
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::IndivisibleDecomposition { .. })
        ));
    }

    #[test]
    fn species_table_checks_lengths_and_masses() {
        assert!(SpeciesTable::new(vec![1.0], vec![1.0, 2.0]).is_err());
        assert!(SpeciesTable::new(vec![1.0], vec![0.0]).is_err());
        assert!(SpeciesTable::new(vec![], vec![]).is_err());
        assert!(SpeciesTable::new(vec![1.0; 9], vec![1.0; 9]).is_err());
        let t = SpeciesTable::new(vec![-1.0, 2.0], vec![1.0, 4.0]).unwrap();
        assert_eq!(t.q_over_m(0), -1.0);
        assert_eq!(t.q_over_m(1), 0.5);
        assert_eq!(t.charge(7), 0.0);
    }

    #[test]
    fn default_species_follow_flag_encoding() {
        let t = SpeciesTable::default();
        assert_eq!(t.charge(PtcType::Electron.index()), -1.0);
        assert_eq!(t.charge(PtcType::Positron.index()), 1.0);
        assert!(t.mass(PtcType::Ion.index()) > 1000.0);
    }

    #[test]
    fn threaded_workers_resolved() {
        let cfg = EngineConfig::<1> {
            backend: Backend::Threaded { threads: Some(0) },
            ..Default::default()
        };
        assert_eq!(
            cfg.resolved_backend(),
            Backend::Threaded { threads: Some(1) }
        );
        let cfg = EngineConfig::<1> {
            backend: Backend::Threaded { threads: None },
            ..Default::default()
        };
        assert!(matches!(
            cfg.resolved_backend(),
            Backend::Threaded { threads: Some(n) } if (1..=64).contains(&n)
        ));
        assert_eq!(EngineConfig::<1>::default().mem_type(), MemType::HostOnly);
    }
}
