//! Aurora: the particle-mesh substrate of a particle-in-cell plasma code.
//!
//! This is the top-level facade crate that re-exports the public API from
//! all Aurora sub-crates. For most users, adding `aurora` as a single
//! dependency is sufficient.
//!
//! # Quick start
//!
//! ```rust
//! use aurora::prelude::*;
//!
//! // A periodic 16-cell line on a single rank.
//! let config = EngineConfig::<1> {
//!     grid: GridConfig::uniform(16, 2),
//!     capacity: 1024,
//!     ..Default::default()
//! };
//! let mut engine = Engine::new(config, Box::new(SelfComm::new())).unwrap();
//!
//! // Two electron-positron pairs per cell, at rest.
//! let injected = engine.fill_multiplicity(2, 1.0).unwrap();
//! assert_eq!(injected, 64);
//!
//! let outcome = engine.step().unwrap();
//! assert_eq!(outcome.step, StepId(1));
//! assert_eq!(engine.particles().live_count(), 64);
//! ```
//!
//! # Modules
//!
//! | Module | Sub-crate | Contents |
//! |--------|-----------|----------|
//! | [`types`] | `aurora-core` | Scalar, flags, ids, shared errors |
//! | [`arena`] | `aurora-arena` | Buffers, residency, multi-arrays, indexing |
//! | [`space`] | `aurora-space` | Grids, zones, domain decomposition |
//! | [`exec`] | `aurora-exec` | Execution policies and launch contexts |
//! | [`particles`] | `aurora-particles` | SoA particle storage and the cell sort |
//! | [`comm`] | `aurora-comm` | Communicators and particle migration |
//! | [`deposit`] | `aurora-deposit` | Shape functions and current deposition |
//! | [`engine`] | `aurora-engine` | Per-step orchestration |

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

/// Core types, flags, and ids (`aurora-core`).
pub use aurora_core as types;

/// Buffers, memory residency, and multi-dimensional arrays (`aurora-arena`).
///
/// [`arena::MultiArray`] is generic over its [`arena::Indexing`]: row-major
/// or Morton order.
pub use aurora_arena as arena;

/// Grids, zones, and domain decomposition (`aurora-space`).
pub use aurora_space as space;

/// Execution policies (`aurora-exec`).
///
/// [`exec::Serial`], [`exec::Threaded`], and [`exec::Device`], or
/// [`exec::Policy`] to pick one at runtime.
pub use aurora_exec as exec;

/// Structure-of-arrays particle storage and the cell sort (`aurora-particles`).
pub use aurora_particles as particles;

/// Communicators and particle migration (`aurora-comm`).
pub use aurora_comm as comm;

/// Charge-conserving current deposition (`aurora-deposit`).
pub use aurora_deposit as deposit;

/// Per-step orchestration (`aurora-engine`).
pub use aurora_engine as engine;

/// Common imports for typical Aurora usage.
///
/// ```rust
/// use aurora::prelude::*;
/// ```
pub mod prelude {
    // Core types
    pub use aurora_core::{ParticleId, PtcFlag, PtcType, Scalar, StepId, EMPTY_CELL};

    // Errors
    pub use aurora_core::{CapacityError, CommError, ConfigError};

    // Storage
    pub use aurora_arena::{Buffer, Extent, MemType, MultiArray};

    // Space
    pub use aurora_space::{DomainConfig, DomainInfo, Grid, GridConfig, Zone};

    // Execution
    pub use aurora_exec::{Backend, ExecPolicy, LaunchContext, Policy};

    // Particles
    pub use aurora_particles::{sort_by_cell, Particle, ParticleArray};

    // Migration
    pub use aurora_comm::{Communicator, DomainComm, LocalUniverse, SelfComm};

    // Deposition
    pub use aurora_deposit::{CurrentMesh, Depositor, Motion, ShapeOrder};

    // Engine
    pub use aurora_engine::{Engine, EngineConfig, StepError, StepMetrics, StepOutcome};
}
