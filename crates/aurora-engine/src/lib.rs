//! Step orchestration for the Aurora particle-in-cell substrate.
//!
//! Provides the per-rank [`Engine`] that drives one simulation step at a
//! time, coordinating the pusher, current deposition, cell sort, and
//! cross-domain migration, plus the configuration, metrics, and uniform
//! injection that go with it.
//!
//! ```text
//! EngineConfig<D> ──validate──► Engine<D, U: Pusher<D>>
//!                               ├── Policy           serial | threaded | device
//!                               ├── ParticleArray    SoA, capacity per rank
//!                               ├── CurrentMesh<D>   J (+ ρ per species)
//!                               ├── Depositor        shape chosen by ShapeOrder
//!                               └── DomainComm<D>    neighbour exchange
//! ```

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod config;
pub mod error;
pub mod inject;
pub mod metrics;
pub mod push;
pub mod step;

pub use config::{EngineConfig, SpeciesTable};
pub use error::{StepError, StepErrorKind};
pub use inject::{fill_multiplicity, Multiplicity};
pub use metrics::StepMetrics;
pub use push::{advance, FreeStreaming, PushContext, Pusher, UniformBoris};
pub use step::{Engine, StepOutcome};
