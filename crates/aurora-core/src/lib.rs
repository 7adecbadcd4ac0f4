//! Core types for the Aurora particle-mesh substrate.
//!
//! This is the leaf crate with zero internal dependencies. It defines
//! the scalar type used for every particle and mesh value, the dead-slot
//! sentinel, the particle flag word layout, strongly-typed identifiers,
//! and the error enums shared by the rest of the workspace.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod error;
pub mod flag;
pub mod id;
pub mod types;

pub use error::{CapacityError, CommError, ConfigError};
pub use flag::{
    check_flag, clear_flag, flag_or, ptc_type, set_flag, set_ptc_type_flag, toggle_flag, PtcFlag,
    PtcType,
};
pub use id::{ParticleId, StepId};
pub use types::{Scalar, EMPTY_CELL, MAX_DIM, MAX_SPECIES};
