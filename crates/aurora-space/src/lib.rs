//! Grid geometry and domain decomposition for Aurora.
//!
//! A run splits a global mesh of `N` interior cells per axis over a
//! Cartesian grid of ranks. Each rank sees a [`Grid`]: its own slab of
//! interior cells surrounded by `guard` cells on every side. The guard
//! shell doubles as the migration *skirt*: a particle whose cell lies in
//! the skirt has left the local interior and belongs to a neighbour.
//!
//! ```text
//!            zone (-1,+1) │ zone (0,+1)  │ zone (+1,+1)
//!           ──────────────┼──────────────┼──────────────
//!            zone (-1, 0) │   interior   │ zone (+1, 0)
//!           ──────────────┼──────────────┼──────────────
//!            zone (-1,-1) │ zone (0,-1)  │ zone (+1,-1)
//! ```
//!
//! [`Zone`] names one of the `3^D - 1` directions around the interior;
//! [`DomainInfo`] maps each zone to the neighbouring rank (if any).

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod config;
pub mod domain;
pub mod grid;
pub mod zone;

pub use config::{DomainConfig, GridConfig};
pub use domain::DomainInfo;
pub use grid::{Grid, GridDescriptor};
pub use zone::Zone;
