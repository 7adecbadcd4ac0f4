//! Particle storage for the Aurora particle-mesh substrate.
//!
//! [`ParticleArray`] keeps one [`Buffer`](aurora_arena::Buffer) per
//! particle attribute (structure of arrays). Slots are never compacted
//! on removal: erasing writes [`EMPTY_CELL`](aurora_core::EMPTY_CELL)
//! into the slot's cell id and every per-particle pass skips it. Dead
//! slots are reclaimed by [`sort_by_cell`], which groups live particles
//! by cell and moves all dead slots behind them.
//!
//! [`Particle`] is the flat per-particle record used for snapshots and,
//! byte for byte, as the migration wire format.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod array;
pub mod error;
pub mod record;
pub mod sort;

pub use array::{ParticleArray, ParticleView, ParticleViewMut};
pub use error::SortError;
pub use record::Particle;
pub use sort::{sort_by_cell, CellPartition};
