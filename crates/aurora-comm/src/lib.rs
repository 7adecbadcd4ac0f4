//! Rank communication and particle migration for Aurora.
//!
//! # Architecture
//!
//! ```text
//! DomainComm<D>
//! ├── DomainInfo<D>                 zone → neighbour rank
//! ├── Box<dyn Communicator>         isend / irecv / wait_all
//! │   ├── LocalComm                 one per rank thread, crossbeam channels
//! │   └── SelfComm                  single-rank runs
//! ├── send/recv staging, one ParticleArray per zone
//! └── Box<dyn EdgeHandler<D>>       policy for non-periodic physical edges
//! ```
//!
//! A migration pass runs after the cell sort. It scans only the skirt
//! cells, stages each skirt particle for the neighbour in its zone,
//! exchanges counts and then payloads with every neighbour, and appends
//! what arrives with its cell id translated into local coordinates.
//! Any communication failure is fatal to the step.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod comm;
pub mod edge;
pub mod error;
pub mod local;
pub mod migrate;

pub use comm::{Communicator, RecvHandle, SelfComm};
pub use edge::{EdgeAction, EdgeCrossing, EdgeHandler, KeepAtEdge, ReflectAtEdge, RemoveAtEdge};
pub use error::MigrationError;
pub use local::{LocalComm, LocalUniverse};
pub use migrate::{DomainComm, MigrationReport};
