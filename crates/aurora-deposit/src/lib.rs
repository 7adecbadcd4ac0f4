//! Charge-conserving current deposition for Aurora.
//!
//! # Architecture
//!
//! ```text
//! Depositor<S: Shape, D>
//! ├── per particle: Trajectory (old x, new x, cell delta, q·w)
//! ├── deposit_1d / deposit_2d / deposit_3d   Esirkepov stencils
//! └── MeshTarget → ExecPolicy::atomic_add → CurrentMesh<D>
//!                                           ├── J: 3 × AtomicArray<D>
//!                                           └── Rho: per species (optional)
//! ```
//!
//! Currents along resolved axes are built from cumulative differences
//! of the shape weights before and after the move, so the discrete
//! continuity equation `ΔJ + Δρ/dt = 0` holds to rounding error for
//! every particle, including ones that change cell. Components along
//! unresolved axes are velocity times the time-averaged shape.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod deposit;
pub mod error;
pub mod kernel;
pub mod shape;

pub use deposit::{CurrentMesh, DepositSummary, Depositor};
pub use error::DepositError;
pub use kernel::{deposit_1d, deposit_2d, deposit_3d, MeshTarget, Motion, Trajectory};
pub use shape::{CloudInCell, NearestGridPoint, PiecewiseCubic, Shape, ShapeOrder, TriangularShapedCloud};
