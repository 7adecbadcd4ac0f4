//! Execution policies for Aurora kernels.
//!
//! Every per-particle algorithm in the workspace is written once against
//! the [`ExecPolicy`] capability interface and runs unchanged on three
//! backends:
//!
//! ```text
//! ExecPolicy
//! ├── Serial    one host thread, host memory
//! ├── Threaded  rayon pool over disjoint index ranges, host memory
//! └── Device    emulated accelerator: one logical thread per particle
//!               tile, operating on the device address space
//! ```
//!
//! Kernels receive the grid parameters through the policy's
//! [`LaunchContext`], a plain value set before each launch; there is no
//! global kernel state. Shared writes go through
//! [`ExecPolicy::atomic_add`]; everything else a kernel does is either
//! read-only or writes a disjoint output slot.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod context;
pub mod device;
pub mod policy;
pub mod serial;
pub mod threaded;

pub use context::LaunchContext;
pub use device::Device;
pub use policy::{Backend, ExecPolicy, Policy};
pub use serial::Serial;
pub use threaded::Threaded;
