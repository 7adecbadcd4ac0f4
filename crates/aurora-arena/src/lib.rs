//! Memory model for the Aurora particle-mesh substrate.
//!
//! Every mesh and particle attribute lives in a [`Buffer`], a linear
//! allocation whose [`MemType`] residency tag decides which address
//! spaces exist. The accelerator address space is emulated: it is a
//! second allocation owned by the buffer that only device kernels touch,
//! and data moves between the two spaces only through explicit
//! `copy_to_host` / `copy_to_device` calls.
//!
//! # Architecture
//!
//! ```text
//! MultiArray<T, D, I>          AtomicArray<D, I>
//! ├── Extent<D>                ├── Extent<D>
//! ├── I: Indexing              └── Vec<AtomicScalar>  (deposition target)
//! │   ├── RowMajor
//! │   └── Morton (power-of-two axes only)
//! └── Buffer<T>
//!     ├── host:   Option<Vec<T>>
//!     └── device: Option<Vec<T>>   (shared with host for DeviceManaged)
//! ```
//!
//! # Residency
//!
//! | `MemType`       | host | device | copies          |
//! |-----------------|------|--------|-----------------|
//! | `HostOnly`      | yes  | no     | none            |
//! | `HostDevice`    | yes  | yes    | explicit        |
//! | `DeviceManaged` | one shared allocation | | none  |
//! | `DeviceOnly`    | no   | yes    | none            |

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod atomic;
pub mod buffer;
pub mod extent;
pub mod index;
pub mod mem;
pub mod multi_array;

pub use atomic::{AtomicArray, AtomicScalar};
pub use buffer::Buffer;
pub use extent::Extent;
pub use index::{Indexing, Morton, RowMajor};
pub use mem::{MemSpace, MemType};
pub use multi_array::MultiArray;
