//! Error types shared across the Aurora workspace.
//!
//! Every error here is fatal to the run: configuration errors abort
//! before the first step, capacity and communication errors abort the
//! step in which they occur. Subsystem crates wrap these in their own
//! enums and expose the original through `source()`.

use std::error::Error;
use std::fmt;

/// A configuration invariant was violated at construction time.
#[derive(Clone, Debug, PartialEq)]
pub enum ConfigError {
    /// Cache-blocked (Morton) indexing requires power-of-two axes.
    NonPowerOfTwoExtent {
        /// Offending axis.
        axis: usize,
        /// Its length.
        len: u32,
    },
    /// An axis has zero length.
    ZeroExtent {
        /// Offending axis.
        axis: usize,
    },
    /// Buffer length does not match the extent's element count.
    ExtentMismatch {
        /// Element count implied by the extent.
        expected: usize,
        /// Actual buffer length.
        actual: usize,
    },
    /// Guard width is too narrow for the shape function stencil.
    GuardTooSmall {
        /// Offending axis.
        axis: usize,
        /// Configured guard width.
        guard: u32,
        /// Minimum width required.
        required: u32,
    },
    /// Global cell count is not divisible by the rank count along an axis.
    IndivisibleDecomposition {
        /// Offending axis.
        axis: usize,
        /// Global interior cells along the axis.
        cells: u32,
        /// Ranks along the axis.
        ranks: u32,
    },
    /// The communicator size does not match the rank grid.
    RankCountMismatch {
        /// Ranks required by the decomposition.
        expected: usize,
        /// Ranks available in the communicator.
        actual: usize,
    },
    /// Timestep is NaN, infinite, zero, or negative.
    InvalidTimestep {
        /// The invalid value.
        value: f64,
    },
    /// Particle capacity is zero.
    ZeroCapacity,
    /// Any other invalid parameter.
    InvalidParameter {
        /// Description of the violation.
        reason: String,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NonPowerOfTwoExtent { axis, len } => {
                write!(
                    f,
                    "morton indexing requires power-of-two extents: axis {axis} has length {len}"
                )
            }
            Self::ZeroExtent { axis } => write!(f, "axis {axis} has zero length"),
            Self::ExtentMismatch { expected, actual } => {
                write!(
                    f,
                    "extent holds {expected} elements but buffer has {actual}"
                )
            }
            Self::GuardTooSmall {
                axis,
                guard,
                required,
            } => {
                write!(
                    f,
                    "guard width {guard} on axis {axis} is below the required {required}"
                )
            }
            Self::IndivisibleDecomposition { axis, cells, ranks } => {
                write!(
                    f,
                    "{cells} cells on axis {axis} cannot be split evenly over {ranks} ranks"
                )
            }
            Self::RankCountMismatch { expected, actual } => {
                write!(
                    f,
                    "decomposition needs {expected} ranks, communicator has {actual}"
                )
            }
            Self::InvalidTimestep { value } => write!(f, "invalid timestep {value}"),
            Self::ZeroCapacity => write!(f, "particle capacity must be non-zero"),
            Self::InvalidParameter { reason } => write!(f, "invalid parameter: {reason}"),
        }
    }
}

impl Error for ConfigError {}

/// An append would push `number` past `size`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CapacityError {
    /// Total slots needed after the append.
    pub requested: usize,
    /// Capacity of the array.
    pub capacity: usize,
}

impl fmt::Display for CapacityError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "particle capacity exceeded: need {} slots, capacity {}",
            self.requested, self.capacity
        )
    }
}

impl Error for CapacityError {}

/// A point-to-point exchange failed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CommError {
    /// The peer hung up before the exchange completed.
    Disconnected {
        /// Rank of the peer.
        peer: usize,
    },
    /// A rank outside `0..size` was addressed.
    InvalidRank {
        /// The addressed rank.
        rank: usize,
        /// Communicator size.
        size: usize,
    },
    /// A received message could not be decoded.
    Malformed {
        /// Sending rank.
        peer: usize,
        /// Message tag.
        tag: u32,
        /// What was wrong with it.
        reason: String,
    },
}

impl fmt::Display for CommError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Disconnected { peer } => write!(f, "rank {peer} disconnected"),
            Self::InvalidRank { rank, size } => {
                write!(f, "rank {rank} out of range for communicator of size {size}")
            }
            Self::Malformed { peer, tag, reason } => {
                write!(f, "malformed message from rank {peer} (tag {tag}): {reason}")
            }
        }
    }
}

impl Error for CommError {}
