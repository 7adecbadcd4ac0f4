//! Scalar type and substrate-wide constants.

/// Floating-point type for particle attributes and mesh values.
///
/// `f64` by default; the `single-precision` feature switches it to `f32`.
#[cfg(not(feature = "single-precision"))]
pub type Scalar = f64;

/// Floating-point type for particle attributes and mesh values.
#[cfg(feature = "single-precision")]
pub type Scalar = f32;

/// Cell id marking a dead particle slot.
///
/// Every per-particle operation skips slots carrying this value. Dead
/// slots are reclaimed by the next cell sort, never eagerly.
pub const EMPTY_CELL: u32 = u32::MAX;

/// Maximum number of particle species (limited by the 3-bit type field).
pub const MAX_SPECIES: usize = 8;

/// Highest supported mesh dimensionality.
pub const MAX_DIM: usize = 3;
