//! Flat per-particle record.

use bytemuck::{Pod, Zeroable};

use aurora_core::{ptc_type, CommError, PtcType, Scalar, EMPTY_CELL};

/// One particle in fixed field order.
///
/// `#[repr(C)]` with no padding, so a slice of records is its own wire
/// format: `x[3]`, `p[3]`, `energy`, `weight`, `cell`, `flag`, `id`.
/// All ranks are assumed to share endianness and [`Scalar`] width.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct Particle {
    /// Sub-cell position in `[0, 1)` along each mesh axis. Axes beyond
    /// the mesh dimension hold physical coordinates.
    pub x: [Scalar; 3],
    /// Momentum.
    pub p: [Scalar; 3],
    /// Energy (Lorentz factor for the reference pusher).
    pub energy: Scalar,
    /// Statistical weight.
    pub weight: Scalar,
    /// Local cell id, or [`EMPTY_CELL`] for a dead slot.
    pub cell: u32,
    /// Flag word; see [`aurora_core::flag`].
    pub flag: u32,
    /// Tracking id.
    pub id: u64,
}

impl Particle {
    /// Size of one record on the wire.
    pub const WIRE_SIZE: usize = std::mem::size_of::<Self>();

    /// True for a dead slot.
    pub fn is_dead(&self) -> bool {
        self.cell == EMPTY_CELL
    }

    /// Species encoded in the flag word, if valid.
    pub fn species(&self) -> Option<PtcType> {
        PtcType::from_index(ptc_type(self.flag))
    }

    /// Byte view of a record slice.
    pub fn as_bytes(records: &[Particle]) -> &[u8] {
        bytemuck::cast_slice(records)
    }

    /// Decode records from bytes received from rank `peer` under `tag`.
    pub fn from_bytes(bytes: &[u8], peer: usize, tag: u32) -> Result<Vec<Particle>, CommError> {
        if bytes.len() % Self::WIRE_SIZE != 0 {
            return Err(CommError::Malformed {
                peer,
                tag,
                reason: format!(
                    "{} bytes is not a multiple of the {}-byte particle record",
                    bytes.len(),
                    Self::WIRE_SIZE
                ),
            });
        }
        Ok(bytes
            .chunks_exact(Self::WIRE_SIZE)
            .map(bytemuck::pod_read_unaligned)
            .collect())
    }
}
