//! Strongly-typed identifiers.

use std::fmt;

/// Monotonically increasing simulation step counter.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StepId(pub u64);

impl StepId {
    /// The step after this one.
    pub fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl fmt::Display for StepId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for StepId {
    fn from(v: u64) -> Self {
        Self(v)
    }
}

/// Tracking identifier carried by every particle.
///
/// The upper 24 bits hold the rank that created the particle and the
/// lower 40 bits a per-rank serial, so ids stay unique across ranks
/// without any communication.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ParticleId(pub u64);

impl ParticleId {
    const SERIAL_BITS: u32 = 40;

    /// Compose an id from the creating rank and its local serial.
    pub fn compose(rank: usize, serial: u64) -> Self {
        Self(((rank as u64) << Self::SERIAL_BITS) | (serial & ((1 << Self::SERIAL_BITS) - 1)))
    }

    /// Rank that created this particle.
    pub fn rank(self) -> usize {
        (self.0 >> Self::SERIAL_BITS) as usize
    }

    /// Per-rank serial number.
    pub fn serial(self) -> u64 {
        self.0 & ((1 << Self::SERIAL_BITS) - 1)
    }
}

impl fmt::Display for ParticleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.rank(), self.serial())
    }
}

impl From<u64> for ParticleId {
    fn from(v: u64) -> Self {
        Self(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn step_id_advances() {
        assert_eq!(StepId(4).next(), StepId(5));
        assert_eq!(StepId::default(), StepId(0));
    }

    #[test]
    fn particle_id_packs_rank_and_serial() {
        let id = ParticleId::compose(7, 123_456);
        assert_eq!(id.rank(), 7);
        assert_eq!(id.serial(), 123_456);
        assert_eq!(id.to_string(), "7:123456");
    }
}
