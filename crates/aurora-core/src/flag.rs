//! Particle flag word layout.
//!
//! The 32-bit flag word carries two things:
//!
//! ```text
//!  31 30 29 | 28 ............................ 0
//!  species  | one bit per PtcFlag (1 << flag)
//! ```
//!
//! The top 3 bits hold the [`PtcType`]; the remaining bits are
//! independent boolean markers indexed by [`PtcFlag`].

use std::fmt;

/// Number of low bits available for boolean markers.
const TYPE_SHIFT: u32 = 29;
/// Mask covering the boolean marker bits.
const MARKER_MASK: u32 = (1 << TYPE_SHIFT) - 1;

/// Boolean particle markers. The discriminant is the bit index.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u32)]
pub enum PtcFlag {
    /// No marker; `1 << 0`, kept so discriminants line up with bit indices.
    Nothing = 0,
    /// Particle is written to tracking output.
    Tracked,
    /// Pusher skips the Lorentz force.
    IgnoreForce,
    /// Particle moves but deposits no current.
    IgnoreCurrent,
    /// Pusher skips the electromagnetic field entirely.
    IgnoreEm,
    /// Radiation physics ignores this particle.
    IgnoreRadiation,
    /// Particle was injected directly (not produced by another process).
    Primary,
    /// Particle was produced by pair creation or similar.
    Secondary,
    /// Particle is scheduled for annihilation.
    Annihilate,
    /// Particle is scheduled to emit a photon.
    EmitPhoton,
}

impl PtcFlag {
    /// The bit this marker occupies in the flag word.
    pub const fn bit(self) -> u32 {
        1 << self as u32
    }
}

/// Particle species, stored in the top 3 bits of the flag word.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u32)]
pub enum PtcType {
    /// Electron (negative charge).
    Electron = 0,
    /// Positron (positive charge).
    Positron = 1,
    /// Ion.
    Ion = 2,
}

impl PtcType {
    /// Species index, usable to look up charge/mass tables.
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Decode a species from its 3-bit value.
    pub fn from_index(v: u32) -> Option<Self> {
        match v {
            0 => Some(Self::Electron),
            1 => Some(Self::Positron),
            2 => Some(Self::Ion),
            _ => None,
        }
    }
}

impl fmt::Display for PtcType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Electron => "electron",
            Self::Positron => "positron",
            Self::Ion => "ion",
        };
        f.write_str(name)
    }
}

/// True if `flag` has the marker bit set.
pub const fn check_flag(flag: u32, marker: PtcFlag) -> bool {
    flag & marker.bit() != 0
}

/// Set a marker bit in place.
pub fn set_flag(flag: &mut u32, marker: PtcFlag) {
    *flag |= marker.bit();
}

/// Clear a marker bit in place.
pub fn clear_flag(flag: &mut u32, marker: PtcFlag) {
    *flag &= !marker.bit();
}

/// Toggle a marker bit in place.
pub fn toggle_flag(flag: &mut u32, marker: PtcFlag) {
    *flag ^= marker.bit();
}

/// Combine several markers into one flag word.
pub fn flag_or(markers: &[PtcFlag]) -> u32 {
    markers.iter().fold(0, |acc, m| acc | m.bit())
}

/// Raw 3-bit species value of a flag word.
pub const fn ptc_type(flag: u32) -> u32 {
    flag >> TYPE_SHIFT
}

/// Replace the species bits of `flag` with `ty`, keeping the markers.
pub const fn set_ptc_type_flag(flag: u32, ty: PtcType) -> u32 {
    (flag & MARKER_MASK) | ((ty as u32) << TYPE_SHIFT)
}
