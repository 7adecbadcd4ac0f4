//! Deposition errors.

use std::error::Error;
use std::fmt;

use aurora_core::ConfigError;

/// Failure of a deposition pass.
#[derive(Clone, Debug, PartialEq)]
pub enum DepositError {
    /// Particles moved more than one cell along some axis in one step.
    /// Every other particle was deposited; these were skipped.
    CflViolation {
        /// Number of offending particles.
        count: usize,
        /// Slot of one offending particle.
        index: usize,
    },
    /// Fewer motions than particles.
    MotionCountMismatch {
        /// Motions supplied.
        motions: usize,
        /// Particles in the array.
        particles: usize,
    },
    /// The mesh or launch context does not match the depositor.
    Config(ConfigError),
}

impl fmt::Display for DepositError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CflViolation { count, index } => write!(
                f,
                "{count} particles moved more than one cell in a step (e.g. slot {index})"
            ),
            Self::MotionCountMismatch { motions, particles } => write!(
                f,
                "{motions} motions supplied for {particles} particles"
            ),
            Self::Config(e) => write!(f, "deposition misconfigured: {e}"),
        }
    }
}

impl Error for DepositError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Config(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ConfigError> for DepositError {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}
