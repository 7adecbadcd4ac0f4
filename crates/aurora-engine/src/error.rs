//! Step-level errors.

use std::error::Error;
use std::fmt;

use aurora_comm::MigrationError;
use aurora_core::{CapacityError, ConfigError, StepId};
use aurora_deposit::DepositError;
use aurora_particles::SortError;

/// Reason a step failed.
#[derive(Clone, Debug, PartialEq)]
pub enum StepErrorKind {
    /// The engine's configuration does not fit the state it was handed.
    Config(ConfigError),
    /// An append ran out of particle slots.
    Capacity(CapacityError),
    /// Current deposition failed.
    Deposit(DepositError),
    /// A particle carried a cell id outside the grid.
    Sort(SortError),
    /// Migration failed.
    Migration(MigrationError),
}

impl fmt::Display for StepErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(e) => write!(f, "configuration: {e}"),
            Self::Capacity(e) => write!(f, "{e}"),
            Self::Deposit(e) => write!(f, "deposition: {e}"),
            Self::Sort(e) => write!(f, "sort: {e}"),
            Self::Migration(e) => write!(f, "{e}"),
        }
    }
}

/// Error returned from [`Engine::step()`](crate::Engine::step).
///
/// Every step error is fatal to the run: the particle array may have
/// been partially updated and the neighbour ranks are no longer in
/// lockstep.
#[derive(Clone, Debug, PartialEq)]
pub struct StepError {
    /// Step that failed.
    pub step: StepId,
    /// What went wrong.
    pub kind: StepErrorKind,
}

impl StepError {
    pub(crate) fn at(step: StepId, kind: impl Into<StepErrorKind>) -> Self {
        Self {
            step,
            kind: kind.into(),
        }
    }
}

impl fmt::Display for StepError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "step {} failed: {}", self.step, self.kind)
    }
}

impl Error for StepError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match &self.kind {
            StepErrorKind::Config(e) => Some(e),
            StepErrorKind::Capacity(e) => Some(e),
            StepErrorKind::Deposit(e) => Some(e),
            StepErrorKind::Sort(e) => Some(e),
            StepErrorKind::Migration(e) => Some(e),
        }
    }
}

impl From<ConfigError> for StepErrorKind {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}

impl From<CapacityError> for StepErrorKind {
    fn from(e: CapacityError) -> Self {
        Self::Capacity(e)
    }
}

impl From<DepositError> for StepErrorKind {
    fn from(e: DepositError) -> Self {
        Self::Deposit(e)
    }
}

impl From<SortError> for StepErrorKind {
    fn from(e: SortError) -> Self {
        Self::Sort(e)
    }
}

impl From<MigrationError> for StepErrorKind {
    fn from(e: MigrationError) -> Self {
        Self::Migration(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aurora_core::CommError;

    #[test]
    fn display_names_step_and_cause() {
        let e = StepError::at(
            StepId(12),
            MigrationError::Comm(CommError::Disconnected { peer: 3 }),
        );
        let text = e.to_string();
        assert!(text.contains("step 12"));
        assert!(text.contains("rank 3 disconnected"));
    }

    #[test]
    fn source_exposes_the_subsystem_error() {
        let e = StepError::at(
            StepId(1),
            SortError::CellOutOfRange {
                index: 0,
                cell: 99,
                max_cell: 10,
            },
        );
        let src = e.source().unwrap();
        assert!(src.to_string().contains("cell 99"));
    }
}
