//! Migration errors.

use std::error::Error;
use std::fmt;

use aurora_core::{CapacityError, CommError, ConfigError};

/// Fatal failure of a migration pass.
#[derive(Clone, Debug, PartialEq)]
pub enum MigrationError {
    /// A neighbour exchange failed.
    Comm(CommError),
    /// A staging buffer or the local array ran out of slots.
    Capacity(CapacityError),
    /// The domain and communicator do not agree.
    Config(ConfigError),
}

impl fmt::Display for MigrationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Comm(e) => write!(f, "migration exchange failed: {e}"),
            Self::Capacity(e) => write!(f, "migration overflow: {e}"),
            Self::Config(e) => write!(f, "migration misconfigured: {e}"),
        }
    }
}

impl Error for MigrationError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Comm(e) => Some(e),
            Self::Capacity(e) => Some(e),
            Self::Config(e) => Some(e),
        }
    }
}

impl From<CommError> for MigrationError {
    fn from(e: CommError) -> Self {
        Self::Comm(e)
    }
}

impl From<CapacityError> for MigrationError {
    fn from(e: CapacityError) -> Self {
        Self::Capacity(e)
    }
}

impl From<ConfigError> for MigrationError {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}
