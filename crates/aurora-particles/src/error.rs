//! Cell-sort errors.

use std::error::Error;
use std::fmt;

/// Errors raised by [`sort_by_cell`](crate::sort_by_cell).
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SortError {
    /// A live particle carries a cell id at or above the cell count.
    CellOutOfRange {
        /// Slot of the first offending particle.
        index: usize,
        /// Its cell id.
        cell: u32,
        /// Number of cells in the sort key space.
        max_cell: u32,
    },
}

impl fmt::Display for SortError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CellOutOfRange {
                index,
                cell,
                max_cell,
            } => write!(
                f,
                "particle {index} has cell {cell}, outside 0..{max_cell}"
            ),
        }
    }
}

impl Error for SortError {}
