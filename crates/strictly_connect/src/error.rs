//! Move errors for the board model.

use derive_more::{Display, Error};

/// Error that can occur when dropping a disc.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Error)]
pub enum MoveError {
    /// The column index is outside `[0, columns)`.
    #[display("Column {} is out of range (board has {} columns)", column, columns)]
    InvalidColumn {
        /// Requested column.
        column: usize,
        /// Number of columns on the board.
        columns: usize,
    },

    /// Every cell in the column is already occupied.
    #[display("Column {} is full", column)]
    ColumnFull {
        /// Requested column.
        column: usize,
    },
}
