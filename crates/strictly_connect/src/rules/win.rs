//! Win detection around the last placed disc.

use crate::{Board, Seat};
use strum::IntoEnumIterator;
use tracing::{instrument, trace};

/// The four axes a run can lie on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::EnumIter, strum::Display)]
pub enum Direction {
    /// Left to right along a row.
    Horizontal,
    /// Top to bottom along a column.
    Vertical,
    /// Bottom-left to top-right.
    Rising,
    /// Top-left to bottom-right.
    Falling,
}

impl Direction {
    /// Unit step `(d_row, d_col)` in the positive sense of the axis.
    pub fn delta(self) -> (isize, isize) {
        match self {
            Direction::Horizontal => (0, 1),
            Direction::Vertical => (1, 0),
            Direction::Rising => (-1, 1),
            Direction::Falling => (1, 1),
        }
    }
}

/// Counts contiguous `seat` discs starting one step away from `(row, col)`.
///
/// Walks at most `max_steps` cells in direction `(d_row, d_col)` and stops
/// at the board edge or the first cell not owned by `seat`. The starting
/// cell is not counted.
pub fn count_in_direction(
    board: &Board,
    seat: Seat,
    row: usize,
    col: usize,
    (d_row, d_col): (isize, isize),
    max_steps: usize,
) -> usize {
    let mut count = 0;
    for step in 1..=max_steps as isize {
        let r = row as isize + d_row * step;
        let c = col as isize + d_col * step;
        if r < 0 || c < 0 {
            break;
        }
        match board.cell(r as usize, c as usize) {
            Some(cell) if cell.is(seat) => count += 1,
            _ => break,
        }
    }
    count
}

/// Checks if the disc at `(last_row, last_col)` completes a run for `seat`.
///
/// Returns true if, along any of the four axes, the placed disc plus the
/// contiguous `seat` discs on either side number at least `connect`.
#[instrument(level = "trace", skip(board))]
pub fn check_win(board: &Board, seat: Seat, last_row: usize, last_col: usize, connect: usize) -> bool {
    let reach = connect.saturating_sub(1);
    Direction::iter().any(|direction| {
        let (d_row, d_col) = direction.delta();
        let forward = count_in_direction(board, seat, last_row, last_col, (d_row, d_col), reach);
        let backward = count_in_direction(board, seat, last_row, last_col, (-d_row, -d_col), reach);
        let run = 1 + forward + backward;
        trace!(%direction, run, "Run length");
        run >= connect
    })
}
