//! Property tests comparing the board against a fixed-shape reference.
//!
//! The reference scans never exit early: every candidate cell is visited
//! and results are selected with masks, the way a fixed-shape circuit
//! evaluates them. The board's early-exit loops must agree on every input.

use proptest::prelude::*;
use strictly_connect::{Board, MoveError, Seat};

const ROWS: usize = 6;
const COLS: usize = 6;
const CONNECT: usize = 4;

type Grid = [[u8; COLS]; ROWS];

/// Visits every row of the column bottom-up and selects the first empty one.
fn reference_drop(grid: &mut Grid, col: usize, value: u8) -> Option<usize> {
    let mut placed = false;
    let mut row_index = 0;
    for i in 0..ROWS {
        let row = ROWS - 1 - i;
        let should_place = grid[row][col] == 0 && !placed;
        placed |= should_place;
        if should_place {
            grid[row][col] = value;
        }
        row_index = if should_place { row } else { row_index };
    }
    placed.then_some(row_index)
}

/// Always walks `CONNECT - 1` steps; a mask stops counting after the
/// first gap or edge.
fn reference_count(grid: &Grid, value: u8, row: usize, col: usize, d_row: isize, d_col: isize) -> usize {
    let mut count = 0;
    let mut running = true;
    for step in 1..CONNECT as isize {
        let r = row as isize + d_row * step;
        let c = col as isize + d_col * step;
        let in_bounds = r >= 0 && c >= 0 && (r as usize) < ROWS && (c as usize) < COLS;
        let same = in_bounds && grid[r as usize][c as usize] == value;
        running = running && same;
        count += usize::from(running);
    }
    count
}

fn reference_check_win(grid: &Grid, value: u8, row: usize, col: usize) -> bool {
    let mut won = false;
    for (d_row, d_col) in [(0, 1), (1, 0), (-1, 1), (1, 1)] {
        let run = 1
            + reference_count(grid, value, row, col, d_row, d_col)
            + reference_count(grid, value, row, col, -d_row, -d_col);
        won |= run >= CONNECT;
    }
    won
}

proptest! {
    #[test]
    fn placement_and_win_match_reference(columns in prop::collection::vec(0..COLS, 0..60)) {
        let mut board = Board::new(ROWS, COLS);
        let mut grid: Grid = [[0; COLS]; ROWS];
        let mut seat = Seat::One;

        for col in columns {
            let height_before = board.column_height(col);
            let expected = reference_drop(&mut grid, col, seat.value());
            let actual = board.drop_into_column(col, seat);

            match (expected, actual) {
                (Some(expected_row), Ok(row)) => {
                    prop_assert_eq!(row, expected_row);
                    prop_assert_eq!(board.column_height(col), height_before + 1);
                    prop_assert_eq!(row, ROWS - 1 - height_before);
                    prop_assert_eq!(
                        board.check_win(seat, row, col, CONNECT),
                        reference_check_win(&grid, seat.value(), row, col)
                    );
                    seat = seat.opponent();
                }
                (None, Err(MoveError::ColumnFull { column })) => {
                    prop_assert_eq!(column, col);
                    prop_assert_eq!(board.column_height(col), height_before);
                }
                (expected, actual) => {
                    prop_assert!(false, "reference {:?} disagrees with board {:?}", expected, actual);
                }
            }

            for r in 0..ROWS {
                for c in 0..COLS {
                    prop_assert_eq!(board.value_at(r, c), grid[r][c]);
                }
            }
            prop_assert!(!board.has_floating_disc());
        }
    }

    #[test]
    fn out_of_range_column_never_mutates(col in COLS..COLS + 20) {
        let mut board = Board::new(ROWS, COLS);
        let before = board.clone();
        let is_invalid_column = matches!(
            board.drop_into_column(col, Seat::One),
            Err(MoveError::InvalidColumn { .. })
        );
        prop_assert!(is_invalid_column);
        prop_assert_eq!(board, before);
    }
}
