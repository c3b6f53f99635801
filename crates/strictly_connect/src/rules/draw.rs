//! Draw detection for the connection game.

use crate::{Board, Cell};
use tracing::instrument;

/// Checks if the board is full.
///
/// Discs settle bottom-up, so the board is full exactly when the top row
/// has no empty cell.
#[instrument(level = "trace", skip(board))]
pub fn is_full(board: &Board) -> bool {
    (0..board.cols()).all(|col| board.cell(0, col).is_some_and(|c| c != Cell::Empty))
}

/// A full board where the last move did not win is a draw.
pub fn is_draw(board: &Board, last_move_won: bool) -> bool {
    is_full(board) && !last_move_won
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Seat;

    #[test]
    fn test_empty_board_not_full() {
        assert!(!is_full(&Board::standard()));
    }

    #[test]
    fn test_partial_board_not_full() {
        let mut board = Board::new(2, 2);
        board.drop_into_column(0, Seat::One).unwrap();
        board.drop_into_column(0, Seat::Two).unwrap();
        board.drop_into_column(1, Seat::One).unwrap();
        assert!(!is_full(&board));
    }

    #[test]
    fn test_full_board() {
        let mut board = Board::new(2, 2);
        for col in [0, 0, 1, 1] {
            board.drop_into_column(col, Seat::One).unwrap();
        }
        assert!(is_full(&board));
    }

    #[test]
    fn test_draw_requires_no_win() {
        let mut board = Board::new(1, 2);
        board.drop_into_column(0, Seat::One).unwrap();
        board.drop_into_column(1, Seat::Two).unwrap();
        assert!(is_draw(&board, false));
        assert!(!is_draw(&board, true));
    }
}
