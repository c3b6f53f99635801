//! History consistency invariant: recorded moves match the discs on the board.

use super::Invariant;
use crate::match_state::MatchState;
use strictly_connect::Seat;

/// Invariant: one disc per recorded move, split between the seats by ply.
///
/// Every column in the history is on the board, and each column holds
/// exactly as many discs as times it was played.
pub struct HistoryConsistentInvariant;

impl Invariant<MatchState> for HistoryConsistentInvariant {
    fn holds(state: &MatchState) -> bool {
        let board = state.board();
        let moves = state.moves();
        if moves.len() != board.occupied() {
            return false;
        }
        if board.count(Seat::One) != moves.len().div_ceil(2)
            || board.count(Seat::Two) != moves.len() / 2
        {
            return false;
        }
        (0..board.cols()).all(|col| {
            board.column_height(col) == moves.iter().filter(|&&c| c == col).count()
        }) && moves.iter().all(|&c| c < board.cols())
    }

    fn description() -> &'static str {
        "Move history matches the discs on the board"
    }
}
