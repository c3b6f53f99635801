//! Gravity invariant: no disc hangs above an empty cell.

use super::Invariant;
use crate::match_state::MatchState;

/// Invariant: every occupied cell rests on the floor or another disc.
pub struct GravityInvariant;

impl Invariant<MatchState> for GravityInvariant {
    fn holds(state: &MatchState) -> bool {
        !state.board().has_floating_disc()
    }

    fn description() -> &'static str {
        "No occupied cell sits above an empty cell in its column"
    }
}
