//! Alternating turn invariant: seat one moves on even plies, seat two on odd.

use super::Invariant;
use crate::match_state::{MatchPhase, MatchState};

/// Invariant: the current mover matches the number of moves played.
///
/// While active the mover is player 1 after an even number of moves. A
/// won or drawn match freezes the mover on whoever played last; a timed
/// out match freezes it on the idle player, who is also the loser.
pub struct AlternatingTurnInvariant;

impl Invariant<MatchState> for AlternatingTurnInvariant {
    fn holds(state: &MatchState) -> bool {
        if !state.is_participant(state.current_mover()) {
            return false;
        }
        let even = state.moves().len() % 2 == 0;
        let mover_is_first = state.current_mover() == state.player1();
        match state.phase() {
            MatchPhase::Active => mover_is_first == even,
            MatchPhase::Won { .. } | MatchPhase::Draw => mover_is_first != even,
            MatchPhase::TimedOut { loser } => {
                loser == state.current_mover() && mover_is_first == even
            }
        }
    }

    fn description() -> &'static str {
        "Players alternate turns starting with player 1"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{MatchId, PlayerId};
    use strictly_connect::ConnectRules;

    fn fresh() -> MatchState {
        MatchState::new(
            MatchId::new(1),
            "global".into(),
            "alice".into(),
            "bob".into(),
            &ConnectRules::STANDARD,
            0,
        )
    }

    #[test]
    fn test_alternating_sequence_holds() {
        let mut state = fresh();
        for column in 0..5 {
            state.apply_drop(column).unwrap();
            state.pass_turn();
            assert!(AlternatingTurnInvariant::holds(&state));
        }
        assert_eq!(state.current_mover(), &PlayerId::from("bob"));
    }

    #[test]
    fn test_same_player_twice_violates() {
        let mut state = fresh();
        state.apply_drop(0).unwrap();
        assert!(!AlternatingTurnInvariant::holds(&state));
    }

    #[test]
    fn test_stranger_as_mover_violates() {
        let mut state = fresh();
        state.set_current_mover("mallory".into());
        assert!(!AlternatingTurnInvariant::holds(&state));
    }

    #[test]
    fn test_frozen_mover_after_win() {
        let mut state = fresh();
        state.apply_drop(0).unwrap();
        state.set_phase(MatchPhase::Won {
            winner: "alice".into(),
        });
        assert!(AlternatingTurnInvariant::holds(&state));
    }

    #[test]
    fn test_timed_out_loser_is_mover() {
        let mut state = fresh();
        state.set_phase(MatchPhase::TimedOut {
            loser: "alice".into(),
        });
        assert!(AlternatingTurnInvariant::holds(&state));
        state.set_phase(MatchPhase::TimedOut {
            loser: "bob".into(),
        });
        assert!(!AlternatingTurnInvariant::holds(&state));
    }
}
