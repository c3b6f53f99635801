//! Contract-based validation for match transitions.
//!
//! Contracts define correctness through preconditions and postconditions,
//! Hoare style: `{P} action {Q}`. Preconditions reject a call with a
//! [`ValidationError`] before anything is touched; a failed postcondition
//! is an [`InvariantViolation`] because no valid call can produce it.

use crate::error::{InvariantViolation, ValidationError};
use crate::invariants::{InvariantSet, MatchInvariants};
use crate::match_state::{MatchPhase, MatchState};
use crate::types::PlayerId;
use derive_new::new;
use strictly_connect::Cell;
use tracing::{instrument, warn};

/// Preconditions and postconditions for a state transition.
pub trait Contract<S, A> {
    /// Checks preconditions before applying the action.
    fn pre(state: &S, action: &A) -> Result<(), ValidationError>;

    /// Checks postconditions after applying the action.
    fn post(before: &S, after: &S) -> Result<(), InvariantViolation>;
}

/// A disc drop by a resolved sender.
#[derive(Debug, Clone, PartialEq, Eq, new)]
pub struct MoveRequest {
    /// Resolved sender.
    pub player: PlayerId,
    /// Target column.
    pub column: usize,
}

/// A forfeiture claim against the idle current mover.
#[derive(Debug, Clone, PartialEq, Eq, new)]
pub struct TimeoutClaim {
    /// Resolved sender making the claim.
    pub claimant: PlayerId,
    /// Current logical height.
    pub height: u64,
    /// Blocks of inactivity that must be exceeded.
    pub timeout_blocks: u64,
}

/// Precondition: the match has not ended.
pub struct MatchIsActive;

impl MatchIsActive {
    /// Rejects ended matches with `GameAlreadyEnded`.
    pub fn check(state: &MatchState) -> Result<(), ValidationError> {
        if state.ended() {
            Err(ValidationError::GameAlreadyEnded {
                match_id: *state.match_id(),
            })
        } else {
            Ok(())
        }
    }
}

/// Precondition: the sender is the current mover.
pub struct PlayersTurn;

impl PlayersTurn {
    /// Rejects anyone but the current mover with `NotYourTurn`.
    pub fn check(request: &MoveRequest, state: &MatchState) -> Result<(), ValidationError> {
        if request.player != *state.current_mover() {
            Err(ValidationError::NotYourTurn {
                player: request.player.clone(),
            })
        } else {
            Ok(())
        }
    }
}

/// Precondition: the column exists and has room.
pub struct ColumnPlayable;

impl ColumnPlayable {
    /// Rejects off-board columns and full columns.
    pub fn check(request: &MoveRequest, state: &MatchState) -> Result<(), ValidationError> {
        let board = state.board();
        if request.column >= board.cols() {
            return Err(ValidationError::InvalidColumn {
                column: request.column,
                columns: board.cols(),
            });
        }
        if board.cell(0, request.column) != Some(Cell::Empty) {
            return Err(ValidationError::ColumnFull {
                column: request.column,
            });
        }
        Ok(())
    }
}

/// Composite precondition for a move.
///
/// Order matters: an ended match reports `GameAlreadyEnded` to everyone,
/// then turn order, then the column.
pub struct LegalMove;

impl LegalMove {
    /// Validates all preconditions for a move.
    #[instrument(skip(state), fields(match_id = %state.match_id()))]
    pub fn check(request: &MoveRequest, state: &MatchState) -> Result<(), ValidationError> {
        MatchIsActive::check(state)?;
        PlayersTurn::check(request, state)?;
        ColumnPlayable::check(request, state)?;
        Ok(())
    }
}

/// Contract for disc drops.
///
/// Postconditions:
/// - exactly one move was appended
/// - no disc present before was moved or changed
/// - the match invariants hold
pub struct MoveContract;

impl Contract<MatchState, MoveRequest> for MoveContract {
    fn pre(state: &MatchState, action: &MoveRequest) -> Result<(), ValidationError> {
        LegalMove::check(action, state)
    }

    #[track_caller]
    fn post(before: &MatchState, after: &MatchState) -> Result<(), InvariantViolation> {
        if after.moves().len() != before.moves().len() + 1 {
            return Err(InvariantViolation::new(format!(
                "Postcondition failed: {} moves before, {} after",
                before.moves().len(),
                after.moves().len()
            )));
        }
        let monotonic = before
            .board()
            .cells()
            .iter()
            .zip(after.board().cells())
            .all(|(old, new)| *old == Cell::Empty || old == new);
        if !monotonic {
            return Err(InvariantViolation::new(
                "Postcondition failed: an existing disc changed",
            ));
        }
        check_invariants(after)
    }
}

/// Contract for timeout forfeiture.
///
/// Postconditions:
/// - the board and history are unchanged
/// - the match is timed out against the mover it had before
/// - the match invariants hold
pub struct TimeoutContract;

impl Contract<MatchState, TimeoutClaim> for TimeoutContract {
    #[instrument(skip(state), fields(match_id = %state.match_id()))]
    fn pre(state: &MatchState, claim: &TimeoutClaim) -> Result<(), ValidationError> {
        MatchIsActive::check(state)?;
        if !state.is_participant(&claim.claimant) {
            return Err(ValidationError::NotAParticipant {
                player: claim.claimant.clone(),
                match_id: *state.match_id(),
            });
        }
        if claim.claimant == *state.current_mover() {
            return Err(ValidationError::CallerIsCurrentMover {
                player: claim.claimant.clone(),
            });
        }
        let elapsed = claim.height.saturating_sub(*state.last_activity_height());
        if elapsed <= claim.timeout_blocks {
            return Err(ValidationError::TimeoutNotElapsed {
                elapsed,
                threshold: claim.timeout_blocks,
            });
        }
        Ok(())
    }

    #[track_caller]
    fn post(before: &MatchState, after: &MatchState) -> Result<(), InvariantViolation> {
        if before.board() != after.board() || before.moves() != after.moves() {
            return Err(InvariantViolation::new(
                "Postcondition failed: forfeiture changed the board",
            ));
        }
        let expected = MatchPhase::TimedOut {
            loser: before.current_mover().clone(),
        };
        if *after.phase() != expected {
            return Err(InvariantViolation::new(format!(
                "Postcondition failed: expected {}, found {}",
                expected,
                after.phase()
            )));
        }
        check_invariants(after)
    }
}

#[track_caller]
fn check_invariants(state: &MatchState) -> Result<(), InvariantViolation> {
    MatchInvariants::check_all(state).map_err(|violations| {
        warn!(?violations, "Match invariants violated");
        InvariantViolation::new(format!("Postcondition failed: {}", violations.join("; ")))
    })
}
