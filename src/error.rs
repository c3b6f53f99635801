//! Error types for the arena.
//!
//! Validation errors reject a call before anything is written. Escrow
//! errors come from the ledger. An [`InvariantViolation`] means the engine
//! reached a state correct callers can never produce.

use crate::types::{Amount, CompetitionId, MatchId, PlayerId};
use derive_more::{Display, Error, From};
use strictly_connect::MoveError;
use tracing::instrument;

/// A call was rejected because of its inputs or the current state.
#[derive(Debug, Clone, PartialEq, Eq, Display, Error)]
pub enum ValidationError {
    /// The column is not on the board.
    #[display("Column {} is out of range (board has {} columns)", column, columns)]
    InvalidColumn {
        /// Requested column.
        column: usize,
        /// Number of columns on the board.
        columns: usize,
    },

    /// The column has no empty cell.
    #[display("Column {} is full", column)]
    ColumnFull {
        /// Requested column.
        column: usize,
    },

    /// The resolved sender is not the current mover.
    #[display("Not your move: {} is not the current mover", player)]
    NotYourTurn {
        /// Resolved sender.
        player: PlayerId,
    },

    /// The match has already concluded.
    #[display("Match {} has already ended", match_id)]
    GameAlreadyEnded {
        /// Match id.
        match_id: MatchId,
    },

    /// No match is stored under the id.
    #[display("Match {} not found", match_id)]
    GameNotFound {
        /// Match id.
        match_id: MatchId,
    },

    /// The opponent has not been idle long enough.
    #[display("Timeout not elapsed: {} blocks idle, threshold is {}", elapsed, threshold)]
    TimeoutNotElapsed {
        /// Blocks since the last activity.
        elapsed: u64,
        /// Configured threshold that must be exceeded.
        threshold: u64,
    },

    /// The caller does not play in the match.
    #[display("{} is not a participant of match {}", player, match_id)]
    NotAParticipant {
        /// Resolved sender.
        player: PlayerId,
        /// Match id.
        match_id: MatchId,
    },

    /// The current mover tried to claim a timeout against the opponent.
    #[display("{} is the current mover and cannot claim a timeout", player)]
    CallerIsCurrentMover {
        /// Resolved sender.
        player: PlayerId,
    },

    /// No competition is registered under the id.
    #[display("Competition {} not found", competition)]
    CompetitionNotFound {
        /// Competition id.
        competition: CompetitionId,
    },

    /// The player is already waiting in a queue.
    #[display("{} is already queued", player)]
    AlreadyQueued {
        /// Resolved sender.
        player: PlayerId,
    },

    /// The player is not waiting in any queue.
    #[display("{} is not queued", player)]
    NotQueued {
        /// Resolved sender.
        player: PlayerId,
    },

    /// The player already has an active match.
    #[display("{} is already playing match {}", player, match_id)]
    AlreadyInMatch {
        /// Resolved sender.
        player: PlayerId,
        /// Active match.
        match_id: MatchId,
    },

    /// The player cannot cover the participation fee.
    #[display("{} has {} but the participation fee is {}", player, available, required)]
    InsufficientFunds {
        /// Player identity.
        player: PlayerId,
        /// Participation fee.
        required: Amount,
        /// Current balance.
        available: Amount,
    },

    /// Two stakes of this fee do not fit in an [`Amount`].
    #[display("Participation fee {} is too large to stake twice", participation_fee)]
    FeeTooLarge {
        /// Offending fee.
        participation_fee: Amount,
    },

    /// The fee of a competition cannot change while players wait in its queue.
    #[display("Competition {} has {} waiting players; fee change refused", competition, waiting)]
    CompetitionBusy {
        /// Competition id.
        competition: CompetitionId,
        /// Players currently queued.
        waiting: usize,
    },
}

impl From<MoveError> for ValidationError {
    fn from(err: MoveError) -> Self {
        match err {
            MoveError::InvalidColumn { column, columns } => Self::InvalidColumn { column, columns },
            MoveError::ColumnFull { column } => Self::ColumnFull { column },
        }
    }
}

/// Error raised by the escrow ledger.
#[derive(Debug, Clone, PartialEq, Eq, Display, Error)]
pub enum EscrowError {
    /// No escrow record exists for the match.
    #[display("No escrow for match {}", match_id)]
    EscrowNotFound {
        /// Match id.
        match_id: MatchId,
    },

    /// An escrow record already exists for the match.
    #[display("Escrow for match {} is already open", match_id)]
    EscrowAlreadyOpen {
        /// Match id.
        match_id: MatchId,
    },

    /// The escrow was settled before.
    #[display("Escrow for match {} is already settled", match_id)]
    AlreadySettled {
        /// Match id.
        match_id: MatchId,
    },

    /// A share is not a fraction in `[0, 1]`.
    #[display("Invalid share {}/{}", numerator, denominator)]
    InvalidShare {
        /// Share numerator.
        numerator: u64,
        /// Share denominator.
        denominator: u64,
    },

    /// The payout plan would pay out more than the escrow holds.
    #[display("Payout of {} exceeds stake of {} for match {}", requested, total_stake, match_id)]
    OverAllocated {
        /// Match id.
        match_id: MatchId,
        /// Sum of computed payouts.
        requested: Amount,
        /// Stake held in escrow.
        total_stake: Amount,
    },
}

/// A broken internal invariant, with the location that detected it.
#[derive(Debug, Clone, PartialEq, Eq, Display, Error)]
#[display("Invariant violation: {} at {}:{}", message, file, line)]
pub struct InvariantViolation {
    /// What went wrong.
    pub message: String,
    /// Line number where the violation was detected.
    pub line: u32,
    /// Source file where the violation was detected.
    pub file: &'static str,
}

impl InvariantViolation {
    /// Creates a violation tagged with the caller's location.
    #[track_caller]
    #[instrument(skip(message))]
    pub fn new(message: impl Into<String>) -> Self {
        let loc = std::panic::Location::caller();
        Self {
            message: message.into(),
            line: loc.line(),
            file: loc.file(),
        }
    }
}

/// Any error produced by the arena.
#[derive(Debug, Clone, PartialEq, Eq, Display, Error, From)]
pub enum ArenaError {
    /// The call was rejected.
    #[display("{}", _0)]
    Validation(ValidationError),
    /// The escrow ledger refused the operation.
    #[display("{}", _0)]
    Escrow(EscrowError),
    /// An internal invariant was broken.
    #[display("{}", _0)]
    Invariant(InvariantViolation),
}

impl From<MoveError> for ArenaError {
    fn from(err: MoveError) -> Self {
        Self::Validation(err.into())
    }
}

impl ArenaError {
    /// Returns the validation error, if this is one.
    pub fn as_validation(&self) -> Option<&ValidationError> {
        match self {
            Self::Validation(err) => Some(err),
            _ => None,
        }
    }
}

/// Result alias for arena operations.
pub type ArenaResult<T> = Result<T, ArenaError>;
