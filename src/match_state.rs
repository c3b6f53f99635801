//! Per-match state record.

use crate::types::{CompetitionId, MatchId, PlayerId};
use derive_getters::Getters;
use serde::{Deserialize, Serialize};
use strictly_connect::{Board, ConnectRules, Seat};

/// Where a match is in its lifecycle.
///
/// `Active` is the only non-terminal phase. Before a match exists its
/// players are waiting in a queue or lobby.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "phase", rename_all = "snake_case")]
pub enum MatchPhase {
    /// Moves are being played.
    Active,
    /// A player completed a run.
    Won {
        /// Winning player.
        winner: PlayerId,
    },
    /// The board filled without a run.
    Draw,
    /// The current mover was idle past the timeout and forfeited.
    TimedOut {
        /// Player who forfeited.
        loser: PlayerId,
    },
}

impl MatchPhase {
    /// Returns true for every terminal phase.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, MatchPhase::Active)
    }
}

impl std::fmt::Display for MatchPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MatchPhase::Active => write!(f, "Active"),
            MatchPhase::Won { winner } => write!(f, "{} wins", winner),
            MatchPhase::Draw => write!(f, "Draw"),
            MatchPhase::TimedOut { loser } => write!(f, "{} timed out", loser),
        }
    }
}

/// Complete state of one match.
///
/// Only the match engine creates or mutates these. Each mutation works on
/// a copy that is persisted as a whole once every check has passed.
#[derive(Debug, Clone, PartialEq, Eq, Getters, Serialize, Deserialize)]
pub struct MatchState {
    /// Match id.
    match_id: MatchId,
    /// Competition the match was paired in.
    competition: CompetitionId,
    /// First player (seat one, moves first).
    player1: PlayerId,
    /// Second player (seat two).
    player2: PlayerId,
    /// Player expected to move next. Frozen once the match ends.
    current_mover: PlayerId,
    /// The board.
    board: Board,
    /// Lifecycle phase.
    phase: MatchPhase,
    /// Logical height of the last state change.
    last_activity_height: u64,
    /// Columns played, in order.
    moves: Vec<usize>,
    /// Connect threshold for this match.
    connect: usize,
}

impl MatchState {
    /// Creates an active match with an empty board; player 1 moves first.
    pub fn new(
        match_id: MatchId,
        competition: CompetitionId,
        player1: PlayerId,
        player2: PlayerId,
        rules: &ConnectRules,
        height: u64,
    ) -> Self {
        Self {
            match_id,
            competition,
            current_mover: player1.clone(),
            player1,
            player2,
            board: Board::for_rules(rules),
            phase: MatchPhase::Active,
            last_activity_height: height,
            moves: Vec::new(),
            connect: rules.connect,
        }
    }

    /// Returns true once the match reached a terminal phase.
    pub fn ended(&self) -> bool {
        self.phase.is_terminal()
    }

    /// Winner of the match, if it ended with one.
    pub fn winner(&self) -> Option<&PlayerId> {
        match &self.phase {
            MatchPhase::Won { winner } => Some(winner),
            MatchPhase::TimedOut { loser } => self.opponent_of(loser),
            MatchPhase::Active | MatchPhase::Draw => None,
        }
    }

    /// Returns true if `player` plays in this match.
    pub fn is_participant(&self, player: &PlayerId) -> bool {
        *player == self.player1 || *player == self.player2
    }

    /// Returns the other participant.
    pub fn opponent_of(&self, player: &PlayerId) -> Option<&PlayerId> {
        if *player == self.player1 {
            Some(&self.player2)
        } else if *player == self.player2 {
            Some(&self.player1)
        } else {
            None
        }
    }

    /// Seat of the current mover.
    pub fn current_seat(&self) -> Seat {
        if self.current_mover == self.player1 {
            Seat::One
        } else {
            Seat::Two
        }
    }

    /// Both participants, player 1 first.
    pub fn players(&self) -> [&PlayerId; 2] {
        [&self.player1, &self.player2]
    }

    /// Drops the current mover's disc and records the column.
    ///
    /// Returns the landing row. Phase and turn are left to the caller.
    pub(crate) fn apply_drop(&mut self, column: usize) -> Result<usize, strictly_connect::MoveError> {
        let seat = self.current_seat();
        let row = self.board.drop_into_column(column, seat)?;
        self.moves.push(column);
        Ok(row)
    }

    /// Hands the turn to the other participant.
    pub(crate) fn pass_turn(&mut self) {
        self.current_mover = if self.current_mover == self.player1 {
            self.player2.clone()
        } else {
            self.player1.clone()
        };
    }

    pub(crate) fn set_phase(&mut self, phase: MatchPhase) {
        self.phase = phase;
    }

    pub(crate) fn stamp_activity(&mut self, height: u64) {
        self.last_activity_height = height;
    }

    #[cfg(test)]
    pub(crate) fn board_mut(&mut self) -> &mut Board {
        &mut self.board
    }

    #[cfg(test)]
    pub(crate) fn set_current_mover(&mut self, player: PlayerId) {
        self.current_mover = player;
    }
}
