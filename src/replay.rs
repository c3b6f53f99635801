//! Scripted match replay.
//!
//! A [`MatchScript`] names two players and a list of steps. [`replay`]
//! funds and queues both players on a fresh in-memory engine, applies the
//! steps in order and reports where the match ended up. Rejected steps are
//! recorded and skipped; they never change state, so the same script
//! always produces the same report.

use crate::balances::BalanceTransfer;
use crate::clock::LogicalClock;
use crate::config::{ArenaConfig, ConfigError};
use crate::engine::InMemoryEngine;
use crate::error::ArenaError;
use crate::escrow::{EscrowRecord, SettlementReceipt};
use crate::lobby::QueueOutcome;
use crate::match_state::MatchState;
use crate::types::{Amount, CompetitionId, MatchId, PlayerId};
use derive_getters::Getters;
use derive_more::{Display, Error, From};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{debug, info, instrument, warn};

/// One scripted action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ScriptStep {
    /// `player` drops a disc into `column`.
    Move {
        /// Signer identity.
        player: PlayerId,
        /// Target column.
        column: usize,
    },
    /// The logical clock moves forward.
    Advance {
        /// Blocks to advance.
        blocks: u64,
    },
    /// `player` claims the opponent timed out.
    ClaimTimeout {
        /// Signer identity.
        player: PlayerId,
    },
    /// `session_key` starts acting for `owner`.
    Delegate {
        /// Delegating player.
        owner: PlayerId,
        /// Key that will sign for them.
        session_key: PlayerId,
    },
}

impl std::fmt::Display for ScriptStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScriptStep::Move { player, column } => write!(f, "{} plays column {}", player, column),
            ScriptStep::Advance { blocks } => write!(f, "advance {} blocks", blocks),
            ScriptStep::ClaimTimeout { player } => write!(f, "{} claims timeout", player),
            ScriptStep::Delegate { owner, session_key } => {
                write!(f, "{} delegates to {}", owner, session_key)
            }
        }
    }
}

/// A scripted match between two players.
#[derive(Debug, Clone, PartialEq, Eq, Getters, Serialize, Deserialize)]
pub struct MatchScript {
    /// Competition to queue in; the configured default when absent.
    #[serde(default)]
    competition: Option<CompetitionId>,
    /// Players in queue order. The first one moves first.
    players: [PlayerId; 2],
    /// Amount minted to each player; the participation fee when absent.
    #[serde(default)]
    fund: Option<Amount>,
    /// Steps applied after pairing.
    #[serde(default)]
    steps: Vec<ScriptStep>,
}

impl MatchScript {
    /// Creates a script with default competition and funding.
    pub fn new(players: [PlayerId; 2], steps: Vec<ScriptStep>) -> Self {
        Self {
            competition: None,
            players,
            fund: None,
            steps,
        }
    }

    /// Loads a script, as JSON for `.json` files and TOML otherwise.
    #[instrument(skip(path), fields(path = %path.as_ref().display()))]
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ScriptError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| ScriptError::new(format!("Failed to read script: {}", e)))?;
        let script = if path.extension().is_some_and(|ext| ext == "json") {
            Self::from_json(&content)?
        } else {
            Self::from_toml(&content)?
        };
        debug!(steps = script.steps.len(), "Script loaded");
        Ok(script)
    }

    /// Parses a TOML script.
    pub fn from_toml(content: &str) -> Result<Self, ScriptError> {
        toml::from_str(content)
            .map_err(|e| ScriptError::new(format!("Failed to parse TOML script: {}", e)))
    }

    /// Parses a JSON script.
    pub fn from_json(content: &str) -> Result<Self, ScriptError> {
        serde_json::from_str(content)
            .map_err(|e| ScriptError::new(format!("Failed to parse JSON script: {}", e)))
    }
}

/// A step the engine refused.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RejectedStep {
    /// Zero-based index into the script's steps.
    pub index: usize,
    /// The step.
    pub step: ScriptStep,
    /// Why it was refused.
    pub error: String,
}

/// Where a replayed match ended up.
#[derive(Debug, Clone, PartialEq, Eq, Getters, Serialize, Deserialize)]
pub struct ReplayReport {
    /// Match the players were paired into.
    match_id: MatchId,
    /// Final match state.
    state: MatchState,
    /// Final escrow record.
    escrow: Option<EscrowRecord>,
    /// Settlement, if the match ended.
    settlement: Option<SettlementReceipt>,
    /// Steps that were accepted.
    applied: usize,
    /// Steps that were refused.
    rejected: Vec<RejectedStep>,
    /// Balances of both players after the last step.
    balances: BTreeMap<PlayerId, Amount>,
    /// Logical height after the last step.
    height: u64,
}

impl ReplayReport {
    /// Human-readable summary.
    pub fn render(&self) -> String {
        let mut out = format!("Match {}: {}\n\n", self.match_id, self.state.phase());
        out.push_str(&self.state.board().display());
        out.push_str(&format!(
            "\nMoves: {:?}\nApplied steps: {}\n",
            self.state.moves(),
            self.applied
        ));
        for rejected in &self.rejected {
            out.push_str(&format!(
                "Rejected step {} ({}): {}\n",
                rejected.index, rejected.step, rejected.error
            ));
        }
        if let Some(receipt) = &self.settlement {
            for payout in receipt.payouts() {
                out.push_str(&format!("Paid {} to {}\n", payout.amount, payout.recipient));
            }
            out.push_str(&format!("Retained in escrow: {}\n", receipt.retained()));
        }
        for (player, balance) in &self.balances {
            out.push_str(&format!("Balance {}: {}\n", player, balance));
        }
        out
    }
}

/// Script loading error.
#[derive(Debug, Clone, Display, Error)]
#[display("Script error: {} at {}:{}", message, file, line)]
pub struct ScriptError {
    /// Error message.
    pub message: String,
    /// Line number where error occurred.
    pub line: u32,
    /// Source file where error occurred.
    pub file: &'static str,
}

impl ScriptError {
    /// Creates a new script error.
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

/// Why a replay could not run.
#[derive(Debug, Clone, Display, Error, From)]
pub enum ReplayError {
    /// The configuration was rejected.
    #[display("{}", _0)]
    Config(ConfigError),
    /// The script is malformed.
    #[display("{}", _0)]
    Script(ScriptError),
    /// Setting up the match failed.
    #[display("Match setup failed: {}", _0)]
    Setup(ArenaError),
}

/// Runs a script on a fresh in-memory engine.
#[instrument(skip_all, fields(steps = script.steps.len()))]
pub fn replay(config: &ArenaConfig, script: &MatchScript) -> Result<ReplayReport, ReplayError> {
    let mut engine = InMemoryEngine::in_memory(config.clone())?;
    let competition = script
        .competition
        .clone()
        .unwrap_or_else(|| config.default_competition().clone());
    let fund = script.fund.unwrap_or(*config.participation_fee());
    let [first, second] = &script.players;
    if first == second {
        return Err(ScriptError::new("A script needs two distinct players").into());
    }

    for player in &script.players {
        engine.bank_mut().mint(player, fund);
    }
    engine.join_queue(&competition, first)?;
    let match_id = match engine.join_queue(&competition, second)? {
        QueueOutcome::Paired { match_id, .. } => match_id,
        QueueOutcome::Queued { .. } => {
            return Err(ScriptError::new("Players were not paired").into());
        }
    };
    info!(%match_id, "Replay match started");

    let mut settlement = None;
    let mut applied = 0;
    let mut rejected = Vec::new();
    for (index, step) in script.steps.iter().enumerate() {
        let result = match step {
            ScriptStep::Move { player, column } => engine
                .submit_move(match_id, *column, player)
                .map(|outcome| outcome.settlement),
            ScriptStep::Advance { blocks } => {
                engine.clock().advance(*blocks);
                Ok(None)
            }
            ScriptStep::ClaimTimeout { player } => {
                engine.prove_opponent_timeout(match_id, player).map(Some)
            }
            ScriptStep::Delegate { owner, session_key } => {
                engine
                    .sessions_mut()
                    .delegate(session_key.clone(), owner.clone());
                Ok(None)
            }
        };
        match result {
            Ok(receipt) => {
                applied += 1;
                if receipt.is_some() {
                    settlement = receipt;
                }
            }
            Err(error) => {
                warn!(index, %step, %error, "Step rejected");
                rejected.push(RejectedStep {
                    index,
                    step: step.clone(),
                    error: error.to_string(),
                });
            }
        }
    }

    let state = engine
        .get_match(match_id)
        .ok_or_else(|| ScriptError::new(format!("Match {} disappeared", match_id)))?;
    let balances = script
        .players
        .iter()
        .map(|player| (player.clone(), engine.bank().balance_of(player)))
        .collect();
    let height = engine.clock().height();

    info!(phase = %state.phase(), applied, rejected = rejected.len(), "Replay finished");
    Ok(ReplayReport {
        match_id,
        escrow: engine.escrow(match_id),
        state,
        settlement,
        applied,
        rejected,
        balances,
        height,
    })
}
