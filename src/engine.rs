//! Match engine: matchmaking entry, move submission, forfeiture and settlement.
//!
//! Every mutating call follows the same shape: resolve the sender, load
//! the match, check preconditions, apply the transition to a copy, check
//! postconditions, then persist. A call that fails any check returns
//! before the first write, so rejected calls never change state.

use crate::balances::{BalanceTransfer, InMemoryBalances};
use crate::clock::{LogicalClock, ManualClock};
use crate::config::{ArenaConfig, ConfigError, DrawPolicy};
use crate::contracts::{Contract, MoveContract, MoveRequest, TimeoutClaim, TimeoutContract};
use crate::error::{ArenaResult, InvariantViolation, ValidationError};
use crate::escrow::{EscrowLedger, EscrowRecord, PayoutPlan, SettlementReceipt};
use crate::lobby::{Competition, Lobby, LobbyManager, QueueEntry, QueueOutcome};
use crate::match_state::{MatchPhase, MatchState};
use crate::session::{SessionRegistry, SessionResolver};
use crate::store::{ArenaStore, InMemoryStore};
use crate::types::{CompetitionId, MatchId, PlayerId};
use serde::{Deserialize, Serialize};
use strictly_connect::{ConnectRules, is_draw};
use tracing::{debug, info, instrument, warn};

/// Result of an accepted move.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveOutcome {
    /// Row the disc landed on.
    pub row: usize,
    /// Column played.
    pub column: usize,
    /// Phase after the move.
    pub phase: MatchPhase,
    /// Settlement, if the move ended the match.
    pub settlement: Option<SettlementReceipt>,
}

/// Engine wired to the in-memory collaborators.
pub type InMemoryEngine = MatchEngine<InMemoryStore, SessionRegistry, ManualClock, InMemoryBalances>;

/// Drives matches from queue to settlement.
///
/// Generic over its collaborators: `S` stores state, `R` resolves session
/// keys, `C` supplies the logical height, `B` moves funds.
pub struct MatchEngine<S, R, C, B> {
    config: ArenaConfig,
    rules: ConnectRules,
    store: S,
    sessions: R,
    clock: C,
    bank: B,
    lobby: LobbyManager,
}

impl InMemoryEngine {
    /// Engine with empty in-memory collaborators and a clock at height 0.
    pub fn in_memory(config: ArenaConfig) -> Result<Self, ConfigError> {
        Self::new(
            config,
            InMemoryStore::new(),
            SessionRegistry::new(),
            ManualClock::default(),
            InMemoryBalances::new(),
        )
    }
}

impl<S, R, C, B> MatchEngine<S, R, C, B>
where
    S: ArenaStore,
    R: SessionResolver,
    C: LogicalClock,
    B: BalanceTransfer,
{
    /// Creates an engine and registers the default competition.
    #[instrument(skip_all)]
    pub fn new(
        config: ArenaConfig,
        store: S,
        sessions: R,
        clock: C,
        bank: B,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        let mut lobby = LobbyManager::new();
        lobby
            .register_competition(Competition::new(
                config.default_competition().clone(),
                config.default_competition().to_string(),
                *config.participation_fee(),
            ))
            .map_err(|e| ConfigError::new(format!("Default competition rejected: {}", e)))?;
        info!(rules = ?config.rules(), "Match engine ready");
        Ok(Self {
            rules: config.rules(),
            config,
            store,
            sessions,
            clock,
            bank,
            lobby,
        })
    }

    /// Active configuration.
    pub fn config(&self) -> &ArenaConfig {
        &self.config
    }

    /// The state store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// The session resolver.
    pub fn sessions(&self) -> &R {
        &self.sessions
    }

    /// Mutable session resolver, for registering delegations.
    pub fn sessions_mut(&mut self) -> &mut R {
        &mut self.sessions
    }

    /// The logical clock.
    pub fn clock(&self) -> &C {
        &self.clock
    }

    /// Balances.
    pub fn bank(&self) -> &B {
        &self.bank
    }

    /// Mutable balances, for funding players.
    pub fn bank_mut(&mut self) -> &mut B {
        &mut self.bank
    }

    /// The lobby manager.
    pub fn lobby(&self) -> &LobbyManager {
        &self.lobby
    }

    /// Adds a competition queue next to the default one, or replaces one.
    ///
    /// # Errors
    ///
    /// `FeeTooLarge`, or `CompetitionBusy` when the fee would change while
    /// players wait in that queue.
    pub fn register_competition(&mut self, competition: Competition) -> ArenaResult<()> {
        Ok(self.lobby.register_competition(competition)?)
    }

    /// Puts the sender in a competition queue, pairing them when an
    /// opponent is waiting.
    ///
    /// Pairing starts the match through [`MatchEngine::init_match`], which
    /// collects both participation fees. Waiting players who can no
    /// longer cover the fee are dropped from the queue when they would
    /// have been paired.
    ///
    /// # Errors
    ///
    /// `CompetitionNotFound`, `AlreadyQueued`, `AlreadyInMatch` or
    /// `InsufficientFunds`; nothing changes in those cases.
    #[instrument(skip(self), fields(player = tracing::field::Empty))]
    pub fn join_queue(
        &mut self,
        competition: &CompetitionId,
        identity: &PlayerId,
    ) -> ArenaResult<QueueOutcome> {
        let player = self.sessions.effective_sender(identity);
        tracing::Span::current().record("player", tracing::field::display(&player));

        let fee = *self
            .lobby
            .competition(competition)
            .inspect_err(|e| warn!(error = %e, "Join rejected"))?
            .participation_fee();
        self.lobby
            .ensure_not_queued(&player)
            .inspect_err(|e| warn!(error = %e, "Join rejected"))?;
        if let Some(match_id) = self.store.active_match(&player) {
            warn!(%match_id, "Join rejected: already in a match");
            return Err(ValidationError::AlreadyInMatch { player, match_id }.into());
        }
        let available = self.bank.balance_of(&player);
        if available < fee {
            warn!(available, fee, "Join rejected: insufficient funds");
            return Err(ValidationError::InsufficientFunds {
                player,
                required: fee,
                available,
            }
            .into());
        }

        let next_id = self.lobby.next_match_id();
        if self.lobby.queue_len(competition) > 0 && self.store.get_match(next_id).is_some() {
            warn!(%next_id, "Join rejected: next match id already in use");
            return Err(InvariantViolation::new(format!(
                "Match {} already exists for a new lobby",
                next_id
            ))
            .into());
        }

        while let Some(waiting) = self.lobby.front(competition) {
            if self.bank.balance_of(waiting.player()) >= fee {
                break;
            }
            if let Some(evicted) = self.lobby.pop_front(competition) {
                warn!(evicted = %evicted.player(), "Waiting player can no longer pay, dropped");
            }
        }

        let height = self.clock.height();
        let position = self
            .lobby
            .enqueue(QueueEntry::new(player.clone(), competition.clone(), fee, height))?;
        let Some((first, second)) = self.lobby.take_pair(competition)? else {
            info!(position, "Player queued");
            return Ok(QueueOutcome::Queued { position });
        };

        let lobby = self.lobby.form_lobby(first, second, height)?;
        let [first_player, _] = lobby.players().clone();
        let match_id = self.init_match(lobby, true)?;
        info!(%match_id, opponent = %first_player, "Players paired");
        Ok(QueueOutcome::Paired {
            match_id,
            opponent: first_player,
        })
    }

    /// Takes the sender out of their queue.
    #[instrument(skip(self))]
    pub fn leave_queue(&mut self, identity: &PlayerId) -> ArenaResult<QueueEntry> {
        let player = self.sessions.effective_sender(identity);
        Ok(self.lobby.leave(&player)?)
    }

    /// Collects both stakes and creates the match and escrow for a lobby.
    ///
    /// With `should_update` false nothing is written and
    /// [`MatchId::SENTINEL`] is returned. For a lobby whose match already
    /// exists the existing id is returned without writing or debiting.
    ///
    /// # Errors
    ///
    /// `FeeTooLarge` or `InsufficientFunds` for either player, checked
    /// before any balance moves. The escrow always holds exactly what was
    /// debited.
    #[instrument(skip(self, lobby), fields(match_id = %lobby.id()))]
    pub fn init_match(&mut self, lobby: Lobby, should_update: bool) -> ArenaResult<MatchId> {
        if !should_update {
            debug!("No-op initialisation");
            return Ok(MatchId::SENTINEL);
        }
        let match_id = *lobby.id();
        if match_id.is_sentinel() {
            return Err(InvariantViolation::new("Lobby was given the sentinel match id").into());
        }
        if self.store.get_match(match_id).is_some() {
            debug!("Match already initialised");
            return Ok(match_id);
        }
        let [player1, player2] = lobby.players().clone();
        if player1 == player2 {
            return Err(InvariantViolation::new(format!("{} paired with themselves", player1)).into());
        }
        if self.lobby.lobby(match_id).is_some() || self.lobby.is_retired(match_id) {
            return Err(InvariantViolation::new(format!("Lobby {} already tracked", match_id)).into());
        }
        if self.store.get_escrow(match_id).is_some() {
            warn!("Escrow exists for an uninitialised match");
            return Err(crate::error::EscrowError::EscrowAlreadyOpen { match_id }.into());
        }
        let fee = *lobby.participation_fee();
        let total_stake = lobby.total_stake().ok_or(ValidationError::FeeTooLarge {
            participation_fee: fee,
        })?;
        for staker in [&player1, &player2] {
            let available = self.bank.balance_of(staker);
            if available < fee {
                warn!(%staker, available, fee, "Stake cannot be collected");
                return Err(ValidationError::InsufficientFunds {
                    player: staker.clone(),
                    required: fee,
                    available,
                }
                .into());
            }
        }

        let height = self.clock.height();
        let state = MatchState::new(
            match_id,
            lobby.competition().clone(),
            player1.clone(),
            player2.clone(),
            &self.rules,
            height,
        );
        self.bank.debit(&player1, fee)?;
        self.bank.debit(&player2, fee)?;
        EscrowLedger::new(&mut self.store, &mut self.bank).open(match_id, total_stake)?;
        self.store.put_match(state);
        self.store.set_active_match(&player1, Some(match_id));
        self.store.set_active_match(&player2, Some(match_id));
        self.lobby.track(lobby)?;

        info!(%player1, %player2, height, total_stake, "Match created");
        Ok(match_id)
    }

    /// Drops the sender's disc into `column`.
    ///
    /// # Errors
    ///
    /// `GameNotFound`, `GameAlreadyEnded`, `NotYourTurn`, `InvalidColumn`
    /// or `ColumnFull`, checked in that order. None of them change state.
    #[instrument(skip(self), fields(player = tracing::field::Empty))]
    pub fn submit_move(
        &mut self,
        match_id: MatchId,
        column: usize,
        identity: &PlayerId,
    ) -> ArenaResult<MoveOutcome> {
        let player = self.sessions.effective_sender(identity);
        tracing::Span::current().record("player", tracing::field::display(&player));

        let before = self.load(match_id)?;
        let request = MoveRequest::new(player, column);
        MoveContract::pre(&before, &request).inspect_err(|e| warn!(error = %e, "Move rejected"))?;

        let mut after = before.clone();
        let seat = after.current_seat();
        let row = after.apply_drop(column)?;
        let has_won = after.board().check_win(seat, row, column, *after.connect());
        if has_won {
            after.set_phase(MatchPhase::Won {
                winner: request.player.clone(),
            });
        } else if is_draw(after.board(), has_won) {
            after.set_phase(MatchPhase::Draw);
        } else {
            after.pass_turn();
        }
        after.stamp_activity(self.clock.height());

        if cfg!(debug_assertions) {
            MoveContract::post(&before, &after)?;
        }
        debug!(row, phase = %after.phase(), "Move applied");

        let settlement = self.persist(after.clone())?;
        Ok(MoveOutcome {
            row,
            column,
            phase: after.phase().clone(),
            settlement,
        })
    }

    /// Ends the match in the sender's favour because the current mover
    /// has been idle for more than `timeout_blocks`.
    ///
    /// # Errors
    ///
    /// `GameNotFound`, `GameAlreadyEnded`, `NotAParticipant`,
    /// `CallerIsCurrentMover` or `TimeoutNotElapsed`. None of them change
    /// state.
    #[instrument(skip(self), fields(player = tracing::field::Empty))]
    pub fn prove_opponent_timeout(
        &mut self,
        match_id: MatchId,
        identity: &PlayerId,
    ) -> ArenaResult<SettlementReceipt> {
        let player = self.sessions.effective_sender(identity);
        tracing::Span::current().record("player", tracing::field::display(&player));

        let before = self.load(match_id)?;
        let height = self.clock.height();
        let claim = TimeoutClaim::new(player, height, *self.config.timeout_blocks());
        TimeoutContract::pre(&before, &claim)
            .inspect_err(|e| warn!(error = %e, "Timeout claim rejected"))?;

        let mut after = before.clone();
        after.set_phase(MatchPhase::TimedOut {
            loser: before.current_mover().clone(),
        });
        after.stamp_activity(height);
        if cfg!(debug_assertions) {
            TimeoutContract::post(&before, &after)?;
        }

        self.persist(after)?.ok_or_else(|| {
            InvariantViolation::new("Forfeited match produced no settlement").into()
        })
    }

    /// Loads a match for observers.
    pub fn get_match(&self, match_id: MatchId) -> Option<MatchState> {
        self.store.get_match(match_id)
    }

    /// All match ids in ascending order.
    pub fn match_ids(&self) -> Vec<MatchId> {
        self.store.match_ids()
    }

    /// Escrow record of a match.
    pub fn escrow(&self, match_id: MatchId) -> Option<EscrowRecord> {
        self.store.get_escrow(match_id)
    }

    /// Active match of a player.
    pub fn active_match(&self, player: &PlayerId) -> Option<MatchId> {
        self.store.active_match(player)
    }

    /// Competition and 1-based position of a waiting player.
    pub fn queue_position(&self, player: &PlayerId) -> Option<(CompetitionId, usize)> {
        self.lobby.queue_position(player)
    }

    /// Number of players waiting in a competition.
    pub fn queue_len(&self, competition: &CompetitionId) -> usize {
        self.lobby.queue_len(competition)
    }

    fn load(&self, match_id: MatchId) -> ArenaResult<MatchState> {
        self.store.get_match(match_id).ok_or_else(|| {
            warn!(%match_id, "Match not found");
            ValidationError::GameNotFound { match_id }.into()
        })
    }

    /// How the escrow of an ended match is paid out.
    fn payout_plan(&self, state: &MatchState) -> PayoutPlan {
        match state.phase() {
            MatchPhase::Won { winner } => {
                PayoutPlan::winner_takes(winner.clone(), *self.config.win_share())
            }
            MatchPhase::TimedOut { .. } => match state.winner() {
                Some(claimant) => {
                    PayoutPlan::winner_takes(claimant.clone(), *self.config.forfeit_share())
                }
                None => PayoutPlan::retain_all(),
            },
            MatchPhase::Draw => match self.config.draw_policy() {
                DrawPolicy::RefundBoth => {
                    PayoutPlan::split_between(state.player1().clone(), state.player2().clone())
                }
                DrawPolicy::ZeroShare => PayoutPlan::retain_all(),
            },
            MatchPhase::Active => PayoutPlan::retain_all(),
        }
    }

    /// Writes the new state and, if it ended the match, settles the escrow,
    /// clears both active pointers and retires the lobby.
    fn persist(&mut self, state: MatchState) -> ArenaResult<Option<SettlementReceipt>> {
        let match_id = *state.match_id();
        if !state.ended() {
            self.store.put_match(state);
            return Ok(None);
        }

        EscrowLedger::new(&mut self.store, &mut self.bank).ensure_settleable(match_id)?;
        let plan = self.payout_plan(&state);
        let players = [state.player1().clone(), state.player2().clone()];
        let phase = state.phase().clone();
        self.store.put_match(state);

        let receipt = EscrowLedger::new(&mut self.store, &mut self.bank).settle(match_id, &plan)?;
        for player in &players {
            self.store.set_active_match(player, None);
        }
        self.lobby.on_lobby_end(match_id)?;

        info!(
            %match_id,
            %phase,
            paid_out = receipt.paid_out(),
            retained = receipt.retained(),
            "Match ended"
        );
        Ok(Some(receipt))
    }
}
