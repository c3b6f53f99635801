//! Lobby formation and FIFO matchmaking.
//!
//! Players wait in per-competition queues. As soon as a queue holds two
//! entries the two longest-waiting ones are paired into a [`Lobby`],
//! which lives until its match ends and is then retired exactly once.
//!
//! The manager only tracks queues and lobbies. Stake collection and
//! match creation are driven by the engine, which owns the balances and
//! the store.

use crate::error::{InvariantViolation, ValidationError};
use crate::types::{Amount, CompetitionId, MatchId, PlayerId};
use derive_getters::Getters;
use derive_new::new;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, VecDeque};
use tracing::{debug, info, instrument, warn};

/// A named queue with a fixed participation fee.
#[derive(Debug, Clone, PartialEq, Eq, Getters, Serialize, Deserialize, new)]
pub struct Competition {
    /// Competition id.
    id: CompetitionId,
    /// Display name.
    name: String,
    /// Stake each player puts into escrow.
    participation_fee: Amount,
}

/// A player waiting to be paired.
#[derive(Debug, Clone, PartialEq, Eq, Getters, Serialize, Deserialize, new)]
pub struct QueueEntry {
    /// Waiting player.
    player: PlayerId,
    /// Competition queue.
    competition: CompetitionId,
    /// Fee the player will stake.
    participation_fee: Amount,
    /// Logical height at which the player joined.
    enqueued_at: u64,
}

/// Two paired players and the match they will play.
#[derive(Debug, Clone, PartialEq, Eq, Getters, Serialize, Deserialize)]
pub struct Lobby {
    /// Id shared with the match and its escrow.
    id: MatchId,
    /// Competition the pair came from.
    competition: CompetitionId,
    /// Players in seat order; the longest-waiting player moves first.
    players: [PlayerId; 2],
    /// Stake per player.
    participation_fee: Amount,
    /// Logical height at which the lobby formed.
    created_at: u64,
}

impl Lobby {
    /// Builds a lobby directly. Matchmaking normally does this.
    pub fn new(
        id: MatchId,
        competition: CompetitionId,
        players: [PlayerId; 2],
        participation_fee: Amount,
        created_at: u64,
    ) -> Self {
        Self {
            id,
            competition,
            players,
            participation_fee,
            created_at,
        }
    }

    /// Combined stake of both players, or `None` if it overflows.
    pub fn total_stake(&self) -> Option<Amount> {
        self.participation_fee.checked_mul(2)
    }
}

/// Result of joining a queue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum QueueOutcome {
    /// The player waits at `position` (1-based) in the queue.
    Queued {
        /// Position in the queue.
        position: usize,
    },
    /// The player was paired and the match has started.
    Paired {
        /// New match id.
        match_id: MatchId,
        /// The other player.
        opponent: PlayerId,
    },
}

/// Queues, live lobbies and the match id counter.
#[derive(Debug, Clone)]
pub struct LobbyManager {
    competitions: BTreeMap<CompetitionId, Competition>,
    queues: BTreeMap<CompetitionId, VecDeque<QueueEntry>>,
    lobbies: BTreeMap<MatchId, Lobby>,
    retired: BTreeSet<MatchId>,
    next_match_id: MatchId,
}

impl Default for LobbyManager {
    fn default() -> Self {
        Self {
            competitions: BTreeMap::new(),
            queues: BTreeMap::new(),
            lobbies: BTreeMap::new(),
            retired: BTreeSet::new(),
            // 0 is the sentinel slot
            next_match_id: MatchId::SENTINEL.next(),
        }
    }
}

impl LobbyManager {
    /// Creates a manager with no competitions.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers or replaces a competition.
    ///
    /// # Errors
    ///
    /// `FeeTooLarge` if two stakes of the fee overflow, `CompetitionBusy`
    /// if the fee would change while players wait in the queue. Waiting
    /// entries carry the fee they were admitted with.
    #[instrument(skip(self, competition), fields(competition = %competition.id()))]
    pub fn register_competition(
        &mut self,
        competition: Competition,
    ) -> Result<(), ValidationError> {
        if competition.participation_fee.checked_mul(2).is_none() {
            warn!(fee = competition.participation_fee, "Competition rejected");
            return Err(ValidationError::FeeTooLarge {
                participation_fee: competition.participation_fee,
            });
        }
        let waiting = self.queue_len(&competition.id);
        let fee_changes = self
            .competitions
            .get(&competition.id)
            .is_some_and(|current| current.participation_fee != competition.participation_fee);
        if fee_changes && waiting > 0 {
            warn!(waiting, "Fee change refused");
            return Err(ValidationError::CompetitionBusy {
                competition: competition.id.clone(),
                waiting,
            });
        }
        info!(fee = competition.participation_fee, "Competition registered");
        self.queues.entry(competition.id.clone()).or_default();
        self.competitions.insert(competition.id.clone(), competition);
        Ok(())
    }

    /// Looks up a competition.
    pub fn competition(&self, id: &CompetitionId) -> Result<&Competition, ValidationError> {
        self.competitions
            .get(id)
            .ok_or_else(|| ValidationError::CompetitionNotFound {
                competition: id.clone(),
            })
    }

    /// Registered competitions in id order.
    pub fn competitions(&self) -> impl Iterator<Item = &Competition> {
        self.competitions.values()
    }

    /// Fails with `AlreadyQueued` if `player` waits in any queue.
    pub fn ensure_not_queued(&self, player: &PlayerId) -> Result<(), ValidationError> {
        if self.queue_position(player).is_some() {
            return Err(ValidationError::AlreadyQueued {
                player: player.clone(),
            });
        }
        Ok(())
    }

    /// Appends an entry to its competition queue and returns its 1-based position.
    #[instrument(skip(self, entry), fields(player = %entry.player, competition = %entry.competition))]
    pub fn enqueue(&mut self, entry: QueueEntry) -> Result<usize, ValidationError> {
        self.competition(&entry.competition)?;
        self.ensure_not_queued(&entry.player)?;
        let queue = self.queues.entry(entry.competition.clone()).or_default();
        queue.push_back(entry);
        debug!(position = queue.len(), "Player queued");
        Ok(queue.len())
    }

    /// Longest-waiting entry of a competition.
    pub fn front(&self, competition: &CompetitionId) -> Option<&QueueEntry> {
        self.queues.get(competition).and_then(VecDeque::front)
    }

    /// Removes the longest-waiting entry of a competition.
    pub fn pop_front(&mut self, competition: &CompetitionId) -> Option<QueueEntry> {
        self.queues.get_mut(competition).and_then(VecDeque::pop_front)
    }

    /// Id the next formed lobby will get.
    pub fn next_match_id(&self) -> MatchId {
        self.next_match_id
    }

    /// Removes the two longest-waiting entries if the queue holds two.
    ///
    /// # Errors
    ///
    /// An [`InvariantViolation`] if both entries belong to the same
    /// player. The queue is left untouched in that case.
    #[instrument(skip(self))]
    pub fn take_pair(
        &mut self,
        competition: &CompetitionId,
    ) -> Result<Option<(QueueEntry, QueueEntry)>, InvariantViolation> {
        let Some(queue) = self.queues.get_mut(competition) else {
            return Ok(None);
        };
        if queue.len() < 2 {
            return Ok(None);
        }
        if queue[0].player == queue[1].player {
            return Err(InvariantViolation::new(format!(
                "{} queued twice in {}",
                queue[0].player, competition
            )));
        }
        match (queue.pop_front(), queue.pop_front()) {
            (Some(first), Some(second)) => {
                debug!(first = %first.player, second = %second.player, "Pair taken");
                Ok(Some((first, second)))
            }
            _ => Err(InvariantViolation::new("Queue shrank while pairing")),
        }
    }

    /// Turns a pair into a lobby with the next match id.
    ///
    /// The lobby is not tracked until [`LobbyManager::track`] is called.
    #[instrument(skip(self, first, second), fields(first = %first.player, second = %second.player))]
    pub fn form_lobby(
        &mut self,
        first: QueueEntry,
        second: QueueEntry,
        height: u64,
    ) -> Result<Lobby, InvariantViolation> {
        if first.player == second.player {
            return Err(InvariantViolation::new(format!(
                "{} paired with themselves",
                first.player
            )));
        }
        if first.participation_fee != second.participation_fee {
            return Err(InvariantViolation::new(format!(
                "{} and {} were queued at different fees",
                first.player, second.player
            )));
        }
        let id = self.next_match_id;
        self.next_match_id = id.next();
        let lobby = Lobby::new(
            id,
            first.competition,
            [first.player, second.player],
            first.participation_fee,
            height,
        );
        info!(match_id = %id, "Lobby formed");
        Ok(lobby)
    }

    /// Records a lobby as live.
    #[instrument(skip(self, lobby), fields(match_id = %lobby.id))]
    pub fn track(&mut self, lobby: Lobby) -> Result<(), InvariantViolation> {
        if self.lobbies.contains_key(&lobby.id) || self.retired.contains(&lobby.id) {
            return Err(InvariantViolation::new(format!(
                "Lobby {} tracked twice",
                lobby.id
            )));
        }
        if lobby.id >= self.next_match_id {
            self.next_match_id = lobby.id.next();
        }
        self.lobbies.insert(lobby.id, lobby);
        Ok(())
    }

    /// Retires the lobby of an ended match.
    ///
    /// # Errors
    ///
    /// An [`InvariantViolation`] if the lobby was already retired or was
    /// never tracked.
    #[instrument(skip(self))]
    pub fn on_lobby_end(&mut self, match_id: MatchId) -> Result<Lobby, InvariantViolation> {
        if self.retired.contains(&match_id) {
            warn!("Lobby torn down twice");
            return Err(InvariantViolation::new(format!(
                "Lobby {} already torn down",
                match_id
            )));
        }
        let lobby = self
            .lobbies
            .remove(&match_id)
            .ok_or_else(|| InvariantViolation::new(format!("No live lobby for {}", match_id)))?;
        self.retired.insert(match_id);
        info!("Lobby retired");
        Ok(lobby)
    }

    /// Takes a waiting player out of their queue.
    #[instrument(skip(self))]
    pub fn leave(&mut self, player: &PlayerId) -> Result<QueueEntry, ValidationError> {
        for queue in self.queues.values_mut() {
            if let Some(index) = queue.iter().position(|e| e.player == *player) {
                if let Some(entry) = queue.remove(index) {
                    info!(competition = %entry.competition, "Player left queue");
                    return Ok(entry);
                }
            }
        }
        warn!("Player not queued");
        Err(ValidationError::NotQueued {
            player: player.clone(),
        })
    }

    /// Competition and 1-based position of a waiting player.
    pub fn queue_position(&self, player: &PlayerId) -> Option<(CompetitionId, usize)> {
        self.queues.iter().find_map(|(competition, queue)| {
            queue
                .iter()
                .position(|e| e.player == *player)
                .map(|index| (competition.clone(), index + 1))
        })
    }

    /// Number of players waiting in a competition.
    pub fn queue_len(&self, competition: &CompetitionId) -> usize {
        self.queues.get(competition).map_or(0, VecDeque::len)
    }

    /// Live lobby for a match.
    pub fn lobby(&self, match_id: MatchId) -> Option<&Lobby> {
        self.lobbies.get(&match_id)
    }

    /// Returns true once the match's lobby has been retired.
    pub fn is_retired(&self, match_id: MatchId) -> bool {
        self.retired.contains(&match_id)
    }
}
