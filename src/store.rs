//! Persistent state maps used by the engine.
//!
//! The engine never owns a global map; it is handed an [`ArenaStore`]
//! and reads/writes whole records through it. Records are returned by
//! value so a caller can stage changes on a copy.

use crate::escrow::EscrowRecord;
use crate::match_state::MatchState;
use crate::types::{MatchId, PlayerId};
use std::collections::BTreeMap;
use tracing::{debug, instrument};

/// Key-value storage for matches, escrows and active-match pointers.
pub trait ArenaStore {
    /// Loads a match.
    fn get_match(&self, id: MatchId) -> Option<MatchState>;

    /// Stores a match, replacing any previous record.
    fn put_match(&mut self, state: MatchState);

    /// All stored match ids in ascending order.
    fn match_ids(&self) -> Vec<MatchId>;

    /// Loads an escrow record.
    fn get_escrow(&self, id: MatchId) -> Option<EscrowRecord>;

    /// Stores an escrow record, replacing any previous record.
    fn put_escrow(&mut self, record: EscrowRecord);

    /// The player's active match, if any.
    fn active_match(&self, player: &PlayerId) -> Option<MatchId>;

    /// Sets or clears the player's active match.
    fn set_active_match(&mut self, player: &PlayerId, id: Option<MatchId>);
}

/// In-memory store backed by ordered maps.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    matches: BTreeMap<MatchId, MatchState>,
    escrows: BTreeMap<MatchId, EscrowRecord>,
    active: BTreeMap<PlayerId, MatchId>,
}

impl InMemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl ArenaStore for InMemoryStore {
    fn get_match(&self, id: MatchId) -> Option<MatchState> {
        self.matches.get(&id).cloned()
    }

    #[instrument(level = "debug", skip(self, state), fields(match_id = %state.match_id()))]
    fn put_match(&mut self, state: MatchState) {
        self.matches.insert(*state.match_id(), state);
        debug!("Match stored");
    }

    fn match_ids(&self) -> Vec<MatchId> {
        self.matches.keys().copied().collect()
    }

    fn get_escrow(&self, id: MatchId) -> Option<EscrowRecord> {
        self.escrows.get(&id).cloned()
    }

    #[instrument(level = "debug", skip(self, record), fields(match_id = %record.match_id()))]
    fn put_escrow(&mut self, record: EscrowRecord) {
        self.escrows.insert(*record.match_id(), record);
        debug!("Escrow stored");
    }

    fn active_match(&self, player: &PlayerId) -> Option<MatchId> {
        self.active.get(player).copied()
    }

    fn set_active_match(&mut self, player: &PlayerId, id: Option<MatchId>) {
        match id {
            Some(id) => {
                self.active.insert(player.clone(), id);
            }
            None => {
                self.active.remove(player);
            }
        }
    }
}
