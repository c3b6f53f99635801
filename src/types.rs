//! Identifier and amount types shared across the arena.

use derive_more::{Display, From};
use serde::{Deserialize, Serialize};

/// Smallest indivisible unit of stake.
pub type Amount = u64;

/// Opaque participant identity (a signer key, account name, ...).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Display, From, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlayerId(String);

impl PlayerId {
    /// Creates a player identity.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the identity as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for PlayerId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// Match identifier, shared by the lobby, match state and escrow record.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Display, From, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct MatchId(u64);

impl MatchId {
    /// Reserved no-op slot. Never assigned to a real match.
    pub const SENTINEL: MatchId = MatchId(0);

    /// Creates a match id.
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Raw numeric value.
    pub fn value(self) -> u64 {
        self.0
    }

    /// Returns true for the reserved sentinel slot.
    pub fn is_sentinel(self) -> bool {
        self == Self::SENTINEL
    }

    /// The id following this one.
    pub fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

/// Name of a competition queue.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Display, From, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CompetitionId(String);

impl CompetitionId {
    /// Creates a competition id.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for CompetitionId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}
