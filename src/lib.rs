//! Strictly Arena - stake-backed two-player matches.
//!
//! Players queue for a competition, get paired into a lobby, stake a
//! participation fee into escrow and play a gravity-drop connection game.
//! A win, a draw or a timeout forfeit ends the match and settles the
//! escrow automatically.
//!
//! Every transition is a deterministic function of stored state and
//! explicit inputs: the resolved sender and a logical clock height.
//! Storage, session resolution, time and balances are injected through
//! the traits in [`store`], [`session`], [`clock`] and [`balances`].
//!
//! ```
//! use strictly_arena::{ArenaConfig, CompetitionId, InMemoryEngine, MatchPhase, QueueOutcome};
//!
//! let mut engine = InMemoryEngine::in_memory(ArenaConfig::default()).unwrap();
//! engine.bank_mut().mint(&"alice".into(), 100);
//! engine.bank_mut().mint(&"bob".into(), 100);
//!
//! let global = CompetitionId::from("global");
//! engine.join_queue(&global, &"alice".into()).unwrap();
//! let QueueOutcome::Paired { match_id, .. } = engine.join_queue(&global, &"bob".into()).unwrap() else {
//!     unreachable!()
//! };
//!
//! for (player, column) in [("alice", 2), ("bob", 0), ("alice", 2), ("bob", 1), ("alice", 2), ("bob", 3)] {
//!     engine.submit_move(match_id, column, &player.into()).unwrap();
//! }
//! let outcome = engine.submit_move(match_id, 2, &"alice".into()).unwrap();
//! assert_eq!(outcome.phase, MatchPhase::Won { winner: "alice".into() });
//! ```

#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod balances;
pub mod clock;
pub mod config;
pub mod contracts;
pub mod engine;
pub mod error;
pub mod escrow;
pub mod invariants;
pub mod lobby;
pub mod match_state;
pub mod replay;
pub mod session;
pub mod store;
pub mod types;

pub use balances::{BalanceTransfer, InMemoryBalances};
pub use clock::{LogicalClock, ManualClock};
pub use config::{ArenaConfig, CONFIG_ENV_VAR, ConfigError, DrawPolicy};
pub use engine::{InMemoryEngine, MatchEngine, MoveOutcome};
pub use error::{ArenaError, ArenaResult, EscrowError, InvariantViolation, ValidationError};
pub use escrow::{
    Allocation, EscrowLedger, EscrowRecord, Payout, PayoutPlan, SettlementReceipt, Share,
    payout_amount,
};
pub use lobby::{Competition, Lobby, LobbyManager, QueueEntry, QueueOutcome};
pub use match_state::{MatchPhase, MatchState};
pub use replay::{
    MatchScript, RejectedStep, ReplayError, ReplayReport, ScriptError, ScriptStep, replay,
};
pub use session::{SessionRegistry, SessionResolver};
pub use store::{ArenaStore, InMemoryStore};
pub use types::{Amount, CompetitionId, MatchId, PlayerId};

pub use strictly_connect::{Board, Cell, ConnectRules, MoveError, Seat};
