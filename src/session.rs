//! Session delegation: resolving a signer to the identity it acts for.

use crate::types::PlayerId;
use std::collections::BTreeMap;
use tracing::{debug, info, instrument, warn};

/// Resolves a raw signer identity to the effective sender.
pub trait SessionResolver {
    /// Returns the identity `signer` acts for: the delegating owner when
    /// `signer` is a registered session key, otherwise `signer` itself.
    fn effective_sender(&self, signer: &PlayerId) -> PlayerId;
}

/// In-memory registry of session keys.
#[derive(Debug, Clone, Default)]
pub struct SessionRegistry {
    delegations: BTreeMap<PlayerId, PlayerId>,
}

impl SessionRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Lets `session_key` act on behalf of `owner`, replacing any previous
    /// delegation of that key.
    #[instrument(skip(self))]
    pub fn delegate(&mut self, session_key: PlayerId, owner: PlayerId) {
        if let Some(previous) = self.delegations.insert(session_key, owner) {
            warn!(%previous, "Session key re-delegated");
        }
        info!("Session key registered");
    }

    /// Revokes a session key. Returns the owner it acted for.
    #[instrument(skip(self))]
    pub fn revoke(&mut self, session_key: &PlayerId) -> Option<PlayerId> {
        let owner = self.delegations.remove(session_key);
        debug!(revoked = owner.is_some(), "Session key revoked");
        owner
    }
}

impl SessionResolver for SessionRegistry {
    fn effective_sender(&self, signer: &PlayerId) -> PlayerId {
        self.delegations
            .get(signer)
            .cloned()
            .unwrap_or_else(|| signer.clone())
    }
}
