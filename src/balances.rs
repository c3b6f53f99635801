//! Balance transfer primitive used for stake collection and payouts.

use crate::error::ValidationError;
use crate::types::{Amount, PlayerId};
use std::collections::BTreeMap;
use tracing::{debug, instrument, warn};

/// Moves funds between player balances and escrow.
pub trait BalanceTransfer {
    /// Current balance of `player`.
    fn balance_of(&self, player: &PlayerId) -> Amount;

    /// Takes `amount` from `player`.
    ///
    /// # Errors
    ///
    /// [`ValidationError::InsufficientFunds`] if the balance is too low;
    /// nothing is taken in that case.
    fn debit(&mut self, player: &PlayerId, amount: Amount) -> Result<(), ValidationError>;

    /// Gives `amount` to `player`.
    fn credit(&mut self, player: &PlayerId, amount: Amount);
}

/// In-memory balances.
#[derive(Debug, Clone, Default)]
pub struct InMemoryBalances {
    balances: BTreeMap<PlayerId, Amount>,
}

impl InMemoryBalances {
    /// Creates an empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates `amount` out of thin air for `player`. Setup only.
    #[instrument(skip(self))]
    pub fn mint(&mut self, player: &PlayerId, amount: Amount) {
        let balance = self.balances.entry(player.clone()).or_default();
        *balance = balance.saturating_add(amount);
        debug!(balance = *balance, "Minted");
    }

    /// Snapshot of every non-zero balance.
    pub fn snapshot(&self) -> BTreeMap<PlayerId, Amount> {
        self.balances
            .iter()
            .filter(|(_, amount)| **amount > 0)
            .map(|(player, amount)| (player.clone(), *amount))
            .collect()
    }
}

impl BalanceTransfer for InMemoryBalances {
    fn balance_of(&self, player: &PlayerId) -> Amount {
        self.balances.get(player).copied().unwrap_or(0)
    }

    #[instrument(skip(self))]
    fn debit(&mut self, player: &PlayerId, amount: Amount) -> Result<(), ValidationError> {
        let available = self.balance_of(player);
        if available < amount {
            warn!(available, "Debit refused");
            return Err(ValidationError::InsufficientFunds {
                player: player.clone(),
                required: amount,
                available,
            });
        }
        self.balances.insert(player.clone(), available - amount);
        debug!(balance = available - amount, "Debited");
        Ok(())
    }

    #[instrument(skip(self))]
    fn credit(&mut self, player: &PlayerId, amount: Amount) {
        let balance = self.balances.entry(player.clone()).or_default();
        *balance = balance.saturating_add(amount);
        debug!(balance = *balance, "Credited");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debit_and_credit() {
        let mut bank = InMemoryBalances::new();
        let alice = PlayerId::from("alice");
        bank.mint(&alice, 100);
        bank.debit(&alice, 40).unwrap();
        bank.credit(&alice, 5);
        assert_eq!(bank.balance_of(&alice), 65);
    }

    #[test]
    fn test_overdraw_leaves_balance_untouched() {
        let mut bank = InMemoryBalances::new();
        let bob = PlayerId::from("bob");
        bank.mint(&bob, 10);
        let err = bank.debit(&bob, 11).unwrap_err();
        assert!(matches!(err, ValidationError::InsufficientFunds { available: 10, .. }));
        assert_eq!(bank.balance_of(&bob), 10);
    }

    #[test]
    fn test_snapshot_skips_empty_accounts() {
        let mut bank = InMemoryBalances::new();
        bank.mint(&"a".into(), 3);
        bank.mint(&"b".into(), 0);
        let snapshot = bank.snapshot();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot.get(&PlayerId::from("a")), Some(&3));
    }
}
