//! Escrow ledger: stake accounting and payout.
//!
//! Every match holds its combined stake in one [`EscrowRecord`]. Settling
//! is the only way funds leave escrow and can happen once per match.
//!
//! Payouts are `floor(total_stake * numerator / denominator)` per
//! allocation. Whatever is not paid out (unallocated shares, rounding
//! dust) stays in the record as `retained`, so after settlement
//! `paid_out + retained == total_stake` always holds.

use crate::balances::BalanceTransfer;
use crate::error::EscrowError;
use crate::store::ArenaStore;
use crate::types::{Amount, MatchId, PlayerId};
use derive_getters::Getters;
use derive_new::new;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

/// A fraction of the escrowed stake in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Share {
    /// Numerator.
    pub numerator: u64,
    /// Denominator, never zero.
    pub denominator: u64,
}

impl Share {
    /// The whole stake.
    pub const WHOLE: Share = Share {
        numerator: 1,
        denominator: 1,
    };

    /// Half the stake.
    pub const HALF: Share = Share {
        numerator: 1,
        denominator: 2,
    };

    /// Nothing.
    pub const NONE: Share = Share {
        numerator: 0,
        denominator: 1,
    };

    /// Creates a share.
    ///
    /// # Errors
    ///
    /// [`EscrowError::InvalidShare`] if the denominator is zero or the
    /// numerator exceeds it.
    pub fn new(numerator: u64, denominator: u64) -> Result<Self, EscrowError> {
        let share = Self {
            numerator,
            denominator,
        };
        share.validate()?;
        Ok(share)
    }

    /// Checks the fraction lies in `[0, 1]`.
    pub fn validate(&self) -> Result<(), EscrowError> {
        if self.denominator == 0 || self.numerator > self.denominator {
            return Err(EscrowError::InvalidShare {
                numerator: self.numerator,
                denominator: self.denominator,
            });
        }
        Ok(())
    }
}

impl Default for Share {
    fn default() -> Self {
        Self::WHOLE
    }
}

impl std::fmt::Display for Share {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.numerator, self.denominator)
    }
}

/// Computes `floor(total * share)` without overflow.
pub fn payout_amount(total: Amount, share: Share) -> Amount {
    if share.denominator == 0 {
        return 0;
    }
    let amount = u128::from(total) * u128::from(share.numerator) / u128::from(share.denominator);
    // share <= 1, so amount <= total
    Amount::try_from(amount).unwrap_or(total)
}

/// One recipient of a payout plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, new)]
pub struct Allocation {
    /// Who gets paid.
    pub recipient: PlayerId,
    /// Fraction of the total stake.
    pub share: Share,
}

/// How an escrow is distributed at settlement.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PayoutPlan {
    allocations: Vec<Allocation>,
}

impl PayoutPlan {
    /// A single recipient receives `share`; the rest is retained.
    pub fn winner_takes(winner: PlayerId, share: Share) -> Self {
        Self {
            allocations: vec![Allocation::new(winner, share)],
        }
    }

    /// Both players receive half.
    pub fn split_between(first: PlayerId, second: PlayerId) -> Self {
        Self {
            allocations: vec![
                Allocation::new(first, Share::HALF),
                Allocation::new(second, Share::HALF),
            ],
        }
    }

    /// Nobody is paid; the whole stake is retained.
    pub fn retain_all() -> Self {
        Self::default()
    }

    /// Appends an allocation.
    pub fn with_allocation(mut self, allocation: Allocation) -> Self {
        self.allocations.push(allocation);
        self
    }

    /// The allocations, in payment order.
    pub fn allocations(&self) -> &[Allocation] {
        &self.allocations
    }
}

/// Stake held for one match.
#[derive(Debug, Clone, PartialEq, Eq, Getters, Serialize, Deserialize)]
pub struct EscrowRecord {
    /// Match id.
    match_id: MatchId,
    /// Combined stake of both players.
    total_stake: Amount,
    /// Flips to true exactly once.
    settled: bool,
    /// Sum paid out at settlement.
    paid_out: Amount,
    /// Part of the stake not paid out at settlement.
    retained: Amount,
}

impl EscrowRecord {
    fn open(match_id: MatchId, total_stake: Amount) -> Self {
        Self {
            match_id,
            total_stake,
            settled: false,
            paid_out: 0,
            retained: 0,
        }
    }
}

/// One computed payout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payout {
    /// Recipient.
    pub recipient: PlayerId,
    /// Amount credited.
    pub amount: Amount,
}

/// What a settlement paid out.
#[derive(Debug, Clone, PartialEq, Eq, Getters, Serialize, Deserialize)]
pub struct SettlementReceipt {
    /// Match id.
    match_id: MatchId,
    /// Stake that was held.
    total_stake: Amount,
    /// Payouts in plan order.
    payouts: Vec<Payout>,
    /// Part of the stake kept in escrow.
    retained: Amount,
}

impl SettlementReceipt {
    /// Sum of all payouts.
    pub fn paid_out(&self) -> Amount {
        self.payouts.iter().map(|p| p.amount).sum()
    }

    /// Amount paid to `player` across all allocations.
    pub fn paid_to(&self, player: &PlayerId) -> Amount {
        self.payouts
            .iter()
            .filter(|p| p.recipient == *player)
            .map(|p| p.amount)
            .sum()
    }
}

/// Escrow operations over a store and a balance primitive.
pub struct EscrowLedger<'a, S, B> {
    store: &'a mut S,
    bank: &'a mut B,
}

impl<'a, S: ArenaStore, B: BalanceTransfer> EscrowLedger<'a, S, B> {
    /// Borrows the store and balances for escrow operations.
    pub fn new(store: &'a mut S, bank: &'a mut B) -> Self {
        Self { store, bank }
    }

    /// Records `total_stake` as held for `match_id`.
    ///
    /// # Errors
    ///
    /// [`EscrowError::EscrowAlreadyOpen`] if a record exists.
    #[instrument(skip(self))]
    pub fn open(&mut self, match_id: MatchId, total_stake: Amount) -> Result<(), EscrowError> {
        if self.store.get_escrow(match_id).is_some() {
            warn!("Escrow already open");
            return Err(EscrowError::EscrowAlreadyOpen { match_id });
        }
        self.store.put_escrow(EscrowRecord::open(match_id, total_stake));
        info!("Escrow opened");
        Ok(())
    }

    /// Checks that `match_id` has an unsettled escrow.
    pub fn ensure_settleable(&self, match_id: MatchId) -> Result<EscrowRecord, EscrowError> {
        let record = self
            .store
            .get_escrow(match_id)
            .ok_or(EscrowError::EscrowNotFound { match_id })?;
        if record.settled {
            return Err(EscrowError::AlreadySettled { match_id });
        }
        Ok(record)
    }

    /// Pays out the escrow according to `plan` and marks it settled.
    ///
    /// All checks run before the first credit, so a refused settlement
    /// changes nothing.
    ///
    /// # Errors
    ///
    /// - [`EscrowError::EscrowNotFound`] if no record exists
    /// - [`EscrowError::AlreadySettled`] on a second settlement
    /// - [`EscrowError::InvalidShare`] if a share is outside `[0, 1]`
    /// - [`EscrowError::OverAllocated`] if payouts would exceed the stake
    #[instrument(skip(self, plan), fields(allocations = plan.allocations().len()))]
    pub fn settle(
        &mut self,
        match_id: MatchId,
        plan: &PayoutPlan,
    ) -> Result<SettlementReceipt, EscrowError> {
        let mut record = self.ensure_settleable(match_id).inspect_err(|e| {
            warn!(error = %e, "Settlement refused");
        })?;

        let mut payouts = Vec::with_capacity(plan.allocations().len());
        for allocation in plan.allocations() {
            allocation.share.validate()?;
            payouts.push(Payout {
                recipient: allocation.recipient.clone(),
                amount: payout_amount(record.total_stake, allocation.share),
            });
        }

        let requested = payouts
            .iter()
            .try_fold(0, |sum: Amount, p| sum.checked_add(p.amount))
            .unwrap_or(Amount::MAX);
        if requested > record.total_stake {
            warn!(requested, total_stake = record.total_stake, "Payout plan over-allocates");
            return Err(EscrowError::OverAllocated {
                match_id,
                requested,
                total_stake: record.total_stake,
            });
        }

        for payout in payouts.iter().filter(|p| p.amount > 0) {
            self.bank.credit(&payout.recipient, payout.amount);
        }

        record.settled = true;
        record.paid_out = requested;
        record.retained = record.total_stake - requested;
        let retained = record.retained;
        let total_stake = record.total_stake;
        self.store.put_escrow(record);

        info!(paid_out = requested, retained, "Escrow settled");
        Ok(SettlementReceipt {
            match_id,
            total_stake,
            payouts,
            retained,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::balances::InMemoryBalances;
    use crate::store::InMemoryStore;

    fn open(store: &mut InMemoryStore, bank: &mut InMemoryBalances, total: Amount) -> MatchId {
        let id = MatchId::new(1);
        EscrowLedger::new(store, bank).open(id, total).unwrap();
        id
    }

    #[test]
    fn test_winner_takes_all() {
        let mut store = InMemoryStore::new();
        let mut bank = InMemoryBalances::new();
        let id = open(&mut store, &mut bank, 200);
        let receipt = EscrowLedger::new(&mut store, &mut bank)
            .settle(id, &PayoutPlan::winner_takes("alice".into(), Share::WHOLE))
            .unwrap();
        assert_eq!(receipt.paid_to(&"alice".into()), 200);
        assert_eq!(*receipt.retained(), 0);
        assert_eq!(bank.balance_of(&"alice".into()), 200);
        let record = store.get_escrow(id).unwrap();
        assert!(*record.settled());
        assert_eq!(*record.paid_out(), 200);
    }

    #[test]
    fn test_second_settlement_fails() {
        let mut store = InMemoryStore::new();
        let mut bank = InMemoryBalances::new();
        let id = open(&mut store, &mut bank, 200);
        let plan = PayoutPlan::winner_takes("alice".into(), Share::WHOLE);
        EscrowLedger::new(&mut store, &mut bank).settle(id, &plan).unwrap();
        let err = EscrowLedger::new(&mut store, &mut bank)
            .settle(id, &plan)
            .unwrap_err();
        assert_eq!(err, EscrowError::AlreadySettled { match_id: id });
        assert_eq!(bank.balance_of(&"alice".into()), 200);
    }

    #[test]
    fn test_rounding_dust_is_retained() {
        let mut store = InMemoryStore::new();
        let mut bank = InMemoryBalances::new();
        let id = open(&mut store, &mut bank, 10);
        let third = Share::new(1, 3).unwrap();
        let plan = PayoutPlan {
            allocations: vec![
                Allocation::new("a".into(), third),
                Allocation::new("b".into(), third),
                Allocation::new("c".into(), third),
            ],
        };
        let receipt = EscrowLedger::new(&mut store, &mut bank).settle(id, &plan).unwrap();
        assert_eq!(receipt.paid_out(), 9);
        assert_eq!(*receipt.retained(), 1);
        let record = store.get_escrow(id).unwrap();
        assert_eq!(record.paid_out() + record.retained(), *record.total_stake());
    }

    #[test]
    fn test_odd_stake_split_keeps_remainder() {
        let mut store = InMemoryStore::new();
        let mut bank = InMemoryBalances::new();
        let id = open(&mut store, &mut bank, 7);
        let receipt = EscrowLedger::new(&mut store, &mut bank)
            .settle(id, &PayoutPlan::split_between("a".into(), "b".into()))
            .unwrap();
        assert_eq!(receipt.paid_to(&"a".into()), 3);
        assert_eq!(receipt.paid_to(&"b".into()), 3);
        assert_eq!(*receipt.retained(), 1);
    }

    #[test]
    fn test_retain_all_pays_nobody() {
        let mut store = InMemoryStore::new();
        let mut bank = InMemoryBalances::new();
        let id = open(&mut store, &mut bank, 50);
        let receipt = EscrowLedger::new(&mut store, &mut bank)
            .settle(id, &PayoutPlan::retain_all())
            .unwrap();
        assert!(receipt.payouts().is_empty());
        assert_eq!(*receipt.retained(), 50);
        assert!(*store.get_escrow(id).unwrap().settled());
    }

    #[test]
    fn test_over_allocation_rejected_without_credit() {
        let mut store = InMemoryStore::new();
        let mut bank = InMemoryBalances::new();
        let id = open(&mut store, &mut bank, 100);
        let plan = PayoutPlan {
            allocations: vec![
                Allocation::new("a".into(), Share::WHOLE),
                Allocation::new("b".into(), Share::HALF),
            ],
        };
        let err = EscrowLedger::new(&mut store, &mut bank)
            .settle(id, &plan)
            .unwrap_err();
        assert!(matches!(err, EscrowError::OverAllocated { requested: 150, .. }));
        assert_eq!(bank.balance_of(&"a".into()), 0);
        assert!(!store.get_escrow(id).unwrap().settled());
    }

    #[test]
    fn test_invalid_share_rejected() {
        assert!(Share::new(3, 2).is_err());
        assert!(Share::new(1, 0).is_err());
        assert!(Share::new(0, 5).is_ok());
    }

    #[test]
    fn test_open_twice_rejected() {
        let mut store = InMemoryStore::new();
        let mut bank = InMemoryBalances::new();
        let id = open(&mut store, &mut bank, 10);
        let err = EscrowLedger::new(&mut store, &mut bank)
            .open(id, 10)
            .unwrap_err();
        assert_eq!(err, EscrowError::EscrowAlreadyOpen { match_id: id });
    }

    #[test]
    fn test_settle_unknown_match() {
        let mut store = InMemoryStore::new();
        let mut bank = InMemoryBalances::new();
        let err = EscrowLedger::new(&mut store, &mut bank)
            .settle(MatchId::new(9), &PayoutPlan::retain_all())
            .unwrap_err();
        assert!(matches!(err, EscrowError::EscrowNotFound { .. }));
    }

    #[test]
    fn test_payout_amount_floors() {
        assert_eq!(payout_amount(u64::MAX, Share::WHOLE), u64::MAX);
        assert_eq!(payout_amount(5, Share::HALF), 2);
        assert_eq!(payout_amount(5, Share::NONE), 0);
    }
}
