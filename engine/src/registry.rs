//! Commitment registry: one sealed commitment per bidder.

use std::collections::HashMap;

use serde::Serialize;

use sealbid_common::{AccountId, Amount, AuctionError, Result, Timestamp};
use sealbid_crypto::{Commitment, Nonce};

/// Everything the engine knows about one bidder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BidderRecord {
    /// Sealed digest submitted while bidding.
    pub commitment: Commitment,
    /// Funds taken into custody with the commitment.
    pub deposited: Amount,
    /// Verified bid value; `None` until revealed.
    pub disclosed: Option<Amount>,
    /// Whether the deposit (or its excess) has been paid back.
    pub withdrawn: bool,
    /// When the commitment was accepted.
    pub committed_at: Timestamp,
    /// When the bid was revealed.
    pub revealed_at: Option<Timestamp>,
}

impl BidderRecord {
    fn new(commitment: Commitment, deposited: Amount, committed_at: Timestamp) -> Self {
        Self {
            commitment,
            deposited,
            disclosed: None,
            withdrawn: false,
            committed_at,
            revealed_at: None,
        }
    }

    /// Whether the bid has been revealed.
    pub fn is_revealed(&self) -> bool {
        self.disclosed.is_some()
    }

    /// Deposit portion above the disclosed bid. This is what the winner gets
    /// back; losing bidders are refunded the whole deposit.
    pub fn excess(&self) -> Amount {
        // disclosed <= deposited is enforced at reveal
        self.deposited - self.disclosed.unwrap_or(0)
    }
}

/// Bidder records keyed by identity.
#[derive(Debug, Default)]
pub struct CommitmentRegistry {
    records: HashMap<AccountId, BidderRecord>,
}

impl CommitmentRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Check that `bidder` may commit `deposit` against `reserve`.
    pub fn check_commit(&self, bidder: &AccountId, deposit: Amount, reserve: Amount) -> Result<()> {
        if self.records.contains_key(bidder) {
            return Err(AuctionError::AlreadyCommitted(bidder.clone()));
        }

        if deposit < reserve {
            return Err(AuctionError::BelowReserve { deposit, reserve });
        }

        Ok(())
    }

    /// Store a new record. Call only after [`check_commit`](Self::check_commit)
    /// passed and the deposit is in custody.
    pub fn insert(
        &mut self,
        bidder: AccountId,
        commitment: Commitment,
        deposit: Amount,
        at: Timestamp,
    ) {
        let previous = self
            .records
            .insert(bidder, BidderRecord::new(commitment, deposit, at));
        debug_assert!(previous.is_none());
    }

    /// Check that `value` and `nonce` are a valid disclosure for `bidder`.
    pub fn check_reveal(&self, bidder: &AccountId, value: Amount, nonce: &Nonce) -> Result<()> {
        let record = self
            .records
            .get(bidder)
            .ok_or_else(|| AuctionError::NoCommitment(bidder.clone()))?;

        if record.is_revealed() {
            return Err(AuctionError::AlreadyRevealed(bidder.clone()));
        }

        if !record.commitment.opens_to(value, nonce) {
            return Err(AuctionError::HashMismatch);
        }

        if value > record.deposited {
            return Err(AuctionError::InsufficientDeposit {
                value,
                deposited: record.deposited,
            });
        }

        Ok(())
    }

    /// Record a verified disclosure.
    pub fn mark_revealed(&mut self, bidder: &AccountId, value: Amount, at: Timestamp) {
        if let Some(record) = self.records.get_mut(bidder) {
            record.disclosed = Some(value);
            record.revealed_at = Some(at);
        }
    }

    /// Flip the withdrawn flag, returning the previous value.
    pub(crate) fn set_withdrawn(&mut self, bidder: &AccountId, withdrawn: bool) -> Option<bool> {
        self.records
            .get_mut(bidder)
            .map(|record| std::mem::replace(&mut record.withdrawn, withdrawn))
    }

    /// Get a bidder's record.
    pub fn get(&self, bidder: &AccountId) -> Option<&BidderRecord> {
        self.records.get(bidder)
    }

    /// Number of bidders that committed.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether nobody has committed.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Iterate over all records.
    pub fn iter(&self) -> impl Iterator<Item = (&AccountId, &BidderRecord)> {
        self.records.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sealbid_common::now;
    use sealbid_crypto::SealedBid;

    fn bidder(name: &str) -> AccountId {
        AccountId::new(name)
    }

    fn registry_with(name: &str, bid: &SealedBid, deposit: Amount) -> CommitmentRegistry {
        let mut registry = CommitmentRegistry::new();
        registry.insert(bidder(name), bid.commitment, deposit, now());
        registry
    }

    #[test]
    fn test_duplicate_commit_rejected() {
        let bid = SealedBid::new(150);
        let registry = registry_with("alice", &bid, 200);

        assert_eq!(
            registry.check_commit(&bidder("alice"), 200, 100),
            Err(AuctionError::AlreadyCommitted(bidder("alice")))
        );
        assert!(registry.check_commit(&bidder("bob"), 200, 100).is_ok());
    }

    #[test]
    fn test_deposit_below_reserve_rejected() {
        let registry = CommitmentRegistry::new();
        assert_eq!(
            registry.check_commit(&bidder("alice"), 50, 100),
            Err(AuctionError::BelowReserve {
                deposit: 50,
                reserve: 100
            })
        );
        assert!(registry.check_commit(&bidder("alice"), 100, 100).is_ok());
    }

    #[test]
    fn test_reveal_checks_in_order() {
        let bid = SealedBid::new(250);
        let mut registry = registry_with("mallory", &bid, 200);

        assert_eq!(
            registry.check_reveal(&bidder("nobody"), 250, &bid.nonce),
            Err(AuctionError::NoCommitment(bidder("nobody")))
        );
        assert_eq!(
            registry.check_reveal(&bidder("mallory"), 249, &bid.nonce),
            Err(AuctionError::HashMismatch)
        );
        assert_eq!(
            registry.check_reveal(&bidder("mallory"), 250, &bid.nonce),
            Err(AuctionError::InsufficientDeposit {
                value: 250,
                deposited: 200
            })
        );

        let honest = SealedBid::new(200);
        registry.insert(bidder("alice"), honest.commitment, 200, now());
        assert!(registry.check_reveal(&bidder("alice"), 200, &honest.nonce).is_ok());
        registry.mark_revealed(&bidder("alice"), 200, now());
        assert_eq!(
            registry.check_reveal(&bidder("alice"), 200, &honest.nonce),
            Err(AuctionError::AlreadyRevealed(bidder("alice")))
        );
    }

    #[test]
    fn test_excess_is_deposit_above_bid() {
        let bid = SealedBid::new(150);
        let mut registry = registry_with("alice", &bid, 200);
        assert_eq!(registry.get(&bidder("alice")).unwrap().excess(), 200);

        registry.mark_revealed(&bidder("alice"), 150, now());
        assert_eq!(registry.get(&bidder("alice")).unwrap().excess(), 50);
    }

    #[test]
    fn test_set_withdrawn_returns_previous() {
        let bid = SealedBid::new(150);
        let mut registry = registry_with("alice", &bid, 200);

        assert_eq!(registry.set_withdrawn(&bidder("alice"), true), Some(false));
        assert_eq!(registry.set_withdrawn(&bidder("alice"), true), Some(true));
        assert_eq!(registry.set_withdrawn(&bidder("bob"), true), None);
    }
}
