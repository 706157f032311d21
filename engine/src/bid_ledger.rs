//! Bid ledger: running highest bid across verified disclosures.

use serde::Serialize;

use sealbid_common::{AccountId, Amount};

/// The current leader.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LeadingBid {
    pub bidder: AccountId,
    pub value: Amount,
}

/// Aggregates verified disclosures into the highest bid and its bidder.
#[derive(Debug, Default)]
pub struct BidLedger {
    leader: Option<LeadingBid>,
}

impl BidLedger {
    /// Create an empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a verified disclosure. Returns `true` if it took the lead.
    ///
    /// Strictly greater values replace the leader, so the earliest bidder
    /// keeps the lead on a tie.
    pub fn observe(&mut self, bidder: &AccountId, value: Amount) -> bool {
        if value <= self.highest_bid() {
            return false;
        }

        self.leader = Some(LeadingBid {
            bidder: bidder.clone(),
            value,
        });
        true
    }

    /// Highest verified bid, 0 if none.
    pub fn highest_bid(&self) -> Amount {
        self.leader.as_ref().map_or(0, |leader| leader.value)
    }

    /// Bidder holding the highest verified bid.
    pub fn highest_bidder(&self) -> Option<&AccountId> {
        self.leader.as_ref().map(|leader| &leader.bidder)
    }

    /// The leader, if any bid was verified.
    pub fn leader(&self) -> Option<&LeadingBid> {
        self.leader.as_ref()
    }

    /// Whether `account` is the current leader.
    pub fn is_leader(&self, account: &AccountId) -> bool {
        self.highest_bidder() == Some(account)
    }
}
