//! Auction event log.

use serde::Serialize;

use sealbid_common::{AccountId, Amount, Timestamp};
use sealbid_crypto::Commitment;

use crate::phase::Deadlines;

/// A successful state change, in the order it was applied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AuctionEvent {
    Started {
        seller: AccountId,
        lot_quantity: Amount,
        deadlines: Deadlines,
    },
    Committed {
        bidder: AccountId,
        commitment: Commitment,
        deposit: Amount,
    },
    Revealed {
        bidder: AccountId,
        value: Amount,
    },
    NewLeader {
        bidder: AccountId,
        value: Amount,
    },
    Withdrawn {
        bidder: AccountId,
        amount: Amount,
    },
    LotClaimed {
        winner: AccountId,
        lot_quantity: Amount,
        excess_refund: Amount,
    },
    ProceedsCollected {
        seller: AccountId,
        amount: Amount,
    },
    LotReclaimed {
        seller: AccountId,
        lot_quantity: Amount,
    },
}

impl AuctionEvent {
    /// Short event name for logs.
    pub fn name(&self) -> &'static str {
        match self {
            AuctionEvent::Started { .. } => "started",
            AuctionEvent::Committed { .. } => "committed",
            AuctionEvent::Revealed { .. } => "revealed",
            AuctionEvent::NewLeader { .. } => "new_leader",
            AuctionEvent::Withdrawn { .. } => "withdrawn",
            AuctionEvent::LotClaimed { .. } => "lot_claimed",
            AuctionEvent::ProceedsCollected { .. } => "proceeds_collected",
            AuctionEvent::LotReclaimed { .. } => "lot_reclaimed",
        }
    }
}

/// An event with its sequence number and time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EventRecord {
    pub sequence: u64,
    pub at: Timestamp,
    #[serde(flatten)]
    pub event: AuctionEvent,
}

/// Append-only event log.
#[derive(Debug, Default)]
pub struct EventLog {
    records: Vec<EventRecord>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an event stamped at `at`.
    pub fn push(&mut self, at: Timestamp, event: AuctionEvent) {
        let sequence = self.records.len() as u64;
        self.records.push(EventRecord {
            sequence,
            at,
            event,
        });
    }

    /// All events, oldest first.
    pub fn records(&self) -> &[EventRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sealbid_common::now;

    #[test]
    fn test_sequence_numbers_increase() {
        let mut log = EventLog::new();
        let bidder = AccountId::new("alice");

        log.push(
            now(),
            AuctionEvent::Revealed {
                bidder: bidder.clone(),
                value: 150,
            },
        );
        log.push(now(), AuctionEvent::NewLeader { bidder, value: 150 });

        let sequences: Vec<u64> = log.records().iter().map(|r| r.sequence).collect();
        assert_eq!(sequences, vec![0, 1]);
        assert_eq!(log.records()[1].event.name(), "new_leader");
    }

    #[test]
    fn test_event_serializes_with_tag() {
        let mut log = EventLog::new();
        log.push(
            now(),
            AuctionEvent::Withdrawn {
                bidder: AccountId::new("bob"),
                amount: 200,
            },
        );

        let json = serde_json::to_value(&log.records()[0]).unwrap();
        assert_eq!(json["type"], "withdrawn");
        assert_eq!(json["sequence"], 0);
        assert_eq!(json["bidder"], "bob");
    }
}
