//! Auction lifecycle phases.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Phase of an auction.
///
/// Only `Created -> Bidding` is ever stored; the later phases are derived from
/// the clock and the deadlines fixed when bidding opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Phase {
    /// Parameters fixed, waiting for the seller to fund and start.
    Created,
    /// Sealed commitments are accepted.
    Bidding,
    /// Commitments are opened and verified.
    Revealing,
    /// Winner fixed, settlement and refunds available.
    Ended,
}

impl Phase {
    /// Check if moving to `next` keeps the lifecycle monotonic.
    pub fn can_advance_to(&self, next: Phase) -> bool {
        next > *self
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Created => "created",
            Phase::Bidding => "bidding",
            Phase::Revealing => "revealing",
            Phase::Ended => "ended",
        };
        write!(f, "{}", name)
    }
}
