//! Simulated bidders' private bid material.

use std::collections::HashMap;

use rand::Rng;

use sealbid_common::{AccountId, Amount};
use sealbid_crypto::{Nonce, SealedBid};

/// Sealed bids the simulated bidders keep to themselves until reveal.
#[derive(Default)]
pub struct BidderBook {
    sealed: HashMap<AccountId, SealedBid>,
}

impl BidderBook {
    /// Create an empty book.
    pub fn new() -> Self {
        Self::default()
    }

    /// Seal `value` for `bidder` with a nonce drawn from `rng`.
    ///
    /// A bidder keeps the first bid sealed for them; later calls return it.
    pub fn seal<R: Rng>(&mut self, rng: &mut R, bidder: &AccountId, value: Amount) -> &SealedBid {
        self.sealed
            .entry(bidder.clone())
            .or_insert_with(|| SealedBid::with_nonce(value, Nonce::from_bytes(rng.gen())))
    }

    /// The bid sealed for `bidder`.
    pub fn get(&self, bidder: &AccountId) -> Option<&SealedBid> {
        self.sealed.get(bidder)
    }
}
