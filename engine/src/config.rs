//! Auction configuration.

use std::time::Duration;

use sealbid_common::constants::{DEFAULT_BIDDING_SECS, DEFAULT_REVEALING_SECS};
use sealbid_common::{AccountId, Amount};

/// Parameters fixed when an auction is created.
#[derive(Debug, Clone)]
pub struct AuctionConfig {
    /// Account that sells the lot and starts the auction.
    pub seller: AccountId,
    /// Lot tokens handed to the winner.
    pub lot_quantity: Amount,
    /// Minimum acceptable bid and minimum deposit.
    pub reserve_price: Amount,
    /// How long sealed bids are accepted after start.
    pub bidding_window: Duration,
    /// How long bids may be revealed after bidding closes.
    pub revealing_window: Duration,
}

impl Default for AuctionConfig {
    fn default() -> Self {
        Self {
            seller: AccountId::new("seller"),
            lot_quantity: 1000,
            reserve_price: 100,
            bidding_window: Duration::from_secs(DEFAULT_BIDDING_SECS),
            revealing_window: Duration::from_secs(DEFAULT_REVEALING_SECS),
        }
    }
}

impl AuctionConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(seller) = std::env::var("AUCTION_SELLER") {
            config.seller = AccountId::new(seller);
        }

        if let Ok(lot) = std::env::var("AUCTION_LOT_QUANTITY") {
            if let Ok(lot) = lot.parse() {
                config.lot_quantity = lot;
            }
        }

        if let Ok(reserve) = std::env::var("AUCTION_RESERVE_PRICE") {
            if let Ok(reserve) = reserve.parse() {
                config.reserve_price = reserve;
            }
        }

        if let Ok(secs) = std::env::var("AUCTION_BIDDING_SECS") {
            if let Ok(secs) = secs.parse() {
                config.bidding_window = Duration::from_secs(secs);
            }
        }

        if let Ok(secs) = std::env::var("AUCTION_REVEALING_SECS") {
            if let Ok(secs) = secs.parse() {
                config.revealing_window = Duration::from_secs(secs);
            }
        }

        config
    }

    /// Validate configuration.
    pub fn validate(&self) -> Result<(), String> {
        if !self.seller.is_valid() {
            return Err(format!("Invalid seller account: {:?}", self.seller.as_str()));
        }

        if self.reserve_price == 0 {
            return Err("Reserve price must be greater than 0".to_string());
        }

        if self.lot_quantity == 0 {
            return Err("Lot quantity must be greater than 0".to_string());
        }

        if self.bidding_window.is_zero() {
            return Err("Bidding window cannot be zero".to_string());
        }

        if self.revealing_window.is_zero() {
            return Err("Revealing window cannot be zero".to_string());
        }

        Ok(())
    }
}
