//! SealBid Engine
//!
//! A sealed-bid, commit-reveal auction for a single lot. Bidders commit a
//! digest of their bid with a deposit while bidding is open, disclose it once
//! bidding closes, and after the revealing window the highest disclosed bid
//! takes the lot while everyone else is refunded.
//!
//! The engine keeps these guarantees on every path:
//! - phase follows the clock and never moves backwards
//! - a reveal only counts if it opens the stored commitment
//! - the lot leaves custody at most once
//! - each bidder is refunded at most once
//! - escrow always equals what the auction still owes

pub mod auction;
pub mod bid_ledger;
pub mod config;
pub mod events;
pub mod metrics;
pub mod phase;
pub mod registry;
pub mod service;
pub mod settlement;

pub use auction::{AuctionEngine, AuctionSnapshot, BidderSnapshot};
pub use bid_ledger::{BidLedger, LeadingBid};
pub use config::AuctionConfig;
pub use events::{AuctionEvent, EventRecord};
pub use metrics::{Metrics, MetricsSnapshot, SharedMetrics};
pub use phase::{Deadlines, PhaseController};
pub use registry::{BidderRecord, CommitmentRegistry};
pub use service::{spawn, AuctionHandle, DEFAULT_QUEUE_DEPTH};
pub use settlement::ClaimReceipt;
