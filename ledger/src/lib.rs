//! SealBid Ledger
//!
//! Interfaces to the token ledger and payment rail an auction custodies value
//! through, plus a journaled in-memory implementation of both.

pub mod custody;
pub mod engine;
pub mod journal;

pub use custody::{AssetLedger, LedgerError, LedgerResult, PaymentRail};
pub use engine::LedgerEngine;
pub use journal::{EntryType, JournalEntry};
