//! SealBid Common Types
//!
//! This crate contains shared types used across the SealBid auction engine,
//! including identifiers, amounts, phases, errors, and the clock interface.

pub mod identifiers;
pub mod monetary;
pub mod phase;
pub mod error;
pub mod time;

pub use identifiers::*;
pub use monetary::*;
pub use phase::*;
pub use error::*;
pub use time::*;
