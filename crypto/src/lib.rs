//! SealBid Cryptographic Primitives
//!
//! Provides the hash commitment that binds a sealed bid to its later
//! disclosure.

pub mod commitment;
pub mod hash;

pub use commitment::{Commitment, Nonce, SealedBid};
pub use hash::{sha256, to_hex};

/// Errors from cryptographic operations.
#[derive(Debug, thiserror::Error)]
pub enum CryptoError {
    #[error("Invalid hex: {0}")]
    InvalidHex(String),

    #[error("Invalid length: expected {expected} bytes, got {actual}")]
    InvalidLength { expected: usize, actual: usize },
}

impl From<CryptoError> for sealbid_common::AuctionError {
    fn from(err: CryptoError) -> Self {
        sealbid_common::AuctionError::InvalidCommitment(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, CryptoError>;
