//! Sealed bid commitments.
//!
//! A commitment is `SHA-256(value || nonce)` where `value` is the bid encoded
//! as a 32-byte big-endian integer and `nonce` is 32 secret bytes. Fixed-width
//! encoding keeps the preimage unambiguous: no two `(value, nonce)` pairs share
//! a byte string.

use std::fmt;
use std::str::FromStr;

use rand::RngCore;
use serde::{Deserialize, Serialize};

use sealbid_common::Amount;

use crate::hash::{from_hex_32, sha256, to_hex};
use crate::CryptoError;

/// Secret blinding value chosen by the bidder.
#[derive(Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Nonce([u8; 32]);

impl Nonce {
    /// Create from raw bytes.
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Draw a fresh nonce from the OS RNG.
    pub fn random() -> Self {
        let mut bytes = [0u8; 32];
        rand::rngs::OsRng.fill_bytes(&mut bytes);
        Self(bytes)
    }

    /// Get the raw bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl From<u128> for Nonce {
    /// Encode an integer nonce as a 32-byte big-endian word.
    fn from(n: u128) -> Self {
        Self(encode_word(n))
    }
}

// Never print the secret.
impl fmt::Debug for Nonce {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Nonce(..)")
    }
}

/// Digest binding a bid value to a nonce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Commitment([u8; 32]);

impl Commitment {
    /// Seal `value` under `nonce`.
    pub fn seal(value: Amount, nonce: &Nonce) -> Self {
        Self(sha256(&[&encode_word(value), nonce.as_bytes()]))
    }

    /// Create from a raw digest.
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Get the raw digest.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Check that `value` and `nonce` open this commitment.
    pub fn opens_to(&self, value: Amount, nonce: &Nonce) -> bool {
        Self::seal(value, nonce) == *self
    }

    /// Hex encoding with a `0x` prefix.
    pub fn to_hex(&self) -> String {
        format!("0x{}", to_hex(&self.0))
    }
}

impl fmt::Display for Commitment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl FromStr for Commitment {
    type Err = CryptoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(from_hex_32(s)?))
    }
}

/// Bidder-side bundle of a bid, its nonce and its commitment.
///
/// The commitment is submitted while bidding; value and nonce stay private
/// until reveal.
#[derive(Debug, Clone)]
pub struct SealedBid {
    pub value: Amount,
    pub nonce: Nonce,
    pub commitment: Commitment,
}

impl SealedBid {
    /// Seal `value` under a fresh random nonce.
    pub fn new(value: Amount) -> Self {
        Self::with_nonce(value, Nonce::random())
    }

    /// Seal `value` under a caller-chosen nonce.
    pub fn with_nonce(value: Amount, nonce: Nonce) -> Self {
        Self {
            value,
            nonce,
            commitment: Commitment::seal(value, &nonce),
        }
    }
}

fn encode_word(n: u128) -> [u8; 32] {
    let mut word = [0u8; 32];
    word[16..].copy_from_slice(&n.to_be_bytes());
    word
}
