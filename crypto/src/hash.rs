//! Hashing and hex helpers.

use sha2::{Digest, Sha256};

use crate::{CryptoError, Result};

/// Compute SHA-256 over the concatenation of `parts`.
pub fn sha256(parts: &[&[u8]]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    for part in parts {
        hasher.update(part);
    }
    hasher.finalize().into()
}

/// Encode bytes as lowercase hex.
pub fn to_hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

/// Decode exactly 32 bytes of hex, with or without a `0x` prefix.
pub fn from_hex_32(s: &str) -> Result<[u8; 32]> {
    let s = s.strip_prefix("0x").unwrap_or(s);
    if !s.is_ascii() {
        return Err(CryptoError::InvalidHex(s.to_string()));
    }
    if s.len() != 64 {
        return Err(CryptoError::InvalidLength {
            expected: 32,
            actual: s.len() / 2,
        });
    }

    let mut out = [0u8; 32];
    for (i, byte) in out.iter_mut().enumerate() {
        let pair = &s[i * 2..i * 2 + 2];
        *byte = u8::from_str_radix(pair, 16)
            .map_err(|_| CryptoError::InvalidHex(pair.to_string()))?;
    }
    Ok(out)
}
