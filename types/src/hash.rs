//! Block hash type for the account-chain lattice.

use blake2::digest::{Update, VariableOutput};
use blake2::Blake2bVar;
use std::fmt;

/// A 32-byte blake2b block hash, identifying one block in an account chain.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BlockHash([u8; 32]);

/// The key under which an election contests a fork: `previous` for blocks
/// that extend a chain, the account for blocks that open one.
pub type Root = BlockHash;

/// blake2b-256 over the concatenation of `parts`.
pub fn blake2b_256_parts(parts: &[&[u8]]) -> [u8; 32] {
    let mut hasher = Blake2bVar::new(32).expect("32 is a valid blake2b length");
    for part in parts {
        hasher.update(part);
    }
    let mut out = [0u8; 32];
    hasher
        .finalize_variable(&mut out)
        .expect("output length matches");
    out
}

impl BlockHash {
    pub const ZERO: Self = Self([0u8; 32]);

    pub fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 32]
    }

    /// Uppercase hex, 64 characters, leading zeros preserved.
    pub fn encode_hex(&self) -> String {
        self.0.iter().map(|b| format!("{:02X}", b)).collect()
    }

    /// Case-insensitive hex decode. Fails on wrong length or stray characters.
    pub fn decode_hex(s: &str) -> Option<Self> {
        if s.len() != 64 {
            return None;
        }
        let mut out = [0u8; 32];
        hex::decode_to_slice(s, &mut out).ok()?;
        Some(Self(out))
    }
}

impl fmt::Debug for BlockHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let head: String = self.0[..4].iter().map(|b| format!("{:02X}", b)).collect();
        write!(f, "BlockHash({}…)", head)
    }
}

impl fmt::Display for BlockHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.encode_hex())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_roundtrip() {
        let h = BlockHash::new([0xAB; 32]);
        let s = h.encode_hex();
        assert_eq!(s.len(), 64);
        assert_eq!(BlockHash::decode_hex(&s), Some(h));
        assert_eq!(BlockHash::decode_hex(&s.to_lowercase()), Some(h));
    }

    #[test]
    fn leading_zeros_preserved() {
        let mut bytes = [0u8; 32];
        bytes[31] = 1;
        let h = BlockHash::new(bytes);
        assert!(h.encode_hex().starts_with("00000000"));
        assert_eq!(BlockHash::decode_hex(&h.encode_hex()), Some(h));
    }

    #[test]
    fn malformed_hex_rejected() {
        assert!(BlockHash::decode_hex("XYZ").is_none());
        assert!(BlockHash::decode_hex(&"G".repeat(64)).is_none());
        assert!(BlockHash::decode_hex(&"A".repeat(63)).is_none());
    }

    #[test]
    fn blake2b_is_deterministic() {
        let a = blake2b_256_parts(&[b"ab", b"c"]);
        let b = blake2b_256_parts(&[b"abc"]);
        assert_eq!(a, b);
        assert_ne!(a, blake2b_256_parts(&[b"abd"]));
    }
}
