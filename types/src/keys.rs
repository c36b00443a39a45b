//! Raw key and signature types.
//!
//! These are plain byte containers; all actual cryptography lives in
//! `ferrite-crypto`.

use std::fmt;

/// A 32-byte Ed25519 public key. Identical bytes to an [`crate::Account`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct PublicKey(pub [u8; 32]);

/// A 32-byte Ed25519 private key.
///
/// Deliberately no `Debug`, `Display`, or serde impls.
#[derive(Clone)]
pub struct PrivateKey(pub [u8; 32]);

/// A 64-byte Ed25519 signature.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Signature(pub [u8; 64]);

impl PublicKey {
    pub const ZERO: Self = Self([0u8; 32]);

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl PrivateKey {
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl Signature {
    pub const ZERO: Self = Self([0u8; 64]);

    pub fn as_bytes(&self) -> &[u8; 64] {
        &self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 64]
    }

    /// Uppercase hex, 128 characters.
    pub fn encode_hex(&self) -> String {
        self.0.iter().map(|b| format!("{:02X}", b)).collect()
    }

    /// Case-insensitive hex decode of exactly 128 characters.
    pub fn decode_hex(s: &str) -> Option<Self> {
        if s.len() != 128 {
            return None;
        }
        let mut out = [0u8; 64];
        hex::decode_to_slice(s, &mut out).ok()?;
        Some(Self(out))
    }
}

impl fmt::Debug for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let head: String = self.0[..4].iter().map(|b| format!("{:02X}", b)).collect();
        write!(f, "Signature({}…)", head)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signature_hex_roundtrip() {
        let sig = Signature([0x5A; 64]);
        let s = sig.encode_hex();
        assert_eq!(s.len(), 128);
        assert_eq!(Signature::decode_hex(&s), Some(sig));
        assert_eq!(Signature::decode_hex(&s.to_lowercase()), Some(sig));
        assert!(Signature::decode_hex(&s[1..]).is_none());
    }
}
