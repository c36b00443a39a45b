//! Account identifiers and the `fer_…` human-readable encoding.
//!
//! An account is the 32-byte Ed25519 public key of its owner. The encoded
//! form is `fer_` + 52 base32 characters for the key + 8 base32 characters
//! for a 40-bit blake2b checksum. The alphabet avoids visually ambiguous
//! characters (no 0/O, 2/Z, l/I, v).

use crate::hash::blake2b_256_parts;
use crate::keys::PublicKey;
use std::fmt;

const BASE32_ALPHABET: &[u8; 32] = b"13456789abcdefghijkmnopqrstuwxyz";

/// Reverse lookup table: ASCII byte → 5-bit value (0xFF = invalid).
const BASE32_DECODE: [u8; 128] = {
    let mut table = [0xFFu8; 128];
    let mut i = 0;
    while i < 32 {
        table[BASE32_ALPHABET[i] as usize] = i as u8;
        i += 1;
    }
    table
};

/// Prefix for all ferrite accounts.
const PREFIX: &str = "fer_";
/// 256 key bits → ceil(256/5) = 52 characters.
const KEY_CHARS: usize = 52;
/// 40 checksum bits → 8 characters.
const CHECKSUM_CHARS: usize = 8;

fn encode_base32(bytes: &[u8]) -> String {
    let total_bits = bytes.len() * 8;
    let mut result = String::with_capacity(total_bits.div_ceil(5));
    let mut buffer: u64 = 0;
    let mut bits = 0;

    for &byte in bytes {
        buffer = (buffer << 8) | byte as u64;
        bits += 8;
        while bits >= 5 {
            bits -= 5;
            result.push(BASE32_ALPHABET[((buffer >> bits) & 0x1F) as usize] as char);
        }
    }
    if bits > 0 {
        result.push(BASE32_ALPHABET[((buffer << (5 - bits)) & 0x1F) as usize] as char);
    }
    result
}

fn decode_base32_fixed<const N: usize>(s: &str) -> Option<[u8; N]> {
    let mut buffer: u64 = 0;
    let mut bits = 0;
    let mut result = [0u8; N];
    let mut pos = 0;

    for c in s.bytes() {
        if c >= 128 {
            return None;
        }
        let val = BASE32_DECODE[c as usize];
        if val == 0xFF {
            return None;
        }
        buffer = (buffer << 5) | val as u64;
        bits += 5;
        if bits >= 8 {
            bits -= 8;
            if pos < N {
                result[pos] = (buffer >> bits) as u8;
                pos += 1;
            }
        }
    }

    if pos < N {
        return None;
    }
    Some(result)
}

/// A 32-byte account identifier.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Account([u8; 32]);

impl Account {
    /// The burn account: funds sent here are irrecoverable.
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

    pub fn public_key(&self) -> PublicKey {
        PublicKey(self.0)
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

    /// The `fer_…` form: prefix + 52-char key + 8-char checksum.
    pub fn encode_account(&self) -> String {
        let checksum = blake2b_256_parts(&[&self.0]);
        format!(
            "{}{}{}",
            PREFIX,
            encode_base32(&self.0),
            encode_base32(&checksum[..5])
        )
    }

    /// Decode a `fer_…` string, rejecting bad prefixes, lengths, characters,
    /// and checksums.
    pub fn decode_account(s: &str) -> Option<Self> {
        let encoded = s.strip_prefix(PREFIX)?;
        if encoded.len() != KEY_CHARS + CHECKSUM_CHARS {
            return None;
        }
        let key: [u8; 32] = decode_base32_fixed(&encoded[..KEY_CHARS])?;
        let checksum: [u8; 5] = decode_base32_fixed(&encoded[KEY_CHARS..])?;
        if checksum != blake2b_256_parts(&[&key])[..5] {
            return None;
        }
        Some(Self(key))
    }
}

impl From<PublicKey> for Account {
    fn from(key: PublicKey) -> Self {
        Self(key.0)
    }
}

impl fmt::Debug for Account {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let head: String = self.0[..4].iter().map(|b| format!("{:02X}", b)).collect();
        write!(f, "Account({}…)", head)
    }
}

impl fmt::Display for Account {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.encode_account())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_roundtrip() {
        let a = Account::new([0x42; 32]);
        assert_eq!(Account::decode_hex(&a.encode_hex()), Some(a));
    }

    #[test]
    fn burn_account_is_zero() {
        assert!(Account::ZERO.is_zero());
        assert_eq!(Account::ZERO.encode_hex(), "0".repeat(64));
    }

    #[test]
    fn account_encoding_roundtrip() {
        let a = Account::new([0x1F; 32]);
        let s = a.encode_account();
        assert!(s.starts_with("fer_"));
        assert_eq!(s.len(), 4 + 52 + 8);
        assert_eq!(Account::decode_account(&s), Some(a));
    }

    #[test]
    fn wrong_prefix_rejected() {
        let s = Account::new([7; 32]).encode_account();
        let other = s.replacen("fer_", "nano_", 1);
        assert!(Account::decode_account(&other).is_none());
    }

    #[test]
    fn corrupted_checksum_rejected() {
        let mut s = Account::new([7; 32]).encode_account();
        let last = s.pop().unwrap();
        s.push(if last == '1' { '3' } else { '1' });
        assert!(Account::decode_account(&s).is_none());
    }

    #[test]
    fn wrong_length_rejected() {
        assert!(Account::decode_account("fer_short").is_none());
        assert!(Account::decode_account("fer_").is_none());
    }
}
