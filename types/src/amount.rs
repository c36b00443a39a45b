//! 128-bit balance amounts.
//!
//! Amounts are raw unsigned 128-bit integers; the wire and disk forms are
//! 16 big-endian bytes. Legacy send blocks carry balances hex-encoded in
//! JSON, state blocks decimal-encoded, so both codecs live here.

use std::fmt;
use std::ops::{Add, Sub};

/// A raw 128-bit balance.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Amount(u128);

impl Amount {
    pub const ZERO: Self = Self(0);
    pub const MAX: Self = Self(u128::MAX);

    pub fn new(raw: u128) -> Self {
        Self(raw)
    }

    pub fn raw(&self) -> u128 {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    pub fn checked_add(self, other: Self) -> Option<Self> {
        self.0.checked_add(other.0).map(Self)
    }

    pub fn checked_sub(self, other: Self) -> Option<Self> {
        self.0.checked_sub(other.0).map(Self)
    }

    pub fn saturating_add(self, other: Self) -> Self {
        Self(self.0.saturating_add(other.0))
    }

    pub fn saturating_sub(self, other: Self) -> Self {
        Self(self.0.saturating_sub(other.0))
    }

    pub fn to_be_bytes(&self) -> [u8; 16] {
        self.0.to_be_bytes()
    }

    pub fn from_be_bytes(bytes: [u8; 16]) -> Self {
        Self(u128::from_be_bytes(bytes))
    }

    /// Uppercase hex, 32 characters, leading zeros preserved.
    pub fn encode_hex(&self) -> String {
        format!("{:032X}", self.0)
    }

    /// Case-insensitive hex decode of exactly 32 characters.
    pub fn decode_hex(s: &str) -> Option<Self> {
        if s.len() != 32 {
            return None;
        }
        let mut bytes = [0u8; 16];
        hex::decode_to_slice(s, &mut bytes).ok()?;
        Some(Self::from_be_bytes(bytes))
    }

    /// Plain base-10 form used by state-block JSON and RPC surfaces.
    pub fn encode_dec(&self) -> String {
        self.0.to_string()
    }

    /// Base-10 decode. Fails on empty input, signs, or overflow.
    pub fn decode_dec(s: &str) -> Option<Self> {
        if s.is_empty() || s.len() > 39 || !s.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }
        s.parse::<u128>().ok().map(Self)
    }
}

impl Add for Amount {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        Self(self.0 + rhs.0)
    }
}

impl Sub for Amount {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self {
        Self(self.0 - rhs.0)
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_roundtrip() {
        for raw in [0u128, 1, 100, u128::MAX, u128::MAX - 100] {
            let a = Amount::new(raw);
            assert_eq!(Amount::decode_hex(&a.encode_hex()), Some(a));
        }
    }

    #[test]
    fn dec_roundtrip() {
        for raw in [0u128, 7, 340_282_366_920_938_463_463_374_607_431_768_211_455] {
            let a = Amount::new(raw);
            assert_eq!(Amount::decode_dec(&a.encode_dec()), Some(a));
        }
    }

    #[test]
    fn dec_rejects_garbage() {
        assert!(Amount::decode_dec("").is_none());
        assert!(Amount::decode_dec("-1").is_none());
        assert!(Amount::decode_dec("12x").is_none());
        // One above u128::MAX.
        assert!(Amount::decode_dec("340282366920938463463374607431768211456").is_none());
    }

    #[test]
    fn hex_rejects_wrong_length() {
        assert!(Amount::decode_hex("FF").is_none());
        assert!(Amount::decode_hex(&"0".repeat(33)).is_none());
    }

    #[test]
    fn be_bytes_roundtrip() {
        let a = Amount::new(0x0102030405060708090A0B0C0D0E0F10);
        assert_eq!(Amount::from_be_bytes(a.to_be_bytes()), a);
        assert_eq!(a.to_be_bytes()[0], 0x01);
    }
}
