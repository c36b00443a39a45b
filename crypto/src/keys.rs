//! Ed25519 key pairs.

use ed25519_dalek::SigningKey;
use ferrite_types::{PrivateKey, PublicKey};
use rand::RngCore;

/// An Ed25519 key pair.
pub struct KeyPair {
    pub public: PublicKey,
    pub private: PrivateKey,
}

impl KeyPair {
    /// Generate a fresh random key pair from the supplied RNG.
    pub fn generate(rng: &mut impl RngCore) -> Self {
        let mut seed = [0u8; 32];
        rng.fill_bytes(&mut seed);
        Self::from_private(PrivateKey(seed))
    }

    /// Derive the public half from a private key.
    pub fn from_private(private: PrivateKey) -> Self {
        let signing = SigningKey::from_bytes(private.as_bytes());
        let public = PublicKey(signing.verifying_key().to_bytes());
        Self { public, private }
    }

    /// Reconstruct a key pair from a 64-character hex private key.
    pub fn from_hex(s: &str) -> Option<Self> {
        if s.len() != 64 {
            return None;
        }
        let mut seed = [0u8; 32];
        hex::decode_to_slice(s, &mut seed).ok()?;
        Some(Self::from_private(PrivateKey(seed)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn derivation_is_deterministic() {
        let a = KeyPair::from_private(PrivateKey([7u8; 32]));
        let b = KeyPair::from_private(PrivateKey([7u8; 32]));
        assert_eq!(a.public, b.public);
    }

    #[test]
    fn generate_distinct_keys() {
        let mut rng = StdRng::seed_from_u64(1);
        let a = KeyPair::generate(&mut rng);
        let b = KeyPair::generate(&mut rng);
        assert_ne!(a.public, b.public);
    }

    #[test]
    fn from_hex_roundtrip() {
        let kp = KeyPair::from_hex(ferrite_types::params::DEV_GENESIS_PRIVATE_KEY).unwrap();
        assert!(!kp.public.as_bytes().iter().all(|&b| b == 0));
        assert!(KeyPair::from_hex("xyz").is_none());
    }
}
