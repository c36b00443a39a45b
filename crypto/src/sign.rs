//! Ed25519 signing and verification.
//!
//! Batched verification mirrors the signature-checker design: all inputs are
//! checked in one pass so a vectorized backend can be slotted in later.
//! Failures never panic; a bad key or signature simply verifies false.

use ed25519_dalek::{Signer, SigningKey, Verifier, VerifyingKey};
use ferrite_types::{PrivateKey, PublicKey, Signature};
use rayon::prelude::*;

pub fn sign_message(message: &[u8], private_key: &PrivateKey) -> Signature {
    let signing = SigningKey::from_bytes(private_key.as_bytes());
    Signature(signing.sign(message).to_bytes())
}

pub fn verify_signature(message: &[u8], signature: &Signature, public_key: &PublicKey) -> bool {
    let Ok(verifying) = VerifyingKey::from_bytes(public_key.as_bytes()) else {
        return false;
    };
    let sig = ed25519_dalek::Signature::from_bytes(signature.as_bytes());
    verifying.verify(message, &sig).is_ok()
}

/// One signature-verification request.
pub struct SignatureCheck<'a> {
    pub message: &'a [u8],
    pub signature: Signature,
    pub public_key: PublicKey,
}

/// Verify a whole batch, returning one flag per entry in input order.
pub fn validate_batch(checks: &[SignatureCheck<'_>]) -> Vec<bool> {
    checks
        .par_iter()
        .map(|c| verify_signature(c.message, &c.signature, &c.public_key))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::KeyPair;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn sign_and_verify() {
        let mut rng = StdRng::seed_from_u64(1);
        let kp = KeyPair::generate(&mut rng);
        let sig = sign_message(b"hello", &kp.private);
        assert!(verify_signature(b"hello", &sig, &kp.public));
        assert!(!verify_signature(b"hellp", &sig, &kp.public));
    }

    #[test]
    fn wrong_key_fails() {
        let mut rng = StdRng::seed_from_u64(2);
        let kp = KeyPair::generate(&mut rng);
        let other = KeyPair::generate(&mut rng);
        let sig = sign_message(b"payload", &kp.private);
        assert!(!verify_signature(b"payload", &sig, &other.public));
    }

    #[test]
    fn zero_signature_fails() {
        let mut rng = StdRng::seed_from_u64(3);
        let kp = KeyPair::generate(&mut rng);
        assert!(!verify_signature(b"m", &Signature::ZERO, &kp.public));
    }

    #[test]
    fn batch_matches_single() {
        let mut rng = StdRng::seed_from_u64(4);
        let kp = KeyPair::generate(&mut rng);
        let good = sign_message(b"one", &kp.private);
        let bad = sign_message(b"two", &kp.private);

        let checks = vec![
            SignatureCheck {
                message: b"one",
                signature: good,
                public_key: kp.public,
            },
            SignatureCheck {
                message: b"one",
                signature: bad,
                public_key: kp.public,
            },
            SignatureCheck {
                message: b"two",
                signature: bad,
                public_key: kp.public,
            },
        ];
        assert_eq!(validate_batch(&checks), vec![true, false, true]);
    }

    #[test]
    fn empty_batch() {
        assert!(validate_batch(&[]).is_empty());
    }
}
