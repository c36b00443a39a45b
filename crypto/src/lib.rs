//! Cryptographic primitives for the ferrite protocol.
//!
//! Ed25519 signing and verification (single and batched) plus Blake2b
//! digests. Key and signature byte containers live in `ferrite-types`; this
//! crate gives them behavior.

pub mod hash;
pub mod keys;
pub mod sign;

pub use hash::{blake2b, blake2b_256};
pub use keys::KeyPair;
pub use sign::{sign_message, validate_batch, verify_signature, SignatureCheck};
