//! Blake2b digest helpers.

use blake2::digest::{Update, VariableOutput};
use blake2::Blake2bVar;

/// Blake2b with a caller-chosen digest length (1–64 bytes).
pub fn blake2b(out_len: usize, parts: &[&[u8]]) -> Vec<u8> {
    let mut hasher = Blake2bVar::new(out_len).expect("digest length in range");
    for part in parts {
        hasher.update(part);
    }
    let mut out = vec![0u8; out_len];
    hasher
        .finalize_variable(&mut out)
        .expect("output length matches");
    out
}

/// Blake2b-256 over a single input.
pub fn blake2b_256(data: &[u8]) -> [u8; 32] {
    let mut out = [0u8; 32];
    out.copy_from_slice(&blake2b(32, &[data]));
    out
}
