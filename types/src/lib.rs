//! Fundamental types for the ferrite protocol.
//!
//! This crate defines the core types shared across every other crate in the
//! workspace: accounts, hashes, amounts, signatures, the five block variants
//! with their binary and JSON codecs, votes, the weak-reference uniquers,
//! and the per-network parameter set.

pub mod account;
pub mod amount;
pub mod block;
pub mod epoch;
pub mod hash;
pub mod keys;
pub mod params;
pub mod uniquer;
pub mod vote;
pub mod wire;

pub use account::Account;
pub use amount::Amount;
pub use block::{
    Block, BlockType, ChangeBlock, Link, OpenBlock, ReceiveBlock, SendBlock, StateBlock,
};
pub use epoch::Epoch;
pub use hash::{BlockHash, Root};
pub use keys::{PrivateKey, PublicKey, Signature};
pub use params::{NetworkParams, Networks};
pub use uniquer::{BlockUniquer, VoteUniquer};
pub use vote::{Vote, VoteBlock, MAX_VOTE_HASHES};
pub use wire::{BufReader, WireError, WriteExt};
