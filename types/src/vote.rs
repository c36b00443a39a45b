//! Representative votes.
//!
//! A vote names either one full block or a list of up to twelve block hashes
//! (the envelope signals the list form with the `not_a_block` block type).
//! Only the highest-sequence vote per representative is authoritative.

use crate::account::Account;
use crate::block::{Block, BlockType};
use crate::hash::{blake2b_256_parts, BlockHash};
use crate::keys::Signature;
use crate::wire::{BufReader, WireError, WriteExt};
use std::sync::Arc;

/// Domain separator for votes whose payload is expressed as hashes.
const HASH_PREFIX: &[u8] = b"vote ";

/// Maximum hashes a single vote may carry.
pub const MAX_VOTE_HASHES: usize = 12;

/// One payload entry: a shared full block or a bare hash.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum VoteBlock {
    Block(Arc<Block>),
    Hash(BlockHash),
}

impl VoteBlock {
    pub fn hash(&self) -> BlockHash {
        match self {
            VoteBlock::Block(b) => b.hash(),
            VoteBlock::Hash(h) => *h,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Vote {
    pub account: Account,
    pub signature: Signature,
    pub sequence: u64,
    pub blocks: Vec<VoteBlock>,
}

impl Vote {
    /// The hashes this vote endorses, in payload order.
    pub fn hashes(&self) -> Vec<BlockHash> {
        self.blocks.iter().map(VoteBlock::hash).collect()
    }

    /// The signable digest. Multi-hash votes (and single-hash votes in the
    /// hash form) are domain-separated with the `"vote "` prefix; a plain
    /// single-block vote hashes just the block hash and sequence.
    pub fn hash(&self) -> BlockHash {
        let prefixed =
            self.blocks.len() > 1 || matches!(self.blocks.first(), Some(VoteBlock::Hash(_)));
        let hashes = self.hashes();
        let mut parts: Vec<&[u8]> = Vec::with_capacity(hashes.len() + 2);
        if prefixed {
            parts.push(HASH_PREFIX);
        }
        for h in &hashes {
            parts.push(h.as_bytes());
        }
        let sequence = self.sequence.to_le_bytes();
        parts.push(&sequence);
        BlockHash::new(blake2b_256_parts(&parts))
    }

    /// Interning key: folds the signable digest with the voter and signature.
    pub fn full_hash(&self) -> BlockHash {
        BlockHash::new(blake2b_256_parts(&[
            self.hash().as_bytes(),
            self.account.as_bytes(),
            self.signature.as_bytes(),
        ]))
    }

    /// The block type the envelope must carry for this payload.
    pub fn wire_block_type(&self) -> BlockType {
        match self.blocks.first() {
            Some(VoteBlock::Block(b)) => b.block_type(),
            _ => BlockType::NotABlock,
        }
    }

    /// Body serialization; the envelope conveys [`Self::wire_block_type`].
    /// Sequence is little-endian (historical).
    pub fn serialize(&self, buf: &mut Vec<u8>) {
        buf.put_bytes(self.account.as_bytes());
        buf.put_bytes(self.signature.as_bytes());
        buf.put_u64_le(self.sequence);
        for entry in &self.blocks {
            match entry {
                VoteBlock::Block(b) => b.serialize(buf),
                VoteBlock::Hash(h) => buf.put_bytes(h.as_bytes()),
            }
        }
    }

    /// Decode a vote body whose payload kind is named by `block_type`.
    /// Consumes the remainder of the stream; empty payloads and hash lists
    /// longer than [`MAX_VOTE_HASHES`] are rejected.
    pub fn deserialize(
        reader: &mut BufReader<'_>,
        block_type: BlockType,
    ) -> Result<Self, WireError> {
        let account = Account::new(reader.read_array()?);
        let signature = Signature(reader.read_array()?);
        let sequence = reader.read_u64_le()?;

        let mut blocks = Vec::new();
        if block_type == BlockType::NotABlock {
            while !reader.is_empty() {
                if blocks.len() == MAX_VOTE_HASHES {
                    return Err(WireError);
                }
                blocks.push(VoteBlock::Hash(BlockHash::new(reader.read_array()?)));
            }
        } else {
            while !reader.is_empty() {
                let block = Block::deserialize(reader, block_type)?;
                blocks.push(VoteBlock::Block(Arc::new(block)));
            }
        }
        if blocks.is_empty() {
            return Err(WireError);
        }

        Ok(Self {
            account,
            signature,
            sequence,
            blocks,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::{SendBlock, StateBlock};
    use crate::{Amount, Link};

    fn sample_block() -> Arc<Block> {
        Arc::new(Block::Send(SendBlock {
            previous: BlockHash::new([1; 32]),
            destination: Account::new([2; 32]),
            balance: Amount::new(5),
            signature: Signature([3; 64]),
            work: 99,
        }))
    }

    fn hash_vote(hashes: &[BlockHash], sequence: u64) -> Vote {
        Vote {
            account: Account::new([7; 32]),
            signature: Signature([8; 64]),
            sequence,
            blocks: hashes.iter().copied().map(VoteBlock::Hash).collect(),
        }
    }

    #[test]
    fn single_block_vote_roundtrip() {
        let vote = Vote {
            account: Account::new([7; 32]),
            signature: Signature([8; 64]),
            sequence: 11,
            blocks: vec![VoteBlock::Block(sample_block())],
        };
        assert_eq!(vote.wire_block_type(), BlockType::Send);

        let mut buf = Vec::new();
        vote.serialize(&mut buf);
        let decoded = Vote::deserialize(&mut BufReader::new(&buf), BlockType::Send).unwrap();
        assert_eq!(decoded, vote);
        assert_eq!(decoded.hash(), vote.hash());
    }

    #[test]
    fn hash_list_vote_roundtrip() {
        let hashes: Vec<BlockHash> = (1u8..=12).map(|i| BlockHash::new([i; 32])).collect();
        let vote = hash_vote(&hashes, 4);
        assert_eq!(vote.wire_block_type(), BlockType::NotABlock);

        let mut buf = Vec::new();
        vote.serialize(&mut buf);
        let decoded = Vote::deserialize(&mut BufReader::new(&buf), BlockType::NotABlock).unwrap();
        assert_eq!(decoded, vote);
        assert_eq!(decoded.hashes(), hashes);
    }

    #[test]
    fn thirteen_hashes_rejected() {
        let hashes: Vec<BlockHash> = (1u8..=13).map(|i| BlockHash::new([i; 32])).collect();
        let vote = hash_vote(&hashes, 1);
        let mut buf = Vec::new();
        vote.serialize(&mut buf);
        assert!(Vote::deserialize(&mut BufReader::new(&buf), BlockType::NotABlock).is_err());
    }

    #[test]
    fn empty_payload_rejected() {
        let vote = hash_vote(&[BlockHash::new([1; 32])], 1);
        let mut buf = Vec::new();
        vote.serialize(&mut buf);
        // Keep only account + signature + sequence.
        buf.truncate(32 + 64 + 8);
        assert!(Vote::deserialize(&mut BufReader::new(&buf), BlockType::NotABlock).is_err());
    }

    #[test]
    fn hash_domain_separation() {
        let block = sample_block();
        let block_vote = Vote {
            account: Account::new([7; 32]),
            signature: Signature([8; 64]),
            sequence: 4,
            blocks: vec![VoteBlock::Block(block.clone())],
        };
        let by_hash = hash_vote(&[block.hash()], 4);
        // Same endorsement expressed as hash digests differently: the hash
        // form carries the "vote " prefix.
        assert_ne!(block_vote.hash(), by_hash.hash());
    }

    #[test]
    fn sequence_changes_hash() {
        let h = BlockHash::new([9; 32]);
        assert_ne!(hash_vote(&[h], 1).hash(), hash_vote(&[h], 2).hash());
    }
}
