//! Weak-reference interning for blocks and votes.
//!
//! Duplicates arriving from many peers collapse to one allocation. The
//! tables hold weak references keyed by `full_hash`, so dropping the last
//! owner frees the value; dead entries are reaped by randomized sampling on
//! every `unique` call to bound worst-case cost. Callers supply the RNG.

use crate::block::Block;
use crate::hash::BlockHash;
use crate::vote::{Vote, VoteBlock};
use rand::Rng;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, Weak};

/// Dead entries probed per `unique` call.
const CLEANUP_SAMPLES: usize = 2;

fn reap<T>(map: &mut HashMap<BlockHash, Weak<T>>, rng: &mut impl Rng) {
    for _ in 0..CLEANUP_SAMPLES {
        if map.is_empty() {
            break;
        }
        let index = rng.gen_range(0..map.len());
        let key = *map.keys().nth(index).expect("index is in range");
        if map[&key].upgrade().is_none() {
            map.remove(&key);
        }
    }
}

#[derive(Default)]
pub struct BlockUniquer {
    blocks: Mutex<HashMap<BlockHash, Weak<Block>>>,
}

impl BlockUniquer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the canonical shared instance for `block`, registering it if
    /// no live instance exists.
    pub fn unique(&self, block: Arc<Block>, rng: &mut impl Rng) -> Arc<Block> {
        let key = block.full_hash();
        let mut map = self.blocks.lock().expect("uniquer poisoned");
        let result = match map.get(&key).and_then(Weak::upgrade) {
            Some(existing) => existing,
            None => {
                map.insert(key, Arc::downgrade(&block));
                block
            }
        };
        reap(&mut map, rng);
        result
    }

    pub fn len(&self) -> usize {
        self.blocks.lock().expect("uniquer poisoned").len()
    }
}

pub struct VoteUniquer {
    votes: Mutex<HashMap<BlockHash, Weak<Vote>>>,
    block_uniquer: Arc<BlockUniquer>,
}

impl VoteUniquer {
    pub fn new(block_uniquer: Arc<BlockUniquer>) -> Self {
        Self {
            votes: Mutex::new(HashMap::new()),
            block_uniquer,
        }
    }

    /// Intern a vote, routing any full-block payload through the block
    /// uniquer first.
    pub fn unique(&self, vote: Arc<Vote>, rng: &mut impl Rng) -> Arc<Vote> {
        let vote = match vote.blocks.first() {
            Some(VoteBlock::Block(block)) => {
                let canonical = self.block_uniquer.unique(block.clone(), rng);
                if Arc::ptr_eq(&canonical, block) {
                    vote
                } else {
                    let mut rebuilt = (*vote).clone();
                    rebuilt.blocks[0] = VoteBlock::Block(canonical);
                    Arc::new(rebuilt)
                }
            }
            _ => vote,
        };

        let key = vote.full_hash();
        let mut map = self.votes.lock().expect("uniquer poisoned");
        let result = match map.get(&key).and_then(Weak::upgrade) {
            Some(existing) => existing,
            None => {
                map.insert(key, Arc::downgrade(&vote));
                vote
            }
        };
        reap(&mut map, rng);
        result
    }

    pub fn len(&self) -> usize {
        self.votes.lock().expect("uniquer poisoned").len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::SendBlock;
    use crate::{Account, Amount, Signature};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn block(n: u8) -> Arc<Block> {
        Arc::new(Block::Send(SendBlock {
            previous: BlockHash::new([n; 32]),
            destination: Account::new([2; 32]),
            balance: Amount::new(1),
            signature: Signature([3; 64]),
            work: 0,
        }))
    }

    #[test]
    fn duplicates_collapse() {
        let uniquer = BlockUniquer::new();
        let mut rng = StdRng::seed_from_u64(1);
        let a = uniquer.unique(block(1), &mut rng);
        let b = uniquer.unique(block(1), &mut rng);
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(uniquer.len(), 1);
    }

    #[test]
    fn unique_is_idempotent() {
        let uniquer = BlockUniquer::new();
        let mut rng = StdRng::seed_from_u64(2);
        let once = uniquer.unique(block(1), &mut rng);
        let twice = uniquer.unique(once.clone(), &mut rng);
        assert!(Arc::ptr_eq(&once, &twice));
    }

    #[test]
    fn dropped_entries_reaped() {
        let uniquer = BlockUniquer::new();
        let mut rng = StdRng::seed_from_u64(3);
        let keeper = uniquer.unique(block(0), &mut rng);
        for n in 1..=16u8 {
            // Interned then dropped immediately.
            let _ = uniquer.unique(block(n), &mut rng);
        }
        // Repeated calls sample the table and shed dead weak entries.
        for _ in 0..200 {
            let again = uniquer.unique(keeper.clone(), &mut rng);
            assert!(Arc::ptr_eq(&again, &keeper));
        }
        assert!(uniquer.len() < 17);
    }

    #[test]
    fn vote_payload_block_is_interned() {
        let blocks = Arc::new(BlockUniquer::new());
        let votes = VoteUniquer::new(blocks.clone());
        let mut rng = StdRng::seed_from_u64(4);

        let canonical = blocks.unique(block(1), &mut rng);
        let vote = Arc::new(Vote {
            account: Account::new([9; 32]),
            signature: Signature([9; 64]),
            sequence: 1,
            blocks: vec![VoteBlock::Block(block(1))],
        });
        let uniqued = votes.unique(vote, &mut rng);
        match &uniqued.blocks[0] {
            VoteBlock::Block(b) => assert!(Arc::ptr_eq(b, &canonical)),
            other => panic!("expected block payload, got {:?}", other),
        }
    }

    #[test]
    fn distinct_votes_kept_separate() {
        let votes = VoteUniquer::new(Arc::new(BlockUniquer::new()));
        let mut rng = StdRng::seed_from_u64(5);
        let a = Arc::new(Vote {
            account: Account::new([1; 32]),
            signature: Signature([1; 64]),
            sequence: 1,
            blocks: vec![VoteBlock::Hash(BlockHash::new([1; 32]))],
        });
        let b = Arc::new(Vote {
            sequence: 2,
            ..(*a).clone()
        });
        let ua = votes.unique(a, &mut rng);
        let ub = votes.unique(b, &mut rng);
        assert!(!Arc::ptr_eq(&ua, &ub));
        assert_eq!(votes.len(), 2);
    }
}
