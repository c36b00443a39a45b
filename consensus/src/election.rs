//! A single election: the candidates contesting one root and the latest
//! vote per representative.
//!
//! The tally credits each candidate with the weight of every representative
//! whose newest vote names it. Sequence numbers are monotone per
//! representative: an equal or lower sequence is a replay and leaves the
//! recorded vote untouched.

use ferrite_types::{Account, Amount, Block, BlockHash, Root};
use std::collections::HashMap;
use std::sync::Arc;

/// The newest vote observed from one representative in this election.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VoteInfo {
    pub time_ms: u64,
    pub sequence: u64,
    pub hash: BlockHash,
}

/// How the election handled an incoming vote.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VoteOutcome {
    /// Recorded as the representative's newest vote.
    Vote,
    /// Superseded by an already-recorded sequence.
    Replay,
}

/// Result snapshot recorded when the election ends.
#[derive(Clone, Debug)]
pub struct ElectionStatus {
    pub root: Root,
    pub winner: Option<Arc<Block>>,
    pub tally: Amount,
    pub started_ms: u64,
    pub ended_ms: u64,
    pub announcements: u32,
}

pub struct Election {
    pub root: Root,
    /// Candidate blocks contesting this root.
    pub blocks: HashMap<BlockHash, Arc<Block>>,
    pub last_votes: HashMap<Account, VoteInfo>,
    pub confirmed: bool,
    pub announcements: u32,
    pub started_ms: u64,
    /// Set once the first tally names a leader or the election confirms.
    pub winner: Option<BlockHash>,
}

impl Election {
    pub fn new(root: Root, block: Arc<Block>, now_ms: u64) -> Self {
        let hash = block.hash();
        let mut blocks = HashMap::new();
        blocks.insert(hash, block);
        Self {
            root,
            blocks,
            last_votes: HashMap::new(),
            confirmed: false,
            announcements: 0,
            started_ms: now_ms,
            winner: Some(hash),
        }
    }

    /// Add a competing candidate. Returns false if it was already present.
    pub fn insert_block(&mut self, block: Arc<Block>) -> bool {
        use std::collections::hash_map::Entry;
        match self.blocks.entry(block.hash()) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                slot.insert(block);
                true
            }
        }
    }

    /// Fold in a representative's vote for `hash`.
    pub fn vote(
        &mut self,
        representative: Account,
        sequence: u64,
        hash: BlockHash,
        now_ms: u64,
    ) -> VoteOutcome {
        match self.last_votes.get(&representative) {
            Some(existing) if sequence <= existing.sequence => VoteOutcome::Replay,
            _ => {
                self.last_votes.insert(
                    representative,
                    VoteInfo {
                        time_ms: now_ms,
                        sequence,
                        hash,
                    },
                );
                VoteOutcome::Vote
            }
        }
    }

    /// Per-candidate weight totals, heaviest first. `weight_of` maps a
    /// representative to its delegated weight.
    pub fn tally(&self, weight_of: &dyn Fn(&Account) -> Amount) -> Vec<(Amount, Arc<Block>)> {
        let mut totals: HashMap<BlockHash, Amount> = HashMap::new();
        for (representative, info) in &self.last_votes {
            if self.blocks.contains_key(&info.hash) {
                let entry = totals.entry(info.hash).or_insert(Amount::ZERO);
                *entry = entry.saturating_add(weight_of(representative));
            }
        }
        let mut result: Vec<(Amount, Arc<Block>)> = totals
            .into_iter()
            .filter_map(|(hash, weight)| Some((weight, self.blocks.get(&hash)?.clone())))
            .collect();
        result.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| b.1.hash().cmp(&a.1.hash())));
        result
    }

    /// Confirm if the leading candidate's tally reaches `delta`.
    /// Returns the winner when this call transitioned the election.
    pub fn try_confirm(
        &mut self,
        delta: Amount,
        weight_of: &dyn Fn(&Account) -> Amount,
    ) -> Option<(Arc<Block>, Amount)> {
        if self.confirmed {
            return None;
        }
        let tally = self.tally(weight_of);
        let (weight, block) = tally.first()?;
        self.winner = Some(block.hash());
        if *weight >= delta {
            self.confirmed = true;
            Some((block.clone(), *weight))
        } else {
            None
        }
    }
}
