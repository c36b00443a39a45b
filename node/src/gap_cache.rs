//! Orphan tracking with a vote-weighted bootstrap trigger.
//!
//! Hashes that blocks are waiting on are remembered with the set of
//! representatives seen voting for them. Once the aggregate voter weight
//! passes the bootstrap threshold, the hash is worth a targeted bootstrap
//! attempt.

use ferrite_types::{Account, Amount, BlockHash};
use std::collections::HashMap;
use std::sync::Mutex;

/// Bounded number of tracked orphan hashes.
const MAX_GAP_ENTRIES: usize = 256;

struct GapEntry {
    arrival: u64,
    /// Voter → weight at observation time.
    voters: HashMap<Account, Amount>,
    bootstrap_started: bool,
}

pub struct GapCache {
    entries: Mutex<HashMap<BlockHash, GapEntry>>,
}

impl GapCache {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// The bootstrap threshold: `online_stake × numerator / 16`.
    pub fn bootstrap_threshold(online_stake: Amount, numerator: u32) -> Amount {
        Amount::new(online_stake.raw().saturating_mul(numerator as u128) / 16)
    }

    /// Remember a missing dependency. The oldest entry is evicted at
    /// capacity.
    pub fn add(&self, hash: BlockHash, now: u64) {
        let mut entries = self.entries.lock().expect("gap cache poisoned");
        if let Some(entry) = entries.get_mut(&hash) {
            entry.arrival = now;
            return;
        }
        if entries.len() >= MAX_GAP_ENTRIES {
            if let Some(oldest) = entries
                .iter()
                .min_by_key(|(_, entry)| entry.arrival)
                .map(|(hash, _)| *hash)
            {
                entries.remove(&oldest);
            }
        }
        entries.insert(
            hash,
            GapEntry {
                arrival: now,
                voters: HashMap::new(),
                bootstrap_started: false,
            },
        );
    }

    /// Record a representative voting for a tracked orphan. Returns true
    /// exactly once, when the aggregate voter weight first exceeds
    /// `threshold` — the caller should start a bootstrap for the hash.
    pub fn vote(
        &self,
        hash: &BlockHash,
        representative: Account,
        weight: Amount,
        threshold: Amount,
    ) -> bool {
        let mut entries = self.entries.lock().expect("gap cache poisoned");
        let Some(entry) = entries.get_mut(hash) else {
            return false;
        };
        entry.voters.insert(representative, weight);
        if entry.bootstrap_started {
            return false;
        }
        let total: u128 = entry.voters.values().map(|w| w.raw()).sum();
        if Amount::new(total) > threshold {
            entry.bootstrap_started = true;
            tracing::info!(%hash, voters = entry.voters.len(), "orphan reached bootstrap weight");
            true
        } else {
            false
        }
    }

    pub fn contains(&self, hash: &BlockHash) -> bool {
        self.entries
            .lock()
            .expect("gap cache poisoned")
            .contains_key(hash)
    }

    /// Drop an entry once its block arrived.
    pub fn erase(&self, hash: &BlockHash) {
        self.entries.lock().expect("gap cache poisoned").remove(hash);
    }

    pub fn len(&self) -> usize {
        self.entries.lock().expect("gap cache poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for GapCache {
    fn default() -> Self {
        Self::new()
    }
}
