//! Local vote generation.
//!
//! A voting node signs votes with a strictly increasing sequence per
//! representative key. Fresh votes land in a dirty first tier; a flush
//! worker periodically writes them through to the vote table and promotes
//! them to the clean second tier, which also serves rebroadcast lookups.

use ferrite_crypto::sign_message;
use ferrite_ledger::Ledger;
use ferrite_types::{Account, PrivateKey, Signature, Vote, VoteBlock, MAX_VOTE_HASHES};
use std::collections::HashMap;
use std::sync::{Arc, Condvar, Mutex};
use std::thread::JoinHandle;
use std::time::Duration;

/// How often the flush worker writes the dirty tier out.
const FLUSH_INTERVAL_MS: u64 = 250;

#[derive(Default)]
struct Cache {
    /// Generated but not yet persisted.
    dirty: HashMap<Account, Arc<Vote>>,
    /// Persisted; kept for rebroadcast without a store read.
    flushed: HashMap<Account, Arc<Vote>>,
}

pub struct VoteGenerator {
    ledger: Arc<Ledger>,
    cache: Mutex<Cache>,
    stopped: Mutex<bool>,
    wakeup: Condvar,
}

impl VoteGenerator {
    pub fn new(ledger: Arc<Ledger>) -> Self {
        Self {
            ledger,
            cache: Mutex::new(Cache::default()),
            stopped: Mutex::new(false),
            wakeup: Condvar::new(),
        }
    }

    /// Build, sign, and cache the next vote for `account`.
    ///
    /// The sequence continues from the highest of the cached and persisted
    /// sequences, so restarts never reuse a number once a flush has landed.
    pub fn generate(
        &self,
        account: Account,
        key: &PrivateKey,
        blocks: Vec<VoteBlock>,
    ) -> Arc<Vote> {
        assert!(!blocks.is_empty(), "a vote must endorse something");
        assert!(blocks.len() <= MAX_VOTE_HASHES, "vote payload too large");

        let mut cache = self.cache.lock().expect("vote cache poisoned");
        let cached = cache
            .dirty
            .get(&account)
            .or_else(|| cache.flushed.get(&account))
            .map(|vote| vote.sequence)
            .unwrap_or(0);
        let stored = {
            let tx = self.ledger.store().tx_begin_read();
            self.ledger.store().vote.sequence(&tx, &account)
        };
        let sequence = cached.max(stored) + 1;

        let mut vote = Vote {
            account,
            signature: Signature::ZERO,
            sequence,
            blocks,
        };
        vote.signature = sign_message(vote.hash().as_bytes(), key);
        let vote = Arc::new(vote);
        cache.dirty.insert(account, vote.clone());
        vote
    }

    /// The newest vote this node generated for `account`, from either tier
    /// or the store.
    pub fn last_vote(&self, account: &Account) -> Option<Arc<Vote>> {
        {
            let cache = self.cache.lock().expect("vote cache poisoned");
            if let Some(vote) = cache.dirty.get(account).or_else(|| cache.flushed.get(account)) {
                return Some(vote.clone());
            }
        }
        let tx = self.ledger.store().tx_begin_read();
        self.ledger.store().vote.get(&tx, account).map(Arc::new)
    }

    /// Write the dirty tier through to the vote table.
    pub fn flush(&self) {
        let drained: Vec<(Account, Arc<Vote>)> = {
            let mut cache = self.cache.lock().expect("vote cache poisoned");
            cache.dirty.drain().collect()
        };
        if drained.is_empty() {
            return;
        }
        {
            let mut tx = self.ledger.store().tx_begin_write();
            for (_, vote) in &drained {
                self.ledger.store().vote.put(&mut tx, vote);
            }
        }
        let mut cache = self.cache.lock().expect("vote cache poisoned");
        for (account, vote) in drained {
            cache.flushed.insert(account, vote);
        }
    }

    pub fn dirty_len(&self) -> usize {
        self.cache.lock().expect("vote cache poisoned").dirty.len()
    }

    /// Run the periodic flusher until [`VoteGenerator::stop`].
    pub fn spawn_flusher(self: &Arc<Self>) -> JoinHandle<()> {
        let this = Arc::clone(self);
        std::thread::Builder::new()
            .name("vote flush".into())
            .spawn(move || {
                let interval = Duration::from_millis(FLUSH_INTERVAL_MS);
                let mut stopped = this.stopped.lock().expect("stop flag poisoned");
                while !*stopped {
                    let (guard, _) = this
                        .wakeup
                        .wait_timeout(stopped, interval)
                        .expect("stop flag poisoned");
                    stopped = guard;
                    if *stopped {
                        break;
                    }
                    drop(stopped);
                    this.flush();
                    stopped = this.stopped.lock().expect("stop flag poisoned");
                }
                // Final drain so shutdown never loses sequences.
                this.flush();
            })
            .expect("spawning vote flusher thread")
    }

    pub fn stop(&self) {
        *self.stopped.lock().expect("stop flag poisoned") = true;
        self.wakeup.notify_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ferrite_crypto::KeyPair;
    use ferrite_store::Store;
    use ferrite_types::{BlockHash, NetworkParams, Networks};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn generator() -> VoteGenerator {
        let params = NetworkParams::new(Networks::Test);
        VoteGenerator::new(Arc::new(Ledger::new(Arc::new(Store::new()), params)))
    }

    fn payload(n: u8) -> Vec<VoteBlock> {
        vec![VoteBlock::Hash(BlockHash::new([n; 32]))]
    }

    #[test]
    fn sequences_increase() {
        let generator = generator();
        let mut rng = StdRng::seed_from_u64(1);
        let key = KeyPair::generate(&mut rng);
        let account = Account::from(key.public);

        let first = generator.generate(account, &key.private, payload(1));
        let second = generator.generate(account, &key.private, payload(2));
        assert_eq!(first.sequence, 1);
        assert_eq!(second.sequence, 2);
    }

    #[test]
    fn votes_are_signed() {
        let generator = generator();
        let mut rng = StdRng::seed_from_u64(2);
        let key = KeyPair::generate(&mut rng);
        let account = Account::from(key.public);

        let vote = generator.generate(account, &key.private, payload(1));
        assert!(ferrite_crypto::verify_signature(
            vote.hash().as_bytes(),
            &vote.signature,
            &key.public,
        ));
    }

    #[test]
    fn flush_persists_and_sequence_continues() {
        let generator = generator();
        let mut rng = StdRng::seed_from_u64(3);
        let key = KeyPair::generate(&mut rng);
        let account = Account::from(key.public);

        generator.generate(account, &key.private, payload(1));
        assert_eq!(generator.dirty_len(), 1);
        generator.flush();
        assert_eq!(generator.dirty_len(), 0);

        {
            let tx = generator.ledger.store().tx_begin_read();
            assert_eq!(generator.ledger.store().vote.sequence(&tx, &account), 1);
        }

        // The flushed tier still answers lookups and feeds the sequence.
        assert_eq!(generator.last_vote(&account).unwrap().sequence, 1);
        let next = generator.generate(account, &key.private, payload(2));
        assert_eq!(next.sequence, 2);
    }

    #[test]
    fn last_vote_falls_back_to_store() {
        let generator = generator();
        let mut rng = StdRng::seed_from_u64(4);
        let key = KeyPair::generate(&mut rng);
        let account = Account::from(key.public);

        generator.generate(account, &key.private, payload(1));
        generator.flush();
        // Wipe the in-memory tiers; the store copy remains.
        generator.cache.lock().unwrap().flushed.clear();
        assert_eq!(generator.last_vote(&account).unwrap().sequence, 1);
    }

    #[test]
    #[should_panic(expected = "vote payload too large")]
    fn oversized_payload_panics() {
        let generator = generator();
        let mut rng = StdRng::seed_from_u64(5);
        let key = KeyPair::generate(&mut rng);
        let blocks: Vec<VoteBlock> = (0..13u8)
            .map(|i| VoteBlock::Hash(BlockHash::new([i; 32])))
            .collect();
        generator.generate(Account::from(key.public), &key.private, blocks);
    }
}
