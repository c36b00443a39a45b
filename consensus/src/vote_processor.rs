//! Vote intake: dedup, batched signature verification, aggregation.
//!
//! Votes queue from the network and drain on a single worker. Signatures
//! are verified a batch at a time, mirroring the block processor's checker.
//! A verified vote replaces the stored vote for its representative only
//! when its sequence is strictly greater, then folds into any election that
//! contains one of its hashes.

use crate::active_elections::ActiveElections;
use ferrite_crypto::sign::SignatureCheck;
use ferrite_ledger::Ledger;
use ferrite_types::{Vote, VoteUniquer};
use std::collections::VecDeque;
use std::sync::{Arc, Condvar, Mutex};
use std::thread::JoinHandle;

/// Verdict on one vote.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VoteCode {
    /// New information: stored and dispatched.
    Vote,
    /// Equal or lower sequence than already recorded.
    Replay,
    /// Signature failure.
    Invalid,
}

/// Votes verified per batch.
const BATCH_SIZE: usize = 256;
/// Queue bound; network intake beyond this is dropped.
const MAX_QUEUE: usize = 16 * 1024;

struct QueueState {
    queue: VecDeque<Arc<Vote>>,
    stopped: bool,
    /// A drained batch is still being verified.
    active: bool,
}

pub struct VoteProcessor {
    ledger: Arc<Ledger>,
    active: Arc<ActiveElections>,
    uniquer: Arc<VoteUniquer>,
    state: Mutex<QueueState>,
    condition: Condvar,
}

impl VoteProcessor {
    pub fn new(ledger: Arc<Ledger>, active: Arc<ActiveElections>, uniquer: Arc<VoteUniquer>) -> Self {
        Self {
            ledger,
            active,
            uniquer,
            state: Mutex::new(QueueState {
                queue: VecDeque::new(),
                stopped: false,
                active: false,
            }),
            condition: Condvar::new(),
        }
    }

    /// Enqueue a vote for verification. Returns false when dropped for
    /// backpressure.
    pub fn add(&self, vote: Arc<Vote>, rng: &mut impl rand::Rng) -> bool {
        let vote = self.uniquer.unique(vote, rng);
        let mut state = self.state.lock().expect("vote queue poisoned");
        if state.stopped || state.queue.len() >= MAX_QUEUE {
            return false;
        }
        state.queue.push_back(vote);
        self.condition.notify_all();
        true
    }

    pub fn len(&self) -> usize {
        self.state.lock().expect("vote queue poisoned").queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Verify and apply one vote. `verified` skips the signature check when
    /// a batch already validated it.
    pub fn vote_blocking(&self, vote: &Arc<Vote>, verified: bool) -> VoteCode {
        if !verified {
            let valid = ferrite_crypto::verify_signature(
                vote.hash().as_bytes(),
                &vote.signature,
                &vote.account.public_key(),
            );
            if !valid {
                return VoteCode::Invalid;
            }
        }

        let code = {
            let mut tx = self.ledger.store().tx_begin_write();
            let stored = self.ledger.store().vote.sequence(&tx, &vote.account);
            if vote.sequence > stored {
                self.ledger.store().vote.put(&mut tx, vote);
                VoteCode::Vote
            } else {
                VoteCode::Replay
            }
        };

        // Replays still reach the election: it tracks per-representative
        // sequences itself and re-announces on demand.
        self.active.vote(vote);
        code
    }

    /// Drain and verify one batch. Returns how many votes were handled.
    fn process_batch(&self, batch: Vec<Arc<Vote>>) -> usize {
        let hashes: Vec<_> = batch.iter().map(|vote| vote.hash()).collect();
        let checks: Vec<SignatureCheck<'_>> = batch
            .iter()
            .zip(&hashes)
            .map(|(vote, hash)| SignatureCheck {
                message: hash.as_bytes(),
                signature: vote.signature,
                public_key: vote.account.public_key(),
            })
            .collect();
        let results = ferrite_crypto::validate_batch(&checks);
        for (vote, valid) in batch.iter().zip(results) {
            if valid {
                self.vote_blocking(vote, true);
            } else {
                tracing::debug!(account = %vote.account.encode_hex(), "dropping vote with bad signature");
            }
        }
        batch.len()
    }

    /// Run the verification worker until [`VoteProcessor::stop`].
    pub fn spawn(self: &Arc<Self>) -> JoinHandle<()> {
        let this = Arc::clone(self);
        std::thread::Builder::new()
            .name("vote proc".into())
            .spawn(move || loop {
                let batch: Vec<Arc<Vote>> = {
                    let mut state = this.state.lock().expect("vote queue poisoned");
                    while state.queue.is_empty() && !state.stopped {
                        state = this
                            .condition
                            .wait(state)
                            .expect("vote queue poisoned");
                    }
                    if state.stopped && state.queue.is_empty() {
                        break;
                    }
                    state.active = true;
                    let take = state.queue.len().min(BATCH_SIZE);
                    state.queue.drain(..take).collect()
                };
                this.process_batch(batch);
                this.state.lock().expect("vote queue poisoned").active = false;
                this.condition.notify_all();
            })
            .expect("spawning vote processor thread")
    }

    /// Block until the queue is drained and the in-flight batch finished.
    pub fn flush(&self) {
        let mut state = self.state.lock().expect("vote queue poisoned");
        while !state.stopped && (!state.queue.is_empty() || state.active) {
            state = self.condition.wait(state).expect("vote queue poisoned");
        }
    }

    pub fn stop(&self) {
        self.state.lock().expect("vote queue poisoned").stopped = true;
        self.condition.notify_all();
    }
}
