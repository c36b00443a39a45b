//! The serialized block insertion queue.
//!
//! All ledger writes originate on one worker thread. Incoming blocks land
//! in three lanes: state blocks awaiting batch signature verification,
//! verified/legacy blocks, and forced blocks used for fork resolution.
//! The worker drains forced first, then verified, then promotes state
//! blocks through the batch verifier. Write transactions are rotated on a
//! time budget so readers never starve.

use ferrite_crypto::sign::SignatureCheck;
use ferrite_ledger::{Ledger, ProcessResult, ProcessReturn};
use ferrite_store::WriteTransaction;
use ferrite_types::{Block, BlockHash, BlockUniquer};
use std::collections::{HashSet, VecDeque};
use std::sync::{Arc, Condvar, Mutex};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

/// State blocks promoted to the verifier per pass.
const VERIFY_BATCH_SIZE: usize = 256;

#[derive(Clone, Debug)]
pub struct BlockProcessorConfig {
    /// Cap on one write transaction's lifetime, ms.
    pub batch_max_time_ms: u64,
    /// Queue depth beyond which network ingest reports full.
    pub max_queue: usize,
}

impl Default for BlockProcessorConfig {
    fn default() -> Self {
        Self {
            batch_max_time_ms: 5_000,
            max_queue: 16_384,
        }
    }
}

struct Lanes {
    /// State blocks whose self-contained signatures await batch checking.
    state_blocks: VecDeque<Arc<Block>>,
    /// Verified state blocks and legacy blocks (their signer depends on
    /// prior chain state, so the ledger checks them).
    blocks: VecDeque<Arc<Block>>,
    /// Fork-resolution insertions; never subject to backpressure.
    forced: VecDeque<Arc<Block>>,
    /// Everything currently queued, for dedup.
    queued: HashSet<BlockHash>,
    stopped: bool,
    /// The worker is mid-batch; flush must keep waiting.
    active: bool,
}

impl Lanes {
    fn depth(&self) -> usize {
        self.state_blocks.len() + self.blocks.len() + self.forced.len()
    }

    fn has_work(&self) -> bool {
        self.depth() > 0
    }
}

type ProcessedFn = dyn Fn(&ProcessReturn, &Arc<Block>) + Send + Sync;

pub struct BlockProcessor {
    ledger: Arc<Ledger>,
    uniquer: Arc<BlockUniquer>,
    config: BlockProcessorConfig,
    lanes: Mutex<Lanes>,
    condition: Condvar,
    processed: Mutex<Option<Box<ProcessedFn>>>,
}

impl BlockProcessor {
    pub fn new(ledger: Arc<Ledger>, uniquer: Arc<BlockUniquer>, config: BlockProcessorConfig) -> Self {
        Self {
            ledger,
            uniquer,
            config,
            lanes: Mutex::new(Lanes {
                state_blocks: VecDeque::new(),
                blocks: VecDeque::new(),
                forced: VecDeque::new(),
                queued: HashSet::new(),
                stopped: false,
                active: false,
            }),
            condition: Condvar::new(),
            processed: Mutex::new(None),
        }
    }

    /// Observer invoked after every ledger attempt, on the worker thread.
    pub fn on_processed(&self, f: impl Fn(&ProcessReturn, &Arc<Block>) + Send + Sync + 'static) {
        *self.processed.lock().expect("hook poisoned") = Some(Box::new(f));
    }

    /// Queue a block from ingest. Duplicates already queued are dropped.
    pub fn add(&self, block: Arc<Block>, rng: &mut impl rand::Rng) -> bool {
        let block = self.uniquer.unique(block, rng);
        let mut lanes = self.lanes.lock().expect("block queue poisoned");
        if lanes.stopped || !lanes.queued.insert(block.hash()) {
            return false;
        }
        match &*block {
            Block::State(_) => lanes.state_blocks.push_back(block),
            _ => lanes.blocks.push_back(block),
        }
        self.condition.notify_all();
        true
    }

    /// Queue a block at the head of the line for fork resolution. The
    /// occupant of the block's root is rolled back before processing.
    pub fn force(&self, block: Arc<Block>) {
        let mut lanes = self.lanes.lock().expect("block queue poisoned");
        lanes.queued.insert(block.hash());
        lanes.forced.push_back(block);
        self.condition.notify_all();
    }

    /// Backpressure signal for network ingest; locally originated blocks
    /// bypass it through [`BlockProcessor::force`].
    pub fn full(&self) -> bool {
        self.lanes.lock().expect("block queue poisoned").depth() >= self.config.max_queue
    }

    pub fn len(&self) -> usize {
        self.lanes.lock().expect("block queue poisoned").depth()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Block until every queued block has been processed.
    pub fn flush(&self) {
        let mut lanes = self.lanes.lock().expect("block queue poisoned");
        while !lanes.stopped && (lanes.has_work() || lanes.active) {
            lanes = self.condition.wait(lanes).expect("block queue poisoned");
        }
    }

    pub fn stop(&self) {
        self.lanes.lock().expect("block queue poisoned").stopped = true;
        self.condition.notify_all();
    }

    /// Run the processing worker until stopped.
    pub fn spawn(self: &Arc<Self>) -> JoinHandle<()> {
        let this = Arc::clone(self);
        std::thread::Builder::new()
            .name("blck proc".into())
            .spawn(move || loop {
                let mut lanes = this.lanes.lock().expect("block queue poisoned");
                if lanes.stopped {
                    break;
                }
                if lanes.has_work() {
                    lanes.active = true;
                    drop(lanes);
                    this.process_batch();
                    let mut lanes = this.lanes.lock().expect("block queue poisoned");
                    lanes.active = false;
                    this.condition.notify_all();
                } else {
                    this.condition.notify_all();
                    let _unused = this.condition.wait(lanes).expect("block queue poisoned");
                }
            })
            .expect("spawning block processor thread")
    }

    /// Pop the next block in lane priority order, promoting state blocks
    /// through the batch verifier when both other lanes are dry.
    fn next_block(&self) -> Option<(Arc<Block>, bool)> {
        loop {
            let promoted = {
                let mut lanes = self.lanes.lock().expect("block queue poisoned");
                if lanes.stopped {
                    return None;
                }
                if let Some(block) = lanes.forced.pop_front() {
                    lanes.queued.remove(&block.hash());
                    return Some((block, true));
                }
                if let Some(block) = lanes.blocks.pop_front() {
                    lanes.queued.remove(&block.hash());
                    return Some((block, false));
                }
                if lanes.state_blocks.is_empty() {
                    return None;
                }
                let take = lanes.state_blocks.len().min(VERIFY_BATCH_SIZE);
                lanes.state_blocks.drain(..take).collect::<Vec<_>>()
            };
            self.verify_state_batch(promoted);
        }
    }

    /// One-pass signature verification for a batch of state blocks, shaped
    /// so a vectorized backend can be slotted in. Valid blocks move to the
    /// verified lane; the rest are dropped here.
    fn verify_state_batch(&self, batch: Vec<Arc<Block>>) {
        let hashes: Vec<BlockHash> = batch.iter().map(|b| b.hash()).collect();
        let checks: Vec<SignatureCheck<'_>> = batch
            .iter()
            .zip(&hashes)
            .map(|(block, hash)| SignatureCheck {
                message: hash.as_bytes(),
                signature: *block.signature(),
                public_key: block
                    .account()
                    .expect("state blocks carry their account")
                    .public_key(),
            })
            .collect();
        let results = ferrite_crypto::validate_batch(&checks);

        let mut lanes = self.lanes.lock().expect("block queue poisoned");
        for (block, valid) in batch.into_iter().zip(results) {
            if valid || self.is_epoch_candidate(&block) {
                lanes.blocks.push_back(block);
            } else {
                lanes.queued.remove(&block.hash());
                tracing::debug!(hash = %block.hash(), "dropping state block with bad signature");
            }
        }
    }

    /// Epoch blocks may be signed by the epoch signer instead of the
    /// account; let the ledger decide those.
    fn is_epoch_candidate(&self, block: &Block) -> bool {
        self.ledger.is_epoch_link(&block.link())
    }

    /// Drain the queue under rotating write transactions. Observer
    /// callbacks run only after the transaction they were produced under
    /// has committed, so they may freely open their own transactions.
    fn process_batch(&self) {
        let budget = Duration::from_millis(self.config.batch_max_time_ms);
        let mut events: Vec<(ProcessReturn, Arc<Block>)> = Vec::new();
        {
            let mut deadline = Instant::now() + budget;
            let mut tx = self.ledger.store().tx_begin_write();
            while let Some((block, forced)) = self.next_block() {
                let result = self.process_one(&mut tx, &block, forced);
                events.push((result, block));
                if Instant::now() >= deadline {
                    // Keep write transactions short; reopen immediately.
                    drop(tx);
                    self.emit(&mut events);
                    tx = self.ledger.store().tx_begin_write();
                    deadline = Instant::now() + budget;
                }
            }
        }
        self.emit(&mut events);
    }

    fn emit(&self, events: &mut Vec<(ProcessReturn, Arc<Block>)>) {
        if events.is_empty() {
            return;
        }
        if let Some(observer) = &*self.processed.lock().expect("hook poisoned") {
            for (result, block) in events.iter() {
                observer(result, block);
            }
        }
        events.clear();
    }

    fn process_one(
        &self,
        tx: &mut WriteTransaction<'_>,
        block: &Arc<Block>,
        forced: bool,
    ) -> ProcessReturn {
        if forced {
            if let Some(existing) = self.ledger.forked_block(tx, block) {
                if existing.hash() != block.hash() {
                    tracing::info!(
                        winner = %block.hash(),
                        losing = %existing.hash(),
                        "rolling back losing fork"
                    );
                    if let Err(error) = self.ledger.rollback(tx, &existing.hash()) {
                        tracing::error!(%error, "fork rollback failed");
                    }
                }
            }
        }

        let result = self.ledger.process(tx, block);
        match result.code {
            ProcessResult::Progress => {
                tracing::debug!(hash = %block.hash(), "block processed");
                self.requeue_dependents(tx, &block.hash());
            }
            ProcessResult::GapPrevious => {
                self.ledger
                    .store()
                    .unchecked
                    .put(tx, &block.previous(), block);
            }
            ProcessResult::GapSource => {
                let dependency = self
                    .ledger
                    .block_source(tx, block)
                    .unwrap_or_else(|| block.link().as_block_hash());
                self.ledger.store().unchecked.put(tx, &dependency, block);
            }
            ProcessResult::Fork => {
                tracing::debug!(hash = %block.hash(), root = %block.root(), "fork detected");
            }
            code => {
                tracing::debug!(hash = %block.hash(), ?code, "block not applied");
            }
        }
        result
    }

    /// A block landed; anything waiting on it becomes processable.
    fn requeue_dependents(&self, tx: &mut WriteTransaction<'_>, hash: &BlockHash) {
        let waiting = self.ledger.store().unchecked.get(tx, hash);
        if waiting.is_empty() {
            return;
        }
        let mut lanes = self.lanes.lock().expect("block queue poisoned");
        for block in waiting {
            self.ledger.store().unchecked.del(tx, hash, &block);
            let block = Arc::new(block);
            if lanes.queued.insert(block.hash()) {
                // Signatures were screened on first entry; the ledger
                // re-validates regardless.
                lanes.blocks.push_back(block);
            }
        }
        self.condition.notify_all();
    }
}
