//! The active-election set and its announcement scheduler.
//!
//! Elections are indexed two ways: uniquely by root, and ordered by the
//! proof-of-work difficulty of their best candidate so the scheduler
//! rebroadcasts the hardest-working roots first. One mutex guards the whole
//! set; vote intake from any thread takes it briefly. The lock order is
//! always active-set before store transaction.

use crate::election::{Election, ElectionStatus, VoteOutcome};
use crate::online_reps::OnlineReps;
use ferrite_ledger::Ledger;
use ferrite_types::{Amount, Block, BlockHash, Root, Vote};
use std::cmp::Reverse;
use std::collections::{BTreeSet, HashMap, VecDeque};
use std::sync::{Arc, Condvar, Mutex};
use std::thread::JoinHandle;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Roots announced per scheduler tick.
const ANNOUNCEMENTS_PER_INTERVAL: usize = 32;
/// Ticks before an unconfirmed election starts logging.
const ANNOUNCEMENT_MIN: u32 = 2;
/// Ticks after which an election is reported stuck.
const ANNOUNCEMENT_LONG: u32 = 20;
/// Confirmed elections retained for introspection.
const ELECTION_HISTORY_SIZE: usize = 2048;

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

#[derive(Clone, Debug)]
pub struct ActiveElectionsConfig {
    pub announcement_interval_ms: u64,
    /// Floor for the quorum denominator.
    pub online_weight_minimum: Amount,
    /// Percentage (0–100) of online stake a winner must gather.
    pub online_weight_quorum: u8,
}

struct Entry {
    election: Election,
    difficulty: u64,
}

#[derive(Default)]
struct State {
    roots: HashMap<Root, Entry>,
    /// Candidate hash → the root its election contests.
    blocks: HashMap<BlockHash, Root>,
    /// Difficulty-descending announcement order.
    by_difficulty: BTreeSet<(Reverse<u64>, Root)>,
    history: VecDeque<ElectionStatus>,
    /// Roots of retained history entries; a settled root is not re-contested
    /// when its winner echoes back through the processing pipeline.
    recently_confirmed: std::collections::HashSet<Root>,
}

impl State {
    fn retire(&mut self, root: &Root, status: ElectionStatus) {
        if let Some(entry) = self.roots.remove(root) {
            self.by_difficulty.remove(&(Reverse(entry.difficulty), *root));
            for hash in entry.election.blocks.keys() {
                self.blocks.remove(hash);
            }
        }
        self.recently_confirmed.insert(*root);
        self.history.push_back(status);
        while self.history.len() > ELECTION_HISTORY_SIZE {
            if let Some(evicted) = self.history.pop_front() {
                self.recently_confirmed.remove(&evicted.root);
            }
        }
    }
}

type BroadcastFn = dyn Fn(&Block) + Send + Sync;
type ForceFn = dyn Fn(Arc<Block>) + Send + Sync;
type ConfirmedFn = dyn Fn(&ElectionStatus) + Send + Sync;

pub struct ActiveElections {
    ledger: Arc<Ledger>,
    online: Arc<OnlineReps>,
    config: ActiveElectionsConfig,
    state: Mutex<State>,
    stopped: Mutex<bool>,
    wakeup: Condvar,
    broadcast: Mutex<Option<Box<BroadcastFn>>>,
    force_process: Mutex<Option<Box<ForceFn>>>,
    confirmed_observer: Mutex<Option<Box<ConfirmedFn>>>,
}

impl ActiveElections {
    pub fn new(ledger: Arc<Ledger>, online: Arc<OnlineReps>, config: ActiveElectionsConfig) -> Self {
        Self {
            ledger,
            online,
            config,
            state: Mutex::new(State::default()),
            stopped: Mutex::new(false),
            wakeup: Condvar::new(),
            broadcast: Mutex::new(None),
            force_process: Mutex::new(None),
            confirmed_observer: Mutex::new(None),
        }
    }

    /// Install the confirm_req rebroadcast hook.
    pub fn on_broadcast(&self, f: impl Fn(&Block) + Send + Sync + 'static) {
        *self.broadcast.lock().expect("hook poisoned") = Some(Box::new(f));
    }

    /// Install the hook that forces a winning fork into the ledger.
    pub fn on_force(&self, f: impl Fn(Arc<Block>) + Send + Sync + 'static) {
        *self.force_process.lock().expect("hook poisoned") = Some(Box::new(f));
    }

    /// Install the confirmation observer.
    pub fn on_confirmed(&self, f: impl Fn(&ElectionStatus) + Send + Sync + 'static) {
        *self.confirmed_observer.lock().expect("hook poisoned") = Some(Box::new(f));
    }

    /// Open an election for `block` unless its root is already active or
    /// its dependencies are absent. Returns whether a new election started.
    pub fn start(&self, block: Arc<Block>) -> bool {
        let root = block.root();
        {
            let tx = self.ledger.store().tx_begin_read();
            if !self.ledger.could_fit(&tx, &block) {
                return false;
            }
        }
        let difficulty = ferrite_work::work_value(&root, block.work());
        let mut state = self.state.lock().expect("active set poisoned");
        if state.recently_confirmed.contains(&root) {
            return false;
        }
        if state.roots.contains_key(&root) {
            drop(state);
            return !self.publish(block);
        }
        let hash = block.hash();
        let election = Election::new(root, block, now_ms());
        state.roots.insert(
            root,
            Entry {
                election,
                difficulty,
            },
        );
        state.blocks.insert(hash, root);
        state.by_difficulty.insert((Reverse(difficulty), root));
        true
    }

    /// Add a fork candidate to an existing election. Returns false when no
    /// election is active for the block's root.
    pub fn publish(&self, block: Arc<Block>) -> bool {
        let root = block.root();
        let difficulty = ferrite_work::work_value(&root, block.work());
        let hash = block.hash();
        let mut state = self.state.lock().expect("active set poisoned");
        let Some(entry) = state.roots.get_mut(&root) else {
            return false;
        };
        if entry.election.insert_block(block) {
            state.blocks.insert(hash, root);
        }
        // A harder-working candidate promotes the whole root.
        if difficulty > state.roots[&root].difficulty {
            let old = state.roots[&root].difficulty;
            state.by_difficulty.remove(&(Reverse(old), root));
            state.by_difficulty.insert((Reverse(difficulty), root));
            state.roots.get_mut(&root).expect("just read").difficulty = difficulty;
        }
        true
    }

    pub fn active(&self, root: &Root) -> bool {
        self.state
            .lock()
            .expect("active set poisoned")
            .roots
            .contains_key(root)
    }

    /// Whether any active election contains this candidate hash.
    pub fn active_block(&self, hash: &BlockHash) -> bool {
        self.state
            .lock()
            .expect("active set poisoned")
            .blocks
            .contains_key(hash)
    }

    pub fn len(&self) -> usize {
        self.state.lock().expect("active set poisoned").roots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn history(&self) -> Vec<ElectionStatus> {
        self.state
            .lock()
            .expect("active set poisoned")
            .history
            .iter()
            .cloned()
            .collect()
    }

    /// The absolute stake a winner needs:
    /// `max(online_weight_minimum, online_stake) × quorum / 100`.
    pub fn delta(&self) -> Amount {
        let online_stake = {
            let tx = self.ledger.store().tx_begin_read();
            self.online
                .online_stake(now_ms(), |rep| self.ledger.weight(&tx, rep))
        };
        let base = online_stake.max(self.config.online_weight_minimum);
        Amount::new(base.raw().saturating_mul(self.config.online_weight_quorum as u128) / 100)
    }

    /// Fold a verified vote into every election one of its hashes belongs
    /// to. Returns true when at least one active election recognized it.
    pub fn vote(&self, vote: &Vote) -> bool {
        let now = now_ms();
        self.online.observe(vote.account, now);
        let delta = self.delta();

        let mut recognized = false;
        let mut confirmed: Vec<ElectionStatus> = Vec::new();
        {
            let mut state = self.state.lock().expect("active set poisoned");
            for hash in vote.hashes() {
                let Some(root) = state.blocks.get(&hash).copied() else {
                    continue;
                };
                let Some(entry) = state.roots.get_mut(&root) else {
                    continue;
                };
                if entry.election.confirmed {
                    continue;
                }
                recognized = true;
                let outcome = entry
                    .election
                    .vote(vote.account, vote.sequence, hash, now);
                if outcome == VoteOutcome::Replay {
                    continue;
                }
                let tx = self.ledger.store().tx_begin_read();
                let weight_of = |rep: &ferrite_types::Account| self.ledger.weight(&tx, rep);
                if let Some((winner, tally)) = entry.election.try_confirm(delta, &weight_of) {
                    let status = ElectionStatus {
                        root,
                        winner: Some(winner),
                        tally,
                        started_ms: entry.election.started_ms,
                        ended_ms: now,
                        announcements: entry.election.announcements,
                    };
                    drop(tx);
                    state.retire(&root, status.clone());
                    confirmed.push(status);
                }
            }
        }

        for status in &confirmed {
            self.election_won(status);
        }
        recognized
    }

    /// Post-confirmation actions, run outside the set lock: force the
    /// winner into the ledger when it is not the stored occupant of the
    /// root, then notify observers.
    fn election_won(&self, status: &ElectionStatus) {
        if let Some(winner) = &status.winner {
            let stored = {
                let tx = self.ledger.store().tx_begin_read();
                self.ledger.block_exists(&tx, &winner.hash())
            };
            if !stored {
                if let Some(force) = &*self.force_process.lock().expect("hook poisoned") {
                    force(winner.clone());
                }
            }
            tracing::info!(
                root = %status.root,
                winner = %winner.hash(),
                tally = %status.tally,
                "election confirmed"
            );
        }
        if let Some(observer) = &*self.confirmed_observer.lock().expect("hook poisoned") {
            observer(status);
        }
    }

    /// One announcement round: rebroadcast a confirm_req for the first
    /// [`ANNOUNCEMENTS_PER_INTERVAL`] roots in difficulty order and retire
    /// confirmed elections that have been announced enough.
    pub fn tick(&self) {
        let now = now_ms();
        let mut to_broadcast: Vec<Arc<Block>> = Vec::new();
        {
            let mut state = self.state.lock().expect("active set poisoned");
            let roots: Vec<Root> = state
                .by_difficulty
                .iter()
                .take(ANNOUNCEMENTS_PER_INTERVAL)
                .map(|(_, root)| *root)
                .collect();
            for root in roots {
                let Some(entry) = state.roots.get_mut(&root) else {
                    continue;
                };
                entry.election.announcements += 1;
                let announcements = entry.election.announcements;
                if entry.election.confirmed {
                    if announcements >= ANNOUNCEMENT_MIN {
                        let election = &entry.election;
                        let winner = election
                            .winner
                            .and_then(|hash| election.blocks.get(&hash).cloned());
                        let status = ElectionStatus {
                            root,
                            winner,
                            tally: Amount::ZERO,
                            started_ms: election.started_ms,
                            ended_ms: now,
                            announcements,
                        };
                        state.retire(&root, status);
                    }
                    continue;
                }
                if announcements == ANNOUNCEMENT_LONG {
                    tracing::warn!(%root, announcements, "election stuck without a winner");
                } else if announcements >= ANNOUNCEMENT_MIN {
                    tracing::debug!(%root, announcements, "election still unconfirmed");
                }
                let election = &entry.election;
                if let Some(block) = election
                    .winner
                    .and_then(|hash| election.blocks.get(&hash).cloned())
                    .or_else(|| election.blocks.values().next().cloned())
                {
                    to_broadcast.push(block);
                }
            }
        }
        if let Some(broadcast) = &*self.broadcast.lock().expect("hook poisoned") {
            for block in &to_broadcast {
                broadcast(block);
            }
        }
    }

    /// Run the announcement scheduler until [`ActiveElections::stop`].
    pub fn spawn_scheduler(self: &Arc<Self>) -> JoinHandle<()> {
        let this = Arc::clone(self);
        std::thread::Builder::new()
            .name("election sched".into())
            .spawn(move || {
                let interval = Duration::from_millis(this.config.announcement_interval_ms);
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
                    this.tick();
                    stopped = this.stopped.lock().expect("stop flag poisoned");
                }
            })
            .expect("spawning scheduler thread")
    }

    pub fn stop(&self) {
        *self.stopped.lock().expect("stop flag poisoned") = true;
        self.wakeup.notify_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ferrite_crypto::{sign_message, KeyPair};
    use ferrite_ledger::{dev_genesis, ProcessResult};
    use ferrite_store::Store;
    use ferrite_types::{
        Account, NetworkParams, Networks, SendBlock, Signature, VoteBlock,
    };
    use rand::SeedableRng;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn genesis_key() -> KeyPair {
        KeyPair::from_hex(ferrite_types::params::DEV_GENESIS_PRIVATE_KEY).unwrap()
    }

    fn setup() -> (Arc<Ledger>, Arc<ActiveElections>, Block) {
        let params = NetworkParams::new(Networks::Test);
        let ledger = Arc::new(Ledger::new(Arc::new(Store::new()), params.clone()));
        let record = dev_genesis(&params);
        {
            let mut tx = ledger.store().tx_begin_write();
            assert_eq!(
                ledger.process(&mut tx, &record.block).code,
                ProcessResult::Progress
            );
        }
        let online = Arc::new(OnlineReps::new(params.online_weight_window_ms()));
        let active = Arc::new(ActiveElections::new(
            ledger.clone(),
            online,
            ActiveElectionsConfig {
                announcement_interval_ms: params.announcement_interval_ms,
                online_weight_minimum: Amount::new(0),
                online_weight_quorum: 50,
            },
        ));
        (ledger, active, record.block)
    }

    fn signed_send(previous: BlockHash, destination: u8, balance: u128) -> Arc<Block> {
        let mut block = Block::Send(SendBlock {
            previous,
            destination: Account::new([destination; 32]),
            balance: Amount::new(balance),
            signature: Signature::ZERO,
            work: 0,
        });
        let signature = sign_message(block.hash().as_bytes(), &genesis_key().private);
        block.set_signature(signature);
        Arc::new(block)
    }

    fn genesis_vote(sequence: u64, hash: BlockHash) -> Vote {
        let key = genesis_key();
        let mut vote = Vote {
            account: Account::from(key.public),
            signature: Signature::ZERO,
            sequence,
            blocks: vec![VoteBlock::Hash(hash)],
        };
        vote.signature = sign_message(vote.hash().as_bytes(), &key.private);
        vote
    }

    #[test]
    fn start_is_unique_per_root() {
        let (ledger, active, genesis) = setup();
        let a = signed_send(genesis.hash(), 1, u128::MAX - 1);
        let b = signed_send(genesis.hash(), 2, u128::MAX - 2);
        {
            let mut tx = ledger.store().tx_begin_write();
            assert_eq!(ledger.process(&mut tx, &a).code, ProcessResult::Progress);
        }

        assert!(active.start(a.clone()));
        assert!(!active.start(a.clone()));
        // Same root: joins the existing election as a candidate.
        assert!(!active.start(b.clone()));
        assert_eq!(active.len(), 1);
        assert!(active.active_block(&a.hash()));
        assert!(active.active_block(&b.hash()));
    }

    #[test]
    fn full_weight_vote_confirms() {
        let (ledger, active, genesis) = setup();
        let send = signed_send(genesis.hash(), 1, u128::MAX - 100);
        {
            let mut tx = ledger.store().tx_begin_write();
            assert_eq!(ledger.process(&mut tx, &send).code, ProcessResult::Progress);
        }
        assert!(active.start(send.clone()));

        let confirmations = Arc::new(AtomicUsize::new(0));
        let seen = confirmations.clone();
        active.on_confirmed(move |status| {
            assert!(status.winner.is_some());
            seen.fetch_add(1, Ordering::SeqCst);
        });

        assert!(active.vote(&genesis_vote(1, send.hash())));
        assert_eq!(confirmations.load(Ordering::SeqCst), 1);
        // The election retired into history.
        assert_eq!(active.len(), 0);
        assert_eq!(active.history().len(), 1);
        assert_eq!(
            active.history()[0].winner.as_ref().map(|b| b.hash()),
            Some(send.hash())
        );
    }

    #[test]
    fn losing_fork_triggers_force() {
        let (ledger, active, genesis) = setup();
        let stored = signed_send(genesis.hash(), 1, u128::MAX - 1);
        let fork = signed_send(genesis.hash(), 2, u128::MAX - 2);
        {
            let mut tx = ledger.store().tx_begin_write();
            assert_eq!(ledger.process(&mut tx, &stored).code, ProcessResult::Progress);
            assert_eq!(ledger.process(&mut tx, &fork).code, ProcessResult::Fork);
        }
        assert!(active.start(stored.clone()));
        assert!(active.publish(fork.clone()));

        let forced: Arc<Mutex<Vec<BlockHash>>> = Arc::new(Mutex::new(Vec::new()));
        let sink = forced.clone();
        active.on_force(move |block| sink.lock().unwrap().push(block.hash()));

        // Full genesis weight lands on the fork, which is not stored.
        assert!(active.vote(&genesis_vote(1, fork.hash())));
        assert_eq!(*forced.lock().unwrap(), vec![fork.hash()]);
    }

    #[test]
    fn replayed_sequence_does_not_move_votes() {
        let (ledger, active, genesis) = setup();
        let a = signed_send(genesis.hash(), 1, u128::MAX - 1);
        let b = signed_send(genesis.hash(), 2, u128::MAX - 2);
        {
            let mut tx = ledger.store().tx_begin_write();
            assert_eq!(ledger.process(&mut tx, &a).code, ProcessResult::Progress);
        }
        assert!(active.start(a.clone()));
        assert!(active.publish(b.clone()));

        // A weightless representative never reaches quorum, so the election
        // stays open for inspection.
        let mut rng = rand::rngs::StdRng::seed_from_u64(42);
        let voter = ferrite_crypto::KeyPair::generate(&mut rng);
        let cast = |sequence: u64, hash: BlockHash| {
            let mut vote = Vote {
                account: Account::from(voter.public),
                signature: Signature::ZERO,
                sequence,
                blocks: vec![VoteBlock::Hash(hash)],
            };
            vote.signature = sign_message(vote.hash().as_bytes(), &voter.private);
            vote
        };

        assert!(active.vote(&cast(5, a.hash())));
        // An older sequence pointing at the fork is a replay.
        assert!(active.vote(&cast(4, b.hash())));

        let state = active.state.lock().unwrap();
        let entry = &state.roots[&genesis.hash()];
        let info = &entry.election.last_votes[&Account::from(voter.public)];
        assert_eq!(info.sequence, 5);
        assert_eq!(info.hash, a.hash());
    }

    #[test]
    fn tick_announces_and_counts() {
        let (ledger, active, genesis) = setup();
        let send = signed_send(genesis.hash(), 1, u128::MAX - 1);
        {
            let mut tx = ledger.store().tx_begin_write();
            assert_eq!(ledger.process(&mut tx, &send).code, ProcessResult::Progress);
        }
        // Impossible quorum keeps it active across ticks.
        let active = {
            let online = Arc::new(OnlineReps::new(1_000_000));
            Arc::new(ActiveElections::new(
                ledger.clone(),
                online,
                ActiveElectionsConfig {
                    announcement_interval_ms: 10,
                    online_weight_minimum: Amount::MAX,
                    online_weight_quorum: 100,
                },
            ))
        };
        assert!(active.start(send.clone()));

        let announced = Arc::new(AtomicUsize::new(0));
        let counter = announced.clone();
        active.on_broadcast(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        for _ in 0..3 {
            active.tick();
        }
        assert_eq!(announced.load(Ordering::SeqCst), 3);
        let state = active.state.lock().unwrap();
        assert_eq!(state.roots[&genesis.hash()].election.announcements, 3);
    }

    #[test]
    fn delta_uses_floor_when_nobody_votes() {
        let (_, active, _) = setup();
        // No online reps: the configured floor carries the quorum.
        let active_config = ActiveElectionsConfig {
            announcement_interval_ms: 10,
            online_weight_minimum: Amount::new(1000),
            online_weight_quorum: 50,
        };
        let rebuilt = ActiveElections::new(
            active.ledger.clone(),
            Arc::new(OnlineReps::new(100)),
            active_config,
        );
        assert_eq!(rebuilt.delta(), Amount::new(500));
    }
}
