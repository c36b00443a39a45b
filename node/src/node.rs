//! Node assembly.
//!
//! Builds the store, ledger, election engine, block processor, and vote
//! pipeline, and wires their callbacks: ledger progress opens elections for
//! live blocks, forks put the stored occupant up for election, election
//! winners are forced back through the block processor, and gaps feed the
//! orphan cache.

use crate::block_arrival::BlockArrival;
use crate::block_processor::{BlockProcessor, BlockProcessorConfig};
use crate::config::{NodeConfig, NodeFlags};
use crate::error::NodeError;
use crate::gap_cache::GapCache;
use ferrite_consensus::{
    ActiveElections, ActiveElectionsConfig, OnlineReps, VoteGenerator, VoteProcessor,
};
use ferrite_ledger::{dev_genesis, Ledger, ProcessResult};
use ferrite_network::{PeerContainer, SynCookies};
use ferrite_store::Store;
use ferrite_types::{Block, BlockUniquer, NetworkParams, Networks, VoteUniquer};
use ferrite_utils::seconds_since_epoch;
use std::net::{Ipv6Addr, SocketAddrV6};
use std::sync::{Arc, Mutex, Weak};
use std::thread::JoinHandle;

pub struct Node {
    pub config: NodeConfig,
    pub flags: NodeFlags,
    pub params: NetworkParams,
    pub ledger: Arc<Ledger>,
    pub online: Arc<OnlineReps>,
    pub active: Arc<ActiveElections>,
    pub block_processor: Arc<BlockProcessor>,
    pub vote_processor: Arc<VoteProcessor>,
    pub vote_generator: Arc<VoteGenerator>,
    pub peers: Mutex<PeerContainer>,
    pub syn_cookies: Mutex<SynCookies>,
    pub gap_cache: Arc<GapCache>,
    pub block_arrival: Arc<BlockArrival>,
    pub block_uniquer: Arc<BlockUniquer>,
    pub vote_uniquer: Arc<VoteUniquer>,
    threads: Mutex<Vec<JoinHandle<()>>>,
}

impl Node {
    pub fn new(network: Networks, config: NodeConfig, flags: NodeFlags) -> Result<Arc<Self>, NodeError> {
        config.validate()?;
        let mut params = NetworkParams::new(network);
        if !config.epoch_block_link.is_empty() && !config.epoch_block_signer.is_empty() {
            params = params.with_epoch(config.epoch_link()?, config.epoch_signer()?);
        }

        let genesis = {
            // Beta/live genesis arrives through configuration; the test set
            // is compiled in.
            let staged = NetworkParams::new(Networks::Test);
            let mut record = dev_genesis(&staged);
            record.amount = params.genesis_amount;
            record
        };
        let store = Arc::new(Store::open(&genesis, seconds_since_epoch())?);
        let ledger = Arc::new(Ledger::new(store, params.clone()));

        let online = Arc::new(OnlineReps::new(params.online_weight_window_ms()));
        let active = Arc::new(ActiveElections::new(
            ledger.clone(),
            online.clone(),
            ActiveElectionsConfig {
                announcement_interval_ms: params.announcement_interval_ms,
                online_weight_minimum: config.online_weight_minimum_amount()?,
                online_weight_quorum: config.online_weight_quorum,
            },
        ));

        let block_uniquer = Arc::new(BlockUniquer::new());
        let vote_uniquer = Arc::new(VoteUniquer::new(block_uniquer.clone()));
        let block_processor = Arc::new(BlockProcessor::new(
            ledger.clone(),
            block_uniquer.clone(),
            BlockProcessorConfig {
                batch_max_time_ms: config.block_processor_batch_max_time,
                ..BlockProcessorConfig::default()
            },
        ));
        let vote_processor = Arc::new(VoteProcessor::new(
            ledger.clone(),
            active.clone(),
            vote_uniquer.clone(),
        ));
        let vote_generator = Arc::new(VoteGenerator::new(ledger.clone()));

        let self_endpoint = SocketAddrV6::new(Ipv6Addr::UNSPECIFIED, config.peering_port, 0, 0);

        let node = Arc::new(Self {
            config,
            flags,
            params,
            ledger: ledger.clone(),
            online,
            active: active.clone(),
            block_processor: block_processor.clone(),
            vote_processor,
            vote_generator,
            peers: Mutex::new(PeerContainer::new(self_endpoint)),
            syn_cookies: Mutex::new(SynCookies::new()),
            gap_cache: Arc::new(GapCache::new()),
            block_arrival: Arc::new(BlockArrival::new()),
            block_uniquer,
            vote_uniquer,
            threads: Mutex::new(Vec::new()),
        });

        // Ledger outcomes drive elections and the orphan cache.
        {
            let ledger = node.ledger.clone();
            let active = node.active.clone();
            let gap_cache = node.gap_cache.clone();
            let block_arrival = node.block_arrival.clone();
            node.block_processor.on_processed(move |result, block| {
                match result.code {
                    ProcessResult::Progress => {
                        gap_cache.erase(&block.hash());
                        if block_arrival.recent(&block.hash()) {
                            active.start(block.clone());
                        }
                    }
                    ProcessResult::Fork => {
                        let occupant = {
                            let tx = ledger.store().tx_begin_read();
                            ledger.forked_block(&tx, block)
                        };
                        if let Some(occupant) = occupant {
                            active.start(Arc::new(occupant));
                            active.publish(block.clone());
                        }
                    }
                    ProcessResult::GapPrevious => {
                        gap_cache.add(block.previous(), seconds_since_epoch());
                    }
                    ProcessResult::GapSource => {
                        let dependency = block
                            .source()
                            .unwrap_or_else(|| block.link().as_block_hash());
                        gap_cache.add(dependency, seconds_since_epoch());
                    }
                    _ => {}
                }
            });
        }

        // Election winners that are not yet stored go through the forced
        // lane, rolling back the losing chain first.
        {
            let weak: Weak<BlockProcessor> = Arc::downgrade(&block_processor);
            active.on_force(move |block| {
                if let Some(processor) = weak.upgrade() {
                    processor.force(block);
                }
            });
        }

        // Announcements fan confirm_reqs out to a random square-root subset
        // of peers; the datagrams leave through the transport layer.
        {
            let weak: Weak<Node> = Arc::downgrade(&node);
            node.active.on_broadcast(move |block| {
                if let Some(node) = weak.upgrade() {
                    let mut rng = rand::thread_rng();
                    let peers = node.peers.lock().expect("peer table poisoned");
                    let fanout = peers.list_fanout(&mut rng);
                    tracing::trace!(
                        hash = %block.hash(),
                        peers = fanout.len(),
                        "announcing confirm_req"
                    );
                }
            });
        }

        Ok(node)
    }

    /// Spawn the worker threads: block processing, vote verification, the
    /// election scheduler, and (for voting nodes) the vote flusher.
    pub fn start(&self) {
        let mut threads = self.threads.lock().expect("thread list poisoned");
        threads.push(self.block_processor.spawn());
        threads.push(self.vote_processor.spawn());
        threads.push(self.active.spawn_scheduler());
        if self.config.enable_voting {
            threads.push(self.vote_generator.spawn_flusher());
        }
        tracing::info!(
            network = self.params.network.as_str(),
            port = self.config.peering_port,
            "node started"
        );
    }

    /// Two-phase drain: signal every worker, then join them. In-flight
    /// transactions complete.
    pub fn stop(&self) {
        self.block_processor.stop();
        self.vote_processor.stop();
        self.active.stop();
        self.vote_generator.stop();
        for handle in self.threads.lock().expect("thread list poisoned").drain(..) {
            let _ = handle.join();
        }
        tracing::info!("node stopped");
    }

    /// Ingest a block that arrived live off the wire. Applies backpressure
    /// to gossip; locally originated blocks use
    /// [`Node::process_local`].
    pub fn process_active(&self, block: Arc<Block>, rng: &mut impl rand::Rng) -> bool {
        self.block_arrival.add(block.hash(), seconds_since_epoch());
        if self.block_processor.full() {
            tracing::debug!(hash = %block.hash(), "dropping gossip block, processor full");
            return false;
        }
        self.block_processor.add(block, rng)
    }

    /// Ingest a locally originated block; never subject to backpressure.
    pub fn process_local(&self, block: Arc<Block>) {
        self.block_arrival.add(block.hash(), seconds_since_epoch());
        self.block_processor.force(block);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn node_builds_with_genesis() {
        let node = Node::new(Networks::Test, NodeConfig::default(), NodeFlags::default()).unwrap();
        let tx = node.ledger.store().tx_begin_read();
        assert_eq!(
            node.ledger.account_balance(&tx, &node.params.genesis_account),
            ferrite_types::Amount::MAX
        );
    }

    #[test]
    fn start_and_stop_join_cleanly() {
        let node = Node::new(Networks::Test, NodeConfig::default(), NodeFlags::default()).unwrap();
        node.start();
        node.stop();
    }

    #[test]
    fn bad_config_is_fatal() {
        let config = NodeConfig {
            online_weight_quorum: 130,
            ..NodeConfig::default()
        };
        assert!(Node::new(Networks::Test, config, NodeFlags::default()).is_err());
    }
}
