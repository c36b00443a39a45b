//! Bridge from parsed wire messages into the node's pipelines.
//!
//! The parser validates envelopes and proof-of-work; this visitor routes
//! what survives: published blocks and confirm_req payloads into the block
//! processor, votes into the vote processor (feeding the gap cache for
//! orphans), keepalives into the peer table, and handshakes through the
//! syn-cookie state.

use crate::node::Node;
use ferrite_messages::{ConfirmAck, ConfirmReq, Keepalive, MessageVisitor, NodeIdHandshake, Publish};
use ferrite_utils::seconds_since_epoch;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::net::SocketAddrV6;
use std::sync::Arc;

pub struct NetworkMessageHandler {
    node: Arc<Node>,
    /// Where the datagram came from.
    pub sender: SocketAddrV6,
    rng: StdRng,
}

impl NetworkMessageHandler {
    pub fn new(node: Arc<Node>, sender: SocketAddrV6) -> Self {
        Self {
            node,
            sender,
            rng: StdRng::from_entropy(),
        }
    }

    fn contacted(&self, version: u8) {
        let now = seconds_since_epoch();
        let mut peers = self.node.peers.lock().expect("peer table poisoned");
        if peers.contacted(self.sender, version, now) {
            tracing::debug!(peer = %self.sender, "new peer, handshake pending");
        }
    }
}

impl MessageVisitor for NetworkMessageHandler {
    fn keepalive(&mut self, message: &Keepalive) {
        self.contacted(message.header.version_using);
        let now = seconds_since_epoch();
        let mut peers = self.node.peers.lock().expect("peer table poisoned");
        for (address, port) in &message.peers {
            if *port == 0 {
                continue;
            }
            let endpoint = SocketAddrV6::new(*address, *port, 0, 0);
            if !peers.reachout(endpoint, now) {
                tracing::trace!(peer = %endpoint, "reaching out to advertised peer");
            }
        }
    }

    fn publish(&mut self, message: &Publish) {
        self.contacted(message.header.version_using);
        self.node
            .process_active(Arc::new(message.block.clone()), &mut self.rng);
    }

    fn confirm_req(&mut self, message: &ConfirmReq) {
        self.contacted(message.header.version_using);
        // The block may be new to us; voting back happens once it settles.
        self.node
            .process_active(Arc::new(message.block.clone()), &mut self.rng);
    }

    fn confirm_ack(&mut self, message: &ConfirmAck) {
        self.contacted(message.header.version_using);
        let vote = Arc::new(message.vote.clone());

        // Votes for orphans accumulate toward the bootstrap trigger.
        let weight = {
            let tx = self.node.ledger.store().tx_begin_read();
            self.node.ledger.weight(&tx, &vote.account)
        };
        let threshold = crate::gap_cache::GapCache::bootstrap_threshold(
            {
                let tx = self.node.ledger.store().tx_begin_read();
                self.node.online.online_stake(
                    ferrite_utils::milliseconds_since_epoch(),
                    |rep| self.node.ledger.weight(&tx, rep),
                )
            },
            self.node.config.bootstrap_fraction_numerator,
        );
        for hash in vote.hashes() {
            if self
                .node
                .gap_cache
                .vote(&hash, vote.account, weight, threshold)
            {
                tracing::info!(%hash, "starting bootstrap for heavily voted orphan");
            }
        }

        self.node.vote_processor.add(vote, &mut self.rng);
    }

    fn node_id_handshake(&mut self, message: &NodeIdHandshake) {
        self.contacted(message.header.version_using);
        if let Some((account, signature)) = &message.response {
            let mut cookies = self.node.syn_cookies.lock().expect("cookies poisoned");
            if cookies.validate(&self.sender, account, signature) {
                tracing::debug!(peer = %self.sender, "handshake response verified");
            } else {
                tracing::debug!(peer = %self.sender, "handshake response rejected");
            }
        }
        if message.query.is_some() {
            // A reply carrying our identity goes out through the transport
            // layer; the cookie for the peer is assigned here.
            let now = seconds_since_epoch();
            let mut cookies = self.node.syn_cookies.lock().expect("cookies poisoned");
            let _ = cookies.assign(&self.sender, now, &mut self.rng);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{NodeConfig, NodeFlags};
    use ferrite_crypto::{sign_message, KeyPair};
    use ferrite_messages::MessageParser;
    use ferrite_types::{Amount, Block, Networks, SendBlock, Signature};
    use std::net::Ipv6Addr;

    fn test_node() -> Arc<Node> {
        let node = Node::new(Networks::Test, NodeConfig::default(), NodeFlags::default()).unwrap();
        node.start();
        node
    }

    fn sender() -> SocketAddrV6 {
        SocketAddrV6::new(Ipv6Addr::new(0x2001, 0xdb8, 0, 0, 0, 0, 0, 1), 7075, 0, 0)
    }

    #[test]
    fn published_block_reaches_ledger() {
        let node = test_node();
        let genesis_account = node.params.genesis_account;
        let genesis_head = {
            let tx = node.ledger.store().tx_begin_read();
            node.ledger.latest(&tx, &genesis_account).unwrap()
        };

        let key = KeyPair::from_hex(ferrite_types::params::DEV_GENESIS_PRIVATE_KEY).unwrap();
        let mut block = Block::Send(SendBlock {
            previous: genesis_head,
            destination: ferrite_types::Account::new([1; 32]),
            balance: Amount::new(u128::MAX - 7),
            signature: Signature::ZERO,
            work: 0,
        });
        let signature = sign_message(block.hash().as_bytes(), &key.private);
        block.set_signature(signature);
        let mut rng = StdRng::seed_from_u64(1);
        let work = ferrite_work::generate_for_tests(
            &block.root(),
            node.params.publish_threshold,
            &mut rng,
        );
        block.set_work(work);

        let message = ferrite_messages::Publish::new(&node.params, block.clone());
        let mut buf = Vec::new();
        message.serialize(&mut buf);

        let mut handler = NetworkMessageHandler::new(node.clone(), sender());
        let mut parser = MessageParser::new(&node.params);
        parser.deserialize_buffer(&buf, &mut handler);
        assert_eq!(parser.status, ferrite_messages::ParseStatus::Success);

        node.block_processor.flush();
        let tx = node.ledger.store().tx_begin_read();
        assert!(node.ledger.block_exists(&tx, &block.hash()));
        drop(tx);

        // The sender is now a known peer.
        assert!(node.peers.lock().unwrap().known_peer(&sender()));

        node.stop();
    }

    #[test]
    fn handshake_query_assigns_cookie() {
        let node = test_node();
        let message = ferrite_messages::NodeIdHandshake::new(&node.params, Some([7; 32]), None);
        let mut buf = Vec::new();
        message.serialize(&mut buf);

        let mut handler = NetworkMessageHandler::new(node.clone(), sender());
        let mut parser = MessageParser::new(&node.params);
        parser.deserialize_buffer(&buf, &mut handler);

        assert_eq!(node.syn_cookies.lock().unwrap().len(), 1);
        node.stop();
    }
}
