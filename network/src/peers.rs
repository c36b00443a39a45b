//! The peer table.
//!
//! Tracks every endpoint the node has heard from: contact and attempt
//! times, protocol version, representative weight. Lookups the node needs —
//! most recently contacted, top representatives by weight, a random fanout
//! subset — are served from this one map. All timestamps are seconds since
//! epoch supplied by the caller.

use ferrite_types::{Account, Amount};
use rand::seq::SliceRandom;
use rand::Rng;
use std::collections::HashMap;
use std::net::{Ipv6Addr, SocketAddrV6};

/// At most this many peers per IP address.
const MAX_PEERS_PER_IP: usize = 10;
/// Peers silent longer than this are eligible for purging.
pub const CONTACT_CUTOFF_SECS: u64 = 300;

/// Everything known about one endpoint.
#[derive(Clone, Debug)]
pub struct PeerInfo {
    pub endpoint: SocketAddrV6,
    pub last_contact: u64,
    pub last_attempt: u64,
    pub last_bootstrap_attempt: u64,
    pub last_rep_request: u64,
    /// Voting weight of the representative observed behind this endpoint.
    pub rep_weight: Amount,
    pub rep_account: Option<Account>,
    pub network_version: u8,
}

impl PeerInfo {
    fn new(endpoint: SocketAddrV6, version: u8, now: u64) -> Self {
        Self {
            endpoint,
            last_contact: now,
            last_attempt: now,
            last_bootstrap_attempt: 0,
            last_rep_request: 0,
            rep_weight: Amount::ZERO,
            rep_account: None,
            network_version: version,
        }
    }
}

/// Whether a v4-mapped address falls in a range that never belongs on the
/// open internet.
fn reserved_address(endpoint: &SocketAddrV6) -> bool {
    let Some(v4) = endpoint.ip().to_ipv4_mapped() else {
        return false;
    };
    let octets = v4.octets();
    match octets {
        [0, ..] => true,
        [192, 0, 2, _] => true,
        [198, 51, 100, _] => true,
        [203, 0, 113, _] => true,
        [233, 252, _, _] => true,
        [255, 255, 255, 255] => true,
        [first, ..] if first >= 240 => true,
        _ => false,
    }
}

pub struct PeerContainer {
    peers: HashMap<SocketAddrV6, PeerInfo>,
    /// Recent outbound reachout attempts, for rate limiting.
    attempts: HashMap<SocketAddrV6, u64>,
    self_endpoint: SocketAddrV6,
}

impl PeerContainer {
    pub fn new(self_endpoint: SocketAddrV6) -> Self {
        Self {
            peers: HashMap::new(),
            attempts: HashMap::new(),
            self_endpoint,
        }
    }

    pub fn len(&self) -> usize {
        self.peers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.peers.is_empty()
    }

    pub fn known_peer(&self, endpoint: &SocketAddrV6) -> bool {
        self.peers.contains_key(endpoint)
    }

    /// Endpoints the table will never admit: self, wildcard, reserved
    /// ranges, zero ports.
    pub fn not_a_peer(&self, endpoint: &SocketAddrV6) -> bool {
        *endpoint == self.self_endpoint
            || endpoint.port() == 0
            || *endpoint.ip() == Ipv6Addr::UNSPECIFIED
            || reserved_address(endpoint)
    }

    /// A message arrived from `endpoint`. Updates contact time; returns
    /// true when this peer is new and a handshake should be initiated.
    pub fn contacted(&mut self, endpoint: SocketAddrV6, version: u8, now: u64) -> bool {
        if self.not_a_peer(&endpoint) {
            return false;
        }
        match self.peers.get_mut(&endpoint) {
            Some(info) => {
                info.last_contact = now;
                info.network_version = version;
                false
            }
            None => self.insert(endpoint, version, now),
        }
    }

    /// Admit a new peer, enforcing the per-IP cap. Returns whether the
    /// table grew.
    pub fn insert(&mut self, endpoint: SocketAddrV6, version: u8, now: u64) -> bool {
        if self.not_a_peer(&endpoint) || self.known_peer(&endpoint) {
            return false;
        }
        let same_ip = self
            .peers
            .keys()
            .filter(|existing| existing.ip() == endpoint.ip())
            .count();
        if same_ip >= MAX_PEERS_PER_IP {
            tracing::debug!(%endpoint, "peer rejected, per-IP cap reached");
            return false;
        }
        self.peers.insert(endpoint, PeerInfo::new(endpoint, version, now));
        true
    }

    /// Rate limiter for outbound contact. Returns true when the endpoint
    /// should NOT be reached out to: it is invalid, already known, or was
    /// attempted recently. A false return records the attempt.
    pub fn reachout(&mut self, endpoint: SocketAddrV6, now: u64) -> bool {
        if self.not_a_peer(&endpoint) || self.known_peer(&endpoint) {
            return true;
        }
        if self.attempts.contains_key(&endpoint) {
            return true;
        }
        self.attempts.insert(endpoint, now);
        false
    }

    /// Record a vote observed from a peer, crediting it as that
    /// representative.
    pub fn rep_response(&mut self, endpoint: &SocketAddrV6, account: Account, weight: Amount) {
        if let Some(info) = self.peers.get_mut(endpoint) {
            info.rep_account = Some(account);
            info.rep_weight = weight;
        }
    }

    pub fn rep_request(&mut self, endpoint: &SocketAddrV6, now: u64) {
        if let Some(info) = self.peers.get_mut(endpoint) {
            info.last_rep_request = now;
        }
    }

    pub fn bootstrap_attempt(&mut self, endpoint: &SocketAddrV6, now: u64) {
        if let Some(info) = self.peers.get_mut(endpoint) {
            info.last_bootstrap_attempt = now;
        }
    }

    /// The top `count` peers by representative weight, freshest first on
    /// ties, excluding stale and weightless entries.
    pub fn representatives(&self, count: usize, now: u64) -> Vec<PeerInfo> {
        let cutoff = now.saturating_sub(CONTACT_CUTOFF_SECS);
        let mut reps: Vec<PeerInfo> = self
            .peers
            .values()
            .filter(|info| !info.rep_weight.is_zero() && info.last_contact >= cutoff)
            .cloned()
            .collect();
        reps.sort_by(|a, b| {
            b.rep_weight
                .cmp(&a.rep_weight)
                .then(b.last_contact.cmp(&a.last_contact))
        });
        reps.truncate(count);
        reps
    }

    /// A square-root-sized random subset used for block and vote broadcast.
    pub fn list_fanout(&self, rng: &mut impl Rng) -> Vec<SocketAddrV6> {
        let size = (self.peers.len() as f64).sqrt().ceil() as usize;
        let mut endpoints: Vec<SocketAddrV6> = self.peers.keys().copied().collect();
        endpoints.shuffle(rng);
        endpoints.truncate(size);
        endpoints
    }

    /// All peers, most recently contacted first.
    pub fn list(&self) -> Vec<PeerInfo> {
        let mut all: Vec<PeerInfo> = self.peers.values().cloned().collect();
        all.sort_by(|a, b| b.last_contact.cmp(&a.last_contact));
        all
    }

    /// Drop peers and attempts older than `cutoff`; the removed peers are
    /// returned for disconnect observers.
    pub fn purge_list(&mut self, cutoff: u64) -> Vec<PeerInfo> {
        let stale: Vec<SocketAddrV6> = self
            .peers
            .iter()
            .filter(|(_, info)| info.last_contact < cutoff)
            .map(|(endpoint, _)| *endpoint)
            .collect();
        let mut removed = Vec::with_capacity(stale.len());
        for endpoint in stale {
            if let Some(info) = self.peers.remove(&endpoint) {
                removed.push(info);
            }
        }
        self.attempts.retain(|_, attempted| *attempted >= cutoff);
        removed
    }
}
