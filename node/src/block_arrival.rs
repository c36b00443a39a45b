//! Recent gossip arrivals.
//!
//! Remembers hashes that arrived live off the wire (not via bootstrap) so
//! downstream logic can tell a live block from catch-up traffic. Entries
//! age out after five minutes, but the set never shrinks below a floor so
//! bursts remain queryable.

use ferrite_types::BlockHash;
use std::collections::{HashSet, VecDeque};
use std::sync::Mutex;

/// Entries younger than this are always kept.
const ARRIVAL_WINDOW_SECS: u64 = 300;
/// The set keeps at least this many entries regardless of age.
const ARRIVAL_SIZE_MIN: usize = 8 * 1024;

struct ArrivalState {
    order: VecDeque<(u64, BlockHash)>,
    recent: HashSet<BlockHash>,
}

pub struct BlockArrival {
    state: Mutex<ArrivalState>,
}

impl BlockArrival {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(ArrivalState {
                order: VecDeque::new(),
                recent: HashSet::new(),
            }),
        }
    }

    /// Record a gossip arrival. Returns true when the hash was not already
    /// recent.
    pub fn add(&self, hash: BlockHash, now: u64) -> bool {
        let mut state = self.state.lock().expect("arrival set poisoned");
        let inserted = state.recent.insert(hash);
        if inserted {
            state.order.push_back((now, hash));
        }
        // Age out, but keep the floor.
        while state.order.len() > ARRIVAL_SIZE_MIN {
            match state.order.front() {
                Some((arrived, _)) if now.saturating_sub(*arrived) > ARRIVAL_WINDOW_SECS => {
                    let (_, old) = state.order.pop_front().expect("checked front");
                    state.recent.remove(&old);
                }
                _ => break,
            }
        }
        inserted
    }

    /// Whether the hash arrived via gossip recently.
    pub fn recent(&self, hash: &BlockHash) -> bool {
        self.state
            .lock()
            .expect("arrival set poisoned")
            .recent
            .contains(hash)
    }

    pub fn len(&self) -> usize {
        self.state.lock().expect("arrival set poisoned").recent.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for BlockArrival {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hash(n: u32) -> BlockHash {
        let mut bytes = [0u8; 32];
        bytes[..4].copy_from_slice(&n.to_be_bytes());
        BlockHash::new(bytes)
    }

    #[test]
    fn add_and_query() {
        let arrival = BlockArrival::new();
        assert!(arrival.add(hash(1), 100));
        assert!(!arrival.add(hash(1), 101));
        assert!(arrival.recent(&hash(1)));
        assert!(!arrival.recent(&hash(2)));
    }

    #[test]
    fn floor_prevents_premature_eviction() {
        let arrival = BlockArrival::new();
        for i in 0..100u32 {
            arrival.add(hash(i), 0);
        }
        // Everything is stale but the set is below the floor: all kept.
        arrival.add(hash(u32::MAX), 10_000);
        assert_eq!(arrival.len(), 101);
        assert!(arrival.recent(&hash(0)));
    }

    #[test]
    fn old_entries_age_out_above_floor() {
        let arrival = BlockArrival::new();
        for i in 0..(ARRIVAL_SIZE_MIN + 10) as u32 {
            arrival.add(hash(i), 0);
        }
        // A much later arrival pushes the stale overflow out, down to the
        // floor and no further.
        arrival.add(hash(u32::MAX), 10_000);
        assert_eq!(arrival.len(), ARRIVAL_SIZE_MIN);
        assert!(!arrival.recent(&hash(0)));
        assert!(arrival.recent(&hash(u32::MAX)));
    }
}
