//! Block tables.
//!
//! Each variant has its own table (state blocks one per epoch generation).
//! Every stored record reserves a trailing 32 bytes for the successor
//! pointer: the hash of the next block on the same chain, maintained on
//! `put` and cleared on rollback. Opens and state blocks with zero previous
//! have no predecessor to rewrite.

use crate::environment::Table;
use crate::transaction::{Transaction, WriteTransaction};
use ferrite_types::{Account, Amount, BlockHash, BlockType, BufReader, Epoch};
use rand::Rng;

use ferrite_types::Block;

/// Cached (account, balance) checkpoint stored for every 32nd block of a
/// chain to bound rollback and balance walks.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BlockInfo {
    pub account: Account,
    pub balance: Amount,
}

impl BlockInfo {
    pub const SERIALIZED_SIZE: usize = 32 + 16;

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(Self::SERIALIZED_SIZE);
        out.extend_from_slice(self.account.as_bytes());
        out.extend_from_slice(&self.balance.to_be_bytes());
        out
    }

    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        if bytes.len() != Self::SERIALIZED_SIZE {
            return None;
        }
        Some(Self {
            account: Account::new(bytes[0..32].try_into().ok()?),
            balance: Amount::from_be_bytes(bytes[32..48].try_into().ok()?),
        })
    }
}

/// Per-table block counts.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BlockCounts {
    pub send: usize,
    pub receive: usize,
    pub open: usize,
    pub change: usize,
    pub state_v0: usize,
    pub state_v1: usize,
}

impl BlockCounts {
    pub fn sum(&self) -> usize {
        self.send + self.receive + self.open + self.change + self.state_v0 + self.state_v1
    }
}

/// (table, variant) pairs in fixed lookup order.
const BLOCK_TABLES: [(Table, BlockType); 6] = [
    (Table::SendBlocks, BlockType::Send),
    (Table::ReceiveBlocks, BlockType::Receive),
    (Table::OpenBlocks, BlockType::Open),
    (Table::ChangeBlocks, BlockType::Change),
    (Table::StateBlocksV0, BlockType::State),
    (Table::StateBlocksV1, BlockType::State),
];

fn table_for(block: &Block, epoch: Epoch) -> Table {
    match block.block_type() {
        BlockType::Send => Table::SendBlocks,
        BlockType::Receive => Table::ReceiveBlocks,
        BlockType::Open => Table::OpenBlocks,
        BlockType::Change => Table::ChangeBlocks,
        BlockType::State => match epoch {
            Epoch::Epoch0 => Table::StateBlocksV0,
            Epoch::Epoch1 => Table::StateBlocksV1,
        },
        BlockType::Invalid | BlockType::NotABlock => unreachable!("not storable"),
    }
}

fn decode_record(value: &[u8], block_type: BlockType) -> Option<(Block, BlockHash)> {
    let body_len = block_type.serialized_size();
    if value.len() != body_len + 32 {
        return None;
    }
    let block = Block::deserialize(&mut BufReader::new(&value[..body_len]), block_type).ok()?;
    let successor = BlockHash::new(value[body_len..].try_into().ok()?);
    Some((block, successor))
}

/// Accessor for the six block tables, the successor pointers, and the
/// block-info checkpoints.
pub struct BlockStore;

impl BlockStore {
    /// Store a block and point its predecessor's successor at it.
    pub fn put(&self, tx: &mut WriteTransaction<'_>, block: &Block, epoch: Epoch) {
        self.put_with_successor(tx, block, epoch, BlockHash::ZERO);
        let previous = block.previous();
        if !previous.is_zero() {
            self.successor_set(tx, &previous, &block.hash());
        }
    }

    /// Store a block with an explicit successor pointer (used when rewriting
    /// a predecessor record in place).
    pub fn put_with_successor(
        &self,
        tx: &mut WriteTransaction<'_>,
        block: &Block,
        epoch: Epoch,
        successor: BlockHash,
    ) {
        let mut value = block.to_bytes();
        value.extend_from_slice(successor.as_bytes());
        tx.dbs_mut()
            .put(table_for(block, epoch), block.hash().as_bytes().to_vec(), value);
    }

    fn raw_get<'a>(
        &self,
        tx: &'a dyn Transaction,
        hash: &BlockHash,
    ) -> Option<(&'a [u8], BlockType, Table)> {
        for (table, block_type) in BLOCK_TABLES {
            if let Some(value) = tx.dbs().get(table, hash.as_bytes()) {
                return Some((value, block_type, table));
            }
        }
        None
    }

    pub fn get(&self, tx: &dyn Transaction, hash: &BlockHash) -> Option<Block> {
        let (value, block_type, _) = self.raw_get(tx, hash)?;
        decode_record(value, block_type).map(|(block, _)| block)
    }

    pub fn exists(&self, tx: &dyn Transaction, hash: &BlockHash) -> bool {
        self.raw_get(tx, hash).is_some()
    }

    pub fn del(&self, tx: &mut WriteTransaction<'_>, hash: &BlockHash) {
        for (table, _) in BLOCK_TABLES {
            if tx.dbs_mut().del(table, hash.as_bytes()) {
                return;
            }
        }
    }

    /// The hash of the next block on the same chain, if any.
    pub fn successor(&self, tx: &dyn Transaction, hash: &BlockHash) -> Option<BlockHash> {
        let (value, block_type, _) = self.raw_get(tx, hash)?;
        let (_, successor) = decode_record(value, block_type)?;
        (!successor.is_zero()).then_some(successor)
    }

    pub fn successor_set(
        &self,
        tx: &mut WriteTransaction<'_>,
        hash: &BlockHash,
        successor: &BlockHash,
    ) {
        let Some((value, _, table)) = self.raw_get(tx, hash) else {
            return;
        };
        let mut rewritten = value.to_vec();
        let tail = rewritten.len() - 32;
        rewritten[tail..].copy_from_slice(successor.as_bytes());
        tx.dbs_mut().put(table, hash.as_bytes().to_vec(), rewritten);
    }

    pub fn successor_clear(&self, tx: &mut WriteTransaction<'_>, hash: &BlockHash) {
        self.successor_set(tx, hash, &BlockHash::ZERO);
    }

    /// Which epoch generation a state block lives in. Legacy blocks are
    /// always epoch 0.
    pub fn version(&self, tx: &dyn Transaction, hash: &BlockHash) -> Epoch {
        if tx.dbs().exists(Table::StateBlocksV1, hash.as_bytes()) {
            Epoch::Epoch1
        } else {
            Epoch::Epoch0
        }
    }

    pub fn counts(&self, tx: &dyn Transaction) -> BlockCounts {
        BlockCounts {
            send: tx.dbs().count(Table::SendBlocks),
            receive: tx.dbs().count(Table::ReceiveBlocks),
            open: tx.dbs().count(Table::OpenBlocks),
            change: tx.dbs().count(Table::ChangeBlocks),
            state_v0: tx.dbs().count(Table::StateBlocksV0),
            state_v1: tx.dbs().count(Table::StateBlocksV1),
        }
    }

    /// A uniformly random stored block: weight tables by their counts, then
    /// seek to a random key, wrapping past the end.
    pub fn random(&self, tx: &dyn Transaction, rng: &mut impl Rng) -> Option<Block> {
        let counts = self.counts(tx);
        let total = counts.sum();
        if total == 0 {
            return None;
        }
        let mut target = rng.gen_range(0..total);
        for (table, block_type) in BLOCK_TABLES {
            let count = tx.dbs().count(table);
            if target < count {
                let mut key = [0u8; 32];
                rng.fill_bytes(&mut key);
                let (_, value) = tx.dbs().seek_or_wrap(table, &key)?;
                return decode_record(value, block_type).map(|(block, _)| block);
            }
            target -= count;
        }
        None
    }

    // ── Block-info checkpoints ──────────────────────────────────────────

    pub fn info_put(&self, tx: &mut WriteTransaction<'_>, hash: &BlockHash, info: &BlockInfo) {
        tx.dbs_mut()
            .put(Table::BlockInfo, hash.as_bytes().to_vec(), info.to_bytes());
    }

    pub fn info_get(&self, tx: &dyn Transaction, hash: &BlockHash) -> Option<BlockInfo> {
        BlockInfo::from_bytes(tx.dbs().get(Table::BlockInfo, hash.as_bytes())?)
    }

    pub fn info_del(&self, tx: &mut WriteTransaction<'_>, hash: &BlockHash) {
        tx.dbs_mut().del(Table::BlockInfo, hash.as_bytes());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Store;
    use ferrite_types::{ChangeBlock, OpenBlock, SendBlock, Signature, StateBlock};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn open_block() -> Block {
        Block::Open(OpenBlock {
            source: BlockHash::new([1; 32]),
            representative: Account::new([2; 32]),
            account: Account::new([3; 32]),
            signature: Signature([0; 64]),
            work: 0,
        })
    }

    fn send_after(previous: BlockHash) -> Block {
        Block::Send(SendBlock {
            previous,
            destination: Account::new([4; 32]),
            balance: Amount::new(10),
            signature: Signature([0; 64]),
            work: 0,
        })
    }

    #[test]
    fn put_get_roundtrip() {
        let store = Store::new();
        let mut tx = store.tx_begin_write();
        let block = open_block();
        store.block.put(&mut tx, &block, Epoch::Epoch0);

        assert!(store.block.exists(&tx, &block.hash()));
        assert_eq!(store.block.get(&tx, &block.hash()), Some(block));
    }

    #[test]
    fn put_links_successor() {
        let store = Store::new();
        let mut tx = store.tx_begin_write();
        let open = open_block();
        let send = send_after(open.hash());

        store.block.put(&mut tx, &open, Epoch::Epoch0);
        assert_eq!(store.block.successor(&tx, &open.hash()), None);

        store.block.put(&mut tx, &send, Epoch::Epoch0);
        assert_eq!(store.block.successor(&tx, &open.hash()), Some(send.hash()));

        store.block.successor_clear(&mut tx, &open.hash());
        assert_eq!(store.block.successor(&tx, &open.hash()), None);
        // Clearing the pointer must not disturb the record itself.
        assert_eq!(store.block.get(&tx, &open.hash()), Some(open));
    }

    #[test]
    fn state_blocks_split_by_epoch() {
        let store = Store::new();
        let mut tx = store.tx_begin_write();
        let state = Block::State(StateBlock {
            account: Account::new([5; 32]),
            previous: BlockHash::ZERO,
            representative: Account::new([6; 32]),
            balance: Amount::new(1),
            link: ferrite_types::Link::ZERO,
            signature: Signature([0; 64]),
            work: 0,
        });
        store.block.put(&mut tx, &state, Epoch::Epoch1);

        assert_eq!(store.block.version(&tx, &state.hash()), Epoch::Epoch1);
        assert_eq!(store.block.counts(&tx).state_v1, 1);
        assert_eq!(store.block.counts(&tx).state_v0, 0);
        assert!(store.block.exists(&tx, &state.hash()));
    }

    #[test]
    fn counts_and_random() {
        let store = Store::new();
        let mut tx = store.tx_begin_write();
        let mut rng = StdRng::seed_from_u64(7);

        assert!(store.block.random(&tx, &mut rng).is_none());

        let open = open_block();
        let send = send_after(open.hash());
        let change = Block::Change(ChangeBlock {
            previous: send.hash(),
            representative: Account::new([9; 32]),
            signature: Signature([0; 64]),
            work: 0,
        });
        store.block.put(&mut tx, &open, Epoch::Epoch0);
        store.block.put(&mut tx, &send, Epoch::Epoch0);
        store.block.put(&mut tx, &change, Epoch::Epoch0);

        assert_eq!(store.block.counts(&tx).sum(), 3);
        for _ in 0..16 {
            assert!(store.block.random(&tx, &mut rng).is_some());
        }
    }

    #[test]
    fn block_info_roundtrip() {
        let store = Store::new();
        let mut tx = store.tx_begin_write();
        let hash = BlockHash::new([8; 32]);
        let info = BlockInfo {
            account: Account::new([1; 32]),
            balance: Amount::new(55),
        };
        store.block.info_put(&mut tx, &hash, &info);
        assert_eq!(store.block.info_get(&tx, &hash), Some(info));
        store.block.info_del(&mut tx, &hash);
        assert_eq!(store.block.info_get(&tx, &hash), None);
    }

    #[test]
    fn delete_removes_block() {
        let store = Store::new();
        let mut tx = store.tx_begin_write();
        let block = open_block();
        store.block.put(&mut tx, &block, Epoch::Epoch0);
        store.block.del(&mut tx, &block.hash());
        assert!(!store.block.exists(&tx, &block.hash()));
    }
}
