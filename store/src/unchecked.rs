//! Unchecked blocks: the holding area for blocks whose dependency has not
//! arrived yet.
//!
//! Keyed by the missing dependency hash; several blocks may wait on the same
//! dependency, so the stored key is the dependency followed by the waiting
//! block's `full_hash`, which also collapses duplicate submissions.

use crate::environment::Table;
use crate::transaction::{Transaction, WriteTransaction};
use ferrite_types::{Block, BlockHash, BufReader};

pub struct UncheckedStore;

impl UncheckedStore {
    fn key(dependency: &BlockHash, block: &Block) -> Vec<u8> {
        let mut key = Vec::with_capacity(64);
        key.extend_from_slice(dependency.as_bytes());
        key.extend_from_slice(block.full_hash().as_bytes());
        key
    }

    pub fn put(&self, tx: &mut WriteTransaction<'_>, dependency: &BlockHash, block: &Block) {
        let mut value = Vec::with_capacity(1 + block.block_type().serialized_size());
        block.serialize_typed(&mut value);
        tx.dbs_mut()
            .put(Table::Unchecked, Self::key(dependency, block), value);
    }

    /// All blocks waiting on `dependency`.
    pub fn get(&self, tx: &dyn Transaction, dependency: &BlockHash) -> Vec<Block> {
        tx.dbs()
            .iter_from(Table::Unchecked, dependency.as_bytes())
            .take_while(|(key, _)| &key[..32] == dependency.as_bytes())
            .filter_map(|(_, value)| Block::deserialize_typed(&mut BufReader::new(value)).ok())
            .collect()
    }

    pub fn del(&self, tx: &mut WriteTransaction<'_>, dependency: &BlockHash, block: &Block) {
        tx.dbs_mut().del(Table::Unchecked, &Self::key(dependency, block));
    }

    pub fn exists(&self, tx: &dyn Transaction, dependency: &BlockHash, block: &Block) -> bool {
        tx.dbs().exists(Table::Unchecked, &Self::key(dependency, block))
    }

    pub fn count(&self, tx: &dyn Transaction) -> usize {
        tx.dbs().count(Table::Unchecked)
    }

    pub fn clear(&self, tx: &mut WriteTransaction<'_>) {
        tx.dbs_mut().clear(Table::Unchecked);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Store;
    use ferrite_types::{Account, Amount, SendBlock, Signature};

    fn block(n: u8, dependency: BlockHash) -> Block {
        Block::Send(SendBlock {
            previous: dependency,
            destination: Account::new([n; 32]),
            balance: Amount::new(n as u128),
            signature: Signature([0; 64]),
            work: 0,
        })
    }

    #[test]
    fn multiple_waiters_on_one_dependency() {
        let store = Store::new();
        let mut tx = store.tx_begin_write();
        let dep = BlockHash::new([1; 32]);

        store.unchecked.put(&mut tx, &dep, &block(2, dep));
        store.unchecked.put(&mut tx, &dep, &block(3, dep));
        // Duplicate insert collapses.
        store.unchecked.put(&mut tx, &dep, &block(3, dep));

        assert_eq!(store.unchecked.count(&tx), 2);
        assert_eq!(store.unchecked.get(&tx, &dep).len(), 2);

        // A different dependency is untouched by the scan.
        let other = BlockHash::new([9; 32]);
        assert!(store.unchecked.get(&tx, &other).is_empty());
    }

    #[test]
    fn del_removes_single_entry() {
        let store = Store::new();
        let mut tx = store.tx_begin_write();
        let dep = BlockHash::new([1; 32]);
        let a = block(2, dep);
        let b = block(3, dep);
        store.unchecked.put(&mut tx, &dep, &a);
        store.unchecked.put(&mut tx, &dep, &b);

        store.unchecked.del(&mut tx, &dep, &a);
        assert!(!store.unchecked.exists(&tx, &dep, &a));
        assert!(store.unchecked.exists(&tx, &dep, &b));
    }

    #[test]
    fn clear_empties_table() {
        let store = Store::new();
        let mut tx = store.tx_begin_write();
        let dep = BlockHash::new([4; 32]);
        store.unchecked.put(&mut tx, &dep, &block(5, dep));
        store.unchecked.clear(&mut tx);
        assert_eq!(store.unchecked.count(&tx), 0);
    }
}
