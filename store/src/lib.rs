//! Transactional block store.
//!
//! An ordered key-value environment with one table per entity, read/write
//! transactions (writes exclusive across the process), merge iteration over
//! epoch generations, successor pointers, and the schema migration chain.
//! Fresh stores are initialized at the current version with the genesis open
//! block already committed.

pub mod account;
pub mod block;
pub mod environment;
pub mod error;
pub mod frontier;
pub mod iterator;
pub mod meta;
pub mod migration;
pub mod pending;
pub mod representation;
pub mod summation;
pub mod transaction;
pub mod unchecked;
pub mod vote;

pub use account::{AccountInfo, AccountStore};
pub use block::{BlockCounts, BlockInfo, BlockStore};
pub use environment::{Databases, Table};
pub use error::StoreError;
pub use frontier::FrontierStore;
pub use iterator::{Generation, MergeIter};
pub use meta::MetaStore;
pub use migration::STORE_VERSION;
pub use pending::{PendingInfo, PendingKey, PendingStore};
pub use representation::RepresentationStore;
pub use summation::SummationVisitor;
pub use transaction::{ReadTransaction, Transaction, WriteTransaction};
pub use unchecked::UncheckedStore;
pub use vote::VoteStore;

use environment::Environment;
use ferrite_types::{Account, Amount, Block, Epoch};

/// Everything needed to seed a fresh ledger.
#[derive(Clone, Debug)]
pub struct GenesisRecord {
    pub block: Block,
    pub account: Account,
    pub amount: Amount,
}

/// The store façade: the environment plus one accessor per table family.
pub struct Store {
    env: Environment,
    pub account: AccountStore,
    pub block: BlockStore,
    pub pending: PendingStore,
    pub representation: RepresentationStore,
    pub frontier: FrontierStore,
    pub unchecked: UncheckedStore,
    pub vote: VoteStore,
    pub meta: MetaStore,
}

impl Store {
    /// An empty, unversioned environment. Used by tests and by the
    /// migration path; production callers want [`Store::open`].
    pub fn new() -> Self {
        Self {
            env: Environment::new(),
            account: AccountStore,
            block: BlockStore,
            pending: PendingStore,
            representation: RepresentationStore,
            frontier: FrontierStore,
            unchecked: UncheckedStore,
            vote: VoteStore,
            meta: MetaStore,
        }
    }

    /// Open a store: fresh environments are initialized with the genesis
    /// block at the current schema version, existing ones are migrated
    /// forward.
    pub fn open(genesis: &GenesisRecord, now: u64) -> Result<Self, StoreError> {
        let store = Self::new();
        {
            let mut tx = store.tx_begin_write();
            if store.account.count(&tx) == 0 && store.block.counts(&tx).sum() == 0 {
                store.initialize(&mut tx, genesis, now);
            } else {
                migration::upgrade(&store, &mut tx, genesis)?;
            }
        }
        Ok(store)
    }

    pub fn tx_begin_read(&self) -> ReadTransaction<'_> {
        ReadTransaction::new(&self.env)
    }

    pub fn tx_begin_write(&self) -> WriteTransaction<'_> {
        WriteTransaction::new(&self.env)
    }

    /// Seed the genesis open block, its account record, its representation
    /// weight, and its frontier entry; stamp the current schema version.
    pub fn initialize(&self, tx: &mut WriteTransaction<'_>, genesis: &GenesisRecord, now: u64) {
        let hash = genesis.block.hash();
        self.meta.version_put(tx, STORE_VERSION);
        self.block.put(tx, &genesis.block, Epoch::Epoch0);
        self.account.put(
            tx,
            &genesis.account,
            &AccountInfo {
                head: hash,
                rep_block: hash,
                open_block: hash,
                balance: genesis.amount,
                modified: now,
                block_count: 1,
                epoch: Epoch::Epoch0,
            },
        );
        self.representation.put(tx, &genesis.account, genesis.amount);
        self.frontier.put(tx, &hash, &genesis.account);
    }
}

impl Default for Store {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ferrite_types::{BlockHash, OpenBlock, Signature};

    fn genesis() -> GenesisRecord {
        let account = Account::new([0xAA; 32]);
        let block = Block::Open(OpenBlock {
            source: BlockHash::new(*account.as_bytes()),
            representative: account,
            account,
            signature: Signature([1; 64]),
            work: 7,
        });
        GenesisRecord {
            block,
            account,
            amount: Amount::MAX,
        }
    }

    #[test]
    fn open_initializes_genesis() {
        let record = genesis();
        let store = Store::open(&record, 1000).unwrap();
        let tx = store.tx_begin_read();

        assert_eq!(store.meta.version_get(&tx), STORE_VERSION);
        assert!(store.block.exists(&tx, &record.block.hash()));

        let info = store.account.get(&tx, &record.account).unwrap();
        assert_eq!(info.head, record.block.hash());
        assert_eq!(info.open_block, record.block.hash());
        assert_eq!(info.balance, Amount::MAX);
        assert_eq!(info.block_count, 1);
        assert_eq!(info.modified, 1000);

        assert_eq!(store.representation.get(&tx, &record.account), Amount::MAX);
        assert_eq!(
            store.frontier.get(&tx, &record.block.hash()),
            Some(record.account)
        );
    }

    #[test]
    fn write_transactions_are_exclusive() {
        let store = Store::new();
        {
            let _w = store.tx_begin_write();
            // A second write in the same scope would deadlock; sequential
            // writes must succeed.
        }
        let _w2 = store.tx_begin_write();
    }
}
