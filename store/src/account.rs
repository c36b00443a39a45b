//! Account records.
//!
//! An account record tracks the chain head, the block that set the current
//! representative, the open block, the confirmed balance, a modification
//! timestamp, and the chain length. The record's epoch is implied by which
//! generation table holds it.

use crate::environment::Table;
use crate::iterator::{Generation, MergeIter};
use crate::transaction::{Transaction, WriteTransaction};
use ferrite_types::{Account, Amount, BlockHash, Epoch};

/// Latest information about an account.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AccountInfo {
    pub head: BlockHash,
    pub rep_block: BlockHash,
    pub open_block: BlockHash,
    pub balance: Amount,
    /// Seconds since epoch of the last modification.
    pub modified: u64,
    pub block_count: u64,
    pub epoch: Epoch,
}

impl AccountInfo {
    pub const SERIALIZED_SIZE: usize = 32 + 32 + 32 + 16 + 8 + 8;

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(Self::SERIALIZED_SIZE);
        out.extend_from_slice(self.head.as_bytes());
        out.extend_from_slice(self.rep_block.as_bytes());
        out.extend_from_slice(self.open_block.as_bytes());
        out.extend_from_slice(&self.balance.to_be_bytes());
        out.extend_from_slice(&self.modified.to_be_bytes());
        out.extend_from_slice(&self.block_count.to_be_bytes());
        out
    }

    pub fn from_bytes(bytes: &[u8], epoch: Epoch) -> Option<Self> {
        if bytes.len() != Self::SERIALIZED_SIZE {
            return None;
        }
        Some(Self {
            head: BlockHash::new(bytes[0..32].try_into().ok()?),
            rep_block: BlockHash::new(bytes[32..64].try_into().ok()?),
            open_block: BlockHash::new(bytes[64..96].try_into().ok()?),
            balance: Amount::from_be_bytes(bytes[96..112].try_into().ok()?),
            modified: u64::from_be_bytes(bytes[112..120].try_into().ok()?),
            block_count: u64::from_be_bytes(bytes[120..128].try_into().ok()?),
            epoch,
        })
    }
}

fn table_for(epoch: Epoch) -> Table {
    match epoch {
        Epoch::Epoch0 => Table::AccountsV0,
        Epoch::Epoch1 => Table::AccountsV1,
    }
}

/// Accessor for the two account tables.
pub struct AccountStore;

impl AccountStore {
    /// Write the record into its epoch's generation, clearing any stale copy
    /// in the other one.
    pub fn put(&self, tx: &mut WriteTransaction<'_>, account: &Account, info: &AccountInfo) {
        let other = match info.epoch {
            Epoch::Epoch0 => Table::AccountsV1,
            Epoch::Epoch1 => Table::AccountsV0,
        };
        tx.dbs_mut().del(other, account.as_bytes());
        tx.dbs_mut().put(
            table_for(info.epoch),
            account.as_bytes().to_vec(),
            info.to_bytes(),
        );
    }

    pub fn get(&self, tx: &dyn Transaction, account: &Account) -> Option<AccountInfo> {
        if let Some(bytes) = tx.dbs().get(Table::AccountsV1, account.as_bytes()) {
            return AccountInfo::from_bytes(bytes, Epoch::Epoch1);
        }
        let bytes = tx.dbs().get(Table::AccountsV0, account.as_bytes())?;
        AccountInfo::from_bytes(bytes, Epoch::Epoch0)
    }

    pub fn del(&self, tx: &mut WriteTransaction<'_>, account: &Account) {
        tx.dbs_mut().del(Table::AccountsV0, account.as_bytes());
        tx.dbs_mut().del(Table::AccountsV1, account.as_bytes());
    }

    pub fn exists(&self, tx: &dyn Transaction, account: &Account) -> bool {
        tx.dbs().exists(Table::AccountsV0, account.as_bytes())
            || tx.dbs().exists(Table::AccountsV1, account.as_bytes())
    }

    pub fn count(&self, tx: &dyn Transaction) -> usize {
        tx.dbs().count(Table::AccountsV0) + tx.dbs().count(Table::AccountsV1)
    }

    /// All accounts across both generations, in key order, starting at
    /// `start`.
    pub fn iter_from(
        &self,
        tx: &dyn Transaction,
        start: &Account,
    ) -> Vec<(Account, AccountInfo)> {
        let v0 = tx.dbs().iter_from(Table::AccountsV0, start.as_bytes());
        let v1 = tx.dbs().iter_from(Table::AccountsV1, start.as_bytes());
        MergeIter::new(v0, v1)
            .filter_map(|(key, value, generation)| {
                let account = Account::new(key.try_into().ok()?);
                let epoch = match generation {
                    Generation::V0 => Epoch::Epoch0,
                    Generation::V1 => Epoch::Epoch1,
                };
                Some((account, AccountInfo::from_bytes(value, epoch)?))
            })
            .collect()
    }

    pub fn iter(&self, tx: &dyn Transaction) -> Vec<(Account, AccountInfo)> {
        self.iter_from(tx, &Account::ZERO)
    }
}
