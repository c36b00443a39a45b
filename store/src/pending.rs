//! Pending receives.
//!
//! A pending entry records an unreceived send: keyed by the destination
//! account and the send block's hash, valued by the source account and the
//! amount in flight. Two generations carry the epoch tag.

use crate::environment::Table;
use crate::iterator::{Generation, MergeIter};
use crate::transaction::{Transaction, WriteTransaction};
use ferrite_types::{Account, Amount, BlockHash, Epoch};

/// Composite key: (destination account, send block hash).
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct PendingKey {
    pub account: Account,
    pub hash: BlockHash,
}

impl PendingKey {
    pub fn new(account: Account, hash: BlockHash) -> Self {
        Self { account, hash }
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(64);
        out.extend_from_slice(self.account.as_bytes());
        out.extend_from_slice(self.hash.as_bytes());
        out
    }

    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        if bytes.len() != 64 {
            return None;
        }
        Some(Self {
            account: Account::new(bytes[0..32].try_into().ok()?),
            hash: BlockHash::new(bytes[32..64].try_into().ok()?),
        })
    }
}

/// The unreceived amount and where it came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PendingInfo {
    pub source: Account,
    pub amount: Amount,
    pub epoch: Epoch,
}

impl PendingInfo {
    pub const SERIALIZED_SIZE: usize = 32 + 16;

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(Self::SERIALIZED_SIZE);
        out.extend_from_slice(self.source.as_bytes());
        out.extend_from_slice(&self.amount.to_be_bytes());
        out
    }

    pub fn from_bytes(bytes: &[u8], epoch: Epoch) -> Option<Self> {
        if bytes.len() != Self::SERIALIZED_SIZE {
            return None;
        }
        Some(Self {
            source: Account::new(bytes[0..32].try_into().ok()?),
            amount: Amount::from_be_bytes(bytes[32..48].try_into().ok()?),
            epoch,
        })
    }
}

fn table_for(epoch: Epoch) -> Table {
    match epoch {
        Epoch::Epoch0 => Table::PendingV0,
        Epoch::Epoch1 => Table::PendingV1,
    }
}

/// Accessor for the two pending tables.
pub struct PendingStore;

impl PendingStore {
    pub fn put(&self, tx: &mut WriteTransaction<'_>, key: &PendingKey, info: &PendingInfo) {
        tx.dbs_mut()
            .put(table_for(info.epoch), key.to_bytes(), info.to_bytes());
    }

    pub fn get(&self, tx: &dyn Transaction, key: &PendingKey) -> Option<PendingInfo> {
        let raw = key.to_bytes();
        if let Some(bytes) = tx.dbs().get(Table::PendingV1, &raw) {
            return PendingInfo::from_bytes(bytes, Epoch::Epoch1);
        }
        let bytes = tx.dbs().get(Table::PendingV0, &raw)?;
        PendingInfo::from_bytes(bytes, Epoch::Epoch0)
    }

    pub fn del(&self, tx: &mut WriteTransaction<'_>, key: &PendingKey) {
        let raw = key.to_bytes();
        tx.dbs_mut().del(Table::PendingV0, &raw);
        tx.dbs_mut().del(Table::PendingV1, &raw);
    }

    pub fn exists(&self, tx: &dyn Transaction, key: &PendingKey) -> bool {
        let raw = key.to_bytes();
        tx.dbs().exists(Table::PendingV0, &raw) || tx.dbs().exists(Table::PendingV1, &raw)
    }

    /// All pending entries for one account, across both generations.
    pub fn iter_account(&self, tx: &dyn Transaction, account: &Account) -> Vec<(PendingKey, PendingInfo)> {
        let start = PendingKey::new(*account, BlockHash::ZERO).to_bytes();
        let v0 = tx.dbs().iter_from(Table::PendingV0, &start);
        let v1 = tx.dbs().iter_from(Table::PendingV1, &start);
        MergeIter::new(v0, v1)
            .map_while(|(key, value, generation)| {
                let key = PendingKey::from_bytes(key)?;
                if key.account != *account {
                    return None;
                }
                let epoch = match generation {
                    Generation::V0 => Epoch::Epoch0,
                    Generation::V1 => Epoch::Epoch1,
                };
                Some((key, PendingInfo::from_bytes(value, epoch)?))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Store;

    fn key(account: u8, hash: u8) -> PendingKey {
        PendingKey::new(Account::new([account; 32]), BlockHash::new([hash; 32]))
    }

    fn info(amount: u128, epoch: Epoch) -> PendingInfo {
        PendingInfo {
            source: Account::new([9; 32]),
            amount: Amount::new(amount),
            epoch,
        }
    }

    #[test]
    fn put_get_del() {
        let store = Store::new();
        let mut tx = store.tx_begin_write();
        let k = key(1, 2);
        store.pending.put(&mut tx, &k, &info(50, Epoch::Epoch0));

        assert!(store.pending.exists(&tx, &k));
        assert_eq!(store.pending.get(&tx, &k).unwrap().amount, Amount::new(50));

        store.pending.del(&mut tx, &k);
        assert!(!store.pending.exists(&tx, &k));
    }

    #[test]
    fn account_scan_stops_at_boundary() {
        let store = Store::new();
        let mut tx = store.tx_begin_write();
        store.pending.put(&mut tx, &key(1, 1), &info(10, Epoch::Epoch0));
        store.pending.put(&mut tx, &key(1, 2), &info(20, Epoch::Epoch1));
        store.pending.put(&mut tx, &key(2, 1), &info(30, Epoch::Epoch0));

        let entries = store.pending.iter_account(&tx, &Account::new([1; 32]));
        assert_eq!(entries.len(), 2);
        let total: u128 = entries.iter().map(|(_, i)| i.amount.raw()).sum();
        assert_eq!(total, 30);
    }

    #[test]
    fn epoch_tag_follows_generation() {
        let store = Store::new();
        let mut tx = store.tx_begin_write();
        let k = key(3, 3);
        store.pending.put(&mut tx, &k, &info(5, Epoch::Epoch1));
        assert_eq!(store.pending.get(&tx, &k).unwrap().epoch, Epoch::Epoch1);
    }
}
