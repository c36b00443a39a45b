//! Meta cells and the ledger checksum table.

use crate::environment::Table;
use crate::transaction::{Transaction, WriteTransaction};
use ferrite_types::BlockHash;

/// Distinguished meta key holding the schema version.
const VERSION_KEY: [u8; 1] = [1];

pub struct MetaStore;

impl MetaStore {
    pub fn version_put(&self, tx: &mut WriteTransaction<'_>, version: u32) {
        tx.dbs_mut().put(
            Table::Meta,
            VERSION_KEY.to_vec(),
            version.to_be_bytes().to_vec(),
        );
    }

    /// Stores without a version cell predate versioning and read as 1.
    pub fn version_get(&self, tx: &dyn Transaction) -> u32 {
        tx.dbs()
            .get(Table::Meta, &VERSION_KEY)
            .and_then(|bytes| Some(u32::from_be_bytes(bytes.try_into().ok()?)))
            .unwrap_or(1)
    }

    fn checksum_key(prefix: u64, mask: u8) -> Vec<u8> {
        let mut key = Vec::with_capacity(9);
        key.extend_from_slice(&prefix.to_be_bytes());
        key.push(mask);
        key
    }

    pub fn checksum_put(
        &self,
        tx: &mut WriteTransaction<'_>,
        prefix: u64,
        mask: u8,
        value: &BlockHash,
    ) {
        tx.dbs_mut().put(
            Table::Checksum,
            Self::checksum_key(prefix, mask),
            value.as_bytes().to_vec(),
        );
    }

    pub fn checksum_get(&self, tx: &dyn Transaction, prefix: u64, mask: u8) -> Option<BlockHash> {
        let bytes = tx.dbs().get(Table::Checksum, &Self::checksum_key(prefix, mask))?;
        Some(BlockHash::new(bytes.try_into().ok()?))
    }

    pub fn checksum_del(&self, tx: &mut WriteTransaction<'_>, prefix: u64, mask: u8) {
        tx.dbs_mut()
            .del(Table::Checksum, &Self::checksum_key(prefix, mask));
    }
}
