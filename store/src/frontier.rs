//! Frontier mapping: chain head hash → owning account.

use crate::environment::Table;
use crate::transaction::{Transaction, WriteTransaction};
use ferrite_types::{Account, BlockHash};

pub struct FrontierStore;

impl FrontierStore {
    pub fn put(&self, tx: &mut WriteTransaction<'_>, head: &BlockHash, account: &Account) {
        tx.dbs_mut().put(
            Table::Frontiers,
            head.as_bytes().to_vec(),
            account.as_bytes().to_vec(),
        );
    }

    pub fn get(&self, tx: &dyn Transaction, head: &BlockHash) -> Option<Account> {
        let bytes = tx.dbs().get(Table::Frontiers, head.as_bytes())?;
        Some(Account::new(bytes.try_into().ok()?))
    }

    pub fn del(&self, tx: &mut WriteTransaction<'_>, head: &BlockHash) {
        tx.dbs_mut().del(Table::Frontiers, head.as_bytes());
    }

    pub fn count(&self, tx: &dyn Transaction) -> usize {
        tx.dbs().count(Table::Frontiers)
    }
}
