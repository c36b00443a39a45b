//! Representative weight totals.
//!
//! One row per representative holding the aggregate balance delegated to it.
//! Deltas are applied with wrapping arithmetic so a debit is an add of the
//! two's-complement amount, keeping the running total exact under any
//! interleaving of credits and debits.

use crate::environment::Table;
use crate::transaction::{Transaction, WriteTransaction};
use ferrite_types::{Account, Amount};

pub struct RepresentationStore;

impl RepresentationStore {
    pub fn get(&self, tx: &dyn Transaction, representative: &Account) -> Amount {
        tx.dbs()
            .get(Table::Representation, representative.as_bytes())
            .and_then(|bytes| Some(Amount::from_be_bytes(bytes.try_into().ok()?)))
            .unwrap_or(Amount::ZERO)
    }

    pub fn put(&self, tx: &mut WriteTransaction<'_>, representative: &Account, weight: Amount) {
        if weight.is_zero() {
            tx.dbs_mut()
                .del(Table::Representation, representative.as_bytes());
        } else {
            tx.dbs_mut().put(
                Table::Representation,
                representative.as_bytes().to_vec(),
                weight.to_be_bytes().to_vec(),
            );
        }
    }

    /// Apply a signed delta expressed as a wrapping unsigned amount.
    pub fn add(&self, tx: &mut WriteTransaction<'_>, representative: &Account, delta: u128) {
        let current = self.get(tx, representative).raw();
        self.put(
            tx,
            representative,
            Amount::new(current.wrapping_add(delta)),
        );
    }

    pub fn clear(&self, tx: &mut WriteTransaction<'_>) {
        tx.dbs_mut().clear(Table::Representation);
    }

    pub fn iter(&self, tx: &dyn Transaction) -> Vec<(Account, Amount)> {
        tx.dbs()
            .iter(Table::Representation)
            .filter_map(|(key, value)| {
                Some((
                    Account::new(key.try_into().ok()?),
                    Amount::from_be_bytes(value.try_into().ok()?),
                ))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Store;

    #[test]
    fn credit_and_debit() {
        let store = Store::new();
        let mut tx = store.tx_begin_write();
        let rep = Account::new([1; 32]);

        store.representation.add(&mut tx, &rep, 100);
        assert_eq!(store.representation.get(&tx, &rep), Amount::new(100));

        // Debit 30 via wrapping add.
        store.representation.add(&mut tx, &rep, 0u128.wrapping_sub(30));
        assert_eq!(store.representation.get(&tx, &rep), Amount::new(70));
    }

    #[test]
    fn zero_weight_rows_are_dropped() {
        let store = Store::new();
        let mut tx = store.tx_begin_write();
        let rep = Account::new([2; 32]);
        store.representation.add(&mut tx, &rep, 10);
        store.representation.add(&mut tx, &rep, 0u128.wrapping_sub(10));
        assert_eq!(store.representation.get(&tx, &rep), Amount::ZERO);
        assert!(store.representation.iter(&tx).is_empty());
    }
}
