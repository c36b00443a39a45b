//! The ordered key-value core backing every table.
//!
//! Keys are raw big-endian byte strings so the natural ordering of the map
//! matches the on-disk ordering a B-tree engine would give. The environment
//! permits many concurrent readers and exactly one writer.

use std::collections::BTreeMap;
use std::ops::Bound;
use std::sync::RwLock;

/// Every table in the schema. Account, state-block, and pending tables come
/// in two generations carrying the epoch tag of their records.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Table {
    AccountsV0,
    AccountsV1,
    SendBlocks,
    ReceiveBlocks,
    OpenBlocks,
    ChangeBlocks,
    StateBlocksV0,
    StateBlocksV1,
    PendingV0,
    PendingV1,
    BlockInfo,
    Representation,
    Frontiers,
    Unchecked,
    Checksum,
    Vote,
    Meta,
}

impl Table {
    pub const COUNT: usize = 17;

    fn index(self) -> usize {
        self as usize
    }
}

/// All tables of one store instance.
pub struct Databases {
    tables: Vec<BTreeMap<Vec<u8>, Vec<u8>>>,
}

impl Databases {
    pub(crate) fn new() -> Self {
        Self {
            tables: (0..Table::COUNT).map(|_| BTreeMap::new()).collect(),
        }
    }

    pub fn get(&self, table: Table, key: &[u8]) -> Option<&[u8]> {
        self.tables[table.index()].get(key).map(Vec::as_slice)
    }

    pub fn put(&mut self, table: Table, key: Vec<u8>, value: Vec<u8>) {
        self.tables[table.index()].insert(key, value);
    }

    /// Returns whether the key was present.
    pub fn del(&mut self, table: Table, key: &[u8]) -> bool {
        self.tables[table.index()].remove(key).is_some()
    }

    pub fn exists(&self, table: Table, key: &[u8]) -> bool {
        self.tables[table.index()].contains_key(key)
    }

    pub fn count(&self, table: Table) -> usize {
        self.tables[table.index()].len()
    }

    pub fn clear(&mut self, table: Table) {
        self.tables[table.index()].clear();
    }

    /// Forward iteration from `start` (inclusive) to the end of the table.
    pub fn iter_from<'a>(
        &'a self,
        table: Table,
        start: &[u8],
    ) -> impl Iterator<Item = (&'a [u8], &'a [u8])> + 'a {
        self.tables[table.index()]
            .range::<[u8], _>((Bound::Included(start), Bound::Unbounded))
            .map(|(k, v)| (k.as_slice(), v.as_slice()))
    }

    /// Forward iteration over the whole table.
    pub fn iter<'a>(&'a self, table: Table) -> impl Iterator<Item = (&'a [u8], &'a [u8])> + 'a {
        self.tables[table.index()]
            .iter()
            .map(|(k, v)| (k.as_slice(), v.as_slice()))
    }

    /// The entry at or after `start`, wrapping to the first entry when past
    /// the end.
    pub fn seek_or_wrap<'a>(&'a self, table: Table, start: &[u8]) -> Option<(&'a [u8], &'a [u8])> {
        self.iter_from(table, start)
            .next()
            .or_else(|| self.iter(table).next())
    }
}

/// Shared store environment: many readers, one writer.
pub struct Environment {
    pub(crate) dbs: RwLock<Databases>,
}

impl Environment {
    pub(crate) fn new() -> Self {
        Self {
            dbs: RwLock::new(Databases::new()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ordered_iteration() {
        let mut dbs = Databases::new();
        dbs.put(Table::Meta, vec![3], vec![30]);
        dbs.put(Table::Meta, vec![1], vec![10]);
        dbs.put(Table::Meta, vec![2], vec![20]);

        let keys: Vec<Vec<u8>> = dbs.iter(Table::Meta).map(|(k, _)| k.to_vec()).collect();
        assert_eq!(keys, vec![vec![1], vec![2], vec![3]]);

        let from_two: Vec<Vec<u8>> = dbs
            .iter_from(Table::Meta, &[2])
            .map(|(k, _)| k.to_vec())
            .collect();
        assert_eq!(from_two, vec![vec![2], vec![3]]);
    }

    #[test]
    fn seek_wraps_past_end() {
        let mut dbs = Databases::new();
        dbs.put(Table::Meta, vec![1], vec![]);
        dbs.put(Table::Meta, vec![2], vec![]);
        assert_eq!(dbs.seek_or_wrap(Table::Meta, &[9]).unwrap().0, &[1][..]);
        assert_eq!(dbs.seek_or_wrap(Table::Meta, &[2]).unwrap().0, &[2][..]);
    }

    #[test]
    fn tables_are_independent() {
        let mut dbs = Databases::new();
        dbs.put(Table::SendBlocks, vec![1], vec![1]);
        assert!(!dbs.exists(Table::ReceiveBlocks, &[1]));
        assert_eq!(dbs.count(Table::SendBlocks), 1);
        assert_eq!(dbs.count(Table::ReceiveBlocks), 0);
    }
}
