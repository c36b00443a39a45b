//! Persisted votes: the highest-sequence vote seen per representative.
//!
//! The stored value is the payload kind byte followed by the vote body, the
//! same layout the wire uses, so a flushed vote round-trips exactly.

use crate::environment::Table;
use crate::transaction::{Transaction, WriteTransaction};
use ferrite_types::{Account, BufReader, Vote};

pub struct VoteStore;

impl VoteStore {
    pub fn put(&self, tx: &mut WriteTransaction<'_>, vote: &Vote) {
        let mut value = Vec::new();
        value.push(vote.wire_block_type().as_u8());
        vote.serialize(&mut value);
        tx.dbs_mut()
            .put(Table::Vote, vote.account.as_bytes().to_vec(), value);
    }

    pub fn get(&self, tx: &dyn Transaction, account: &Account) -> Option<Vote> {
        let value = tx.dbs().get(Table::Vote, account.as_bytes())?;
        let mut reader = BufReader::new(value);
        let kind = ferrite_types::BlockType::from_u8(reader.read_u8().ok()?)?;
        Vote::deserialize(&mut reader, kind).ok()
    }

    /// The persisted sequence for a representative, zero when none.
    pub fn sequence(&self, tx: &dyn Transaction, account: &Account) -> u64 {
        self.get(tx, account).map(|v| v.sequence).unwrap_or(0)
    }

    pub fn count(&self, tx: &dyn Transaction) -> usize {
        tx.dbs().count(Table::Vote)
    }
}
