//! Schema migrations.
//!
//! A store opened at any historical version is upgraded in order, one
//! version per step, each step stamping the version cell first so a crashed
//! upgrade resumes idempotently. The chain covers: widening account records
//! (open block, then block count), recomputing representation totals,
//! rewriting pending entries to destination keys, populating successor
//! pointers, retiring the standalone sequence store in favor of the vote
//! table, and resetting the unchecked table.

use crate::account::AccountInfo;
use crate::block::BlockInfo;
use crate::environment::Table;
use crate::error::StoreError;
use crate::pending::{PendingInfo, PendingKey};
use crate::summation::SummationVisitor;
use crate::transaction::{Transaction, WriteTransaction};
use crate::{GenesisRecord, Store};
use ferrite_types::{Account, Amount, BlockHash, Epoch};

/// Current schema version.
pub const STORE_VERSION: u32 = 12;

/// One block-info checkpoint per this many blocks of a chain.
pub const BLOCK_INFO_MAX: u64 = 32;

/// Bring the schema up to [`STORE_VERSION`].
pub fn upgrade(
    store: &Store,
    tx: &mut WriteTransaction<'_>,
    genesis: &GenesisRecord,
) -> Result<(), StoreError> {
    loop {
        let version = store.meta.version_get(tx);
        match version {
            1 => upgrade_v1_to_v2(store, tx),
            2 => upgrade_v2_to_v3(store, tx),
            3 => upgrade_v3_to_v4(store, tx),
            4 => upgrade_v4_to_v5(store, tx),
            5 => upgrade_v5_to_v6(store, tx),
            6 => upgrade_v6_to_v7(store, tx),
            7 => upgrade_v7_to_v8(store, tx),
            8 => upgrade_v8_to_v9(store, tx),
            9 => upgrade_v9_to_v10(store, tx, genesis),
            10 => upgrade_v10_to_v11(store, tx),
            11 => upgrade_v11_to_v12(store, tx),
            STORE_VERSION => return Ok(()),
            newer => return Err(StoreError::VersionFromFuture(newer)),
        }
        tracing::info!(from = version, to = version + 1, "store schema upgraded");
    }
}

/// v1 account record: head, rep_block, balance, modified (88 bytes).
fn parse_v1_account(bytes: &[u8]) -> Option<(BlockHash, BlockHash, Amount, u64)> {
    if bytes.len() != 88 {
        return None;
    }
    Some((
        BlockHash::new(bytes[0..32].try_into().ok()?),
        BlockHash::new(bytes[32..64].try_into().ok()?),
        Amount::from_be_bytes(bytes[64..80].try_into().ok()?),
        u64::from_be_bytes(bytes[80..88].try_into().ok()?),
    ))
}

/// v2–v5 account record: head, rep_block, open_block, balance, modified
/// (120 bytes).
fn parse_v5_account(bytes: &[u8]) -> Option<(BlockHash, BlockHash, BlockHash, Amount, u64)> {
    if bytes.len() != 120 {
        return None;
    }
    Some((
        BlockHash::new(bytes[0..32].try_into().ok()?),
        BlockHash::new(bytes[32..64].try_into().ok()?),
        BlockHash::new(bytes[64..96].try_into().ok()?),
        Amount::from_be_bytes(bytes[96..112].try_into().ok()?),
        u64::from_be_bytes(bytes[112..120].try_into().ok()?),
    ))
}

fn serialize_v5_account(
    head: BlockHash,
    rep_block: BlockHash,
    open_block: BlockHash,
    balance: Amount,
    modified: u64,
) -> Vec<u8> {
    let mut out = Vec::with_capacity(120);
    out.extend_from_slice(head.as_bytes());
    out.extend_from_slice(rep_block.as_bytes());
    out.extend_from_slice(open_block.as_bytes());
    out.extend_from_slice(&balance.to_be_bytes());
    out.extend_from_slice(&modified.to_be_bytes());
    out
}

fn snapshot_accounts_v0(tx: &dyn Transaction) -> Vec<(Vec<u8>, Vec<u8>)> {
    tx.dbs()
        .iter(Table::AccountsV0)
        .map(|(k, v)| (k.to_vec(), v.to_vec()))
        .collect()
}

/// Widen account records with the open block, found by walking the chain
/// back from the head.
fn upgrade_v1_to_v2(store: &Store, tx: &mut WriteTransaction<'_>) {
    store.meta.version_put(tx, 2);
    for (key, value) in snapshot_accounts_v0(tx) {
        let Some((head, rep_block, balance, modified)) = parse_v1_account(&value) else {
            continue;
        };
        let mut open = head;
        while let Some(block) = store.block.get(tx, &open) {
            if block.previous().is_zero() {
                break;
            }
            open = block.previous();
        }
        tx.dbs_mut().put(
            Table::AccountsV0,
            key,
            serialize_v5_account(head, rep_block, open, balance, modified),
        );
    }
}

/// Recompute the representation table from scratch and repoint `rep_block`
/// at the newest block that actually set a representative.
fn upgrade_v2_to_v3(store: &Store, tx: &mut WriteTransaction<'_>) {
    store.meta.version_put(tx, 3);
    store.representation.clear(tx);
    for (key, value) in snapshot_accounts_v0(tx) {
        let Some((head, _, open, balance, modified)) = parse_v5_account(&value) else {
            continue;
        };
        let mut cursor = head;
        let mut rep_block = BlockHash::ZERO;
        while let Some(block) = store.block.get(tx, &cursor) {
            if block.representative().is_some() {
                rep_block = cursor;
                break;
            }
            cursor = block.previous();
        }
        if let Some(rep) = store
            .block
            .get(tx, &rep_block)
            .and_then(|b| b.representative())
        {
            store.representation.add(tx, &rep, balance.raw());
        }
        tx.dbs_mut().put(
            Table::AccountsV0,
            key,
            serialize_v5_account(head, rep_block, open, balance, modified),
        );
    }
}

/// Rewrite pending entries from send-hash keys to (destination, hash) keys.
fn upgrade_v3_to_v4(store: &Store, tx: &mut WriteTransaction<'_>) {
    store.meta.version_put(tx, 4);
    let legacy: Vec<(Vec<u8>, Vec<u8>)> = tx
        .dbs()
        .iter(Table::PendingV0)
        .map(|(k, v)| (k.to_vec(), v.to_vec()))
        .collect();
    tx.dbs_mut().clear(Table::PendingV0);
    for (key, value) in legacy {
        // Legacy value: source, amount, destination.
        if key.len() != 32 || value.len() != 80 {
            continue;
        }
        let hash = BlockHash::new(key.as_slice().try_into().expect("checked length"));
        let source = Account::new(value[0..32].try_into().expect("checked length"));
        let amount = Amount::from_be_bytes(value[32..48].try_into().expect("checked length"));
        let destination = Account::new(value[48..80].try_into().expect("checked length"));
        store.pending.put(
            tx,
            &PendingKey::new(destination, hash),
            &PendingInfo {
                source,
                amount,
                epoch: Epoch::Epoch0,
            },
        );
    }
}

/// Populate missing successor pointers by walking each chain from the head.
fn upgrade_v4_to_v5(store: &Store, tx: &mut WriteTransaction<'_>) {
    store.meta.version_put(tx, 5);
    for (_, value) in snapshot_accounts_v0(tx) {
        let Some((head, ..)) = parse_v5_account(&value) else {
            continue;
        };
        let mut successor = BlockHash::ZERO;
        let mut cursor = head;
        while let Some(block) = store.block.get(tx, &cursor) {
            if !successor.is_zero() && store.block.successor(tx, &cursor).is_none() {
                store.block.successor_set(tx, &cursor, &successor);
            }
            successor = cursor;
            if block.previous().is_zero() {
                break;
            }
            cursor = block.previous();
        }
    }
}

/// Widen account records with the chain length.
fn upgrade_v5_to_v6(store: &Store, tx: &mut WriteTransaction<'_>) {
    store.meta.version_put(tx, 6);
    for (key, value) in snapshot_accounts_v0(tx) {
        let Some((head, rep_block, open, balance, modified)) = parse_v5_account(&value) else {
            continue;
        };
        let mut block_count = 0u64;
        let mut cursor = head;
        while let Some(block) = store.block.get(tx, &cursor) {
            block_count += 1;
            if block.previous().is_zero() {
                break;
            }
            cursor = block.previous();
        }
        let info = AccountInfo {
            head,
            rep_block,
            open_block: open,
            balance,
            modified,
            block_count,
            epoch: Epoch::Epoch0,
        };
        tx.dbs_mut().put(Table::AccountsV0, key, info.to_bytes());
    }
}

fn upgrade_v6_to_v7(store: &Store, tx: &mut WriteTransaction<'_>) {
    store.meta.version_put(tx, 7);
    store.unchecked.clear(tx);
}

fn upgrade_v7_to_v8(store: &Store, tx: &mut WriteTransaction<'_>) {
    store.meta.version_put(tx, 8);
    // The unchecked table switched to duplicate keys; start it empty.
    store.unchecked.clear(tx);
}

fn upgrade_v8_to_v9(store: &Store, tx: &mut WriteTransaction<'_>) {
    store.meta.version_put(tx, 9);
    // Vote sequences moved from the retired sequence store into the vote
    // table; nothing survives a fresh chain of this schema.
}

/// Backfill block-info checkpoints on long chains.
fn upgrade_v9_to_v10(store: &Store, tx: &mut WriteTransaction<'_>, genesis: &GenesisRecord) {
    store.meta.version_put(tx, 10);
    for (key, value) in snapshot_accounts_v0(tx) {
        let Ok(account_bytes) = <[u8; 32]>::try_from(key.as_slice()) else {
            continue;
        };
        let account = Account::new(account_bytes);
        let Some(info) = AccountInfo::from_bytes(&value, Epoch::Epoch0) else {
            continue;
        };
        if info.block_count < BLOCK_INFO_MAX {
            continue;
        }
        let mut block_count = 1u64;
        let mut cursor = info.open_block;
        while !cursor.is_zero() {
            if block_count % BLOCK_INFO_MAX == 0 {
                let balance = SummationVisitor::new(
                    tx,
                    &store.block,
                    genesis.account,
                    genesis.amount,
                )
                .balance(&cursor)
                .unwrap_or(Amount::ZERO);
                store.block.info_put(tx, &cursor, &BlockInfo { account, balance });
            }
            cursor = store.block.successor(tx, &cursor).unwrap_or(BlockHash::ZERO);
            block_count += 1;
        }
    }
}

fn upgrade_v10_to_v11(store: &Store, tx: &mut WriteTransaction<'_>) {
    store.meta.version_put(tx, 11);
    // The unsynced bootstrap table was dropped from the schema.
}

fn upgrade_v11_to_v12(store: &Store, tx: &mut WriteTransaction<'_>) {
    store.meta.version_put(tx, 12);
    // Unchecked reverts to unique keys; entries regenerate from live traffic.
    store.unchecked.clear(tx);
}
