//! Block application and rollback.
//!
//! `process` dispatches on the block variant and runs its checks in order:
//! duplicate, dependency presence, chain position, signature, fork, variant
//! semantics. The signature always precedes the fork verdict, so a forged
//! block can never enter fork handling. Only a fully validated block mutates
//! the store, and all mutations of one block land inside the caller's write
//! transaction.

use crate::{LedgerError, ProcessResult, ProcessReturn};
use ferrite_crypto::verify_signature;
use ferrite_store::{
    AccountInfo, BlockInfo, PendingInfo, PendingKey, Store, SummationVisitor, Transaction,
    WriteTransaction,
};
use ferrite_store::migration::BLOCK_INFO_MAX;
use ferrite_types::block::valid_predecessor;
use ferrite_types::{Account, Amount, Block, BlockHash, Epoch, Link, NetworkParams, Root};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

fn seconds_since_epoch() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// The ledger owns the store handle and is the only writer of ledger state.
pub struct Ledger {
    store: Arc<Store>,
    params: NetworkParams,
}

impl Ledger {
    pub fn new(store: Arc<Store>, params: NetworkParams) -> Self {
        Self { store, params }
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn params(&self) -> &NetworkParams {
        &self.params
    }

    fn summation<'a>(&'a self, tx: &'a dyn Transaction) -> SummationVisitor<'a> {
        SummationVisitor::new(
            tx,
            &self.store.block,
            self.params.genesis_account,
            self.params.genesis_amount,
        )
    }

    // ── Queries ─────────────────────────────────────────────────────────

    /// Balance on the chain immediately after the block at `hash`.
    pub fn balance(&self, tx: &dyn Transaction, hash: &BlockHash) -> Option<Amount> {
        self.summation(tx).balance(hash)
    }

    /// Amount moved by the block at `hash`.
    pub fn amount(&self, tx: &dyn Transaction, hash: &BlockHash) -> Option<Amount> {
        self.summation(tx).amount(hash)
    }

    /// The account owning the block at `hash`, resolved by walking forward
    /// to the chain head.
    pub fn account(&self, tx: &dyn Transaction, hash: &BlockHash) -> Option<Account> {
        let mut current = *hash;
        loop {
            let block = self.store.block.get(tx, &current)?;
            if let Some(account) = block.account() {
                return Some(account);
            }
            if let Some(info) = self.store.block.info_get(tx, &current) {
                return Some(info.account);
            }
            match self.store.block.successor(tx, &current) {
                Some(next) => current = next,
                None => return self.store.frontier.get(tx, &current),
            }
        }
    }

    pub fn account_balance(&self, tx: &dyn Transaction, account: &Account) -> Amount {
        self.store
            .account
            .get(tx, account)
            .map(|info| info.balance)
            .unwrap_or(Amount::ZERO)
    }

    /// Sum of unreceived sends addressed to `account`.
    pub fn account_pending(&self, tx: &dyn Transaction, account: &Account) -> Amount {
        self.store
            .pending
            .iter_account(tx, account)
            .into_iter()
            .fold(Amount::ZERO, |acc, (_, info)| {
                acc.saturating_add(info.amount)
            })
    }

    /// Aggregate weight delegated to a representative.
    pub fn weight(&self, tx: &dyn Transaction, representative: &Account) -> Amount {
        self.store.representation.get(tx, representative)
    }

    pub fn latest(&self, tx: &dyn Transaction, account: &Account) -> Option<BlockHash> {
        self.store.account.get(tx, account).map(|info| info.head)
    }

    /// The root a new block for `account` would contest: the head when the
    /// chain exists, otherwise the account itself.
    pub fn latest_root(&self, tx: &dyn Transaction, account: &Account) -> Root {
        match self.latest(tx, account) {
            Some(head) => head,
            None => BlockHash::new(*account.as_bytes()),
        }
    }

    pub fn block_exists(&self, tx: &dyn Transaction, hash: &BlockHash) -> bool {
        self.store.block.exists(tx, hash)
    }

    pub fn successor(&self, tx: &dyn Transaction, hash: &BlockHash) -> Option<Block> {
        let next = self.store.block.successor(tx, hash)?;
        self.store.block.get(tx, &next)
    }

    /// The stored block occupying the same root as `block`.
    pub fn forked_block(&self, tx: &dyn Transaction, block: &Block) -> Option<Block> {
        if block.previous().is_zero() {
            let account = block.account()?;
            let info = self.store.account.get(tx, &account)?;
            self.store.block.get(tx, &info.open_block)
        } else {
            self.successor(tx, &block.previous())
        }
    }

    /// Hash of the nearest block at or before `hash` that names a
    /// representative.
    pub fn representative_block(&self, tx: &dyn Transaction, hash: &BlockHash) -> BlockHash {
        let mut current = *hash;
        while let Some(block) = self.store.block.get(tx, &current) {
            if block.representative().is_some() {
                return current;
            }
            current = block.previous();
        }
        BlockHash::ZERO
    }

    /// The representative in force at `hash`.
    pub fn representative(&self, tx: &dyn Transaction, hash: &BlockHash) -> Option<Account> {
        let rep_block = self.representative_block(tx, hash);
        self.store
            .block
            .get(tx, &rep_block)
            .and_then(|b| b.representative())
    }

    pub fn is_epoch_link(&self, link: &Link) -> bool {
        *link == self.params.epoch_link
    }

    /// Whether a state block lowers its balance relative to its previous.
    pub fn is_send(&self, tx: &dyn Transaction, block: &Block) -> bool {
        match block {
            Block::Send(_) => true,
            Block::State(b) => {
                if b.previous.is_zero() {
                    false
                } else {
                    match self.balance(tx, &b.previous) {
                        Some(previous_balance) => b.balance < previous_balance,
                        None => false,
                    }
                }
            }
            _ => false,
        }
    }

    /// For sends: who the funds go to.
    pub fn block_destination(&self, tx: &dyn Transaction, block: &Block) -> Option<Account> {
        match block {
            Block::Send(b) => Some(b.destination),
            Block::State(b) if self.is_send(tx, block) => Some(b.link.as_account()),
            _ => None,
        }
    }

    /// For receives: the consumed send's hash.
    pub fn block_source(&self, tx: &dyn Transaction, block: &Block) -> Option<BlockHash> {
        match block {
            Block::Receive(b) => Some(b.source),
            Block::Open(b) => Some(b.source),
            Block::State(b) if !self.is_send(tx, block) && !b.link.is_zero() => {
                Some(b.link.as_block_hash())
            }
            _ => None,
        }
    }

    /// Whether every dependency of `block` is already stored.
    pub fn could_fit(&self, tx: &dyn Transaction, block: &Block) -> bool {
        let previous = block.previous();
        if !previous.is_zero() && !self.block_exists(tx, &previous) {
            return false;
        }
        match block {
            Block::Receive(b) => self.block_exists(tx, &b.source),
            Block::Open(b) => {
                self.block_exists(tx, &b.source)
                    || b.source == BlockHash::new(*self.params.genesis_account.as_bytes())
            }
            Block::State(b) => {
                b.link.is_zero()
                    || self.is_epoch_link(&b.link)
                    || self.is_send(tx, block)
                    || self.block_exists(tx, &b.link.as_block_hash())
            }
            _ => true,
        }
    }

    /// Fold a hash into the rolling ledger checksum (XOR, self-inverse).
    pub fn checksum_update(&self, tx: &mut WriteTransaction<'_>, hash: &BlockHash) {
        let current = self
            .store
            .meta
            .checksum_get(tx, 0, 0)
            .unwrap_or(BlockHash::ZERO);
        let mut mixed = *current.as_bytes();
        for (byte, other) in mixed.iter_mut().zip(hash.as_bytes()) {
            *byte ^= other;
        }
        self.store.meta.checksum_put(tx, 0, 0, &BlockHash::new(mixed));
    }

    // ── Process ─────────────────────────────────────────────────────────

    pub fn process(&self, tx: &mut WriteTransaction<'_>, block: &Block) -> ProcessReturn {
        let hash = block.hash();
        if self.store.block.exists(tx, &hash) {
            return ProcessReturn::code(ProcessResult::Old);
        }
        match block {
            Block::Send(_) | Block::Receive(_) | Block::Change(_) => {
                self.process_legacy(tx, block, hash)
            }
            Block::Open(_) => self.process_open(tx, block, hash),
            Block::State(_) => self.process_state(tx, block, hash),
        }
    }

    /// Shared path for send/receive/change: resolve the signer by walking
    /// forward from `previous`, verify, then apply variant semantics.
    fn process_legacy(
        &self,
        tx: &mut WriteTransaction<'_>,
        block: &Block,
        hash: BlockHash,
    ) -> ProcessReturn {
        let previous = block.previous();
        let Some(previous_block) = self.store.block.get(tx, &previous) else {
            return ProcessReturn::code(ProcessResult::GapPrevious);
        };
        if !valid_predecessor(previous_block.block_type(), block.block_type()) {
            return ProcessReturn::code(ProcessResult::BlockPosition);
        }
        // The signer is the owner of the chain `previous` sits on, resolved
        // forward to the head so fork candidates are still signature-checked.
        let Some(account) = self.account(tx, &previous) else {
            return ProcessReturn::code(ProcessResult::GapPrevious);
        };
        if !verify_signature(hash.as_bytes(), block.signature(), &account.public_key()) {
            return ProcessReturn::code(ProcessResult::BadSignature);
        }
        // A previous that is no longer a frontier already has a successor.
        if self.store.frontier.get(tx, &previous).is_none() {
            return ProcessReturn::code(ProcessResult::Fork);
        }
        let info = self
            .store
            .account
            .get(tx, &account)
            .expect("resolved account without account record");

        match block {
            Block::Send(b) => {
                if b.balance > info.balance {
                    return ProcessReturn::code(ProcessResult::NegativeSpend);
                }
                let amount = info.balance - b.balance;
                self.store.block.put(tx, block, Epoch::Epoch0);
                if let Some(rep) = self.rep_of_info(tx, &info) {
                    self.store
                        .representation
                        .add(tx, &rep, 0u128.wrapping_sub(amount.raw()));
                }
                self.store.pending.put(
                    tx,
                    &PendingKey::new(b.destination, hash),
                    &PendingInfo {
                        source: account,
                        amount,
                        epoch: Epoch::Epoch0,
                    },
                );
                self.commit_head(tx, &account, &info, hash, info.rep_block, b.balance);
                ProcessReturn {
                    code: ProcessResult::Progress,
                    account: Some(account),
                    amount: Some(amount),
                    pending_account: Some(b.destination),
                    state_is_send: false,
                }
            }
            Block::Receive(b) => {
                if !self.store.block.exists(tx, &b.source) {
                    return ProcessReturn::code(ProcessResult::GapSource);
                }
                let key = PendingKey::new(account, b.source);
                let Some(pending) = self.store.pending.get(tx, &key) else {
                    return ProcessReturn::code(ProcessResult::Unreceivable);
                };
                // Epoch-1 pending entries need a state receive.
                if pending.epoch != Epoch::Epoch0 {
                    return ProcessReturn::code(ProcessResult::Unreceivable);
                }
                self.store.pending.del(tx, &key);
                let amount = pending.amount;
                let balance = info.balance.saturating_add(amount);
                self.store.block.put(tx, block, Epoch::Epoch0);
                if let Some(rep) = self.rep_of_info(tx, &info) {
                    self.store.representation.add(tx, &rep, amount.raw());
                }
                self.commit_head(tx, &account, &info, hash, info.rep_block, balance);
                ProcessReturn {
                    code: ProcessResult::Progress,
                    account: Some(account),
                    amount: Some(amount),
                    pending_account: None,
                    state_is_send: false,
                }
            }
            Block::Change(b) => {
                self.store.block.put(tx, block, Epoch::Epoch0);
                if let Some(old_rep) = self.rep_of_info(tx, &info) {
                    self.store
                        .representation
                        .add(tx, &old_rep, 0u128.wrapping_sub(info.balance.raw()));
                }
                self.store
                    .representation
                    .add(tx, &b.representative, info.balance.raw());
                self.commit_head(tx, &account, &info, hash, hash, info.balance);
                ProcessReturn {
                    code: ProcessResult::Progress,
                    account: Some(account),
                    amount: None,
                    pending_account: None,
                    state_is_send: false,
                }
            }
            _ => unreachable!("legacy dispatch"),
        }
    }

    fn process_open(
        &self,
        tx: &mut WriteTransaction<'_>,
        block: &Block,
        hash: BlockHash,
    ) -> ProcessReturn {
        let Block::Open(b) = block else {
            unreachable!("open dispatch")
        };
        // No key can sign for the burn account; reject its opens outright.
        if b.account == self.params.burn_account {
            return ProcessReturn::code(ProcessResult::OpenedBurnAccount);
        }
        if !verify_signature(hash.as_bytes(), block.signature(), &b.account.public_key()) {
            return ProcessReturn::code(ProcessResult::BadSignature);
        }
        let genesis_source = BlockHash::new(*self.params.genesis_account.as_bytes());
        let genesis_open = b.account == self.params.genesis_account
            && b.source == genesis_source
            && !self.store.account.exists(tx, &b.account);

        if !genesis_open && !self.store.block.exists(tx, &b.source) {
            return ProcessReturn::code(ProcessResult::GapSource);
        }
        if self.store.account.exists(tx, &b.account) {
            // A second open for the account contests the same root.
            return ProcessReturn::code(ProcessResult::Fork);
        }

        let amount = if genesis_open {
            self.params.genesis_amount
        } else {
            let key = PendingKey::new(b.account, b.source);
            let Some(pending) = self.store.pending.get(tx, &key) else {
                return ProcessReturn::code(ProcessResult::Unreceivable);
            };
            if pending.epoch != Epoch::Epoch0 {
                return ProcessReturn::code(ProcessResult::Unreceivable);
            }
            self.store.pending.del(tx, &key);
            pending.amount
        };

        self.store.block.put(tx, block, Epoch::Epoch0);
        self.store.representation.add(tx, &b.representative, amount.raw());
        self.store.account.put(
            tx,
            &b.account,
            &AccountInfo {
                head: hash,
                rep_block: hash,
                open_block: hash,
                balance: amount,
                modified: seconds_since_epoch(),
                block_count: 1,
                epoch: Epoch::Epoch0,
            },
        );
        self.store.frontier.put(tx, &hash, &b.account);
        self.checksum_update(tx, &hash);
        ProcessReturn {
            code: ProcessResult::Progress,
            account: Some(b.account),
            amount: Some(amount),
            pending_account: None,
            state_is_send: false,
        }
    }

    fn process_state(
        &self,
        tx: &mut WriteTransaction<'_>,
        block: &Block,
        hash: BlockHash,
    ) -> ProcessReturn {
        let Block::State(b) = block else {
            unreachable!("state dispatch")
        };
        let is_epoch = self.is_epoch_link(&b.link);

        let mut signed = verify_signature(hash.as_bytes(), block.signature(), &b.account.public_key());
        if !signed && is_epoch {
            signed = verify_signature(
                hash.as_bytes(),
                block.signature(),
                &self.params.epoch_signer.public_key(),
            );
        }
        if !signed {
            return ProcessReturn::code(ProcessResult::BadSignature);
        }

        if !b.previous.is_zero() && !self.store.block.exists(tx, &b.previous) {
            return ProcessReturn::code(ProcessResult::GapPrevious);
        }
        let info_opt = self.store.account.get(tx, &b.account);
        match &info_opt {
            Some(info) => {
                if b.previous.is_zero() || b.previous != info.head {
                    return ProcessReturn::code(ProcessResult::Fork);
                }
            }
            None => {
                if !b.previous.is_zero() {
                    return ProcessReturn::code(ProcessResult::GapPrevious);
                }
            }
        }

        if is_epoch {
            return self.process_epoch(tx, block, b, hash, info_opt);
        }

        let old_balance = info_opt
            .as_ref()
            .map(|i| i.balance)
            .unwrap_or(Amount::ZERO);
        let epoch = info_opt.as_ref().map(|i| i.epoch).unwrap_or(Epoch::Epoch0);
        let is_send = b.balance < old_balance;
        let is_receive = !is_send && !b.link.is_zero();
        let amount = if is_send {
            old_balance - b.balance
        } else {
            b.balance - old_balance
        };

        if info_opt.is_none() && b.account == self.params.burn_account {
            return ProcessReturn::code(ProcessResult::OpenedBurnAccount);
        }

        let mut consumed_pending: Option<PendingKey> = None;
        if is_receive {
            let source = b.link.as_block_hash();
            if !self.store.block.exists(tx, &source) {
                return ProcessReturn::code(ProcessResult::GapSource);
            }
            let key = PendingKey::new(b.account, source);
            let Some(pending) = self.store.pending.get(tx, &key) else {
                return ProcessReturn::code(ProcessResult::Unreceivable);
            };
            if pending.amount != amount {
                return ProcessReturn::code(ProcessResult::BalanceMismatch);
            }
            consumed_pending = Some(key);
        } else if !is_send && !amount.is_zero() {
            // Balance rose without naming a source.
            return ProcessReturn::code(ProcessResult::BalanceMismatch);
        }

        // All checks passed; mutate.
        if let Some(key) = consumed_pending {
            self.store.pending.del(tx, &key);
        }
        let mut pending_account = None;
        if is_send {
            let destination = b.link.as_account();
            self.store.pending.put(
                tx,
                &PendingKey::new(destination, hash),
                &PendingInfo {
                    source: b.account,
                    amount,
                    epoch,
                },
            );
            pending_account = Some(destination);
        }

        if let Some(info) = &info_opt {
            if let Some(old_rep) = self.rep_of_info(tx, info) {
                self.store
                    .representation
                    .add(tx, &old_rep, 0u128.wrapping_sub(old_balance.raw()));
            }
        }
        self.store
            .representation
            .add(tx, &b.representative, b.balance.raw());

        self.store.block.put(tx, block, epoch);
        match info_opt {
            Some(info) => self.commit_head(tx, &b.account, &info, hash, hash, b.balance),
            None => {
                self.store.account.put(
                    tx,
                    &b.account,
                    &AccountInfo {
                        head: hash,
                        rep_block: hash,
                        open_block: hash,
                        balance: b.balance,
                        modified: seconds_since_epoch(),
                        block_count: 1,
                        epoch,
                    },
                );
                self.store.frontier.put(tx, &hash, &b.account);
                self.checksum_update(tx, &hash);
            }
        }
        ProcessReturn {
            code: ProcessResult::Progress,
            account: Some(b.account),
            amount: Some(amount),
            pending_account,
            state_is_send: is_send,
        }
    }

    /// Epoch upgrade: no balance and no representative movement, only the
    /// account's generation tag advances.
    fn process_epoch(
        &self,
        tx: &mut WriteTransaction<'_>,
        block: &Block,
        b: &ferrite_types::StateBlock,
        hash: BlockHash,
        info_opt: Option<AccountInfo>,
    ) -> ProcessReturn {
        match info_opt {
            Some(info) => {
                if info.epoch != Epoch::Epoch0 {
                    return ProcessReturn::code(ProcessResult::BlockPosition);
                }
                if b.balance != info.balance {
                    return ProcessReturn::code(ProcessResult::BalanceMismatch);
                }
                let current_rep = self.rep_of_info(tx, &info).unwrap_or(Account::ZERO);
                if b.representative != current_rep {
                    return ProcessReturn::code(ProcessResult::RepresentativeMismatch);
                }
                self.store.block.put(tx, block, Epoch::Epoch1);
                let mut upgraded = info.clone();
                upgraded.epoch = Epoch::Epoch1;
                self.commit_head(tx, &b.account, &upgraded, hash, hash, info.balance);
                ProcessReturn {
                    code: ProcessResult::Progress,
                    account: Some(b.account),
                    amount: None,
                    pending_account: None,
                    state_is_send: false,
                }
            }
            None => {
                // Epoch-open: creates an empty epoch-1 account.
                if !b.balance.is_zero() {
                    return ProcessReturn::code(ProcessResult::BalanceMismatch);
                }
                if !b.representative.is_zero() {
                    return ProcessReturn::code(ProcessResult::RepresentativeMismatch);
                }
                if b.account == self.params.burn_account {
                    return ProcessReturn::code(ProcessResult::OpenedBurnAccount);
                }
                self.store.block.put(tx, block, Epoch::Epoch1);
                self.store.account.put(
                    tx,
                    &b.account,
                    &AccountInfo {
                        head: hash,
                        rep_block: hash,
                        open_block: hash,
                        balance: Amount::ZERO,
                        modified: seconds_since_epoch(),
                        block_count: 1,
                        epoch: Epoch::Epoch1,
                    },
                );
                self.store.frontier.put(tx, &hash, &b.account);
                self.checksum_update(tx, &hash);
                ProcessReturn {
                    code: ProcessResult::Progress,
                    account: Some(b.account),
                    amount: None,
                    pending_account: None,
                    state_is_send: false,
                }
            }
        }
    }

    /// The representative currently credited for an account.
    fn rep_of_info(&self, tx: &dyn Transaction, info: &AccountInfo) -> Option<Account> {
        self.store
            .block
            .get(tx, &info.rep_block)
            .and_then(|b| b.representative())
    }

    /// Advance an account's head, preserving the open block and epoch,
    /// moving the frontier, and writing the periodic block-info checkpoint.
    fn commit_head(
        &self,
        tx: &mut WriteTransaction<'_>,
        account: &Account,
        info: &AccountInfo,
        hash: BlockHash,
        rep_block: BlockHash,
        balance: Amount,
    ) {
        let block_count = info.block_count + 1;
        self.store.account.put(
            tx,
            account,
            &AccountInfo {
                head: hash,
                rep_block,
                open_block: info.open_block,
                balance,
                modified: seconds_since_epoch(),
                block_count,
                epoch: info.epoch,
            },
        );
        self.store.frontier.del(tx, &info.head);
        self.store.frontier.put(tx, &hash, account);
        if block_count % BLOCK_INFO_MAX == 0 {
            self.store.block.info_put(
                tx,
                &hash,
                &BlockInfo {
                    account: *account,
                    balance,
                },
            );
        }
        self.checksum_update(tx, &hash);
    }

    // ── Rollback ────────────────────────────────────────────────────────

    /// Undo the block at `hash` and every successor on the same chain.
    /// Rolling back an absent block is a no-op.
    pub fn rollback(&self, tx: &mut WriteTransaction<'_>, hash: &BlockHash) -> Result<(), LedgerError> {
        if !self.store.block.exists(tx, hash) {
            return Ok(());
        }
        let account = self
            .account(tx, hash)
            .ok_or_else(|| LedgerError::AccountNotFound(hash.encode_hex()))?;
        while self.store.block.exists(tx, hash) {
            let info = self
                .store
                .account
                .get(tx, &account)
                .ok_or_else(|| LedgerError::AccountNotFound(hash.encode_hex()))?;
            let head = self
                .store
                .block
                .get(tx, &info.head)
                .ok_or_else(|| LedgerError::BlockNotFound(info.head.encode_hex()))?;
            self.rollback_one(tx, &head, &account, &info)?;
        }
        Ok(())
    }

    fn rollback_one(
        &self,
        tx: &mut WriteTransaction<'_>,
        block: &Block,
        account: &Account,
        info: &AccountInfo,
    ) -> Result<(), LedgerError> {
        let head = block.hash();
        tracing::debug!(block = %head, account = %account.encode_hex(), "rolling back");
        match block {
            Block::Send(b) => {
                let key = PendingKey::new(b.destination, head);
                // If the destination already received, unwind it first.
                while !self.store.pending.exists(tx, &key) {
                    let dest_head = self
                        .latest(tx, &b.destination)
                        .ok_or_else(|| LedgerError::AccountNotFound(head.encode_hex()))?;
                    self.rollback(tx, &dest_head)?;
                }
                let pending = self.store.pending.get(tx, &key).expect("checked above");
                self.store.pending.del(tx, &key);
                if let Some(rep) = self.rep_of_info(tx, info) {
                    self.store.representation.add(tx, &rep, pending.amount.raw());
                }
                let balance = info.balance.saturating_add(pending.amount);
                self.revert_head(tx, block, account, info, balance, info.rep_block, Epoch::Epoch0);
            }
            Block::Receive(b) => {
                let amount = self.amount(tx, &head).unwrap_or(Amount::ZERO);
                let source_account = self.account(tx, &b.source).unwrap_or(Account::ZERO);
                self.store.pending.put(
                    tx,
                    &PendingKey::new(*account, b.source),
                    &PendingInfo {
                        source: source_account,
                        amount,
                        epoch: Epoch::Epoch0,
                    },
                );
                if let Some(rep) = self.rep_of_info(tx, info) {
                    self.store
                        .representation
                        .add(tx, &rep, 0u128.wrapping_sub(amount.raw()));
                }
                let balance = info.balance.saturating_sub(amount);
                self.revert_head(tx, block, account, info, balance, info.rep_block, Epoch::Epoch0);
            }
            Block::Open(b) => {
                let amount = self.amount(tx, &head).unwrap_or(Amount::ZERO);
                let genesis_source = BlockHash::new(*self.params.genesis_account.as_bytes());
                if b.source != genesis_source || b.account != self.params.genesis_account {
                    let source_account = self.account(tx, &b.source).unwrap_or(Account::ZERO);
                    self.store.pending.put(
                        tx,
                        &PendingKey::new(*account, b.source),
                        &PendingInfo {
                            source: source_account,
                            amount,
                            epoch: Epoch::Epoch0,
                        },
                    );
                }
                self.store
                    .representation
                    .add(tx, &b.representative, 0u128.wrapping_sub(amount.raw()));
                self.revert_head(tx, block, account, info, Amount::ZERO, BlockHash::ZERO, Epoch::Epoch0);
            }
            Block::Change(b) => {
                self.store
                    .representation
                    .add(tx, &b.representative, 0u128.wrapping_sub(info.balance.raw()));
                let previous_rep_block = self.representative_block(tx, &b.previous);
                if let Some(rep) = self
                    .store
                    .block
                    .get(tx, &previous_rep_block)
                    .and_then(|blk| blk.representative())
                {
                    self.store.representation.add(tx, &rep, info.balance.raw());
                }
                self.revert_head(tx, block, account, info, info.balance, previous_rep_block, Epoch::Epoch0);
            }
            Block::State(b) => {
                let previous_balance = if b.previous.is_zero() {
                    Amount::ZERO
                } else {
                    self.balance(tx, &b.previous).unwrap_or(Amount::ZERO)
                };
                let was_send = b.balance < previous_balance;
                let is_epoch = self.is_epoch_link(&b.link);

                if was_send {
                    let key = PendingKey::new(b.link.as_account(), head);
                    while !self.store.pending.exists(tx, &key) {
                        let dest_head = self
                            .latest(tx, &b.link.as_account())
                            .ok_or_else(|| LedgerError::AccountNotFound(head.encode_hex()))?;
                        self.rollback(tx, &dest_head)?;
                    }
                    self.store.pending.del(tx, &key);
                } else if !b.link.is_zero() && !is_epoch {
                    // Was a receive: restore the pending entry.
                    let source = b.link.as_block_hash();
                    let amount = b.balance.saturating_sub(previous_balance);
                    let source_account = self.account(tx, &source).unwrap_or(Account::ZERO);
                    self.store.pending.put(
                        tx,
                        &PendingKey::new(*account, source),
                        &PendingInfo {
                            source: source_account,
                            amount,
                            epoch: self.store.block.version(tx, &source),
                        },
                    );
                }

                if !is_epoch {
                    self.store
                        .representation
                        .add(tx, &b.representative, 0u128.wrapping_sub(b.balance.raw()));
                    if !b.previous.is_zero() {
                        if let Some(rep) = self.representative(tx, &b.previous) {
                            self.store
                                .representation
                                .add(tx, &rep, previous_balance.raw());
                        }
                    }
                }

                let previous_rep_block = self.representative_block(tx, &b.previous);
                let previous_epoch = if b.previous.is_zero() {
                    Epoch::Epoch0
                } else {
                    self.store.block.version(tx, &b.previous)
                };
                self.revert_head(
                    tx,
                    block,
                    account,
                    info,
                    previous_balance,
                    previous_rep_block,
                    previous_epoch,
                );
            }
        }
        Ok(())
    }

    /// Detach the head block and restore the account record to its
    /// predecessor (or delete the account for a rolled-back open).
    fn revert_head(
        &self,
        tx: &mut WriteTransaction<'_>,
        block: &Block,
        account: &Account,
        info: &AccountInfo,
        previous_balance: Amount,
        rep_block: BlockHash,
        previous_epoch: Epoch,
    ) {
        let head = block.hash();
        let previous = block.previous();
        if info.block_count % BLOCK_INFO_MAX == 0 {
            self.store.block.info_del(tx, &head);
        }
        self.store.block.del(tx, &head);
        self.store.frontier.del(tx, &head);
        if previous.is_zero() {
            self.store.account.del(tx, account);
        } else {
            self.store.block.successor_clear(tx, &previous);
            self.store.frontier.put(tx, &previous, account);
            self.store.account.put(
                tx,
                account,
                &AccountInfo {
                    head: previous,
                    rep_block,
                    open_block: info.open_block,
                    balance: previous_balance,
                    modified: seconds_since_epoch(),
                    block_count: info.block_count - 1,
                    epoch: previous_epoch,
                },
            );
        }
        self.checksum_update(tx, &head);
    }
}
