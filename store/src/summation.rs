//! Balance and amount computation for chains of legacy blocks.
//!
//! Legacy receive/open/change blocks carry no balance field, so the balance
//! at an arbitrary block is the balance of the nearest send/state ancestor
//! plus the amounts of every receive in between — and the amount of a send
//! is itself a balance difference on another chain. The walk runs on an
//! explicit task stack: recursion depth must not scale with chain length.
//! Block-info checkpoints short-circuit long walks.

use crate::block::BlockStore;
use crate::transaction::Transaction;
use ferrite_types::{Account, Amount, Block, BlockHash};

enum Task {
    /// Balance at `current`, with receive amounts accumulated so far.
    Balance { current: BlockHash, acc: u128 },
    /// Amount moved by the block at `hash`.
    Amount { hash: BlockHash },
    /// A receive's source amount landed in the register: fold it in and
    /// keep walking the chain.
    FoldReceive { previous: BlockHash, acc: u128 },
    /// An open's source amount landed in the register.
    FoldOpen { acc: u128 },
    /// The pre-send balance landed in the register.
    FoldSend { balance: u128 },
    /// The pre-state balance landed in the register.
    FoldState { balance: u128 },
}

/// Iterative balance/amount resolver.
pub struct SummationVisitor<'a> {
    tx: &'a dyn Transaction,
    blocks: &'a BlockStore,
    genesis_account: Account,
    genesis_amount: Amount,
}

impl<'a> SummationVisitor<'a> {
    pub fn new(
        tx: &'a dyn Transaction,
        blocks: &'a BlockStore,
        genesis_account: Account,
        genesis_amount: Amount,
    ) -> Self {
        Self {
            tx,
            blocks,
            genesis_account,
            genesis_amount,
        }
    }

    /// Balance on the chain immediately after the block at `hash`.
    /// `None` when a referenced block is missing.
    pub fn balance(&self, hash: &BlockHash) -> Option<Amount> {
        self.run(Task::Balance {
            current: *hash,
            acc: 0,
        })
    }

    /// The amount transferred by the block at `hash` (zero for change
    /// blocks).
    pub fn amount(&self, hash: &BlockHash) -> Option<Amount> {
        self.run(Task::Amount { hash: *hash })
    }

    fn run(&self, initial: Task) -> Option<Amount> {
        let mut stack = vec![initial];
        let mut register: u128 = 0;

        while let Some(task) = stack.pop() {
            match task {
                Task::Balance { current, acc } => {
                    if let Some(info) = self.blocks.info_get(self.tx, &current) {
                        register = info.balance.raw().saturating_add(acc);
                        continue;
                    }
                    match self.blocks.get(self.tx, &current)? {
                        Block::Send(b) => register = b.balance.raw().saturating_add(acc),
                        Block::State(b) => register = b.balance.raw().saturating_add(acc),
                        Block::Change(b) => stack.push(Task::Balance {
                            current: b.previous,
                            acc,
                        }),
                        Block::Receive(b) => {
                            stack.push(Task::FoldReceive {
                                previous: b.previous,
                                acc,
                            });
                            stack.push(Task::Amount { hash: b.source });
                        }
                        Block::Open(b) => {
                            if b.account == self.genesis_account {
                                register = self.genesis_amount.raw().saturating_add(acc);
                            } else {
                                stack.push(Task::FoldOpen { acc });
                                stack.push(Task::Amount { hash: b.source });
                            }
                        }
                    }
                }
                Task::Amount { hash } => match self.blocks.get(self.tx, &hash)? {
                    Block::Send(b) => {
                        stack.push(Task::FoldSend {
                            balance: b.balance.raw(),
                        });
                        stack.push(Task::Balance {
                            current: b.previous,
                            acc: 0,
                        });
                    }
                    Block::State(b) => {
                        if b.previous.is_zero() {
                            register = b.balance.raw();
                        } else {
                            stack.push(Task::FoldState {
                                balance: b.balance.raw(),
                            });
                            stack.push(Task::Balance {
                                current: b.previous,
                                acc: 0,
                            });
                        }
                    }
                    Block::Open(b) => {
                        if b.account == self.genesis_account {
                            register = self.genesis_amount.raw();
                        } else {
                            stack.push(Task::Amount { hash: b.source });
                        }
                    }
                    Block::Receive(b) => stack.push(Task::Amount { hash: b.source }),
                    Block::Change(_) => register = 0,
                },
                Task::FoldReceive { previous, acc } => stack.push(Task::Balance {
                    current: previous,
                    acc: acc.saturating_add(register),
                }),
                Task::FoldOpen { acc } => register = acc.saturating_add(register),
                Task::FoldSend { balance } => register = register.saturating_sub(balance),
                Task::FoldState { balance } => register = register.abs_diff(balance),
            }
        }

        Some(Amount::new(register))
    }
}
