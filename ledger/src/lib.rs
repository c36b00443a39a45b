//! Account-chain ledger.
//!
//! Applies blocks against each account's prior state, maintains account
//! heads, representative weights, pending receives, and frontier mappings,
//! and can roll any chain back block by block. Every outcome of `process`
//! is a structured result code; only `Progress` mutates the store.

pub mod genesis;
pub mod ledger;

pub use genesis::dev_genesis;
pub use ledger::Ledger;

use ferrite_types::{Account, Amount};
use thiserror::Error;

/// Outcome of applying one block. `Progress` is the only success.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProcessResult {
    /// Block applied and committed.
    Progress,
    /// Block already stored.
    Old,
    /// Signature does not verify for the required signer.
    BadSignature,
    /// A send tried to raise its own balance.
    NegativeSpend,
    /// Another block already occupies this root.
    Fork,
    /// Receive without a matching pending entry.
    Unreceivable,
    /// The previous block is not in the store.
    GapPrevious,
    /// The source block is not in the store.
    GapSource,
    /// Attempt to open the burn account.
    OpenedBurnAccount,
    /// State block balance disagrees with the pending amount or epoch rules.
    BalanceMismatch,
    /// Epoch block changed the representative.
    RepresentativeMismatch,
    /// Variant may not follow the previous block's variant.
    BlockPosition,
}

/// What `process` learned while applying a block.
#[derive(Clone, Debug)]
pub struct ProcessReturn {
    pub code: ProcessResult,
    /// The account the block belongs to, when resolvable.
    pub account: Option<Account>,
    /// The amount moved by the block.
    pub amount: Option<Amount>,
    /// For sends: the destination whose pending was credited.
    pub pending_account: Option<Account>,
    /// For state blocks: whether it classified as a send.
    pub state_is_send: bool,
}

impl ProcessReturn {
    pub fn code(code: ProcessResult) -> Self {
        Self {
            code,
            account: None,
            amount: None,
            pending_account: None,
            state_is_send: false,
        }
    }
}

/// Failures of operations that must not happen on a consistent store.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum LedgerError {
    #[error("block {0} is not in the ledger")]
    BlockNotFound(String),
    #[error("account for block {0} could not be resolved")]
    AccountNotFound(String),
}
