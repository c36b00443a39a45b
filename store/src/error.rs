//! Store error type.
//!
//! Absence is an expected value and surfaces as `Option::None` from getters;
//! `StoreError` is reserved for conditions the ledger cannot continue past.

use thiserror::Error;

#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("undecodable record in table {0}")]
    Corrupt(&'static str),
    #[error("schema version {0} is newer than this build supports")]
    VersionFromFuture(u32),
}
