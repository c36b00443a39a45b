//! Node-level errors. Config problems are fatal at startup and never occur
//! after initialization.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum NodeError {
    #[error("configuration error: {0}")]
    Config(String),
    #[error("store error: {0}")]
    Store(#[from] ferrite_store::StoreError),
}
