//! Error types for the reasoning engine and its storage backends.
//!
//! Two tiers: storage-level failures (`StorageError`) bubble up into the top-level
//! `MelvinError` via `#[from]`, so callers of [`crate::engine::ReasoningEngine`]
//! only ever match one enum.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("node not found: {0}")]
    NodeNotFound(String),

    #[error("edge not found: {0}")]
    EdgeNotFound(String),

    #[error("invariant violation: {0}")]
    InvariantViolation(&'static str),

    #[error("corrupt file store: {0}")]
    Corrupt(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

pub type StorageResult<T> = Result<T, StorageError>;

#[derive(Debug, Error)]
pub enum MelvinError {
    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("invalid query: {0}")]
    InvalidQuery(String),

    #[error("beam search exceeded its deadline before finding a path")]
    Timeout,

    #[error("beam or mining budget exhausted before completing")]
    BudgetExceeded,

    #[error("config error: {0}")]
    Config(String),
}

pub type MelvinResult<T> = Result<T, MelvinError>;
