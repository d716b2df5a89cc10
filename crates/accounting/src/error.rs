//! Accounting error types.

use core::time::Duration;

use crate::mutex::LockError;
use weft_statestore::StateStoreError;

/// Errors that can occur during accounting operations.
#[derive(Debug, thiserror::Error)]
pub enum AccountingError {
    /// The expected debt would exceed the peer's payment threshold and
    /// inline settlement could not bring it down.
    #[error("attempted overdraft")]
    Overdraft,

    /// The caller's deadline expired while waiting for the peer lock.
    #[error("failed to acquire peer lock within deadline")]
    LockFailed,

    /// A debit pushed the peer past the disconnect threshold. The balance
    /// stays at its post-apply value; the transport should drop the peer
    /// for `duration`.
    #[error("disconnect threshold exceeded, blocking peer for {duration:?}")]
    BlockPeer {
        /// How long the peer should stay blocked.
        duration: Duration,
    },

    /// A persistence write failed; the operation left no in-memory change.
    #[error("state store: {0}")]
    Store(#[from] StateStoreError),

    /// A received payment would overflow the balance representation.
    #[error("payment would overflow balance")]
    Overflow,

    /// No balance has been recorded for this peer.
    #[error("no balance recorded for peer")]
    NoBalance,

    /// A persisted value could not be decoded.
    #[error("invalid stored value under key {0}")]
    InvalidValue(String),

    /// A settlement collaborator failed.
    #[error("settlement: {0}")]
    Settlement(weft_primitives::Error),
}

impl From<LockError> for AccountingError {
    fn from(_: LockError) -> Self {
        Self::LockFailed
    }
}
