//! Per-peer accounting state.
//!
//! The persisted trio (balance, surplus, originated) lives in the state
//! store and is read and written under the account lock; everything here is
//! volatile and reset on reconnect.

use weft_primitives::{PeerAddress, U256};

use crate::mutex::DeadlineMutex;

/// Volatile accounting state for one peer, guarded by the account lock.
#[derive(Debug)]
pub(crate) struct PeerFields {
    /// Payment threshold for this peer; starts at the global default and
    /// may be changed by the peer's announcement.
    pub(crate) payment_threshold: U256,
    /// Sum of outstanding prepared credits.
    pub(crate) reserved_credit: U256,
    /// Sum of outstanding prepared debits.
    pub(crate) shadow_reserve: U256,
    /// Debt accumulated from debit reservations the peer abandoned.
    pub(crate) ghost_balance: U256,
    /// The peer's refreshment high-water mark; no refreshment is possible
    /// until the clock passes it.
    pub(crate) refreshment_timestamp: i64,
    /// Time of the last failed payment attempt, 0 if none.
    pub(crate) last_settlement_failure: i64,
    /// True while a payment is in flight.
    pub(crate) payment_ongoing: bool,
    pub(crate) connected: bool,
}

impl PeerFields {
    pub(crate) fn new(payment_threshold: U256) -> Self {
        Self {
            payment_threshold,
            reserved_credit: U256::ZERO,
            shadow_reserve: U256::ZERO,
            ghost_balance: U256::ZERO,
            refreshment_timestamp: 0,
            last_settlement_failure: 0,
            payment_ongoing: false,
            connected: false,
        }
    }
}

/// One peer's account: its address and the lock serializing all operations
/// on it.
#[derive(Debug)]
pub(crate) struct PeerAccount {
    peer: PeerAddress,
    fields: DeadlineMutex<PeerFields>,
}

impl PeerAccount {
    pub(crate) fn new(peer: PeerAddress, payment_threshold: U256) -> Self {
        Self {
            peer,
            fields: DeadlineMutex::new(PeerFields::new(payment_threshold)),
        }
    }

    pub(crate) fn peer(&self) -> PeerAddress {
        self.peer
    }

    pub(crate) fn fields(&self) -> &DeadlineMutex<PeerFields> {
        &self.fields
    }
}
