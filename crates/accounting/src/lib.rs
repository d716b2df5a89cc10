//! Per-peer accounting and settlement for the weft node.
//!
//! Every piece of useful work between two peers (chunk upload, retrieval,
//! forwarding) has a price. This crate tracks a running signed balance with
//! each peer, authorizes new chargeable work through a two-phase
//! reserve/apply/cleanup protocol, settles growing debt through time-based
//! refreshment and monetary payment, and blocklists peers that misbehave
//! economically.
//!
//! # Sign convention
//!
//! A **positive** balance means the peer owes us (we extended service); a
//! **negative** balance means we owe the peer. Credits move the balance
//! down, debits move it up.
//!
//! # Two-phase actions
//!
//! Chargeable work is authorized before it runs and booked after:
//!
//! ```text
//! prepare_credit ──> CreditAction ──> apply (balance moves)
//!                              └────> cleanup (reservation released)
//! ```
//!
//! `prepare_credit` fails with [`AccountingError::Overdraft`] when the
//! expected debt would cross the peer's payment threshold and inline
//! settlement could not bring it down. Debits are always provisional until
//! apply; a debit reservation that is cleaned up without applying feeds the
//! peer's ghost balance, which the misbehavior monitor watches.
//!
//! # Settlement
//!
//! Refreshment (free, time-based) always runs before monetary payment, and
//! payment covers only the debt we originated ourselves; forwarded debt is
//! settled exclusively through refreshment. At most one payment per peer is
//! in flight at any time.
//!
//! # Collaborators
//!
//! The transport, settlement protocols, pricing and persistence are
//! consumed through the narrow traits in `weft-api` and `weft-statestore`;
//! tests implement them directly.

mod accounting;
mod action;
mod config;
mod error;
mod mutex;
mod peer;
mod persistence;

pub use accounting::Accounting;
pub use action::{CreditAction, DebitAction};
pub use config::{
    AccountingConfig, DEFAULT_EARLY_PAYMENT_PERCENT, DEFAULT_LIGHT_FACTOR,
    DEFAULT_LIGHT_REFRESH_RATE, DEFAULT_PAYMENT_THRESHOLD, DEFAULT_PAYMENT_TOLERANCE_PERCENT,
    DEFAULT_REFRESH_RATE,
};
pub use error::AccountingError;
pub use mutex::{DeadlineMutex, LockError};
