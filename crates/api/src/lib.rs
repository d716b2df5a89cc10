//! Trait contracts between the accounting core and its collaborators.
//!
//! The accounting core never talks to the network, the chain, or the
//! transport directly. It consumes the narrow contracts defined here:
//!
//! - [`Refresher`]: time-based settlement with a peer (no on-chain cost)
//! - [`Payer`]: fire-and-forget monetary settlement, completion reported
//!   back through the core's `notify_payment_sent`
//! - [`Blocklister`]: the peer-control surface for misbehaving peers
//! - [`PricingAnnouncer`]: payment threshold announcement on connect
//!
//! Implementations live with the transport, settlement and pricing
//! services; tests implement them directly.

use async_trait::async_trait;
use auto_impl::auto_impl;
use core::time::Duration;
use weft_primitives::{PeerAddress, Result, U256};

/// Time-based settlement with a peer.
#[async_trait]
#[auto_impl(&, Arc)]
pub trait Refresher: Send + Sync + 'static {
    /// Ask the peer to absorb up to `amount` of our debt through
    /// time-based refreshment.
    ///
    /// `shadow_balance` is the debt that will remain even after every
    /// outstanding debit reservation applies; the peer caps its acceptance
    /// against it.
    ///
    /// Returns the accepted amount and the peer's new refreshment
    /// high-water mark. An equal high-water mark means no further
    /// refreshment is possible until more time passes.
    async fn refresh(
        &self,
        peer: &PeerAddress,
        amount: U256,
        shadow_balance: U256,
    ) -> Result<(U256, i64)>;
}

/// Monetary settlement with a peer.
///
/// `pay` is fire-and-forget: the implementation eventually reports the
/// outcome through the accounting core's `notify_payment_sent`.
#[async_trait]
#[auto_impl(&, Arc)]
pub trait Payer: Send + Sync + 'static {
    /// Initiate a payment of `amount` to `peer`.
    async fn pay(&self, peer: &PeerAddress, amount: U256);
}

/// Peer-control surface used by the misbehavior monitor.
#[auto_impl(&, Arc)]
pub trait Blocklister: Send + Sync + 'static {
    /// Block the peer for `duration`. `reason` is a short static tag,
    /// e.g. `"ghost overdraw"` or `"disconnected"`.
    fn blocklist(&self, peer: &PeerAddress, duration: Duration, reason: &str) -> Result<()>;
}

/// Payment threshold announcement towards a peer.
#[async_trait]
#[auto_impl(&, Arc)]
pub trait PricingAnnouncer: Send + Sync + 'static {
    /// Announce the payment threshold we will tolerate for this peer.
    async fn announce_payment_threshold(&self, peer: &PeerAddress, threshold: U256) -> Result<()>;
}

/// Blocklister that drops every request.
///
/// Use when running without a transport (dev/testing only).
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopBlocklister;

impl Blocklister for NoopBlocklister {
    fn blocklist(&self, _peer: &PeerAddress, _duration: Duration, _reason: &str) -> Result<()> {
        Ok(())
    }
}
