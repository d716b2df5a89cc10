//! Two-phase credit and debit actions.
//!
//! A prepared action holds a reservation against the peer's account until
//! it is either applied (the balance moves and is persisted) or cleaned up
//! (the reservation is released). Cleanup is idempotent and callable on
//! every exit path; cleanup after apply is a no-op.

use std::cmp;
use std::sync::Arc;

use weft_primitives::{I256, U256};

use crate::accounting::{compensated_debt, Shared};
use crate::error::AccountingError;
use crate::peer::PeerAccount;
use crate::persistence::{balance_key, load_or_zero, originated_key, save, surplus_key};

/// A prepared credit: debt we have provisionally committed to.
pub struct CreditAction {
    shared: Arc<Shared>,
    account: Arc<PeerAccount>,
    amount: U256,
    originated: bool,
    applied: bool,
    consumed: bool,
}

impl CreditAction {
    pub(crate) fn new(
        shared: Arc<Shared>,
        account: Arc<PeerAccount>,
        amount: U256,
        originated: bool,
    ) -> Self {
        Self {
            shared,
            account,
            amount,
            originated,
            applied: false,
            consumed: false,
        }
    }

    /// Book the credit: the balance moves and is persisted, the reservation
    /// is consumed.
    pub async fn apply(&mut self) -> Result<(), AccountingError> {
        let peer = self.account.peer();
        let mut fields = self.account.fields().lock().await;
        let store = &*self.shared.store;

        let bkey = balance_key(&peer);
        let balance = load_or_zero(store, &bkey)?;
        let amount = I256::from_raw(self.amount);
        let new_balance = balance - amount;
        save(store, &bkey, new_balance)?;

        if self.originated {
            // Our own debt may not exceed, in magnitude, the total debt.
            let okey = originated_key(&peer);
            let originated = load_or_zero(store, &okey)?;
            let new_originated = cmp::max(originated - amount, new_balance);
            save(store, &okey, new_originated)?;
        }

        fields.reserved_credit = fields.reserved_credit.saturating_sub(self.amount);
        self.applied = true;
        tracing::trace!(peer = %peer, amount = %self.amount, balance = %new_balance, "credit applied");
        Ok(())
    }

    /// Release the reservation if the credit was never applied.
    pub async fn cleanup(&mut self) {
        if self.consumed || self.applied {
            self.consumed = true;
            return;
        }
        self.consumed = true;

        let mut fields = self.account.fields().lock().await;
        fields.reserved_credit = fields.reserved_credit.saturating_sub(self.amount);
    }
}

impl Drop for CreditAction {
    fn drop(&mut self) {
        if !self.applied && !self.consumed {
            tracing::debug!(
                peer = %self.account.peer(),
                amount = %self.amount,
                "credit action dropped without cleanup, reservation leaked"
            );
        }
    }
}

/// A prepared debit: work we are about to perform for the peer.
pub struct DebitAction {
    shared: Arc<Shared>,
    account: Arc<PeerAccount>,
    amount: U256,
    applied: bool,
    consumed: bool,
}

impl DebitAction {
    pub(crate) fn new(shared: Arc<Shared>, account: Arc<PeerAccount>, amount: U256) -> Self {
        Self {
            shared,
            account,
            amount,
            applied: false,
            consumed: false,
        }
    }

    /// Book the debit: surplus is consumed first, the remainder raises the
    /// balance. Fails with [`AccountingError::BlockPeer`] when the peer
    /// crosses the disconnect threshold; the balance keeps its post-apply
    /// value since the peer still owes it.
    pub async fn apply(&mut self) -> Result<(), AccountingError> {
        let peer = self.account.peer();
        let mut fields = self.account.fields().lock().await;
        self.applied = true;
        fields.shadow_reserve = fields.shadow_reserve.saturating_sub(self.amount);

        let store = &*self.shared.store;
        let bkey = balance_key(&peer);
        let skey = surplus_key(&peer);
        let balance = load_or_zero(store, &bkey)?;
        let surplus = load_or_zero(store, &skey)?;

        // Surplus absorbs the debit before the balance moves.
        let mut remaining = I256::from_raw(self.amount);
        let mut new_surplus = surplus;
        if surplus > I256::ZERO {
            let used = cmp::min(surplus, remaining);
            new_surplus = surplus - used;
            remaining -= used;
            save(store, &skey, new_surplus)?;
        }

        let new_balance = balance + remaining;
        if let Err(err) = save(store, &bkey, new_balance) {
            if new_surplus != surplus {
                if let Err(err) = save(store, &skey, surplus) {
                    tracing::error!(peer = %peer, %err, "failed to restore surplus after write failure");
                }
            }
            return Err(err);
        }

        let okey = originated_key(&peer);
        let originated = load_or_zero(store, &okey)?;
        let clamped = cmp::max(originated, cmp::min(I256::ZERO, new_balance));
        if clamped != originated {
            save(store, &okey, clamped)?;
        }

        tracing::trace!(peer = %peer, amount = %self.amount, balance = %new_balance, "debit applied");
        self.shared
            .check_ghost_overdraw(&peer, &fields, new_balance, new_surplus);

        if new_balance >= I256::from_raw(self.shared.disconnect_threshold) {
            let exposure = compensated_debt(new_balance, new_surplus)
                .saturating_add(fields.shadow_reserve)
                .saturating_add(fields.ghost_balance);
            let duration = self.shared.blocklist_duration(exposure);
            tracing::warn!(peer = %peer, balance = %new_balance, "disconnect threshold exceeded");
            return Err(AccountingError::BlockPeer { duration });
        }
        Ok(())
    }

    /// Release the reservation if the debit was never applied. The peer
    /// consumed a reservation without following through, so the amount
    /// moves to its ghost balance.
    pub async fn cleanup(&mut self) {
        if self.consumed || self.applied {
            self.consumed = true;
            return;
        }
        self.consumed = true;

        let peer = self.account.peer();
        let mut fields = self.account.fields().lock().await;
        fields.shadow_reserve = fields.shadow_reserve.saturating_sub(self.amount);
        fields.ghost_balance = fields.ghost_balance.saturating_add(self.amount);

        let store = &*self.shared.store;
        let balance = load_or_zero(store, &balance_key(&peer));
        let surplus = load_or_zero(store, &surplus_key(&peer));
        match (balance, surplus) {
            (Ok(balance), Ok(surplus)) => {
                self.shared
                    .check_ghost_overdraw(&peer, &fields, balance, surplus);
            }
            (Err(err), _) | (_, Err(err)) => {
                tracing::error!(peer = %peer, %err, "failed to read balances for ghost check");
            }
        }
    }
}

impl Drop for DebitAction {
    fn drop(&mut self) {
        if !self.applied && !self.consumed {
            tracing::debug!(
                peer = %self.account.peer(),
                amount = %self.amount,
                "debit action dropped without cleanup, reservation leaked"
            );
        }
    }
}
