//! The accounting facade and settlement controller.
//!
//! [`Accounting`] owns the peer map and the configured thresholds. All
//! operations on one peer serialize through that peer's lock; operations on
//! different peers are independent. Settlement runs from the prepare that
//! crosses the early-payment threshold: refreshment is awaited under the
//! account lock so the decide-refresh-apply sequence stays atomic, while
//! monetary payment is spawned onto its own task and deduplicated with the
//! per-peer `payment_ongoing` flag.

use std::cmp;
use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use parking_lot::RwLock;

use weft_api::{Blocklister, Payer, PricingAnnouncer, Refresher};
use weft_primitives::{I256, PeerAddress, Sign, U256};
use weft_statestore::StateStore;

use crate::action::{CreditAction, DebitAction};
use crate::config::AccountingConfig;
use crate::error::AccountingError;
use crate::peer::{PeerAccount, PeerFields};
use crate::persistence::{balance_key, load, load_or_zero, originated_key, save, surplus_key};

/// After a failed payment, no new payment is attempted for this long.
/// Refreshment keeps running every settlement round in the meantime.
const PAYMENT_FAILURE_BACKOFF_SECS: i64 = 10;

const TIME_UNSET: i64 = i64::MIN;

/// What the peer owes us once their prepaid surplus is taken into account.
pub(crate) fn compensated_debt(balance: I256, surplus: I256) -> U256 {
    let debt = balance - surplus;
    if debt > I256::ZERO {
        debt.unsigned_abs()
    } else {
        U256::ZERO
    }
}

/// What we owe the peer.
pub(crate) fn debt_owed(balance: I256) -> U256 {
    if balance < I256::ZERO {
        balance.unsigned_abs()
    } else {
        U256::ZERO
    }
}

fn to_signed(amount: U256) -> Option<I256> {
    I256::checked_from_sign_and_abs(Sign::Positive, amount)
}

/// State shared between the facade, the action handles and spawned
/// settlement tasks.
pub(crate) struct Shared {
    pub(crate) payment_threshold: U256,
    pub(crate) disconnect_threshold: U256,
    pub(crate) early_payment_percent: u64,
    pub(crate) refresh_rate: U256,
    pub(crate) store: Arc<dyn StateStore>,
    pub(crate) blocklister: Arc<dyn Blocklister>,
    pub(crate) pricing: Option<Arc<dyn PricingAnnouncer>>,
    refresher: RwLock<Option<Arc<dyn Refresher>>>,
    payer: RwLock<Option<Arc<dyn Payer>>>,
    time_override: AtomicI64,
}

impl Shared {
    pub(crate) fn time_now(&self) -> i64 {
        let t = self.time_override.load(Ordering::Relaxed);
        if t != TIME_UNSET {
            return t;
        }
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs() as i64)
            .unwrap_or(0)
    }

    fn early_payment_threshold(&self, peer_threshold: U256) -> U256 {
        let keep = 100u64.saturating_sub(self.early_payment_percent);
        peer_threshold * U256::from(keep) / U256::from(100u64)
    }

    /// Refreshment time the peer would need to purge `exposure`, plus one
    /// threshold of grace.
    pub(crate) fn blocklist_duration(&self, exposure: U256) -> Duration {
        if self.refresh_rate.is_zero() {
            return Duration::ZERO;
        }
        let secs = exposure.saturating_add(self.payment_threshold) / self.refresh_rate;
        Duration::from_secs(u64::try_from(secs).unwrap_or(u64::MAX))
    }

    /// Blocklist the peer if its total exposure (debt plus outstanding and
    /// abandoned debit reservations) has grown past what a well-behaved
    /// peer could reach.
    pub(crate) fn check_ghost_overdraw(
        &self,
        peer: &PeerAddress,
        fields: &PeerFields,
        balance: I256,
        surplus: I256,
    ) {
        let exposure = compensated_debt(balance, surplus)
            .saturating_add(fields.shadow_reserve)
            .saturating_add(fields.ghost_balance);
        let limit = self
            .disconnect_threshold
            .saturating_add(self.payment_threshold);
        if exposure > limit {
            let duration = self.blocklist_duration(exposure);
            tracing::warn!(peer = %peer, %exposure, ?duration, "ghost overdraw");
            if let Err(err) = self.blocklister.blocklist(peer, duration, "ghost overdraw") {
                tracing::error!(peer = %peer, %err, "blocklisting failed");
            }
        }
    }

    /// Settle outstanding debt with the peer: refreshment first, then a
    /// monetary payment for whatever originated debt remains.
    pub(crate) async fn settle(
        &self,
        peer: PeerAddress,
        fields: &mut PeerFields,
    ) -> Result<(), AccountingError> {
        let now = self.time_now();
        let store = &*self.store;
        let bkey = balance_key(&peer);
        let balance = load_or_zero(store, &bkey)?;
        let debt = debt_owed(balance);
        let settlement_amount = cmp::min(debt, fields.payment_threshold);

        // No refreshment is possible until the clock passes the peer's
        // high-water mark.
        if !settlement_amount.is_zero() && now > fields.refreshment_timestamp {
            let refresher = self.refresher.read().clone();
            if let Some(refresher) = refresher {
                let shadow_balance = debt.saturating_sub(fields.shadow_reserve);
                let (accepted, timestamp) = refresher
                    .refresh(&peer, settlement_amount, shadow_balance)
                    .await
                    .map_err(AccountingError::Settlement)?;
                fields.refreshment_timestamp = timestamp;
                let accepted = cmp::min(accepted, settlement_amount);
                if !accepted.is_zero() {
                    let new_balance = balance + I256::from_raw(accepted);
                    save(store, &bkey, new_balance)?;
                    let okey = originated_key(&peer);
                    let originated = load_or_zero(store, &okey)?;
                    let clamped = cmp::max(originated, cmp::min(I256::ZERO, new_balance));
                    if clamped != originated {
                        save(store, &okey, clamped)?;
                    }
                    tracing::debug!(peer = %peer, %accepted, balance = %new_balance, "refreshment applied");
                }
            }
        }

        // Monetary settlement covers only the debt we originated; forwarded
        // debt settles exclusively through refreshment.
        let payer = self.payer.read().clone();
        if let Some(payer) = payer {
            if !fields.payment_ongoing
                && now.saturating_sub(fields.last_settlement_failure)
                    > PAYMENT_FAILURE_BACKOFF_SECS
            {
                let originated = load_or_zero(store, &originated_key(&peer))?;
                let payment_due = cmp::min(debt_owed(originated), fields.payment_threshold);
                if !payment_due.is_zero() {
                    fields.payment_ongoing = true;
                    tracing::debug!(peer = %peer, amount = %payment_due, "starting payment");
                    tokio::spawn(async move {
                        payer.pay(&peer, payment_due).await;
                    });
                }
            }
        }
        Ok(())
    }
}

/// Per-peer accounting and settlement.
///
/// See the crate docs for the protocol overview.
pub struct Accounting {
    config: AccountingConfig,
    shared: Arc<Shared>,
    peers: RwLock<HashMap<PeerAddress, Arc<PeerAccount>>>,
}

impl Accounting {
    /// Create a new accounting instance.
    ///
    /// Refreshment and payment stay disabled until a [`Refresher`] and
    /// [`Payer`] are installed with [`Self::set_refresher`] /
    /// [`Self::set_payer`].
    pub fn new(
        config: AccountingConfig,
        store: Arc<dyn StateStore>,
        blocklister: Arc<dyn Blocklister>,
        pricing: Option<Arc<dyn PricingAnnouncer>>,
    ) -> Self {
        let payment_threshold = U256::from(config.payment_threshold);
        let disconnect_threshold = payment_threshold
            * U256::from(100 + config.payment_tolerance_percent)
            / U256::from(100u64);
        Self {
            shared: Arc::new(Shared {
                payment_threshold,
                disconnect_threshold,
                early_payment_percent: config.early_payment_percent,
                refresh_rate: U256::from(config.refresh_rate),
                store,
                blocklister,
                pricing,
                refresher: RwLock::new(None),
                payer: RwLock::new(None),
                time_override: AtomicI64::new(TIME_UNSET),
            }),
            config,
            peers: RwLock::new(HashMap::new()),
        }
    }

    /// Get the accounting configuration.
    pub fn config(&self) -> &AccountingConfig {
        &self.config
    }

    fn get_or_create_peer(&self, peer: PeerAddress) -> Arc<PeerAccount> {
        {
            let peers = self.peers.read();
            if let Some(account) = peers.get(&peer) {
                return Arc::clone(account);
            }
        }
        let mut peers = self.peers.write();
        peers
            .entry(peer)
            .or_insert_with(|| Arc::new(PeerAccount::new(peer, self.shared.payment_threshold)))
            .clone()
    }

    /// Mark the peer connected: volatile state and persisted balances start
    /// from a fresh slate (a reconnecting peer has served any blocklist),
    /// and our payment threshold is announced.
    pub async fn connect(&self, peer: PeerAddress) {
        let account = self.get_or_create_peer(peer);
        {
            let mut fields = account.fields().lock().await;
            *fields = PeerFields::new(self.shared.payment_threshold);
            fields.connected = true;

            let store = &*self.shared.store;
            for key in [balance_key(&peer), surplus_key(&peer), originated_key(&peer)] {
                if let Err(err) = save(store, &key, I256::ZERO) {
                    tracing::error!(peer = %peer, key = %key, %err, "failed to reset persisted balance");
                }
            }
        }
        if let Some(pricing) = &self.shared.pricing {
            if let Err(err) = pricing
                .announce_payment_threshold(&peer, self.shared.payment_threshold)
                .await
            {
                tracing::warn!(peer = %peer, %err, "failed to announce payment threshold");
            }
        }
        tracing::debug!(peer = %peer, "peer connected");
    }

    /// Mark the peer disconnected. A peer leaving with unpaid debt or
    /// outstanding debit reservations is blocklisted for the time
    /// refreshment would have needed to purge them.
    pub async fn disconnect(&self, peer: PeerAddress) {
        let account = self.get_or_create_peer(peer);
        let mut fields = account.fields().lock().await;
        if fields.connected {
            let store = &*self.shared.store;
            let balance = load_or_zero(store, &balance_key(&peer));
            let surplus = load_or_zero(store, &surplus_key(&peer));
            match (balance, surplus) {
                (Ok(balance), Ok(surplus)) => {
                    let exposure = compensated_debt(balance, surplus)
                        .saturating_add(fields.shadow_reserve)
                        .saturating_add(fields.ghost_balance);
                    if !exposure.is_zero() {
                        let duration = self.shared.blocklist_duration(exposure);
                        tracing::debug!(peer = %peer, %exposure, ?duration, "disconnected with open exposure");
                        if let Err(err) =
                            self.shared.blocklister.blocklist(&peer, duration, "disconnected")
                        {
                            tracing::error!(peer = %peer, %err, "blocklisting failed");
                        }
                    }
                }
                (Err(err), _) | (_, Err(err)) => {
                    tracing::error!(peer = %peer, %err, "failed to read balances on disconnect");
                }
            }
        }
        fields.connected = false;
    }

    /// Reserve `amount` of new debt towards `peer`.
    ///
    /// If the expected debt crosses the early-payment mark this first tries
    /// to settle; if it would still exceed the peer's payment threshold the
    /// reservation is refused with [`AccountingError::Overdraft`].
    pub async fn prepare_credit(
        &self,
        timeout: Option<Duration>,
        peer: PeerAddress,
        amount: u64,
        originated: bool,
    ) -> Result<CreditAction, AccountingError> {
        let account = self.get_or_create_peer(peer);
        let mut fields = account.fields().lock_deadline(timeout).await?;
        let amount = U256::from(amount);
        let store = &*self.shared.store;
        let bkey = balance_key(&peer);

        let threshold = fields.payment_threshold;
        let balance = load_or_zero(store, &bkey)?;
        let mut expected_debt = debt_owed(balance)
            .saturating_add(fields.reserved_credit)
            .saturating_add(amount);

        if expected_debt >= self.shared.early_payment_threshold(threshold) {
            if let Err(err) = self.shared.settle(peer, &mut fields).await {
                tracing::warn!(peer = %peer, %err, "settlement attempt failed");
            }
            let balance = load_or_zero(store, &bkey)?;
            expected_debt = debt_owed(balance)
                .saturating_add(fields.reserved_credit)
                .saturating_add(amount);
        }

        if expected_debt > threshold {
            return Err(AccountingError::Overdraft);
        }

        fields.reserved_credit = fields.reserved_credit.saturating_add(amount);
        drop(fields);
        Ok(CreditAction::new(
            Arc::clone(&self.shared),
            account,
            amount,
            originated,
        ))
    }

    /// Reserve a debit of `amount` against `peer`. Debits are always
    /// provisional until apply, so there is no up-front threshold check.
    pub async fn prepare_debit(
        &self,
        timeout: Option<Duration>,
        peer: PeerAddress,
        amount: u64,
    ) -> Result<DebitAction, AccountingError> {
        let account = self.get_or_create_peer(peer);
        let mut fields = account.fields().lock_deadline(timeout).await?;
        let amount = U256::from(amount);
        fields.shadow_reserve = fields.shadow_reserve.saturating_add(amount);
        drop(fields);
        Ok(DebitAction::new(Arc::clone(&self.shared), account, amount))
    }

    /// Report the outcome of an asynchronous payment started by the
    /// settlement controller.
    pub async fn notify_payment_sent(
        &self,
        peer: PeerAddress,
        amount: U256,
        error: Option<weft_primitives::Error>,
    ) {
        let account = self.get_or_create_peer(peer);
        let mut fields = account.fields().lock().await;
        fields.payment_ongoing = false;

        if let Some(err) = error {
            fields.last_settlement_failure = self.shared.time_now();
            tracing::warn!(peer = %peer, %amount, %err, "payment failed");
            return;
        }

        let store = &*self.shared.store;
        let result = (|| {
            let amount = to_signed(amount).ok_or(AccountingError::Overflow)?;
            let bkey = balance_key(&peer);
            let balance = load_or_zero(store, &bkey)?;
            let new_balance = balance + amount;

            // The payment settles originated debt; an overpaid portion is
            // our credit with the peer, capped by the actual balance.
            let okey = originated_key(&peer);
            let originated = load_or_zero(store, &okey)?;
            let new_originated = cmp::min(
                originated + amount,
                cmp::max(new_balance, I256::ZERO),
            );

            save(store, &bkey, new_balance)?;
            save(store, &okey, new_originated)?;
            tracing::debug!(peer = %peer, balance = %new_balance, "payment booked");
            Ok::<_, AccountingError>(())
        })();
        if let Err(err) = result {
            tracing::error!(peer = %peer, %err, "failed to book sent payment");
        }
    }

    /// Book a payment received from the peer. Anything beyond the peer's
    /// current debt becomes surplus and absorbs future debits.
    pub async fn notify_payment_received(
        &self,
        peer: PeerAddress,
        amount: U256,
    ) -> Result<(), AccountingError> {
        let account = self.get_or_create_peer(peer);
        let _fields = account.fields().lock().await;

        let store = &*self.shared.store;
        let amount = to_signed(amount).ok_or(AccountingError::Overflow)?;
        let bkey = balance_key(&peer);
        let balance = load_or_zero(store, &bkey)?;
        let new_balance = balance.checked_sub(amount).ok_or(AccountingError::Overflow)?;

        if new_balance < I256::ZERO {
            let skey = surplus_key(&peer);
            let surplus = load_or_zero(store, &skey)?;
            let new_surplus = surplus
                .checked_add(-new_balance)
                .ok_or(AccountingError::Overflow)?;
            save(store, &skey, new_surplus)?;
            save(store, &bkey, I256::ZERO)?;
            tracing::debug!(peer = %peer, surplus = %new_surplus, "payment received into surplus");
        } else {
            save(store, &bkey, new_balance)?;
            tracing::debug!(peer = %peer, balance = %new_balance, "payment received");
        }
        Ok(())
    }

    /// Record the payment threshold announced by the peer.
    pub async fn notify_payment_threshold(&self, peer: PeerAddress, threshold: U256) {
        let account = self.get_or_create_peer(peer);
        let mut fields = account.fields().lock().await;
        fields.payment_threshold = threshold;
    }

    /// Net position with the peer. Positive means the peer owes us.
    pub fn balance(&self, peer: PeerAddress) -> Result<I256, AccountingError> {
        load(&*self.shared.store, &balance_key(&peer))?.ok_or(AccountingError::NoBalance)
    }

    /// Credit received beyond what the peer owed.
    pub fn surplus_balance(&self, peer: PeerAddress) -> Result<I256, AccountingError> {
        load(&*self.shared.store, &surplus_key(&peer))?.ok_or(AccountingError::NoBalance)
    }

    /// The slice of our debt that we originated ourselves.
    pub fn originated_balance(&self, peer: PeerAddress) -> Result<I256, AccountingError> {
        load(&*self.shared.store, &originated_key(&peer))?.ok_or(AccountingError::NoBalance)
    }

    /// What the peer owes us after surplus compensation; zero for unknown
    /// peers.
    pub fn peer_debt(&self, peer: PeerAddress) -> Result<U256, AccountingError> {
        let store = &*self.shared.store;
        let balance = load(store, &balance_key(&peer))?.unwrap_or(I256::ZERO);
        let surplus = load(store, &surplus_key(&peer))?.unwrap_or(I256::ZERO);
        Ok(compensated_debt(balance, surplus))
    }

    /// Whether a payment to this peer is currently in flight.
    pub async fn is_payment_ongoing(&self, peer: PeerAddress) -> bool {
        self.get_or_create_peer(peer)
            .fields()
            .lock()
            .await
            .payment_ongoing
    }

    /// Override the clock. Test seam.
    pub fn set_time(&self, timestamp: i64) {
        self.shared
            .time_override
            .store(timestamp, Ordering::Relaxed);
    }

    /// Install the refreshment collaborator.
    pub fn set_refresher(&self, refresher: Arc<dyn Refresher>) {
        *self.shared.refresher.write() = Some(refresher);
    }

    /// Install the payment collaborator.
    pub fn set_payer(&self, payer: Arc<dyn Payer>) {
        *self.shared.payer.write() = Some(payer);
    }
}
