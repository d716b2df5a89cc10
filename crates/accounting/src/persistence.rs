//! Persistence adapter.
//!
//! Three arbitrary-precision integer keys per peer, namespaced by the hex
//! peer address. Values are decimal strings so they stay inspectable with
//! store tooling. Missing keys read as zero inside operations; the query
//! surface distinguishes a missing balance from a zero one.

use weft_primitives::{I256, PeerAddress};
use weft_statestore::StateStore;

use crate::error::AccountingError;

const BALANCE_PREFIX: &str = "accounting_balance_";
const SURPLUS_PREFIX: &str = "accounting_surplus_";
const ORIGINATED_PREFIX: &str = "accounting_originated_";

pub(crate) fn balance_key(peer: &PeerAddress) -> String {
    format!("{BALANCE_PREFIX}{}", peer.encode_hex())
}

pub(crate) fn surplus_key(peer: &PeerAddress) -> String {
    format!("{SURPLUS_PREFIX}{}", peer.encode_hex())
}

pub(crate) fn originated_key(peer: &PeerAddress) -> String {
    format!("{ORIGINATED_PREFIX}{}", peer.encode_hex())
}

pub(crate) fn load(store: &dyn StateStore, key: &str) -> Result<Option<I256>, AccountingError> {
    let Some(raw) = store.get(key)? else {
        return Ok(None);
    };
    let text = core::str::from_utf8(&raw)
        .map_err(|_| AccountingError::InvalidValue(key.to_owned()))?;
    let value = text
        .parse::<I256>()
        .map_err(|_| AccountingError::InvalidValue(key.to_owned()))?;
    Ok(Some(value))
}

pub(crate) fn load_or_zero(store: &dyn StateStore, key: &str) -> Result<I256, AccountingError> {
    Ok(load(store, key)?.unwrap_or(I256::ZERO))
}

pub(crate) fn save(store: &dyn StateStore, key: &str, value: I256) -> Result<(), AccountingError> {
    store.put(key, value.to_string().as_bytes())?;
    Ok(())
}
