//! Key-value state store abstraction.
//!
//! The [`StateStore`] trait abstracts over persistent node state backends.
//! Single-key writes are atomic; callers that need multi-key consistency
//! serialize access themselves.
//!
//! # Thread Safety
//!
//! Implementations must be thread-safe (Send + Sync).

mod memory;

pub use memory::MemoryStateStore;

use auto_impl::auto_impl;

/// Result alias for state store operations.
pub type StateStoreResult<T> = Result<T, StateStoreError>;

/// Errors from state store operations.
#[derive(Debug, Clone, thiserror::Error)]
pub enum StateStoreError {
    /// Backend error.
    #[error("store backend: {0}")]
    Backend(String),

    /// IO error.
    #[error("io: {0}")]
    Io(String),
}

/// Persistent key-value store for node state.
///
/// Keys are UTF-8 strings namespaced by the caller; values are raw bytes.
#[auto_impl(&, Arc, Box)]
pub trait StateStore: Send + Sync + 'static {
    /// Store a value under a key, overwriting any previous value.
    fn put(&self, key: &str, value: &[u8]) -> StateStoreResult<()>;

    /// Get the value for a key.
    ///
    /// Returns `None` if the key doesn't exist.
    fn get(&self, key: &str) -> StateStoreResult<Option<Vec<u8>>>;

    /// Remove a key.
    ///
    /// Returns `Ok(())` even if the key didn't exist.
    fn delete(&self, key: &str) -> StateStoreResult<()>;
}
