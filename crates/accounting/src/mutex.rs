//! Deadline-aware mutex.
//!
//! Wraps [`tokio::sync::Mutex`] with a single enriched operation,
//! [`DeadlineMutex::lock_deadline`]: acquire the lock, or give up with
//! [`LockError::Timeout`] once the caller's deadline passes. This is the
//! one place where caller deadlines are honored; once the lock is held,
//! operations complete synchronously.

use std::time::Duration;

use tokio::sync::{Mutex, MutexGuard};

/// Errors from lock acquisition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum LockError {
    /// The deadline expired while waiting for the lock.
    #[error("failed to acquire lock within deadline")]
    Timeout,

    /// The lock is currently held and no wait was requested.
    #[error("lock is currently held")]
    WouldBlock,
}

/// A mutex whose waiters can be bounded by a deadline.
#[derive(Debug, Default)]
pub struct DeadlineMutex<T> {
    inner: Mutex<T>,
}

impl<T> DeadlineMutex<T> {
    /// Create a new mutex guarding `value`.
    pub fn new(value: T) -> Self {
        Self {
            inner: Mutex::new(value),
        }
    }

    /// Acquire the lock, waiting as long as it takes.
    ///
    /// Dropping the returned future abandons the wait.
    pub async fn lock(&self) -> MutexGuard<'_, T> {
        self.inner.lock().await
    }

    /// Acquire the lock only if it is immediately available.
    pub fn try_lock(&self) -> Result<MutexGuard<'_, T>, LockError> {
        self.inner.try_lock().map_err(|_| LockError::WouldBlock)
    }

    /// Acquire the lock, waiting at most `timeout` if one is given.
    pub async fn lock_deadline(
        &self,
        timeout: Option<Duration>,
    ) -> Result<MutexGuard<'_, T>, LockError> {
        match timeout {
            None => Ok(self.inner.lock().await),
            Some(timeout) => tokio::time::timeout(timeout, self.inner.lock())
                .await
                .map_err(|_| LockError::Timeout),
        }
    }
}
