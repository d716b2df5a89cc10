//! Error types for the weft node

/// Common error type for all weft operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Error related to network operations
    #[error("Network error: {0}")]
    Network(String),

    /// Error related to settlement operations
    #[error("Settlement error: {0}")]
    Settlement(String),

    /// Error related to storage operations
    #[error("Storage error: {0}")]
    Storage(String),

    /// Error when a resource is not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Other errors
    #[error("Other error: {0}")]
    Other(String),
}

impl Error {
    /// Creates a new network error
    pub fn network(msg: impl Into<String>) -> Self {
        Self::Network(msg.into())
    }

    /// Creates a new settlement error
    pub fn settlement(msg: impl Into<String>) -> Self {
        Self::Settlement(msg.into())
    }

    /// Creates a new storage error
    pub fn storage(msg: impl Into<String>) -> Self {
        Self::Storage(msg.into())
    }

    /// Creates a new not found error
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    /// Creates a new other error
    pub fn other(msg: impl Into<String>) -> Self {
        Self::Other(msg.into())
    }
}
