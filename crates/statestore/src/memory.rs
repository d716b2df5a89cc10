//! In-memory state store (does not persist across restarts).

use std::collections::HashMap;

use parking_lot::RwLock;

use crate::{StateStore, StateStoreResult};

/// Simple in-memory state store for testing.
#[derive(Default)]
pub struct MemoryStateStore {
    entries: RwLock<HashMap<String, Vec<u8>>>,
}

impl MemoryStateStore {
    /// Create a new empty memory store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl StateStore for MemoryStateStore {
    fn put(&self, key: &str, value: &[u8]) -> StateStoreResult<()> {
        self.entries.write().insert(key.to_owned(), value.to_vec());
        Ok(())
    }

    fn get(&self, key: &str) -> StateStoreResult<Option<Vec<u8>>> {
        Ok(self.entries.read().get(key).cloned())
    }

    fn delete(&self, key: &str) -> StateStoreResult<()> {
        self.entries.write().remove(key);
        Ok(())
    }
}
