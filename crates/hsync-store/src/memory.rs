//! In-memory directory store for testing and ephemeral use.
//!
//! [`InMemoryDirectoryStore`] keeps all entries in a `HashMap` protected by a
//! `RwLock`. Data is lost when the store is dropped.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;

use crate::error::{StoreError, StoreResult};
use crate::traits::DirectoryStore;

#[derive(Debug, Default)]
pub struct InMemoryDirectoryStore {
    items: RwLock<HashMap<String, String>>,
}

impl InMemoryDirectoryStore {
    /// Create a new empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entries.
    pub fn len(&self) -> usize {
        self.items.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl DirectoryStore for InMemoryDirectoryStore {
    async fn get_item(&self, key: &str) -> StoreResult<Option<String>> {
        let items = self
            .items
            .read()
            .map_err(|e| StoreError::Unavailable(format!("lock poisoned: {e}")))?;
        Ok(items.get(key).cloned())
    }

    async fn set_item(&self, key: &str, value: &str) -> StoreResult<()> {
        let mut items = self
            .items
            .write()
            .map_err(|e| StoreError::Unavailable(format!("lock poisoned: {e}")))?;
        items.insert(key.to_string(), value.to_string());
        Ok(())
    }
}
