use async_trait::async_trait;

use crate::error::StoreResult;

/// Durable string-to-string storage.
///
/// All implementations must satisfy these invariants:
/// - `set_item` returns only after the value is durable.
/// - A write to one key is atomic with respect to reads of that key.
/// - Concurrent readers and writers need no external locking.
/// - The store never interprets keys or values.
#[async_trait]
pub trait DirectoryStore: Send + Sync {
    /// Read the value stored under `key`.
    ///
    /// Returns `Ok(None)` if nothing has been stored under the key.
    async fn get_item(&self, key: &str) -> StoreResult<Option<String>>;

    /// Store `value` under `key`, replacing any previous value.
    async fn set_item(&self, key: &str, value: &str) -> StoreResult<()>;
}
