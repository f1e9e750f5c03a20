use std::fmt;
use std::sync::Arc;

use hsync_store::{DirectoryStore, InMemoryDirectoryStore, StoreError};
use hsync_types::{DocumentHandle, Iid};
use tracing::{debug, error, info};

use crate::error::{DirectoryError, DirectoryResult};

/// Durable iid -> document handle mapping.
///
/// Cloning is cheap; clones share the same store. Last write to an iid wins
/// and there is no delete.
#[derive(Clone)]
pub struct HandleDirectory {
    store: Arc<dyn DirectoryStore>,
}

impl HandleDirectory {
    pub fn new(store: Arc<dyn DirectoryStore>) -> Self {
        Self { store }
    }

    /// A directory backed by a fresh [`InMemoryDirectoryStore`].
    pub fn in_memory() -> Self {
        Self::new(Arc::new(InMemoryDirectoryStore::new()))
    }

    /// Look up the handle assigned to a raw, client-supplied iid.
    ///
    /// `Ok(None)` means nothing has been assigned yet.
    pub async fn lookup(&self, iid: &str) -> DirectoryResult<Option<DocumentHandle>> {
        let iid = Iid::parse(iid)?;
        self.get(&iid).await
    }

    /// Assign a raw handle to a raw iid, validating both first.
    ///
    /// Nothing is written unless both inputs are valid. The entry is durable
    /// when this returns `Ok`.
    pub async fn assign(&self, iid: &str, handle: &str) -> DirectoryResult<()> {
        let iid = Iid::parse(iid)?;
        let handle = DocumentHandle::parse(handle)?;
        self.put(&iid, &handle).await
    }

    pub async fn get(&self, iid: &Iid) -> DirectoryResult<Option<DocumentHandle>> {
        let stored = self
            .store
            .get_item(iid.as_str())
            .await
            .map_err(|e| storage_failure("lookup", iid, e))?;

        let Some(raw) = stored else {
            debug!(%iid, "no handle assigned");
            return Ok(None);
        };

        let handle = DocumentHandle::parse(raw).map_err(|e| {
            storage_failure(
                "lookup",
                iid,
                StoreError::Corrupt {
                    key: iid.to_string(),
                    reason: e.to_string(),
                },
            )
        })?;
        debug!(%iid, %handle, "handle found");
        Ok(Some(handle))
    }

    pub async fn put(&self, iid: &Iid, handle: &DocumentHandle) -> DirectoryResult<()> {
        self.store
            .set_item(iid.as_str(), handle.as_str())
            .await
            .map_err(|e| storage_failure("assign", iid, e))?;
        info!(%iid, %handle, "handle assigned");
        Ok(())
    }
}

fn storage_failure(op: &'static str, iid: &Iid, e: StoreError) -> DirectoryError {
    error!(op, %iid, error = %e, "directory store failure");
    DirectoryError::Storage(e)
}

impl fmt::Debug for HandleDirectory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandleDirectory").finish_non_exhaustive()
    }
}
