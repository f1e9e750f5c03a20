//! File-backed directory store.
//!
//! Layout under the root directory:
//!
//! ```text
//! <root>/<hex blake3(key)>    JSON record {"key": ..., "value": ...}
//! ```
//!
//! Hashing the key keeps arbitrary client strings (slashes, `..`, unicode)
//! out of file names. The full key is kept inside the record and checked
//! on read.

use std::io::Write;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use tracing::{debug, warn};

use crate::error::{StoreError, StoreResult};
use crate::traits::DirectoryStore;

#[derive(Debug, Serialize, Deserialize)]
struct Record {
    key: String,
    value: String,
}

/// A [`DirectoryStore`] persisting one file per key.
///
/// Writes go to a temporary file in the same directory, are fsynced, and are
/// then renamed over the record. Rename is atomic on the same file system,
/// which gives per-key write atomicity without any locking.
#[derive(Clone, Debug)]
pub struct FileDirectoryStore {
    root: PathBuf,
}

impl FileDirectoryStore {
    /// Open a store rooted at `root`, creating the directory if absent.
    pub async fn open(root: impl Into<PathBuf>) -> StoreResult<Self> {
        let root = root.into();
        tokio::fs::create_dir_all(&root).await?;
        debug!(root = %root.display(), "opened file directory store");
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn record_path(&self, key: &str) -> PathBuf {
        self.root
            .join(hex::encode(blake3::hash(key.as_bytes()).as_bytes()))
    }
}

#[async_trait]
impl DirectoryStore for FileDirectoryStore {
    async fn get_item(&self, key: &str) -> StoreResult<Option<String>> {
        let path = self.record_path(key);
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let record: Record = serde_json::from_slice(&bytes).map_err(|e| StoreError::Corrupt {
            key: key.to_string(),
            reason: e.to_string(),
        })?;
        if record.key != key {
            warn!(path = %path.display(), "record key mismatch");
            return Err(StoreError::Corrupt {
                key: key.to_string(),
                reason: format!("record holds key {:?}", record.key),
            });
        }
        Ok(Some(record.value))
    }

    async fn set_item(&self, key: &str, value: &str) -> StoreResult<()> {
        let record = Record {
            key: key.to_string(),
            value: value.to_string(),
        };
        let bytes =
            serde_json::to_vec(&record).map_err(|e| StoreError::Serialization(e.to_string()))?;
        let root = self.root.clone();
        let path = self.record_path(key);

        tokio::task::spawn_blocking(move || write_atomic(&root, &path, &bytes))
            .await
            .map_err(|e| StoreError::Unavailable(format!("write task failed: {e}")))?
    }
}

fn write_atomic(root: &Path, path: &Path, bytes: &[u8]) -> StoreResult<()> {
    let mut tmp = NamedTempFile::new_in(root)?;
    tmp.write_all(bytes)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| StoreError::Io(e.error))?;

    // Make the rename itself durable.
    #[cfg(unix)]
    std::fs::File::open(root)?.sync_all()?;

    Ok(())
}
