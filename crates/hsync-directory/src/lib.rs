//! Handle directory for hsync.
//!
//! Maps client-facing instance identifiers ([`Iid`]) to sync-engine
//! [`DocumentHandle`]s on top of any [`DirectoryStore`]. Inputs are validated
//! before storage is touched, so a rejected request never changes the
//! directory.
//!
//! [`Iid`]: hsync_types::Iid
//! [`DocumentHandle`]: hsync_types::DocumentHandle
//! [`DirectoryStore`]: hsync_store::DirectoryStore

pub mod directory;
pub mod error;

pub use directory::HandleDirectory;
pub use error::{DirectoryError, DirectoryResult};
