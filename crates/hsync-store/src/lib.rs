//! Durable key-value storage for the hsync handle directory.
//!
//! The store maps opaque string keys to opaque string values. It knows
//! nothing about instance identifiers or document handles; validation lives
//! one layer up, in `hsync-directory`.
//!
//! # Storage Backends
//!
//! All backends implement the [`DirectoryStore`] trait:
//!
//! - [`InMemoryDirectoryStore`] -- `HashMap`-based store for tests and embedding
//! - [`FileDirectoryStore`] -- one file per key, survives process restarts
//!
//! # Design Rules
//!
//! 1. `set_item` is durable when it returns (write-then-acknowledge).
//! 2. Writes to a single key are atomic: readers see the old or the new value,
//!    never a mix.
//! 3. Keys are independent. There are no cross-key transactions.
//! 4. Missing keys are `Ok(None)`, not errors.
//! 5. All I/O errors are propagated, never silently ignored.

pub mod error;
pub mod file;
pub mod memory;
pub mod traits;

pub use error::{StoreError, StoreResult};
pub use file::FileDirectoryStore;
pub use memory::InMemoryDirectoryStore;
pub use traits::DirectoryStore;
