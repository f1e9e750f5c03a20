//! Foundation types for hsync.
//!
//! Every other hsync crate depends on `hsync-types`.
//!
//! # Key Types
//!
//! - [`Iid`] — opaque, client-supplied instance identifier (directory key)
//! - [`DocumentHandle`] — sync-engine document handle, validated as base58
//! - [`PeerId`] — this node's identity on the sync network

pub mod error;
pub mod handle;
pub mod iid;
pub mod peer;

pub use error::TypeError;
pub use handle::DocumentHandle;
pub use iid::Iid;
pub use peer::PeerId;
