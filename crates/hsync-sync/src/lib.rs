//! Sync engine collaborator interface for hsync.
//!
//! The sync engine (document replication, storage layout, wire protocol) is
//! not implemented here. This crate defines what the gateway hands to it and
//! what it expects back:
//!
//! - [`SyncTransport`] receives every bridged [`Connection`] together with
//!   the [`RequestInfo`] of the upgrade request. After handoff the gateway
//!   keeps no reference to the connection.
//! - [`EngineConfig`] carries the peer identity, the storage root, and the
//!   [`SharePolicy`].
//! - [`EngineHost`] drives a [`SyncEngine`] over the connections coming out
//!   of a [`ChannelTransport`].

pub mod connection;
pub mod engine;
pub mod error;
pub mod policy;
pub mod transport;

pub use connection::{Connection, RequestInfo};
pub use engine::{EngineConfig, EngineHost, IdleEngine, SyncEngine};
pub use error::{SyncError, SyncResult};
pub use policy::{NeverShare, SharePolicy};
pub use transport::{ChannelTransport, ConnectionReceiver, SyncTransport};
