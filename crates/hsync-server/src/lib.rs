//! HTTP gateway for hsync.
//!
//! Binds the listener behind a broadcast-once readiness signal, serves the
//! handle directory API, and bridges WebSocket upgrades into the sync
//! engine's transport. Origin allow-listing guards both.

pub mod api;
pub mod bridge;
pub mod config;
pub mod error;
pub mod handler;
pub mod origin;
pub mod readiness;
pub mod router;
pub mod server;

pub use bridge::ConnectionBridge;
pub use config::ServerConfig;
pub use error::{ServerError, ServerResult};
pub use origin::OriginPolicy;
pub use readiness::Readiness;
pub use router::AppState;
pub use server::HsyncServer;
