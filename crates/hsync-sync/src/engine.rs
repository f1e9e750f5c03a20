use std::fmt;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use axum::extract::ws::Message;
use hsync_types::PeerId;
use tracing::{debug, info, warn};

use crate::connection::Connection;
use crate::error::SyncResult;
use crate::policy::{NeverShare, SharePolicy};
use crate::transport::ConnectionReceiver;

/// Everything the sync engine is configured with.
#[derive(Clone)]
pub struct EngineConfig {
    pub peer_id: PeerId,
    /// Root of the engine's document storage.
    pub storage_dir: PathBuf,
    pub share_policy: Arc<dyn SharePolicy>,
}

impl EngineConfig {
    /// Config with the [`NeverShare`] policy.
    pub fn new(peer_id: PeerId, storage_dir: impl Into<PathBuf>) -> Self {
        Self {
            peer_id,
            storage_dir: storage_dir.into(),
            share_policy: Arc::new(NeverShare),
        }
    }

    pub fn with_share_policy(mut self, policy: Arc<dyn SharePolicy>) -> Self {
        self.share_policy = policy;
        self
    }

    /// Create the storage root if it does not exist yet.
    pub async fn prepare_storage(&self) -> SyncResult<()> {
        tokio::fs::create_dir_all(&self.storage_dir).await?;
        Ok(())
    }
}

impl fmt::Debug for EngineConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EngineConfig")
            .field("peer_id", &self.peer_id)
            .field("storage_dir", &self.storage_dir)
            .finish_non_exhaustive()
    }
}

/// A sync engine serving one bridged peer at a time per call.
///
/// `run_peer` owns the connection until the peer goes away; keep-alive,
/// teardown and protocol are all the engine's concern.
#[async_trait]
pub trait SyncEngine: Send + Sync + 'static {
    async fn run_peer(&self, connection: Connection, config: &EngineConfig) -> SyncResult<()>;
}

/// Engine used when no replication engine is linked in.
///
/// Holds the channel open without sending anything and returns when the
/// peer closes it. Pings are answered by the socket itself.
#[derive(Clone, Copy, Debug, Default)]
pub struct IdleEngine;

#[async_trait]
impl SyncEngine for IdleEngine {
    async fn run_peer(&self, connection: Connection, _config: &EngineConfig) -> SyncResult<()> {
        let (mut socket, request) = connection.into_parts();
        let mut frames = 0u64;
        while let Some(message) = socket.recv().await {
            match message {
                Ok(Message::Close(_)) => break,
                Ok(_) => frames += 1,
                Err(e) => {
                    debug!(remote = ?request.remote_addr, error = %e, "peer socket error");
                    break;
                }
            }
        }
        debug!(remote = ?request.remote_addr, frames, "peer channel ended");
        Ok(())
    }
}

/// Drives a [`SyncEngine`] over the connections of a [`ConnectionReceiver`].
pub struct EngineHost<E> {
    engine: Arc<E>,
    config: Arc<EngineConfig>,
    live: Arc<AtomicUsize>,
}

impl<E: SyncEngine> EngineHost<E> {
    pub fn new(engine: E, config: EngineConfig) -> Self {
        Self {
            engine: Arc::new(engine),
            config: Arc::new(config),
            live: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Number of peers whose channel is currently open.
    pub fn live_peers(&self) -> usize {
        self.live.load(Ordering::SeqCst)
    }

    /// Serve connections until every transport feeding `receiver` is gone.
    ///
    /// Each connection runs on its own task; peers still connected when this
    /// returns keep running until they close.
    pub async fn run(&self, mut receiver: ConnectionReceiver) {
        info!(peer_id = %self.config.peer_id, "sync engine host started");
        while let Some(connection) = receiver.recv().await {
            let engine = Arc::clone(&self.engine);
            let config = Arc::clone(&self.config);
            let guard = PeerGuard::enter(Arc::clone(&self.live));
            let remote = connection.request.remote_addr;
            info!(remote = ?remote, live = guard.live(), "peer connected");

            tokio::spawn(async move {
                if let Err(e) = engine.run_peer(connection, &config).await {
                    warn!(remote = ?remote, error = %e, "peer session failed");
                }
                drop(guard);
                info!(remote = ?remote, "peer disconnected");
            });
        }
        info!("sync engine host stopped");
    }
}

struct PeerGuard(Arc<AtomicUsize>);

impl PeerGuard {
    fn enter(live: Arc<AtomicUsize>) -> Self {
        live.fetch_add(1, Ordering::SeqCst);
        Self(live)
    }

    fn live(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }
}

impl Drop for PeerGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::ChannelTransport;

    #[tokio::test]
    async fn prepare_storage_creates_root() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path().join("documents");
        let config = EngineConfig::new(PeerId::for_host("test"), &root);
        config.prepare_storage().await.unwrap();
        assert!(root.is_dir());
        // Second call is a no-op.
        config.prepare_storage().await.unwrap();
    }

    #[tokio::test]
    async fn default_policy_never_shares() {
        let config = EngineConfig::new(PeerId::for_host("test"), "unused");
        assert!(!config.share_policy.should_share("peer", "doc").await);
    }

    #[tokio::test]
    async fn host_stops_when_transport_dropped() {
        let (transport, receiver) = ChannelTransport::new();
        let host = EngineHost::new(IdleEngine, EngineConfig::new(PeerId::for_host("t"), "unused"));
        drop(transport);
        host.run(receiver).await;
        assert_eq!(host.live_peers(), 0);
    }
}
