use async_trait::async_trait;
use tokio::sync::mpsc;
use tracing::debug;

use crate::connection::Connection;
use crate::error::{SyncError, SyncResult};

/// Transport adapter of the sync engine.
///
/// `accept` is the "new connection" event. Ownership of the connection moves
/// to the engine; the caller must not hold on to anything from it.
#[async_trait]
pub trait SyncTransport: Send + Sync {
    async fn accept(&self, connection: Connection) -> SyncResult<()>;
}

/// Bounded number of handed-off connections waiting for the engine.
const DEFAULT_BACKLOG: usize = 64;

/// [`SyncTransport`] that queues connections on an mpsc channel.
#[derive(Clone, Debug)]
pub struct ChannelTransport {
    tx: mpsc::Sender<Connection>,
}

/// Receiving end of a [`ChannelTransport`], given to the engine host.
#[derive(Debug)]
pub struct ConnectionReceiver {
    rx: mpsc::Receiver<Connection>,
}

impl ChannelTransport {
    pub fn new() -> (Self, ConnectionReceiver) {
        Self::with_backlog(DEFAULT_BACKLOG)
    }

    pub fn with_backlog(backlog: usize) -> (Self, ConnectionReceiver) {
        let (tx, rx) = mpsc::channel(backlog);
        (Self { tx }, ConnectionReceiver { rx })
    }
}

#[async_trait]
impl SyncTransport for ChannelTransport {
    async fn accept(&self, connection: Connection) -> SyncResult<()> {
        debug!(uri = %connection.request.uri, "queueing connection for sync engine");
        self.tx
            .send(connection)
            .await
            .map_err(|_| SyncError::EngineUnavailable)
    }
}

impl ConnectionReceiver {
    /// Next handed-off connection, or `None` once every transport is dropped.
    pub async fn recv(&mut self) -> Option<Connection> {
        self.rx.recv().await
    }
}
