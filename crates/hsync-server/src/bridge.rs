use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use axum::extract::ws::WebSocketUpgrade;
use axum::response::Response;
use hsync_sync::{Connection, RequestInfo, SyncTransport};
use tracing::{debug, info, warn};

use crate::error::{ServerError, ServerResult};
use crate::origin::OriginPolicy;

/// Turns protocol-upgrade requests into sync engine connections.
///
/// The bridge checks the origin, completes the WebSocket handshake and emits
/// the socket into the [`SyncTransport`]. It keeps nothing about a
/// connection after handoff.
pub struct ConnectionBridge {
    transport: Arc<dyn SyncTransport>,
    policy: Arc<OriginPolicy>,
    accepting: AtomicBool,
}

impl ConnectionBridge {
    pub fn new(transport: Arc<dyn SyncTransport>, policy: Arc<OriginPolicy>) -> Self {
        Self {
            transport,
            policy,
            accepting: AtomicBool::new(true),
        }
    }

    pub fn is_accepting(&self) -> bool {
        self.accepting.load(Ordering::SeqCst)
    }

    /// Stop accepting upgrades. Already bridged connections are unaffected.
    pub fn close(&self) {
        if self.accepting.swap(false, Ordering::SeqCst) {
            info!("connection bridge closed");
        }
    }

    /// Handle one upgrade request.
    ///
    /// A rejected origin or a closed bridge fails before the handshake, so
    /// the sync engine never sees the request.
    pub fn upgrade(&self, ws: WebSocketUpgrade, request: RequestInfo) -> ServerResult<Response> {
        self.policy.check(&request.headers)?;
        if !self.is_accepting() {
            return Err(ServerError::ShuttingDown);
        }

        debug!(uri = %request.uri, remote = ?request.remote_addr, "upgrading sync connection");
        let transport = Arc::clone(&self.transport);
        Ok(ws
            .on_failed_upgrade(|e| warn!(error = %e, "sync upgrade failed"))
            .on_upgrade(move |socket| async move {
                let remote = request.remote_addr;
                if let Err(e) = transport.accept(Connection::new(socket, request)).await {
                    warn!(remote = ?remote, error = %e, "sync engine refused connection");
                }
            }))
    }
}

impl fmt::Debug for ConnectionBridge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectionBridge")
            .field("accepting", &self.is_accepting())
            .finish_non_exhaustive()
    }
}
