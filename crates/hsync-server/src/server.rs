use std::net::SocketAddr;
use std::sync::{Arc, Mutex, MutexGuard};

use hsync_directory::HandleDirectory;
use hsync_store::FileDirectoryStore;
use hsync_sync::SyncTransport;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{error, info};

use crate::bridge::ConnectionBridge;
use crate::config::ServerConfig;
use crate::error::{ServerError, ServerResult};
use crate::origin::OriginPolicy;
use crate::readiness::Readiness;
use crate::router::{build_router, AppState};

struct Running {
    local_addr: SocketAddr,
    shutdown: oneshot::Sender<()>,
    task: JoinHandle<std::io::Result<()>>,
}

/// Listener lifecycle. `Binding` reserves the slot while `bind` is in flight.
enum Slot {
    Idle,
    Binding,
    Running(Running),
    Closed,
}

/// hsync gateway: owns the listener, the readiness signal and the bridge.
pub struct HsyncServer {
    config: ServerConfig,
    state: AppState,
    readiness: Arc<Readiness>,
    slot: Mutex<Slot>,
}

impl HsyncServer {
    pub fn new(
        config: ServerConfig,
        directory: HandleDirectory,
        transport: Arc<dyn SyncTransport>,
    ) -> Self {
        let policy = Arc::new(OriginPolicy::new(config.allowed_origins.iter().cloned()));
        let bridge = Arc::new(ConnectionBridge::new(transport, Arc::clone(&policy)));
        Self {
            config,
            state: AppState {
                directory,
                bridge,
                policy,
            },
            readiness: Arc::new(Readiness::new()),
            slot: Mutex::new(Slot::Idle),
        }
    }

    /// Server with a file-backed directory under `config.directory_dir()`.
    pub async fn open(config: ServerConfig, transport: Arc<dyn SyncTransport>) -> ServerResult<Self> {
        config.validate()?;
        let store = FileDirectoryStore::open(config.directory_dir()).await?;
        let directory = HandleDirectory::new(Arc::new(store));
        Ok(Self::new(config, directory, transport))
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn directory(&self) -> &HandleDirectory {
        &self.state.directory
    }

    /// Build the router (useful for testing).
    pub fn router(&self) -> axum::Router {
        build_router(self.state.clone(), &self.config)
    }

    /// Readiness handle for waiters living outside this server's owner.
    pub fn readiness(&self) -> Arc<Readiness> {
        Arc::clone(&self.readiness)
    }

    pub fn is_ready(&self) -> bool {
        self.readiness.is_ready()
    }

    /// Resolves once the listener is bound; fails if binding failed.
    pub async fn await_ready(&self) -> ServerResult<()> {
        self.readiness.wait().await
    }

    /// Address actually bound, while running.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        match &*self.slot() {
            Slot::Running(r) => Some(r.local_addr),
            _ => None,
        }
    }

    fn slot(&self) -> MutexGuard<'_, Slot> {
        self.slot.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Bind the listener, signal readiness, and start serving.
    ///
    /// Readiness is broadcast before the first connection is accepted. A bind
    /// failure is returned and also delivered to every readiness waiter; it is
    /// final, so later calls return the same failure instead of binding again.
    pub async fn start(&self) -> ServerResult<SocketAddr> {
        {
            let mut slot = self.slot();
            if let Some(failure) = self.readiness.failure() {
                return Err(failure);
            }
            match &*slot {
                Slot::Idle => {}
                Slot::Binding | Slot::Running(_) => {
                    return Err(ServerError::Internal("server already started".into()));
                }
                Slot::Closed => return Err(ServerError::ShuttingDown),
            }
            *slot = Slot::Binding;
        }

        let addr = self.config.bind_addr;
        let bound = match TcpListener::bind(addr).await {
            Ok(listener) => listener.local_addr().map(|local| (listener, local)),
            Err(e) => Err(e),
        };
        let (listener, local_addr) = match bound {
            Ok(bound) => bound,
            Err(e) => return Err(self.bind_failed(addr, e.to_string())),
        };

        let mut slot = self.slot();
        if !matches!(*slot, Slot::Binding) {
            // Closed while binding; the listener is dropped unused.
            drop(slot);
            return Err(self.bind_failed(addr, "server closed before listening".into()));
        }

        self.readiness.mark_ready();
        info!("hsync server listening on {local_addr}");

        let app = self
            .router()
            .into_make_service_with_connect_info::<SocketAddr>();
        let (shutdown, shutdown_rx) = oneshot::channel::<()>();
        let task = tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async move {
                    let _ = shutdown_rx.await;
                })
                .await
        });

        *slot = Slot::Running(Running {
            local_addr,
            shutdown,
            task,
        });
        Ok(local_addr)
    }

    /// Settle readiness on `Failed` and release the `Binding` reservation.
    fn bind_failed(&self, addr: SocketAddr, reason: String) -> ServerError {
        error!(%addr, error = %reason, "failed to bind listener");
        self.readiness.mark_failed(addr, reason.clone());
        let mut slot = self.slot();
        if matches!(*slot, Slot::Binding) {
            *slot = Slot::Idle;
        }
        ServerError::BindFailure { addr, reason }
    }

    /// Stop accepting upgrades, release the listener, and wait for the serve
    /// loop to finish. Bridged connections belong to the sync engine and are
    /// left alone. Readiness stays `Ready`. A closed server cannot be started
    /// again.
    pub async fn close(&self) -> ServerResult<()> {
        self.state.bridge.close();

        let previous = std::mem::replace(&mut *self.slot(), Slot::Closed);
        let Slot::Running(running) = previous else {
            return Ok(());
        };
        let _ = running.shutdown.send(());
        running
            .task
            .await
            .map_err(|e| ServerError::Internal(format!("serve task failed: {e}")))??;
        info!(addr = %running.local_addr, "hsync server closed");
        Ok(())
    }

    /// Start, serve until ctrl-c or SIGTERM, then close.
    pub async fn run_until_shutdown(&self) -> ServerResult<()> {
        self.start().await?;
        shutdown_signal().await;
        info!("shutdown signal received");
        self.close().await
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hsync_sync::{ChannelTransport, ConnectionReceiver, EngineConfig, EngineHost, IdleEngine};
    use hsync_types::PeerId;
    use std::time::Duration;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpStream;

    fn local_config() -> ServerConfig {
        ServerConfig {
            bind_addr: "127.0.0.1:0".parse().unwrap(),
            ..ServerConfig::default()
        }
    }

    fn test_server(config: ServerConfig) -> (HsyncServer, ConnectionReceiver) {
        let (transport, receiver) = ChannelTransport::new();
        let server = HsyncServer::new(config, HandleDirectory::in_memory(), Arc::new(transport));
        (server, receiver)
    }

    /// Read until the end of the response head.
    async fn read_head(stream: &mut TcpStream) -> String {
        let mut buf = Vec::new();
        let mut byte = [0u8; 1];
        while !buf.ends_with(b"\r\n\r\n") {
            let n = stream.read(&mut byte).await.unwrap();
            assert!(n > 0, "connection closed mid-head: {:?}", String::from_utf8_lossy(&buf));
            buf.push(byte[0]);
        }
        String::from_utf8(buf).unwrap()
    }

    async fn upgrade(addr: SocketAddr, origin: Option<&str>) -> (TcpStream, String) {
        let mut stream = TcpStream::connect(addr).await.unwrap();
        let origin = origin
            .map(|o| format!("Origin: {o}\r\n"))
            .unwrap_or_default();
        let request = format!(
            "GET / HTTP/1.1\r\n\
             Host: {addr}\r\n\
             Connection: Upgrade\r\n\
             Upgrade: websocket\r\n\
             Sec-WebSocket-Version: 13\r\n\
             Sec-WebSocket-Key: dGhlIHNhbXBsZSBub25jZQ==\r\n\
             {origin}\r\n"
        );
        stream.write_all(request.as_bytes()).await.unwrap();
        let head = read_head(&mut stream).await;
        (stream, head)
    }

    #[tokio::test]
    async fn waiters_resume_when_listener_binds() {
        let (server, _rx) = test_server(local_config());
        let readiness = server.readiness();

        let mut waiters = Vec::new();
        for _ in 0..10 {
            let r = Arc::clone(&readiness);
            waiters.push(tokio::spawn(async move { r.wait().await }));
        }
        while readiness.pending_waiters() < 10 {
            tokio::task::yield_now().await;
        }
        assert!(!server.is_ready());

        let addr = server.start().await.unwrap();
        assert_ne!(addr.port(), 0);
        assert_eq!(server.local_addr(), Some(addr));
        for w in waiters {
            w.await.unwrap().unwrap();
        }

        // Registered after readiness: resolves immediately.
        tokio::time::timeout(Duration::from_millis(100), server.await_ready())
            .await
            .unwrap()
            .unwrap();
        server.close().await.unwrap();
    }

    #[tokio::test]
    async fn bind_failure_is_fatal_not_a_hang() {
        let taken = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let config = ServerConfig {
            bind_addr: taken.local_addr().unwrap(),
            ..ServerConfig::default()
        };
        let (server, _rx) = test_server(config);

        let err = server.start().await.unwrap_err();
        assert!(matches!(err, ServerError::BindFailure { .. }), "got {err}");

        let err = tokio::time::timeout(Duration::from_secs(1), server.await_ready())
            .await
            .expect("await_ready must not hang after a bind failure")
            .unwrap_err();
        assert!(matches!(err, ServerError::BindFailure { .. }));
        assert!(!server.is_ready());
        assert!(server.local_addr().is_none());
    }

    #[tokio::test]
    async fn start_after_bind_failure_is_refused() {
        let taken = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = taken.local_addr().unwrap();
        let config = ServerConfig {
            bind_addr: addr,
            ..ServerConfig::default()
        };
        let (server, _rx) = test_server(config);
        assert!(server.start().await.is_err());

        // The port is free now, but readiness already settled on failure.
        drop(taken);
        let err = server.start().await.unwrap_err();
        assert!(matches!(err, ServerError::BindFailure { addr: a, .. } if a == addr), "got {err}");
        assert!(server.local_addr().is_none());
        assert!(!server.is_ready());
        assert!(server.await_ready().await.is_err());
    }

    #[tokio::test]
    async fn concurrent_starts_bind_once() {
        let (server, _rx) = test_server(local_config());
        let (a, b) = tokio::join!(server.start(), server.start());

        let (ok, rejected) = match (a, b) {
            (Ok(addr), Err(e)) | (Err(e), Ok(addr)) => (addr, e),
            other => panic!("expected exactly one start to win, got {other:?}"),
        };
        assert!(matches!(rejected, ServerError::Internal(_)), "got {rejected}");
        assert_eq!(server.local_addr(), Some(ok));
        assert!(server.is_ready());

        server.close().await.unwrap();
    }

    #[tokio::test]
    async fn liveness_over_tcp() {
        let (server, _rx) = test_server(local_config());
        let addr = server.start().await.unwrap();
        server.await_ready().await.unwrap();

        let mut stream = TcpStream::connect(addr).await.unwrap();
        stream
            .write_all(b"GET / HTTP/1.1\r\nHost: test\r\nConnection: close\r\n\r\n")
            .await
            .unwrap();
        let mut response = String::new();
        stream.read_to_string(&mut response).await.unwrap();
        assert!(response.starts_with("HTTP/1.1 200"), "{response}");
        assert!(response.contains("is running"));

        server.close().await.unwrap();
    }

    #[tokio::test]
    async fn allowed_upgrade_is_handed_to_engine() {
        let (server, mut rx) = test_server(local_config());
        let addr = server.start().await.unwrap();

        let (_client, head) = upgrade(addr, Some("https://jazztap.github.io/bitsy")).await;
        assert!(head.starts_with("HTTP/1.1 101"), "{head}");

        let connection = tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .unwrap()
            .expect("connection handed off");
        assert_eq!(connection.request.origin(), Some("https://jazztap.github.io/bitsy"));
        assert_eq!(connection.request.uri.path(), "/");
        assert!(connection.request.remote_addr.is_some());

        server.close().await.unwrap();
    }

    #[tokio::test]
    async fn headerless_upgrade_is_allowed() {
        let (server, mut rx) = test_server(local_config());
        let addr = server.start().await.unwrap();

        let (_client, head) = upgrade(addr, None).await;
        assert!(head.starts_with("HTTP/1.1 101"), "{head}");
        assert!(rx.recv().await.is_some());

        server.close().await.unwrap();
    }

    #[tokio::test]
    async fn foreign_origin_never_reaches_engine() {
        let (server, mut rx) = test_server(local_config());
        let addr = server.start().await.unwrap();

        let (_client, head) = upgrade(addr, Some("https://evil.example")).await;
        assert!(head.starts_with("HTTP/1.1 403"), "{head}");

        let nothing = tokio::time::timeout(Duration::from_millis(200), rx.recv()).await;
        assert!(nothing.is_err(), "rejected upgrade must not be bridged");

        server.close().await.unwrap();
    }

    #[tokio::test]
    async fn closed_bridge_answers_503() {
        let (server, mut rx) = test_server(local_config());
        let addr = server.start().await.unwrap();
        server.state.bridge.close();

        let (_client, head) = upgrade(addr, Some("https://jazztap.github.io/bitsy")).await;
        assert!(head.starts_with("HTTP/1.1 503"), "{head}");

        let nothing = tokio::time::timeout(Duration::from_millis(200), rx.recv()).await;
        assert!(nothing.is_err(), "upgrade after close must not be bridged");

        server.close().await.unwrap();
    }

    #[tokio::test]
    async fn engine_host_tracks_bridged_peers() {
        let (server, rx) = test_server(local_config());
        let addr = server.start().await.unwrap();

        let tmp = tempfile::tempdir().unwrap();
        let host = Arc::new(EngineHost::new(
            IdleEngine,
            EngineConfig::new(PeerId::for_host("test"), tmp.path()),
        ));
        let runner = Arc::clone(&host);
        tokio::spawn(async move { runner.run(rx).await });

        let (client, head) = upgrade(addr, None).await;
        assert!(head.starts_with("HTTP/1.1 101"), "{head}");
        tokio::time::timeout(Duration::from_secs(5), async {
            while host.live_peers() != 1 {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .expect("peer registered");

        drop(client);
        tokio::time::timeout(Duration::from_secs(5), async {
            while host.live_peers() != 0 {
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .expect("peer released");

        server.close().await.unwrap();
    }

    #[tokio::test]
    async fn close_releases_listener_and_stops_upgrades() {
        let (server, _rx) = test_server(local_config());
        let addr = server.start().await.unwrap();
        server.close().await.unwrap();

        assert!(server.local_addr().is_none());
        assert!(server.is_ready(), "close does not go back to starting");
        assert!(!server.state.bridge.is_accepting());
        assert!(TcpStream::connect(addr).await.is_err());

        // Closing twice is harmless; starting again is not allowed.
        server.close().await.unwrap();
        assert!(matches!(server.start().await, Err(ServerError::ShuttingDown)));
    }

    #[tokio::test]
    async fn start_twice_is_rejected() {
        let (server, _rx) = test_server(local_config());
        server.start().await.unwrap();
        assert!(matches!(server.start().await, Err(ServerError::Internal(_))));
        server.close().await.unwrap();
    }

    #[tokio::test]
    async fn open_uses_file_directory_under_data_dir() {
        let tmp = tempfile::tempdir().unwrap();
        let config = ServerConfig {
            data_dir: tmp.path().to_path_buf(),
            ..local_config()
        };
        let (transport, _rx) = ChannelTransport::new();
        let server = HsyncServer::open(config.clone(), Arc::new(transport)).await.unwrap();
        server
            .directory()
            .assign("doc1", "4NMNnkMhL8jXrdJ9jamS58PAVdXu")
            .await
            .unwrap();
        assert!(config.directory_dir().is_dir());

        let (transport, _rx) = ChannelTransport::new();
        let reopened = HsyncServer::open(config, Arc::new(transport)).await.unwrap();
        let handle = reopened.directory().lookup("doc1").await.unwrap().unwrap();
        assert_eq!(handle.as_str(), "4NMNnkMhL8jXrdJ9jamS58PAVdXu");
    }
}
