use std::net::SocketAddr;

use axum::extract::ws::WebSocket;
use axum::http::{header, HeaderMap, Method, Uri};

/// Metadata of the HTTP request that was upgraded.
///
/// The engine uses it for peer bookkeeping (who connected, from where).
#[derive(Clone, Debug)]
pub struct RequestInfo {
    pub method: Method,
    pub uri: Uri,
    pub headers: HeaderMap,
    pub remote_addr: Option<SocketAddr>,
}

impl RequestInfo {
    pub fn new(method: Method, uri: Uri, headers: HeaderMap, remote_addr: Option<SocketAddr>) -> Self {
        Self {
            method,
            uri,
            headers,
            remote_addr,
        }
    }

    /// The `Origin` header, if present and valid UTF-8.
    pub fn origin(&self) -> Option<&str> {
        self.headers
            .get(header::ORIGIN)
            .and_then(|v| v.to_str().ok())
    }
}

/// A bridged full-duplex channel, owned by the sync engine once handed off.
#[derive(Debug)]
pub struct Connection {
    pub socket: WebSocket,
    pub request: RequestInfo,
}

impl Connection {
    pub fn new(socket: WebSocket, request: RequestInfo) -> Self {
        Self { socket, request }
    }

    pub fn into_parts(self) -> (WebSocket, RequestInfo) {
        (self.socket, self.request)
    }
}
