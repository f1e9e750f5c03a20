use std::fmt;

use serde::{Deserialize, Serialize};

const PEER_PREFIX: &str = "storage-server-";

/// Identity this node announces to sync peers.
///
/// Derived deterministically from the host's network name so that restarts
/// on the same machine keep the same identity.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PeerId(String);

impl PeerId {
    /// Peer id for a given host name.
    pub fn for_host(host: &str) -> Self {
        Self(format!("{PEER_PREFIX}{host}"))
    }

    /// Peer id for the machine this process runs on.
    ///
    /// Falls back to `localhost` when the host name is unavailable or not
    /// valid UTF-8.
    pub fn from_hostname() -> Self {
        let host = hostname::get()
            .ok()
            .and_then(|h| h.into_string().ok())
            .filter(|h| !h.is_empty())
            .unwrap_or_else(|| "localhost".into());
        Self::for_host(&host)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PeerId({})", self.0)
    }
}

impl fmt::Display for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
