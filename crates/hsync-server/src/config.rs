use std::net::{Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};

use axum::http::HeaderValue;
use serde::{Deserialize, Serialize};

use crate::error::{ServerError, ServerResult};

pub const ENV_DATA_DIR: &str = "DATA_DIR";
pub const ENV_PORT: &str = "PORT";
pub const ENV_ALLOWED_ORIGINS: &str = "HSYNC_ALLOWED_ORIGINS";

pub const DEFAULT_PORT: u16 = 3030;
pub const DEFAULT_DATA_DIR: &str = ".amrg";

pub const DEFAULT_ALLOWED_ORIGINS: &[&str] = &[
    "http://localhost:8080",
    "https://bitsy.mixedinitiatives.net",
    "https://jazztap.github.io/bitsy",
];

/// Gateway configuration.
///
/// Resolved in layers: [`Default`], then an optional TOML file, then the
/// process environment, then command-line flags (applied by the binary).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_addr: SocketAddr,
    /// Root for all durable state: the directory store and engine documents.
    pub data_dir: PathBuf,
    pub allowed_origins: Vec<String>,
    /// Body cap for `POST /api/handle`, in bytes.
    pub handle_body_limit: usize,
    /// Body cap for `POST /api/assign`, in bytes.
    pub assign_body_limit: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from((Ipv4Addr::UNSPECIFIED, DEFAULT_PORT)),
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            allowed_origins: DEFAULT_ALLOWED_ORIGINS.iter().map(|o| o.to_string()).collect(),
            handle_body_limit: 500,
            assign_body_limit: 1500,
        }
    }
}

impl ServerConfig {
    pub fn from_toml_str(s: &str) -> ServerResult<Self> {
        let config: Self = toml::from_str(s).map_err(|e| ServerError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml_file(path: &Path) -> ServerResult<Self> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| ServerError::Config(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&text)
    }

    /// Overlay `DATA_DIR`, `PORT` and `HSYNC_ALLOWED_ORIGINS` from the process
    /// environment.
    pub fn apply_env(self) -> ServerResult<Self> {
        self.apply_vars(|key| std::env::var(key).ok())
    }

    /// Overlay variables from an arbitrary lookup. Unset keys keep the
    /// current value; an unparsable `PORT` is an error.
    pub fn apply_vars(mut self, var: impl Fn(&str) -> Option<String>) -> ServerResult<Self> {
        if let Some(dir) = var(ENV_DATA_DIR) {
            self.data_dir = PathBuf::from(dir);
        }
        if let Some(port) = var(ENV_PORT) {
            let port = port
                .trim()
                .parse::<u16>()
                .map_err(|e| ServerError::Config(format!("{ENV_PORT}={port:?}: {e}")))?;
            self.bind_addr.set_port(port);
        }
        if let Some(origins) = var(ENV_ALLOWED_ORIGINS) {
            self.allowed_origins = origins
                .split(',')
                .map(str::trim)
                .filter(|o| !o.is_empty())
                .map(String::from)
                .collect();
            self.validate()?;
        }
        Ok(self)
    }

    /// Reject allow-list entries that cannot be echoed back as an exact
    /// `Access-Control-Allow-Origin` value. `*` is refused: the list is an
    /// exact-match allow-list, never a wildcard.
    pub fn validate(&self) -> ServerResult<()> {
        for origin in &self.allowed_origins {
            if origin == "*" {
                return Err(ServerError::Config(
                    "allowed origin \"*\" is not supported; list each origin".into(),
                ));
            }
            if HeaderValue::from_str(origin).is_err() {
                return Err(ServerError::Config(format!(
                    "allowed origin {origin:?} is not a valid header value"
                )));
            }
        }
        Ok(())
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.bind_addr.set_port(port);
        self
    }

    /// Where the handle directory keeps its records.
    pub fn directory_dir(&self) -> PathBuf {
        self.data_dir.join("directory")
    }

    /// Storage root handed to the sync engine.
    pub fn documents_dir(&self) -> PathBuf {
        self.data_dir.join("documents")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn vars(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn default_config() {
        let c = ServerConfig::default();
        assert_eq!(c.bind_addr, "0.0.0.0:3030".parse::<SocketAddr>().unwrap());
        assert_eq!(c.data_dir, PathBuf::from(".amrg"));
        assert_eq!(c.handle_body_limit, 500);
        assert_eq!(c.assign_body_limit, 1500);
        assert!(c.allowed_origins.iter().any(|o| o == "https://jazztap.github.io/bitsy"));
    }

    #[test]
    fn env_overrides() {
        let c = ServerConfig::default()
            .apply_vars(vars(&[
                ("DATA_DIR", "/var/lib/hsync"),
                ("PORT", "8080"),
                ("HSYNC_ALLOWED_ORIGINS", "https://a.example, https://b.example,,"),
            ]))
            .unwrap();
        assert_eq!(c.data_dir, PathBuf::from("/var/lib/hsync"));
        assert_eq!(c.bind_addr.port(), 8080);
        assert_eq!(c.allowed_origins, vec!["https://a.example", "https://b.example"]);
    }

    #[test]
    fn missing_env_keeps_values() {
        let c = ServerConfig::default().apply_vars(vars(&[])).unwrap();
        assert_eq!(c, ServerConfig::default());
    }

    #[test]
    fn bad_port_is_config_error() {
        let err = ServerConfig::default()
            .apply_vars(vars(&[("PORT", "http")]))
            .unwrap_err();
        assert!(matches!(err, ServerError::Config(_)));
    }

    #[test]
    fn wildcard_origin_is_config_error() {
        for value in ["*", "https://a.example,*"] {
            let err = ServerConfig::default()
                .apply_vars(vars(&[("HSYNC_ALLOWED_ORIGINS", value)]))
                .unwrap_err();
            assert!(matches!(err, ServerError::Config(ref m) if m.contains('*')), "got {err}");
        }
    }

    #[test]
    fn unparsable_origin_is_config_error() {
        let err = ServerConfig::default()
            .apply_vars(vars(&[("HSYNC_ALLOWED_ORIGINS", "https://a.example/\u{7f}")]))
            .unwrap_err();
        assert!(matches!(err, ServerError::Config(_)));

        let err = ServerConfig::from_toml_str(r#"allowed_origins = ["*"]"#).unwrap_err();
        assert!(matches!(err, ServerError::Config(_)));

        let c = ServerConfig {
            allowed_origins: vec!["http://localhost:8080".into()],
            ..ServerConfig::default()
        };
        assert!(c.validate().is_ok());
    }

    #[test]
    fn toml_partial_file() {
        let c = ServerConfig::from_toml_str(
            r#"
            data_dir = "/srv/data"
            assign_body_limit = 4096
            "#,
        )
        .unwrap();
        assert_eq!(c.data_dir, PathBuf::from("/srv/data"));
        assert_eq!(c.assign_body_limit, 4096);
        assert_eq!(c.handle_body_limit, 500);
        assert_eq!(c.bind_addr.port(), DEFAULT_PORT);
    }

    #[test]
    fn toml_file_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hsync.toml");
        std::fs::write(&path, "bind_addr = \"127.0.0.1:9000\"\n").unwrap();
        let c = ServerConfig::from_toml_file(&path).unwrap();
        assert_eq!(c.bind_addr, "127.0.0.1:9000".parse::<SocketAddr>().unwrap());

        let missing = ServerConfig::from_toml_file(&dir.path().join("nope.toml"));
        assert!(matches!(missing, Err(ServerError::Config(_))));
    }

    #[test]
    fn derived_dirs() {
        let c = ServerConfig {
            data_dir: PathBuf::from("/d"),
            ..ServerConfig::default()
        };
        assert_eq!(c.directory_dir(), PathBuf::from("/d/directory"));
        assert_eq!(c.documents_dir(), PathBuf::from("/d/documents"));
        assert_eq!(c.with_port(1).bind_addr.port(), 1);
    }
}
