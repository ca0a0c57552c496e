//! Server configuration, loaded from a TOML file.

use std::path::PathBuf;

use serde::Deserialize;

use crate::error::{LogError, Result};
use crate::segment::SegmentConfig;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Directory holding the log's segment files.
    pub log_dir: PathBuf,
    /// Address to bind the gRPC server to, e.g. `"127.0.0.1:8400"`.
    pub bind_addr: String,
    pub tls: TlsConfig,
    /// Flat allow-list of `(subject, object, action)` rows.
    pub authorizer_policy_path: PathBuf,
    /// Statically configured cluster membership returned by `GetServers`.
    #[serde(default)]
    pub servers: Vec<ServerEntry>,
    #[serde(default)]
    pub segment: SegmentSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TlsConfig {
    pub cert_path: PathBuf,
    pub key_path: PathBuf,
    pub client_ca_path: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerEntry {
    pub id: String,
    pub rpc_addr: String,
    #[serde(default)]
    pub is_leader: bool,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct SegmentSettings {
    #[serde(default = "default_max_store_bytes")]
    pub max_store_bytes: u64,
    #[serde(default = "default_max_index_bytes")]
    pub max_index_bytes: u64,
    /// Base offset the first segment is created at when the log directory
    /// is empty. Ignored once segments already exist on disk.
    #[serde(default)]
    pub initial_offset: u64,
}

fn default_max_store_bytes() -> u64 {
    1024
}

fn default_max_index_bytes() -> u64 {
    1024
}

impl Default for SegmentSettings {
    fn default() -> Self {
        Self {
            max_store_bytes: default_max_store_bytes(),
            max_index_bytes: default_max_index_bytes(),
            initial_offset: 0,
        }
    }
}

impl From<SegmentSettings> for SegmentConfig {
    fn from(settings: SegmentSettings) -> Self {
        SegmentConfig {
            max_store_bytes: settings.max_store_bytes,
            max_index_bytes: settings.max_index_bytes,
        }
    }
}

impl Config {
    pub fn load(path: impl AsRef<std::path::Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        toml::from_str(&text).map_err(|e| LogError::InvalidConfig(e.to_string()))
    }

    pub fn segment_config(&self) -> SegmentConfig {
        self.segment.into()
    }

    pub fn initial_offset(&self) -> u64 {
        self.segment.initial_offset
    }
}
