//! Daemon configuration — parsed from a TOML file with environment
//! variable overrides, mirroring the teacher's `config.rs` shape: a
//! sub-table per concern, `from_file`, `apply_env_overrides`, `validate`.
//!
//! Priority: environment variables > config file > defaults.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DaemonConfig {
    #[serde(default)]
    pub server: ServerSection,

    #[serde(default)]
    pub electrum: ElectrumSection,

    #[serde(default)]
    pub sync: SyncSection,

    #[serde(default)]
    pub pin: PinSection,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerSection {
    /// Data directory: canonical snapshot DB, vault store, archives.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Log level (error, warn, info, debug, trace).
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Idle heartbeat cadence while no sync is in flight.
    #[serde(default = "default_heartbeat_secs")]
    pub heartbeat_interval_secs: u64,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            log_level: default_log_level(),
            heartbeat_interval_secs: default_heartbeat_secs(),
        }
    }
}

/// Electrum servers and the fixed per-operation timeouts from spec §5.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ElectrumSection {
    #[serde(default = "default_servers")]
    pub servers: Vec<String>,

    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    #[serde(default = "default_history_timeout_secs")]
    pub history_timeout_secs: u64,

    #[serde(default = "default_broadcast_timeout_secs")]
    pub broadcast_timeout_secs: u64,
}

impl Default for ElectrumSection {
    fn default() -> Self {
        Self {
            servers: default_servers(),
            request_timeout_secs: default_request_timeout_secs(),
            history_timeout_secs: default_history_timeout_secs(),
            broadcast_timeout_secs: default_broadcast_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncSection {
    #[serde(default = "default_gap_limit")]
    pub gap_limit: u32,
}

impl Default for SyncSection {
    fn default() -> Self {
        Self { gap_limit: default_gap_limit() }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PinLengthPolicy {
    Fixed4,
    Fixed6,
    Variable,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PinSection {
    #[serde(default = "default_pin_policy")]
    pub policy: PinLengthPolicy,
}

impl Default for PinSection {
    fn default() -> Self {
        Self { policy: default_pin_policy() }
    }
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("/data")
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_heartbeat_secs() -> u64 {
    60
}

fn default_servers() -> Vec<String> {
    vec!["ssl://electrum.blockstream.info:50002".to_string()]
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_history_timeout_secs() -> u64 {
    60
}

fn default_broadcast_timeout_secs() -> u64 {
    45
}

fn default_gap_limit() -> u32 {
    20
}

fn default_pin_policy() -> PinLengthPolicy {
    PinLengthPolicy::Fixed6
}

impl DaemonConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;
        let config: DaemonConfig = toml::from_str(&contents).context("failed to parse TOML config")?;
        Ok(config)
    }

    /// Supported env vars: `BITVAULT_DATA_DIR`, `BITVAULT_LOG_LEVEL`,
    /// `BITVAULT_ELECTRUM_SERVERS` (comma-separated), `BITVAULT_GAP_LIMIT`.
    pub fn apply_env_overrides(&mut self) {
        if let Ok(v) = std::env::var("BITVAULT_DATA_DIR") {
            self.server.data_dir = PathBuf::from(v);
        }
        if let Ok(v) = std::env::var("BITVAULT_LOG_LEVEL") {
            self.server.log_level = v;
        }
        if let Ok(v) = std::env::var("BITVAULT_ELECTRUM_SERVERS") {
            self.electrum.servers = v.split(',').map(|s| s.trim().to_string()).filter(|s| !s.is_empty()).collect();
        }
        if let Ok(v) = std::env::var("BITVAULT_GAP_LIMIT") {
            if let Ok(limit) = v.parse::<u32>() {
                self.sync.gap_limit = limit;
            }
        }
    }

    /// This core is mainnet-only (spec §1 Non-goals) — there is no
    /// network field to mis-set, unlike the teacher's multi-network
    /// config.
    pub fn network(&self) -> bitcoin::Network {
        bitcoin::Network::Bitcoin
    }

    pub fn validate(&self) -> Result<()> {
        anyhow::ensure!(!self.electrum.servers.is_empty(), "electrum.servers must not be empty");
        anyhow::ensure!(self.sync.gap_limit > 0, "sync.gap_limit must be > 0");
        anyhow::ensure!(self.server.heartbeat_interval_secs >= 1, "server.heartbeat_interval_secs must be >= 1");
        anyhow::ensure!(self.electrum.request_timeout_secs > 0, "electrum.request_timeout_secs must be > 0");
        Ok(())
    }
}
