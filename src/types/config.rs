//! Configuration structures.
//!
//! Configuration is loaded from an optional JSON file and then overridden by
//! command-line flags and environment variables (see `main.rs`).

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::types::{Error, Result};

/// Global gateway configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Server configuration.
    #[serde(default)]
    pub server: ServerConfig,

    /// Observability configuration.
    #[serde(default)]
    pub observability: ObservabilityConfig,

    /// Registry refresh configuration.
    #[serde(default)]
    pub sync: SyncConfig,

    /// Downstream call configuration.
    #[serde(default)]
    pub executor: ExecutorConfig,

    /// Tool store configuration.
    #[serde(default)]
    pub store: StoreConfig,

    /// Framed TCP transport configuration.
    #[serde(default)]
    pub ipc: IpcConfig,
}

impl Config {
    /// Load configuration from a JSON file. Missing sections take defaults.
    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        serde_json::from_str(&raw).map_err(|e| {
            Error::validation(format!("Invalid config file {}: {}", path.display(), e))
        })
    }
}

/// Server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// HTTP bind address (REST, admin and WebSocket routes).
    pub http_addr: String,

    /// Framed TCP bind address. `None` disables the TCP transport.
    pub ipc_addr: Option<String>,

    /// Name reported in the JSON-RPC `initialize` result.
    pub name: String,

    /// Version reported in the JSON-RPC `initialize` result.
    pub version: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            http_addr: "0.0.0.0:8080".to_string(),
            ipc_addr: Some("127.0.0.1:50051".to_string()),
            name: env!("CARGO_PKG_NAME").to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    /// Tracing log level (trace, debug, info, warn, error). `RUST_LOG` wins.
    pub log_level: String,

    /// Enable JSON log formatting.
    pub json_logs: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json_logs: false,
        }
    }
}

/// Registry refresh configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Delay between scheduled refresh ticks.
    #[serde(with = "humantime_serde")]
    pub refresh_interval: Duration,

    /// Capacity of the refresh signal queue.
    pub signal_capacity: usize,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            refresh_interval: Duration::from_millis(1000),
            signal_capacity: 32,
        }
    }
}

/// Downstream call configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutorConfig {
    /// Timeout applied when a tool definition omits `timeoutMs`.
    pub default_timeout_ms: u64,

    /// Extra client-side wait on top of the tool timeout so a response that
    /// arrives at the deadline can still be read in full.
    pub read_grace_ms: u64,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            default_timeout_ms: 3000,
            read_grace_ms: 500,
        }
    }
}

/// Tool store configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct StoreConfig {
    /// SQLite database path. In-memory store when unset.
    pub sqlite_path: Option<PathBuf>,
}

/// Framed TCP transport configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IpcConfig {
    /// Maximum frame payload size in bytes.
    pub max_frame_bytes: u32,

    /// Maximum concurrent TCP connections. Connections beyond this limit
    /// are refused.
    pub max_connections: usize,

    /// Read timeout in seconds per frame. Connections idle beyond this
    /// duration are dropped.
    pub read_timeout_secs: u64,

    /// Write timeout in seconds per frame. Slow consumers that cannot
    /// accept a response within this window are dropped.
    pub write_timeout_secs: u64,

    /// Bounded capacity of the per-connection outbound response queue.
    pub outbound_capacity: usize,
}

impl Default for IpcConfig {
    fn default() -> Self {
        Self {
            max_frame_bytes: 5 * 1024 * 1024,
            max_connections: 1000,
            read_timeout_secs: 300,
            write_timeout_secs: 10,
            outbound_capacity: 256,
        }
    }
}
