// SPDX-FileCopyrightText: 2026 Tidewire Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the Tidewire pipeline.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup rather than silently ignoring typos.

use serde::{Deserialize, Serialize};

/// Top-level Tidewire configuration.
///
/// Loaded from TOML files following the XDG hierarchy, with environment
/// variable overrides. All sections are optional and default to sensible
/// values; secrets (Meta app secret, vault key) have no defaults and must
/// be provided by config or environment.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct TidewireConfig {
    /// Service identity and logging.
    #[serde(default)]
    pub service: ServiceConfig,

    /// Webhook HTTP server bind settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// Meta platform settings: app credentials, webhook verify token,
    /// Graph API base URL.
    #[serde(default)]
    pub meta: MetaConfig,

    /// SQLite storage settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Token vault settings.
    #[serde(default)]
    pub vault: VaultConfig,

    /// Job worker settings.
    #[serde(default)]
    pub worker: WorkerConfig,

    /// Media asset resolution settings.
    #[serde(default)]
    pub media: MediaConfig,
}

/// Service identity and logging configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ServiceConfig {
    /// Display name used in logs.
    #[serde(default = "default_service_name")]
    pub name: String,

    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            name: default_service_name(),
            log_level: default_log_level(),
        }
    }
}

fn default_service_name() -> String {
    "tidewire".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Webhook HTTP server configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    /// Host address to bind.
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to bind.
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8743
}

/// Meta platform configuration.
///
/// One app secret covers both webhook signature verification (Meta and
/// WhatsApp callbacks are signed with the same secret) and OAuth token
/// exchange.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct MetaConfig {
    /// Meta app id used for OAuth token exchange. `None` disables token refresh.
    #[serde(default)]
    pub app_id: Option<String>,

    /// Meta app secret. Required for webhook signature verification and
    /// token exchange.
    #[serde(default)]
    pub app_secret: Option<String>,

    /// Webhook handshake verify token.
    #[serde(default)]
    pub verify_token: Option<String>,

    /// Graph API base URL including version.
    #[serde(default = "default_graph_base_url")]
    pub graph_base_url: String,

    /// Client-side timeout for outbound Graph API calls, in seconds.
    #[serde(default = "default_graph_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for MetaConfig {
    fn default() -> Self {
        Self {
            app_id: None,
            app_secret: None,
            verify_token: None,
            graph_base_url: default_graph_base_url(),
            timeout_secs: default_graph_timeout_secs(),
        }
    }
}

fn default_graph_base_url() -> String {
    "https://graph.facebook.com/v18.0".to_string()
}

fn default_graph_timeout_secs() -> u64 {
    30
}

/// SQLite storage configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Enable WAL (Write-Ahead Logging) mode for SQLite.
    #[serde(default = "default_wal_mode")]
    pub wal_mode: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            wal_mode: default_wal_mode(),
        }
    }
}

fn default_database_path() -> String {
    dirs::data_dir()
        .map(|p| p.join("tidewire").join("tidewire.db"))
        .unwrap_or_else(|| std::path::PathBuf::from("tidewire.db"))
        .to_string_lossy()
        .into_owned()
}

fn default_wal_mode() -> bool {
    true
}

/// Token vault configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct VaultConfig {
    /// 32-byte AES-256-GCM master key, hex-encoded. Usually supplied via
    /// the `TIDEWIRE_VAULT_MASTER_KEY` environment variable rather than a
    /// config file on disk.
    #[serde(default)]
    pub master_key: Option<String>,
}

/// Job worker configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct WorkerConfig {
    /// Seconds between sweeps of the scheduled_jobs table.
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,

    /// Maximum jobs claimed per sweep.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: default_poll_interval_secs(),
            batch_size: default_batch_size(),
        }
    }
}

fn default_poll_interval_secs() -> u64 {
    5
}

fn default_batch_size() -> usize {
    10
}

/// Media asset resolution configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct MediaConfig {
    /// Public base URL prepended to storage-relative media paths when
    /// building platform-facing absolute URLs. `None` requires every media
    /// ref to already carry an absolute URL.
    #[serde(default)]
    pub public_base_url: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sensible() {
        let config = TidewireConfig::default();
        assert_eq!(config.service.name, "tidewire");
        assert_eq!(config.service.log_level, "info");
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(
            config.meta.graph_base_url,
            "https://graph.facebook.com/v18.0"
        );
        assert_eq!(config.meta.timeout_secs, 30);
        assert!(config.meta.app_secret.is_none());
        assert_eq!(config.worker.poll_interval_secs, 5);
        assert_eq!(config.worker.batch_size, 10);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let result: Result<ServerConfig, _> =
            toml::from_str("host = \"0.0.0.0\"\nbort = 1234\n");
        assert!(result.is_err());
    }
}
