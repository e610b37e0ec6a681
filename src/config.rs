//! Configuration module for stowage.

use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

use crate::{Result, StowageError};

/// Server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Host address to bind.
    #[serde(default = "default_host")]
    pub host: String,
    /// Port number to listen on.
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    50051
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Database configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Connection URL (e.g. `sqlite://data/stowage.db` or `postgres://...`).
    #[serde(default = "default_db_url")]
    pub url: String,
    /// Maximum pooled connections.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_db_url() -> String {
    "sqlite://data/stowage.db".to_string()
}

fn default_max_connections() -> u32 {
    5
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: default_db_url(),
            max_connections: default_max_connections(),
        }
    }
}

/// Blob storage configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Root directory for stored files.
    #[serde(default = "default_storage_path")]
    pub path: String,
    /// Remove unregistered blobs when the server starts.
    #[serde(default = "default_reconcile_on_startup")]
    pub reconcile_on_startup: bool,
    /// Minimum age in seconds before an unregistered blob counts as an orphan.
    #[serde(default = "default_orphan_grace")]
    pub orphan_grace_secs: u64,
    /// Maximum upload request size in megabytes.
    #[serde(default = "default_max_upload_size")]
    pub max_upload_size_mb: u64,
}

fn default_storage_path() -> String {
    "./storage/files".to_string()
}

fn default_reconcile_on_startup() -> bool {
    true
}

fn default_orphan_grace() -> u64 {
    3600
}

fn default_max_upload_size() -> u64 {
    100
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            path: default_storage_path(),
            reconcile_on_startup: default_reconcile_on_startup(),
            orphan_grace_secs: default_orphan_grace(),
            max_upload_size_mb: default_max_upload_size(),
        }
    }
}

impl StorageConfig {
    /// Upload request size limit in bytes.
    pub fn max_upload_bytes(&self) -> usize {
        usize::try_from(self.max_upload_size_mb.saturating_mul(1024 * 1024)).unwrap_or(usize::MAX)
    }

    /// Grace period for orphan reconciliation.
    pub fn orphan_grace(&self) -> Duration {
        Duration::from_secs(self.orphan_grace_secs)
    }
}

/// Concurrency limits per operation class.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct LimitsConfig {
    /// Concurrent uploads.
    #[serde(default = "default_upload_limit")]
    pub upload: usize,
    /// Concurrent downloads.
    #[serde(default = "default_download_limit")]
    pub download: usize,
    /// Concurrent list calls.
    #[serde(default = "default_list_limit")]
    pub list: usize,
}

fn default_upload_limit() -> usize {
    10
}

fn default_download_limit() -> usize {
    10
}

fn default_list_limit() -> usize {
    100
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            upload: default_upload_limit(),
            download: default_download_limit(),
            list: default_list_limit(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Path to the log file.
    #[serde(default = "default_log_file")]
    pub file: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_file() -> String {
    "logs/stowage.log".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: default_log_file(),
        }
    }
}

/// Main configuration structure.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// Server configuration.
    #[serde(default)]
    pub server: ServerConfig,
    /// Database configuration.
    #[serde(default)]
    pub database: DatabaseConfig,
    /// Blob storage configuration.
    #[serde(default)]
    pub storage: StorageConfig,
    /// Concurrency limits.
    #[serde(default)]
    pub limits: LimitsConfig,
    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(StowageError::Io)?;
        Self::parse(&content)
    }

    /// Load configuration from a TOML file and apply environment variable overrides.
    pub fn load_with_env<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides()?;
        Ok(config)
    }

    /// Parse configuration from a TOML string.
    pub fn parse(s: &str) -> Result<Self> {
        toml::from_str(s).map_err(|e| StowageError::Config(format!("config parse error: {e}")))
    }

    /// Apply environment variable overrides to the configuration.
    ///
    /// Supported environment variables:
    /// - `STOWAGE_HOST`, `STOWAGE_PORT`
    /// - `STOWAGE_DATABASE_URL`
    /// - `STOWAGE_STORAGE_PATH`
    /// - `STOWAGE_UPLOAD_LIMIT`, `STOWAGE_DOWNLOAD_LIMIT`, `STOWAGE_LIST_LIMIT`
    /// - `STOWAGE_LOG_LEVEL`
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from an arbitrary key lookup. Empty values are ignored.
    fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.is_empty());

        if let Some(host) = get("STOWAGE_HOST") {
            self.server.host = host;
        }
        if let Some(port) = get("STOWAGE_PORT") {
            self.server.port = parse_env("STOWAGE_PORT", &port)?;
        }
        if let Some(url) = get("STOWAGE_DATABASE_URL") {
            self.database.url = url;
        }
        if let Some(path) = get("STOWAGE_STORAGE_PATH") {
            self.storage.path = path;
        }
        if let Some(limit) = get("STOWAGE_UPLOAD_LIMIT") {
            self.limits.upload = parse_env("STOWAGE_UPLOAD_LIMIT", &limit)?;
        }
        if let Some(limit) = get("STOWAGE_DOWNLOAD_LIMIT") {
            self.limits.download = parse_env("STOWAGE_DOWNLOAD_LIMIT", &limit)?;
        }
        if let Some(limit) = get("STOWAGE_LIST_LIMIT") {
            self.limits.list = parse_env("STOWAGE_LIST_LIMIT", &limit)?;
        }
        if let Some(level) = get("STOWAGE_LOG_LEVEL") {
            self.logging.level = level;
        }
        Ok(())
    }

    /// Validate the configuration.
    ///
    /// Returns an error if any concurrency limit is zero or the storage path is empty.
    pub fn validate(&self) -> Result<()> {
        if self.storage.path.trim().is_empty() {
            return Err(StowageError::Config("storage.path must not be empty".to_string()));
        }
        if self.storage.max_upload_size_mb == 0 {
            return Err(StowageError::Config(
                "storage.max_upload_size_mb must be at least 1".to_string(),
            ));
        }
        let limits = [
            ("limits.upload", self.limits.upload),
            ("limits.download", self.limits.download),
            ("limits.list", self.limits.list),
        ];
        for (name, value) in limits {
            if value == 0 {
                return Err(StowageError::Config(format!("{name} must be at least 1")));
            }
        }
        Ok(())
    }
}

fn parse_env<T: std::str::FromStr>(key: &str, value: &str) -> Result<T> {
    value
        .parse()
        .map_err(|_| StowageError::Config(format!("invalid value for {key}: {value:?}")))
}
