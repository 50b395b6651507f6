//! Configuration module for the instrument explorer
//!
//! This module handles:
//! - Locating the application data directory
//! - The explorer configuration file (`explorer.toml`)
//! - The persistence store holding saved instruments (see [`store`])
//!
//! # App Data Location
//!
//! Application data is stored in the platform-appropriate location:
//! - **Linux**: `~/.local/share/dev.hxyulin.instrument-explorer/`
//! - **macOS**: `~/Library/Application Support/dev.hxyulin.instrument-explorer/`
//! - **Windows**: `%APPDATA%\dev.hxyulin.instrument-explorer\`
//!
//! # Files
//!
//! - `explorer.toml` - Discovery settings
//! - `settings.json` - Persisted settings, including `savedInstruments`
//! - `logs/` - Application and discovery-process logs
//!
//! # Example
//!
//! ```ignore
//! use instrument_explorer::config::AppConfig;
//!
//! let config = AppConfig::load_or_default(AppConfig::default_path());
//! println!("discovery timeout: {}s", config.discovery.timeout_secs);
//! ```

pub mod store;

pub use store::{JsonSettingsStore, MemoryStore, SavedInstrumentStore, SettingsStore};

use crate::error::{ExplorerError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Application identifier for data directories
pub const APP_ID: &str = "dev.hxyulin.instrument-explorer";

/// Configuration filename
pub const CONFIG_FILE: &str = "explorer.toml";

/// Persisted settings filename
pub const SETTINGS_FILE: &str = "settings.json";

/// Log directory name inside the app data directory
pub const LOG_DIR_NAME: &str = "logs";

/// Settings key holding the saved instrument array
pub const SAVED_INSTRUMENTS_KEY: &str = "savedInstruments";

/// Default scope passed to the discovery executable
pub const DEFAULT_DISCOVERY_SCOPE: &str = "all";

/// Default discovery timeout in seconds
pub const DEFAULT_DISCOVERY_TIMEOUT_SECS: u64 = 5;

/// Default interval between discovery-service polls in milliseconds
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 1000;

/// Default JSON-RPC endpoint of the discovery service
pub const DEFAULT_RPC_ENDPOINT: &str = "http://localhost:3030/";

// ==================== App Data Directory ====================

/// Get the application data directory path
pub fn app_data_dir() -> Option<PathBuf> {
    dirs_next::data_dir().map(|p| p.join(APP_ID))
}

/// Directory for application and discovery logs
pub fn log_dir() -> PathBuf {
    app_data_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join(LOG_DIR_NAME)
}

/// `<dir>/<YYYY-MM-DD>-<stem>.log`, dated in UTC
pub fn dated_log_file(dir: &Path, stem: &str) -> PathBuf {
    dir.join(format!("{}-{}.log", chrono::Utc::now().format("%Y-%m-%d"), stem))
}

// ==================== App Config ====================

/// Explorer configuration stored in `explorer.toml`
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    /// Override for the persisted settings file
    #[serde(default)]
    pub settings_path: Option<PathBuf>,

    /// Discovery process and polling settings
    #[serde(default)]
    pub discovery: DiscoveryConfig,
}

impl AppConfig {
    /// Default location of the config file
    pub fn default_path() -> PathBuf {
        app_data_dir()
            .map(|p| p.join(CONFIG_FILE))
            .unwrap_or_else(|| PathBuf::from(CONFIG_FILE))
    }

    /// Load configuration from a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            ExplorerError::Config(format!("Failed to read config file {:?}: {}", path, e))
        })?;

        toml::from_str(&content).map_err(|e| {
            ExplorerError::Config(format!("Failed to parse config file {:?}: {}", path, e))
        })
    }

    /// Load configuration, returning defaults on any error
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        if !path.exists() {
            return Self::default();
        }
        Self::load(path).unwrap_or_else(|e| {
            tracing::warn!("Failed to load config, using defaults: {}", e);
            Self::default()
        })
    }

    /// Save configuration as TOML
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                ExplorerError::Config(format!("Failed to create config directory: {}", e))
            })?;
        }

        let content = toml::to_string_pretty(self)
            .map_err(|e| ExplorerError::Config(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path, content).map_err(|e| {
            ExplorerError::Config(format!("Failed to write config file {:?}: {}", path, e))
        })
    }

    /// Settings store selected by this configuration
    pub fn settings_store(&self) -> Result<JsonSettingsStore> {
        match &self.settings_path {
            Some(path) => Ok(JsonSettingsStore::new(path)),
            None => JsonSettingsStore::in_app_data_dir(),
        }
    }
}

// ==================== Discovery Config ====================

/// Discovery process and polling configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscoveryConfig {
    /// Discovery executable
    #[serde(default = "default_discovery_executable")]
    pub executable: PathBuf,

    /// Scope argument (`all`, `lan`, `usb`, ...)
    #[serde(default = "default_scope")]
    pub scope: String,

    /// Timeout handed to the discovery executable, in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Interval between RPC polls while discovery runs
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// JSON-RPC endpoint serving `get_instr_list`
    #[serde(default = "default_rpc_endpoint")]
    pub rpc_endpoint: String,

    /// Re-run discovery on this interval (None = run once)
    #[serde(default)]
    pub cycle_interval_secs: Option<u64>,

    /// Executable used for delegated instrument actions (reset)
    #[serde(default = "default_reset_executable")]
    pub reset_executable: PathBuf,
}

fn default_discovery_executable() -> PathBuf {
    PathBuf::from("kic-discover")
}

fn default_reset_executable() -> PathBuf {
    PathBuf::from("kic")
}

fn default_scope() -> String {
    DEFAULT_DISCOVERY_SCOPE.to_string()
}

fn default_timeout_secs() -> u64 {
    DEFAULT_DISCOVERY_TIMEOUT_SECS
}

fn default_poll_interval_ms() -> u64 {
    DEFAULT_POLL_INTERVAL_MS
}

fn default_rpc_endpoint() -> String {
    DEFAULT_RPC_ENDPOINT.to_string()
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            executable: default_discovery_executable(),
            scope: default_scope(),
            timeout_secs: DEFAULT_DISCOVERY_TIMEOUT_SECS,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            rpc_endpoint: default_rpc_endpoint(),
            cycle_interval_secs: None,
            reset_executable: default_reset_executable(),
        }
    }
}

impl DiscoveryConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn cycle_interval(&self) -> Option<Duration> {
        self.cycle_interval_secs
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
    }
}

// ==================== Tests ====================
