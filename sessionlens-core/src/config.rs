//! Configuration loading and management
//!
//! Configuration is loaded from `~/.config/sessionlens/config.toml`
//!
//! This module follows the XDG Base Directory Specification:
//! - Config: `$XDG_CONFIG_HOME/sessionlens/` (~/.config/sessionlens/)
//! - State/Logs: `$XDG_STATE_HOME/sessionlens/` (~/.local/state/sessionlens/)
//!
//! The assistant's own data (transcripts, stats, history) lives under
//! `~/.claude` and the dashboard's derived data (settings, disk cache)
//! under `~/.sessionlens`; both roots can be overridden.

use crate::error::{Error, Result};
use serde::Deserialize;
use std::path::PathBuf;

/// Returns a best-effort home directory path.
fn home_dir() -> PathBuf {
    std::env::var_os("HOME")
        .map(PathBuf::from)
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Returns XDG_CONFIG_HOME or ~/.config
fn xdg_config_home() -> PathBuf {
    std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".config"))
}

/// Returns XDG_STATE_HOME or ~/.local/state
fn xdg_state_home() -> PathBuf {
    std::env::var("XDG_STATE_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| home_dir().join(".local/state"))
}

/// Main configuration struct
#[derive(Debug, Deserialize, Default)]
pub struct Config {
    /// Data directory overrides
    #[serde(default)]
    pub data: DataConfig,

    /// Scanner configuration
    #[serde(default)]
    pub scanner: ScannerConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Override paths for the data directories
#[derive(Debug, Deserialize, Default)]
pub struct DataConfig {
    /// Override for the assistant data directory (default ~/.claude)
    pub claude_dir: Option<PathBuf>,
    /// Override for the dashboard data directory (default ~/.sessionlens)
    pub dashboard_dir: Option<PathBuf>,
}

/// Session scanner configuration
#[derive(Debug, Deserialize)]
pub struct ScannerConfig {
    /// Seconds since last write before a session stops counting as active
    #[serde(default = "default_active_threshold_secs")]
    pub active_threshold_secs: u64,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            active_threshold_secs: default_active_threshold_secs(),
        }
    }
}

fn default_active_threshold_secs() -> u64 {
    120
}

/// Logging configuration
#[derive(Debug, Deserialize)]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Config {
    /// Load configuration from the default path, falling back to defaults
    /// when no config file exists.
    pub fn load() -> Result<Self> {
        let path = Self::config_path();
        if !path.exists() {
            return Ok(Config::default());
        }

        let contents = std::fs::read_to_string(&path)?;
        toml::from_str(&contents)
            .map_err(|e| Error::Config(format!("failed to parse {}: {}", path.display(), e)))
    }

    /// Returns the config directory path
    pub fn config_dir() -> PathBuf {
        xdg_config_home().join("sessionlens")
    }

    /// Returns the config file path
    pub fn config_path() -> PathBuf {
        Self::config_dir().join("config.toml")
    }

    /// Returns the state directory path (for logs)
    pub fn state_dir() -> PathBuf {
        xdg_state_home().join("sessionlens")
    }

    /// Returns the log file path
    pub fn log_path() -> PathBuf {
        Self::state_dir().join("sessionlens.log")
    }

    /// Root of the assistant's own data
    pub fn claude_dir(&self) -> PathBuf {
        self.data
            .claude_dir
            .clone()
            .unwrap_or_else(|| home_dir().join(".claude"))
    }

    /// Directory holding one sub-directory per project
    pub fn projects_dir(&self) -> PathBuf {
        self.claude_dir().join("projects")
    }

    /// Precomputed stats blob maintained by the assistant
    pub fn stats_path(&self) -> PathBuf {
        self.claude_dir().join("stats-cache.json")
    }

    /// Prompt history log
    pub fn history_path(&self) -> PathBuf {
        self.claude_dir().join("history.jsonl")
    }

    /// Root of the dashboard's own data
    pub fn dashboard_dir(&self) -> PathBuf {
        self.data
            .dashboard_dir
            .clone()
            .unwrap_or_else(|| home_dir().join(".sessionlens"))
    }

    /// Settings file path
    pub fn settings_path(&self) -> PathBuf {
        self.dashboard_dir().join("settings.json")
    }

    /// Disk cache directory for derived artifacts
    pub fn cache_dir(&self) -> PathBuf {
        self.dashboard_dir().join("cache")
    }
}
