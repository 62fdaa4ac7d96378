//! Configuration loading and management
//!
//! Configuration is loaded from `~/.config/agent-tracking/config.toml`
//!
//! This module follows the XDG Base Directory Specification:
//! - Config: `$XDG_CONFIG_HOME/agent-tracking/` (~/.config/agent-tracking/)
//! - State/Logs: `$XDG_STATE_HOME/agent-tracking/` (~/.local/state/agent-tracking/)
//!
//! There is no data directory: the database belongs to the host issue tracker.

use crate::error::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

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
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Default limits for list and statistics queries
    #[serde(default)]
    pub queries: QueryLimits,
}

/// Logging configuration
#[derive(Debug, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Directory for log files; defaults to the XDG state directory
    #[serde(default)]
    pub dir: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            dir: None,
        }
    }
}

impl LoggingConfig {
    /// Directory log files are written to.
    pub fn log_dir(&self) -> PathBuf {
        self.dir.clone().unwrap_or_else(Config::state_dir)
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Fallback limits applied when a caller passes a non-positive limit.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
pub struct QueryLimits {
    /// Sessions returned by `list_sessions_by_agent`
    #[serde(default = "default_session_list_limit")]
    pub session_list_limit: i64,

    /// Rows returned by `session_durations`
    #[serde(default = "default_duration_list_limit")]
    pub duration_list_limit: i64,

    /// Length of "top" rankings in statistics
    #[serde(default = "default_top_n")]
    pub top_n: i64,
}

impl Default for QueryLimits {
    fn default() -> Self {
        Self {
            session_list_limit: default_session_list_limit(),
            duration_list_limit: default_duration_list_limit(),
            top_n: default_top_n(),
        }
    }
}

impl QueryLimits {
    /// Validate limits, returning error message if invalid
    pub fn validate(&self) -> Result<()> {
        if self.session_list_limit <= 0 {
            return Err(Error::Config(
                "queries.session_list_limit must be positive".to_string(),
            ));
        }
        if self.duration_list_limit <= 0 {
            return Err(Error::Config(
                "queries.duration_list_limit must be positive".to_string(),
            ));
        }
        if self.top_n <= 0 {
            return Err(Error::Config("queries.top_n must be positive".to_string()));
        }
        Ok(())
    }
}

fn default_session_list_limit() -> i64 {
    10
}

fn default_duration_list_limit() -> i64 {
    50
}

fn default_top_n() -> i64 {
    5
}

impl Config {
    /// Load configuration from the default path
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path();

        if !config_path.exists() {
            tracing::info!("No config file found at {:?}, using defaults", config_path);
            return Ok(Config::default());
        }

        Self::load_from(&config_path)
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("failed to read config file {:?}: {}", path, e)))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| Error::Config(format!("failed to parse config: {}", e)))?;

        config.queries.validate()?;

        Ok(config)
    }

    /// Returns the default config file path
    ///
    /// `$XDG_CONFIG_HOME/agent-tracking/config.toml`
    pub fn config_path() -> PathBuf {
        xdg_config_home().join("agent-tracking").join("config.toml")
    }

    /// Returns the state directory path (default log directory)
    ///
    /// `$XDG_STATE_HOME/agent-tracking/`
    pub fn state_dir() -> PathBuf {
        xdg_state_home().join("agent-tracking")
    }
}
