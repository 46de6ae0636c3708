//! Client configuration
//!
//! Settings come from, in priority order:
//! 1. Command-line arguments
//! 2. Environment variable `INTEGRITY_API_URL` (API base URL only)
//! 3. TOML config file (`<config dir>/integrity-os/config.toml`)
//! 4. Built-in defaults
//!
//! A missing or unreadable config file is never fatal: a warning is logged
//! and defaults are used.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

/// Environment variable overriding `api_base_url`
pub const API_URL_ENV: &str = "INTEGRITY_API_URL";

/// Application directory under the platform config dir
const APP_DIR: &str = "integrity-os";

/// Settings loaded from the TOML config file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TomlConfig {
    /// Backend root, without the trailing `/api`
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,

    /// Dashboard auto-refresh period
    #[serde(default = "default_refresh_interval_secs")]
    pub refresh_interval_secs: u64,

    /// Maximum concurrent per-object diagnostic requests
    #[serde(default = "default_diagnostics_batch_size")]
    pub diagnostics_batch_size: usize,

    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Chat turns kept in history (oldest dropped first)
    #[serde(default = "default_chat_history_limit")]
    pub chat_history_limit: usize,

    /// Where exported reports are written (current directory if not set)
    #[serde(default)]
    pub export_dir: Option<PathBuf>,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log file path (optional, logs to stderr if not specified)
    #[serde(default)]
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: None,
        }
    }
}

fn default_api_base_url() -> String {
    "http://localhost:8000".to_string()
}

fn default_refresh_interval_secs() -> u64 {
    30
}

fn default_diagnostics_batch_size() -> usize {
    10
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_chat_history_limit() -> usize {
    20
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for TomlConfig {
    fn default() -> Self {
        Self {
            api_base_url: default_api_base_url(),
            refresh_interval_secs: default_refresh_interval_secs(),
            diagnostics_batch_size: default_diagnostics_batch_size(),
            request_timeout_secs: default_request_timeout_secs(),
            chat_history_limit: default_chat_history_limit(),
            export_dir: None,
            logging: LoggingConfig::default(),
        }
    }
}

impl TomlConfig {
    /// Parse a config file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: TomlConfig = toml::from_str(&content)
            .map_err(|e| Error::Config(format!("Invalid config {}: {}", path.display(), e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load from `path`, or the platform default location when `None`
    ///
    /// Falls back to defaults with a warning when the file is missing or
    /// invalid.
    pub fn load_or_default(path: Option<&Path>) -> Self {
        let path = match path.map(Path::to_path_buf).or_else(default_config_path) {
            Some(p) => p,
            None => {
                warn!("Could not determine config directory, using defaults");
                return Self::default();
            }
        };

        if !path.exists() {
            warn!(path = %path.display(), "Config file not found, using defaults");
            return Self::default();
        }

        match Self::load(&path) {
            Ok(config) => {
                info!(path = %path.display(), "Loaded configuration");
                config
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Config file unusable, using defaults");
                Self::default()
            }
        }
    }

    /// Reject values the client cannot run with
    pub fn validate(&self) -> Result<()> {
        let url = self.api_base_url.trim();
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(Error::Config(format!(
                "api_base_url must start with http:// or https://, got '{}'",
                self.api_base_url
            )));
        }
        if self.refresh_interval_secs == 0 {
            return Err(Error::Config("refresh_interval_secs must be at least 1".to_string()));
        }
        if self.diagnostics_batch_size == 0 {
            return Err(Error::Config("diagnostics_batch_size must be at least 1".to_string()));
        }
        if self.request_timeout_secs == 0 {
            return Err(Error::Config("request_timeout_secs must be at least 1".to_string()));
        }
        Ok(())
    }

    /// Apply the environment and CLI overrides for the API base URL
    pub fn resolve_api_base_url(&mut self, cli_arg: Option<&str>) {
        if let Some(url) = cli_arg {
            self.api_base_url = url.to_string();
        } else if let Ok(url) = std::env::var(API_URL_ENV) {
            if !url.trim().is_empty() {
                self.api_base_url = url;
            }
        }
        self.api_base_url = self.api_base_url.trim().trim_end_matches('/').to_string();
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Directory for exported reports
    pub fn export_dir(&self) -> PathBuf {
        self.export_dir.clone().unwrap_or_else(|| PathBuf::from("."))
    }
}

/// Default config file location for the platform
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join(APP_DIR).join("config.toml"))
}

/// Write a config file, creating parent directories as needed
pub fn write_toml_config(config: &TomlConfig, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let content = toml::to_string_pretty(config)
        .map_err(|e| Error::Config(format!("Failed to serialize config: {}", e)))?;
    std::fs::write(path, content)?;
    info!(path = %path.display(), "Wrote configuration");
    Ok(())
}
