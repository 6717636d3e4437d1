//! Configuration management for mcwatch.
//!
//! Loads configuration from ${MCWATCH_HOME}/config.toml with sensible defaults.

use std::fs;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Watched server configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Server to watch, as "host" or "host:port".
    pub address: String,
}

/// Telegram bot configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TelegramConfig {
    /// Bot token for the Telegram API.
    pub bot_token: Option<String>,
    /// Chat that receives session notifications.
    pub channel_chat_id: i64,
    /// API base URL, overridable for tests.
    pub api_base: String,
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            bot_token: None,
            channel_chat_id: 0,
            api_base: Config::DEFAULT_API_BASE.to_string(),
        }
    }
}

/// Population watch configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WatchConfig {
    /// Player count at which a session counts as started.
    pub threshold: u32,
    /// Seconds between population checks.
    pub poll_interval_secs: u64,
    /// Deadline for a single status query, in seconds.
    pub ping_timeout_secs: u64,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            threshold: Config::DEFAULT_THRESHOLD,
            poll_interval_secs: Config::DEFAULT_POLL_INTERVAL_SECS,
            ping_timeout_secs: Config::DEFAULT_PING_TIMEOUT_SECS,
        }
    }
}

/// Main configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Watched server settings.
    pub server: ServerConfig,
    /// Telegram bot settings.
    pub telegram: TelegramConfig,
    /// Population watch settings.
    pub watch: WatchConfig,
}

impl Config {
    const DEFAULT_API_BASE: &str = "https://api.telegram.org";
    const DEFAULT_THRESHOLD: u32 = 20;
    const DEFAULT_POLL_INTERVAL_SECS: u64 = 30;
    const DEFAULT_PING_TIMEOUT_SECS: u64 = 5;

    /// Loads configuration from the default config path.
    pub fn load() -> Result<Self> {
        Self::load_from(&paths::config_path())
    }

    /// Loads configuration from a specific path.
    /// Returns defaults if file doesn't exist.
    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let contents = fs::read_to_string(path)
                .with_context(|| format!("Failed to read config from {}", path.display()))?;
            toml::from_str(&contents)
                .with_context(|| format!("Failed to parse config from {}", path.display()))
        } else {
            Ok(Config::default())
        }
    }

    /// Writes the commented default template if no config file exists yet.
    ///
    /// Returns true when a fresh template was written.
    pub fn write_template_if_missing() -> Result<bool> {
        Self::write_template_if_missing_at(&paths::config_path())
    }

    /// Writes the default template to a specific path unless it exists.
    pub fn write_template_if_missing_at(path: &Path) -> Result<bool> {
        if path.exists() {
            return Ok(false);
        }
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        fs::write(path, default_config_template())
            .with_context(|| format!("Failed to write config to {}", path.display()))?;
        Ok(true)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.watch.poll_interval_secs)
    }

    pub fn ping_timeout(&self) -> Duration {
        Duration::from_secs(self.watch.ping_timeout_secs)
    }
}

/// Returns the default config template with comments.
///
/// This is embedded from default_config.toml at compile time.
/// To update, edit default_config.toml directly.
fn default_config_template() -> &'static str {
    include_str!("../default_config.toml")
}

pub mod paths {
    //! Path resolution for mcwatch configuration.
    //!
    //! MCWATCH_HOME resolution order:
    //! 1. MCWATCH_HOME environment variable (if set)
    //! 2. ~/.config/mcwatch (default)

    use std::path::PathBuf;

    /// Returns the mcwatch home directory.
    ///
    /// Checks MCWATCH_HOME env var first, falls back to ~/.config/mcwatch
    pub fn mcwatch_home() -> PathBuf {
        if let Ok(home) = std::env::var("MCWATCH_HOME") {
            return PathBuf::from(home);
        }

        dirs::home_dir()
            .map(|h| h.join(".config").join("mcwatch"))
            .expect("Could not determine home directory")
    }

    /// Returns the path to the config.toml file.
    pub fn config_path() -> PathBuf {
        mcwatch_home().join("config.toml")
    }
}
