//! Configuration management for ditto

#![allow(dead_code)]

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Problems found while validating a loaded configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Teach prefix must not be empty")]
    EmptyPrefix,

    #[error("Throttle window {0} must have a positive interval")]
    ZeroInterval(usize),

    #[error("Loop prevention rule {0} must have a positive length")]
    ZeroLoopLength(usize),
}

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub general: GeneralConfig,
    pub authority: AuthorityConfig,
    pub trigger: TriggerConfig,
    pub display: DisplayConfig,
    /// Names the bot answers to
    pub nicknames: Vec<String>,
    pub rate_limit: RateLimitConfig,
    pub storage: StorageConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Prefix of teach commands
    pub prefix: String,
    /// How long mutations stay reviewable, in milliseconds
    pub history_timeout_ms: u64,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            prefix: "#".to_string(),
            history_timeout_ms: 10 * 60 * 1000,
        }
    }
}

/// Authority levels required for teach features
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthorityConfig {
    /// Use the teach command at all
    pub base: u32,
    /// Modify dialogues written by others
    pub admin: u32,
    /// Change context settings globally
    pub context: u32,
    /// Modify frozen dialogues, toggle the frozen flag
    pub frozen: u32,
    /// Use regular expressions
    pub regexp: u32,
    /// Set the writer or make a dialogue anonymous
    pub writer: u32,
    /// Trigger dialogues
    pub receive: u32,
}

impl Default for AuthorityConfig {
    fn default() -> Self {
        Self {
            base: 2,
            admin: 3,
            context: 3,
            frozen: 4,
            regexp: 3,
            writer: 2,
            receive: 1,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TriggerConfig {
    pub max_redirections: u32,
    pub successor_timeout_ms: u64,
    pub appellation_timeout_ms: u64,
}

impl Default for TriggerConfig {
    fn default() -> Self {
        Self {
            max_redirections: 3,
            successor_timeout_ms: 20 * 1000,
            appellation_timeout_ms: 10 * 60 * 1000,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    pub max_previews: usize,
    pub preview_delay_ms: u64,
    pub items_per_page: usize,
    pub max_answer_length: usize,
    /// Merged search groups larger than this show a count instead of ids
    pub merge_threshold: usize,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            max_previews: 10,
            preview_delay_ms: 500,
            items_per_page: 30,
            max_answer_length: 100,
            merge_threshold: 5,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct ThrottleConfig {
    pub interval_ms: u64,
    pub responses: i64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct LoopConfig {
    /// Maximum distinct senders that still count as a loop
    pub participants: usize,
    /// Number of recent initiators inspected
    pub length: usize,
    #[serde(default)]
    pub debounce_ms: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct RateLimitConfig {
    pub throttle: Vec<ThrottleConfig>,
    pub prevent_loop: Vec<LoopConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct StorageConfig {
    /// SQLite database file, in-memory storage when unset
    pub path: Option<PathBuf>,
}

impl Config {
    /// Load configuration from the default location
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;

        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            Ok(Config::default())
        }
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config: {}", path.display()))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config: {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// Get the configuration file path
    pub fn config_path() -> Result<PathBuf> {
        if let Some(proj_dirs) = directories::ProjectDirs::from("", "", "ditto") {
            let config_dir = proj_dirs.config_dir();
            std::fs::create_dir_all(config_dir)?;
            Ok(config_dir.join("config.toml"))
        } else {
            Ok(PathBuf::from("config.toml"))
        }
    }

    /// Save configuration to default location
    pub fn save(&self) -> Result<()> {
        let config_path = Self::config_path()?;
        let content = toml::to_string_pretty(self)?;
        std::fs::write(config_path, content)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.general.prefix.is_empty() {
            return Err(ConfigError::EmptyPrefix);
        }
        if let Some(index) = self
            .rate_limit
            .throttle
            .iter()
            .position(|t| t.interval_ms == 0)
        {
            return Err(ConfigError::ZeroInterval(index));
        }
        if let Some(index) = self
            .rate_limit
            .prevent_loop
            .iter()
            .position(|l| l.length == 0)
        {
            return Err(ConfigError::ZeroLoopLength(index));
        }
        Ok(())
    }

    pub fn history_timeout(&self) -> Duration {
        Duration::from_millis(self.general.history_timeout_ms)
    }

    pub fn successor_timeout(&self) -> Duration {
        Duration::from_millis(self.trigger.successor_timeout_ms)
    }

    pub fn appellation_timeout(&self) -> Duration {
        Duration::from_millis(self.trigger.appellation_timeout_ms)
    }

    pub fn preview_delay(&self) -> Duration {
        Duration::from_millis(self.display.preview_delay_ms)
    }
}
