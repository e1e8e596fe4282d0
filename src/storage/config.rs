//! Application configuration loaded from TOML.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// Application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Application version
    pub version: String,
    /// Data directory path
    #[serde(skip)]
    pub data_dir: PathBuf,
    /// Progress engine settings
    #[serde(default)]
    pub progress: ProgressConfig,
    /// Login throttle settings
    #[serde(default)]
    pub throttle: ThrottleSettings,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            version: env!("CARGO_PKG_VERSION").to_string(),
            data_dir: PathBuf::new(),
            progress: ProgressConfig::default(),
            throttle: ThrottleSettings::default(),
        }
    }
}

/// Progress engine settings: XP rewards per action and the level curve.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressConfig {
    /// XP required per level. Changing this affects future writes only;
    /// existing rows are re-levelled on their next write.
    pub xp_per_level: i64,
    /// XP awarded for joining a game
    pub play_reward_xp: i64,
    /// XP awarded for hosting a game
    pub host_reward_xp: i64,
    /// XP awarded to each party when a friend request is accepted
    pub friend_reward_xp: i64,
    /// XP awarded once when a user first fills in their bio
    pub bio_reward_xp: i64,
}

impl Default for ProgressConfig {
    fn default() -> Self {
        Self {
            xp_per_level: 100,
            play_reward_xp: 25,
            host_reward_xp: 40,
            friend_reward_xp: 15,
            bio_reward_xp: 20,
        }
    }
}

impl ProgressConfig {
    /// Validate the level curve. XP per level below 1 would divide by zero.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.xp_per_level < 1 {
            return Err(ConfigError::InvalidValue(
                "xp_per_level must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Login throttle settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThrottleSettings {
    /// Failed attempts allowed before lockout
    pub max_attempts: u32,
    /// Fixed lockout window in seconds
    pub window_secs: u64,
}

impl Default for ThrottleSettings {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            window_secs: 900,
        }
    }
}

/// Get the application data directory.
pub fn get_data_dir() -> PathBuf {
    directories::ProjectDirs::from("com", "playconnect", "PlayConnect")
        .map(|dirs| dirs.data_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Get the configuration file path.
pub fn get_config_path() -> PathBuf {
    get_data_dir().join("config.toml")
}

/// Load application configuration from file.
pub fn load_config() -> Result<AppConfig, ConfigError> {
    let path = get_config_path();

    if !path.exists() {
        let config = AppConfig {
            data_dir: get_data_dir(),
            ..Default::default()
        };
        return Ok(config);
    }

    let content =
        std::fs::read_to_string(&path).map_err(|e| ConfigError::IoError(e.to_string()))?;

    let mut config: AppConfig =
        toml::from_str(&content).map_err(|e| ConfigError::ParseError(e.to_string()))?;

    config.data_dir = get_data_dir();
    config.progress.validate()?;

    Ok(config)
}

/// Save application configuration to file.
pub fn save_config(config: &AppConfig) -> Result<(), ConfigError> {
    let path = get_config_path();

    // Ensure parent directory exists
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| ConfigError::IoError(e.to_string()))?;
    }

    let content =
        toml::to_string_pretty(config).map_err(|e| ConfigError::SerializeError(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| ConfigError::IoError(e.to_string()))?;

    Ok(())
}

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Serialize error: {0}")]
    SerializeError(String),

    #[error("Invalid value: {0}")]
    InvalidValue(String),
}
