use crate::audio::{QualityPreset, SessionOptions};
use crate::index::IndexMode;
use crate::locator::Locator;
use crate::services::ControllerOptions;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

const MAX_SLOTS: usize = 8;

#[derive(Debug, Deserialize, Serialize)]
pub struct Config {
    /// 1 for the single-recording board, 3 for the multi-slot board
    #[serde(default = "default_slot_count")]
    pub slot_count: usize,

    #[serde(default = "default_preloaded_locator")]
    pub preloaded_locator: String,

    #[serde(default = "default_database_path")]
    pub database_path: PathBuf,

    #[serde(default = "default_recordings_dir")]
    pub recordings_dir: PathBuf,

    #[serde(default)]
    pub quality: QualityPreset,

    #[serde(default)]
    pub index_mode: IndexMode,

    #[serde(default = "default_plays_in_silent_mode")]
    pub plays_in_silent_mode: bool,
}

fn default_slot_count() -> usize {
    3
}

fn default_preloaded_locator() -> String {
    "https://www.learningcontainer.com/wp-content/uploads/2020/02/Kalimba.mp3".to_string()
}

fn default_database_path() -> PathBuf {
    data_dir().join("recordings.db")
}

fn default_recordings_dir() -> PathBuf {
    data_dir().join("recordings")
}

fn default_plays_in_silent_mode() -> bool {
    true
}

/// `$XDG_DATA_HOME/soundboard`, falling back to `~/.local/share/soundboard`
fn data_dir() -> PathBuf {
    let base = if let Ok(dir) = std::env::var("XDG_DATA_HOME") {
        PathBuf::from(dir)
    } else if let Ok(home) = std::env::var("HOME") {
        PathBuf::from(home).join(".local").join("share")
    } else {
        PathBuf::from(".")
    };
    base.join("soundboard")
}

impl Default for Config {
    fn default() -> Self {
        Self {
            slot_count: default_slot_count(),
            preloaded_locator: default_preloaded_locator(),
            database_path: default_database_path(),
            recordings_dir: default_recordings_dir(),
            quality: QualityPreset::default(),
            index_mode: IndexMode::default(),
            plays_in_silent_mode: default_plays_in_silent_mode(),
        }
    }
}

impl Config {
    /// Load configuration from the default location (~/.config/soundboard/config.json)
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;

        if !config_path.exists() {
            tracing::info!(
                "Config file not found at {:?}, creating default config",
                config_path
            );
            let config = Self::default();
            config.save()?;
            return Ok(config);
        }

        let contents = std::fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read config file: {:?}", config_path))?;

        let config = Self::parse(&contents)
            .with_context(|| format!("Failed to parse config file: {:?}", config_path))?;

        tracing::info!("Loaded config from {:?}", config_path);
        Ok(config)
    }

    fn parse(contents: &str) -> Result<Self> {
        Ok(serde_json::from_str(contents)?)
    }

    /// Save configuration to the default location
    pub fn save(&self) -> Result<()> {
        let config_path = Self::config_path()?;

        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory: {:?}", parent))?;
        }

        let contents = serde_json::to_string_pretty(self).context("Failed to serialize config")?;

        std::fs::write(&config_path, contents)
            .with_context(|| format!("Failed to write config file: {:?}", config_path))?;

        tracing::info!("Saved config to {:?}", config_path);
        Ok(())
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir = if let Ok(dir) = std::env::var("XDG_CONFIG_HOME") {
            PathBuf::from(dir)
        } else {
            let home = std::env::var("HOME").context("HOME environment variable not set")?;
            PathBuf::from(home).join(".config")
        };

        Ok(config_dir.join("soundboard").join("config.json"))
    }

    pub fn validate(&self) -> Result<()> {
        if self.slot_count == 0 || self.slot_count > MAX_SLOTS {
            return Err(anyhow::anyhow!(
                "slot_count must be between 1 and {}",
                MAX_SLOTS
            ));
        }

        if self.preloaded_locator.trim().is_empty() {
            return Err(anyhow::anyhow!("preloaded_locator cannot be empty"));
        }

        if self.recordings_dir.as_os_str().is_empty() {
            return Err(anyhow::anyhow!("recordings_dir cannot be empty"));
        }

        Ok(())
    }

    pub fn controller_options(&self) -> ControllerOptions {
        ControllerOptions {
            slot_count: self.slot_count,
            preloaded: Locator::new(self.preloaded_locator.trim()),
            quality: self.quality,
            session: SessionOptions {
                allows_recording: true,
                plays_in_silent_mode: self.plays_in_silent_mode,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_fields_use_defaults() {
        let config = Config::parse(r#"{ "slot_count": 1, "quality": "low" }"#).unwrap();

        assert_eq!(config.slot_count, 1);
        assert_eq!(config.quality, QualityPreset::Low);
        assert_eq!(config.index_mode, IndexMode::Log);
        assert!(config.plays_in_silent_mode);
        assert!(config.preloaded_locator.ends_with("Kalimba.mp3"));
        config.validate().unwrap();
    }

    #[test]
    fn test_latest_index_mode_parses() {
        let config = Config::parse(r#"{ "index_mode": "latest" }"#).unwrap();
        assert_eq!(config.index_mode, IndexMode::Latest);
    }

    #[test]
    fn test_validate_rejects_bad_slot_count() {
        let mut config = Config::default();
        config.slot_count = 0;
        assert!(config.validate().is_err());

        config.slot_count = MAX_SLOTS + 1;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_controller_options_follow_config() {
        let config = Config {
            plays_in_silent_mode: false,
            ..Config::default()
        };
        let options = config.controller_options();

        assert_eq!(options.slot_count, 3);
        assert!(options.session.allows_recording);
        assert!(!options.session.plays_in_silent_mode);
        assert!(options.preloaded.is_remote());
    }
}
