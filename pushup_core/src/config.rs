//! Configuration file support.
//!
//! Configuration is loaded from `$XDG_CONFIG_HOME/pushup/config.toml`.

use crate::clock::{ReferenceTime, DEFAULT_RESUME_HOUR};
use crate::{Error, Result};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Application configuration
#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub data: DataConfig,

    #[serde(default)]
    pub schedule: ScheduleConfig,
}

/// Data storage configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DataConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
        }
    }
}

/// Day boundary configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ScheduleConfig {
    /// IANA zone the day boundaries are evaluated in
    #[serde(default = "default_time_zone")]
    pub time_zone: String,

    /// Hour at which reminders resume; earlier hours are the restricted window
    #[serde(default = "default_resume_hour")]
    pub resume_hour: u32,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            time_zone: default_time_zone(),
            resume_hour: default_resume_hour(),
        }
    }
}

// Default value functions
fn default_data_dir() -> PathBuf {
    let base = dirs::data_local_dir().unwrap_or_else(|| {
        std::env::var("HOME")
            .map(|home| PathBuf::from(home).join(".local/share"))
            .unwrap_or_else(|_| PathBuf::from("."))
    });
    base.join("pushup")
}

fn default_time_zone() -> String {
    "CET".into()
}

fn default_resume_hour() -> u32 {
    DEFAULT_RESUME_HOUR
}

impl Config {
    /// Load configuration from the standard config path
    pub fn load() -> Result<Self> {
        let config_path = Self::default_config_path();
        if config_path.exists() {
            Self::load_from(&config_path)
        } else {
            tracing::info!(
                "No config file found at {:?}, using defaults",
                config_path
            );
            Ok(Self::default())
        }
    }

    /// Load configuration from a specific path
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        tracing::info!("Loaded config from {:?}", path);
        Ok(config)
    }

    /// Get the default config file path
    pub fn default_config_path() -> PathBuf {
        let base = dirs::config_dir().unwrap_or_else(|| {
            std::env::var("HOME")
                .map(|home| PathBuf::from(home).join(".config"))
                .unwrap_or_else(|_| PathBuf::from("."))
        });
        base.join("pushup").join("config.toml")
    }

    /// Save the current configuration to a specific path
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)
            .map_err(|e| Error::Config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, contents)?;
        tracing::info!("Saved config to {:?}", path);
        Ok(())
    }

    /// Path of the settings file inside the data directory
    pub fn settings_path(&self) -> PathBuf {
        self.data.data_dir.join("settings.json")
    }

    /// Validate the schedule section into a reference time
    pub fn reference_time(&self) -> Result<ReferenceTime> {
        let tz: Tz = self.schedule.time_zone.parse().map_err(|_| {
            Error::Config(format!("unknown time zone: {}", self.schedule.time_zone))
        })?;

        if self.schedule.resume_hour > 23 {
            return Err(Error::Config(format!(
                "resume_hour must be between 0 and 23, got {}",
                self.schedule.resume_hour
            )));
        }

        Ok(ReferenceTime::new(tz, self.schedule.resume_hour))
    }
}
