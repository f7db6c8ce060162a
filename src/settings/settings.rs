// Settings management and persistence
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::mixer::wave::DEFAULT_BAR_COUNT;

/// Audio device settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioSettings {
    /// Directory the catalog's sound files are resolved against
    pub assets_dir: PathBuf,
    pub volume: f32, // 0.0-1.0
    /// How often a playing track reports its position
    pub status_interval_ms: u64,
}

impl Default for AudioSettings {
    fn default() -> Self {
        Self {
            assets_dir: PathBuf::from("assets"),
            volume: 1.0,
            status_interval_ms: 100,
        }
    }
}

impl AudioSettings {
    pub fn status_interval(&self) -> Duration {
        Duration::from_millis(self.status_interval_ms.max(10))
    }
}

/// Mixer presentation settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MixerSettings {
    pub wave_bars: usize,
}

impl Default for MixerSettings {
    fn default() -> Self {
        Self {
            wave_bars: DEFAULT_BAR_COUNT,
        }
    }
}

/// Where the scene catalog comes from
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogSettings {
    /// JSON catalog replacing the built-in scenes
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    pub level: String, // env_logger filter, e.g. "info" or "soundscape_lib=debug"
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

/// Main application settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppSettings {
    pub version: i32, // Settings schema version for future migrations
    pub audio: AudioSettings,
    pub mixer: MixerSettings,
    pub catalog: CatalogSettings,
    pub logging: LoggingSettings,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            version: 1,
            audio: AudioSettings::default(),
            mixer: MixerSettings::default(),
            catalog: CatalogSettings::default(),
            logging: LoggingSettings::default(),
        }
    }
}

impl AppSettings {
    /// Get the settings file path
    pub fn get_settings_path(app_dir: &Path) -> PathBuf {
        app_dir.join("settings.json")
    }

    /// Load settings from file, or return defaults if file doesn't exist
    pub fn load(app_dir: &Path) -> Result<Self> {
        let path = Self::get_settings_path(app_dir);

        if !path.exists() {
            log::info!("No settings file found, using defaults");
            return Ok(Self::default());
        }

        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read settings file {:?}", path))?;

        let settings: AppSettings = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse settings file {:?}", path))?;

        log::info!("Loaded settings from {:?}", path);
        Ok(settings)
    }

    /// Save settings to file
    pub fn save(&self, app_dir: &Path) -> Result<()> {
        fs::create_dir_all(app_dir).context("Failed to create settings directory")?;

        let path = Self::get_settings_path(app_dir);
        let content = serde_json::to_string_pretty(self).context("Failed to serialize settings")?;

        fs::write(&path, content)
            .with_context(|| format!("Failed to write settings file {:?}", path))?;

        log::info!("Saved settings to {:?}", path);
        Ok(())
    }

    /// Assets directory, resolved against the data directory when relative
    pub fn assets_path(&self, app_dir: &Path) -> PathBuf {
        app_dir.join(&self.audio.assets_dir)
    }
}
