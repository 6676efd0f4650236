use crate::layout::LayoutSource;
use crate::settings::{SimulationSettings, TimingSettings};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const CONFIG_VERSION: u32 = 1;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to access config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse config file: {0}")]
    Parse(#[source] serde_json::Error),
    #[error("failed to serialize config: {0}")]
    Serialize(#[source] serde_json::Error),
}

/// Complete application configuration for export/import
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Version field for future compatibility
    pub version: u32,
    /// Starting board
    pub layout: LayoutSource,
    /// Grain count for preset layouts; `None` uses the preset default
    #[serde(default)]
    pub grains: Option<usize>,
    /// Fixed generator seed; `None` draws one from the thread RNG
    #[serde(default)]
    pub seed: Option<u32>,
    pub simulation: SimulationSettings,
    pub timing: TimingSettings,
    /// Show the board rotated so gravity points down the terminal
    #[serde(default)]
    pub portrait: bool,
}

impl AppConfig {
    /// `<config dir>/hourglass-sand/config.json`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("hourglass-sand").join("config.json"))
    }

    /// Export config to a JSON file
    pub fn save_to_file(&self, path: &Path) -> Result<(), ConfigError> {
        let json = serde_json::to_string_pretty(self).map_err(ConfigError::Serialize)?;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|source| ConfigError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        fs::write(path, json).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        log::info!("saved config to {}", path.display());
        Ok(())
    }

    /// Import config from a JSON file
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = serde_json::from_str(&content).map_err(ConfigError::Parse)?;
        log::info!("loaded config from {}", path.display());
        Ok(config)
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            layout: LayoutSource::default(),
            grains: None,
            seed: None,
            simulation: SimulationSettings::default(),
            timing: TimingSettings::default(),
            portrait: false,
        }
    }
}
