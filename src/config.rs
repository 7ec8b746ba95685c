use std::{
    io,
    path::{Path, PathBuf},
    time::Duration,
};

use log::{info, warn};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("couldn't access config file {}: {source}", path.display())]
    Io { path: PathBuf, source: io::Error },
    #[error("couldn't parse config file: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("couldn't serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("couldn't find a home directory to keep the config in")]
    NoProjectDirs,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// strftime format of the live clock
    pub time_format: String,
    /// played when the alarm fires
    pub sound: PathBuf,
    /// 0 to 100, anything outside is clamped
    pub volume: f32,
    /// keep playing the sound until the alarm is acknowledged
    pub repeat_sound: bool,
    /// how often the monitor checks the time, clamped to 1..=59
    pub poll_interval_secs: u64,
    pub speech: Speech,
    pub messages: Messages,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            time_format: "%H:%M:%S".to_string(),
            sound: PathBuf::from("alarm.mp3"),
            volume: 100.0,
            repeat_sound: true,
            poll_interval_secs: 5,
            speech: Speech::default(),
            messages: Messages::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Speech {
    pub enabled: bool,
    /// words per minute
    pub rate: u32,
}

impl Speech {
    pub const DEFAULT_RATE: u32 = 170;
}

impl Default for Speech {
    fn default() -> Self {
        Self {
            enabled: true,
            rate: Self::DEFAULT_RATE,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Messages {
    /// spoken when the alarm fires
    pub wake: String,
}

impl Default for Messages {
    fn default() -> Self {
        Self {
            wake: "Wake up! It's time!".to_string(),
        }
    }
}

impl Config {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// # Errors
    /// the file can't be read or isn't valid toml
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let config = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(toml::from_str(&config)?)
    }

    /// like [`Self::load`] but falls back to the defaults, a missing file is not an error
    #[must_use]
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load(path) {
            Ok(config) => {
                info!("loaded config from {}", path.display());
                config
            }
            Err(ConfigError::Io { source, .. }) if source.kind() == io::ErrorKind::NotFound => {
                info!("no config at {}, using defaults", path.display());
                Self::default()
            }
            Err(e) => {
                warn!("{e}, using defaults");
                Self::default()
            }
        }
    }

    /// # Errors
    /// the config can't be serialized or the file can't be written
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let config = toml::to_string(self)?;
        let io_error = |source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(io_error)?;
        }
        std::fs::write(path, config).map_err(io_error)
    }

    /// # Errors
    /// there is no home directory
    pub fn config_path() -> Result<PathBuf, ConfigError> {
        let mut path = directories::ProjectDirs::from("", "", "roosty_alarm")
            .ok_or(ConfigError::NoProjectDirs)?
            .config_dir()
            .to_path_buf();
        path.push("config.toml");
        Ok(path)
    }

    #[must_use]
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs.clamp(1, 59))
    }

    /// playback volume in 0..=100. nan counts as full volume
    #[must_use]
    pub fn volume(&self) -> f32 {
        if self.volume.is_nan() {
            100.0
        } else {
            self.volume.clamp(0.0, 100.0)
        }
    }
}
