//! Host construction parameters.

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::FatalError;

/// How the emulator is brought up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmulatorConfig {
    /// Directory holding `model.lua` and the assets it names.
    pub model_dir: PathBuf,
    /// Period of the tick driver.
    pub timer_interval: Duration,
    /// Emulated cycles per real second. Zero freezes the device.
    pub cycles_per_second: u64,
    /// Initial value of the paused flag.
    pub paused: bool,
}

impl EmulatorConfig {
    pub const DEFAULT_TIMER_INTERVAL: Duration = Duration::from_millis(20);
    pub const DEFAULT_CYCLES_PER_SECOND: u64 = 128 * 1024;

    /// Defaults for the model in `model_dir`.
    pub fn new(model_dir: impl Into<PathBuf>) -> Self {
        Self {
            model_dir: model_dir.into(),
            timer_interval: Self::DEFAULT_TIMER_INTERVAL,
            cycles_per_second: Self::DEFAULT_CYCLES_PER_SECOND,
            paused: false,
        }
    }

    pub fn validate(&self) -> Result<(), FatalError> {
        if self.timer_interval.is_zero() {
            return Err(FatalError::Config("timer interval must be positive".into()));
        }
        if self.model_dir.as_os_str().is_empty() {
            return Err(FatalError::Config("model directory is empty".into()));
        }
        Ok(())
    }

    /// Path of a file inside the model directory.
    pub fn model_file(&self, relative: impl AsRef<Path>) -> PathBuf {
        self.model_dir.join(relative)
    }
}

/// On-disk form of [`EmulatorConfig`]; every field but the model directory is
/// optional and falls back to the defaults.
#[cfg(feature = "serde-spec")]
#[derive(Debug, Clone, serde::Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    pub model_dir: PathBuf,
    pub timer_interval_ms: Option<u64>,
    pub cycles_per_second: Option<u64>,
    pub paused: Option<bool>,
}

#[cfg(feature = "serde-spec")]
impl ConfigFile {
    pub fn from_yaml_str(text: &str) -> Result<Self, FatalError> {
        serde_yaml::from_str(text).map_err(|e| FatalError::Config(e.to_string()))
    }

    pub fn from_json_str(text: &str) -> Result<Self, FatalError> {
        serde_json::from_str(text).map_err(|e| FatalError::Config(e.to_string()))
    }

    /// Read a config file, picking the format from its extension.
    pub fn read(path: &Path) -> Result<Self, FatalError> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| FatalError::Config(format!("{}: {e}", path.display())))?;
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => Self::from_json_str(&text),
            _ => Self::from_yaml_str(&text),
        }
    }

    pub fn into_config(self) -> EmulatorConfig {
        let mut config = EmulatorConfig::new(self.model_dir);
        if let Some(ms) = self.timer_interval_ms {
            config.timer_interval = Duration::from_millis(ms);
        }
        if let Some(rate) = self.cycles_per_second {
            config.cycles_per_second = rate;
        }
        if let Some(paused) = self.paused {
            config.paused = paused;
        }
        config
    }
}
