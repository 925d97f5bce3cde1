//! Engine settings file and platform paths.
//!
//! Settings are stored as TOML with camelCase keys. Every key is optional
//! and falls back to its default.
//!
//! # TOML Format
//!
//! ```toml
//! sampleRate = 48000.0
//! blockSize = 128
//! maxChannels = 2
//! maxDelaySeconds = 5.0
//! rmsThreshold = 0.95
//! waveshaperCurveSize = 8192
//! commandCapacity = 256
//! notificationCapacity = 256
//! ```
//!
//! # Paths
//!
//! - Linux: `~/.config/recirc/engine.toml`
//! - macOS: `~/Library/Application Support/recirc/engine.toml`
//! - Windows: `%APPDATA%\recirc\engine.toml`

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use recirc_core::{EngineConfig, XorShift32};

use crate::error::ControlError;

/// Application name used for directory paths.
const APP_NAME: &str = "recirc";

/// Settings file name.
const SETTINGS_FILE: &str = "engine.toml";

/// Smallest accepted block size.
pub const MIN_BLOCK_SIZE: usize = 16;
/// Largest accepted block size.
pub const MAX_BLOCK_SIZE: usize = 8192;
/// Largest accepted channel count.
pub const MAX_CHANNELS: usize = 32;

/// Session settings for an engine and its queues.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EngineSettings {
    /// Sample rate in Hz.
    pub sample_rate: f32,
    /// Frames per block.
    pub block_size: usize,
    /// Largest channel count a graph may use.
    pub max_channels: usize,
    /// Longest delay a delay node can hold, in seconds.
    pub max_delay_seconds: f32,
    /// RMS ceiling of the output guard.
    pub rms_threshold: f32,
    /// Waveshaper transfer-curve length.
    pub waveshaper_curve_size: usize,
    /// Control messages that may wait for the next block.
    pub command_capacity: usize,
    /// Notifications that may wait for the control side.
    pub notification_capacity: usize,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            sample_rate: 48000.0,
            block_size: 128,
            max_channels: 2,
            max_delay_seconds: 5.0,
            rms_threshold: 0.95,
            waveshaper_curve_size: 8192,
            command_capacity: 256,
            notification_capacity: 256,
        }
    }
}

impl EngineSettings {
    /// Load settings from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ControlError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| ControlError::read_file(path, e))?;
        let settings = Self::from_toml(&content)?;
        tracing::debug!(path = %path.display(), "loaded engine settings");
        Ok(settings)
    }

    /// Load settings from a TOML string and validate them.
    pub fn from_toml(toml_str: &str) -> Result<Self, ControlError> {
        let settings: Self = toml::from_str(toml_str)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Serialize to a TOML string.
    pub fn to_toml(&self) -> Result<String, ControlError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Save settings to a TOML file, creating parent directories.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ControlError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ControlError::write_file(parent, e))?;
        }
        std::fs::write(path, self.to_toml()?).map_err(|e| ControlError::write_file(path, e))
    }

    /// Settings from `path` if given, else from [`default_path`] if that
    /// file exists, else defaults.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, ControlError> {
        match path {
            Some(path) => Self::load(path),
            None => {
                let path = default_path();
                if path.is_file() { Self::load(path) } else { Ok(Self::default()) }
            }
        }
    }

    /// Checks every field against its accepted range.
    pub fn validate(&self) -> Result<(), ControlError> {
        if !(self.sample_rate.is_finite() && self.sample_rate > 0.0) {
            return Err(ControlError::invalid_value(
                "sampleRate",
                format!("{} is not a positive rate", self.sample_rate),
            ));
        }
        if !(MIN_BLOCK_SIZE..=MAX_BLOCK_SIZE).contains(&self.block_size) {
            return Err(ControlError::invalid_value(
                "blockSize",
                format!("{} outside {MIN_BLOCK_SIZE}..={MAX_BLOCK_SIZE}", self.block_size),
            ));
        }
        if !(1..=MAX_CHANNELS).contains(&self.max_channels) {
            return Err(ControlError::invalid_value(
                "maxChannels",
                format!("{} outside 1..={MAX_CHANNELS}", self.max_channels),
            ));
        }
        if !(self.max_delay_seconds.is_finite() && self.max_delay_seconds > 0.0) {
            return Err(ControlError::invalid_value(
                "maxDelaySeconds",
                format!("{} is not a positive duration", self.max_delay_seconds),
            ));
        }
        if !(self.rms_threshold > 0.0 && self.rms_threshold <= 1.0) {
            return Err(ControlError::invalid_value(
                "rmsThreshold",
                format!("{} outside (0, 1]", self.rms_threshold),
            ));
        }
        if self.waveshaper_curve_size < 2 {
            return Err(ControlError::invalid_value(
                "waveshaperCurveSize",
                format!("{} is below 2", self.waveshaper_curve_size),
            ));
        }
        if self.command_capacity == 0 || self.notification_capacity == 0 {
            return Err(ControlError::invalid_value("queue capacity", "must be at least 1"));
        }
        Ok(())
    }

    /// Core engine configuration for these settings.
    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            sample_rate: self.sample_rate,
            block_size: self.block_size,
            max_channels: self.max_channels,
            max_delay_seconds: self.max_delay_seconds,
            rms_threshold: self.rms_threshold,
            waveshaper_curve_size: self.waveshaper_curve_size,
            event_capacity: EngineConfig::default().event_capacity,
            seed: XorShift32::DEFAULT_SEED,
        }
    }
}

/// Returns the user-specific configuration directory.
///
/// Returns a fallback path if the config directory cannot be determined.
pub fn user_config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_NAME)
}

/// Default settings file location inside [`user_config_dir`].
pub fn default_path() -> PathBuf {
    user_config_dir().join(SETTINGS_FILE)
}
