//! Recorder configuration.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use gifgrab_capture::{DesiredFps, DEFAULT_FPS, UPDATE_CHANNEL_CAPACITY};
use gifgrab_encoder::DEFAULT_FILENAME;

/// Errors loading a configuration file.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("Failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The file is not valid JSON for this schema.
    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),

    /// A value is out of range.
    #[error("Invalid config value for {field}: {reason}")]
    Invalid {
        field: &'static str,
        reason: String,
    },
}

/// Tunable recorder settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecorderConfig {
    /// Capture rate cap, also used when the rate input is empty or invalid.
    pub default_fps: f64,

    /// Most frames kept in memory; older frames are evicted first.
    /// Zero disables the cap.
    pub max_buffered_frames: usize,

    /// Interval between display poll ticks in milliseconds.
    pub poll_interval_ms: u64,

    /// Capacity of the capture → display update channel.
    pub update_channel_capacity: usize,

    /// File name used when a save request names none.
    pub default_filename: String,

    /// Directory that relative save names are resolved against.
    pub output_dir: Option<PathBuf>,
}

impl Default for RecorderConfig {
    fn default() -> Self {
        Self {
            default_fps: DEFAULT_FPS,
            max_buffered_frames: 3000,
            poll_interval_ms: 16,
            update_channel_capacity: UPDATE_CHANNEL_CAPACITY,
            default_filename: DEFAULT_FILENAME.to_string(),
            output_dir: None,
        }
    }
}

impl RecorderConfig {
    /// Parse and validate a JSON configuration. Missing fields take their
    /// defaults.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a JSON configuration file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let json = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_json(&json)?;
        debug!(path = %path.display(), "Loaded recorder config");
        Ok(config)
    }

    /// Check value ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !DesiredFps::is_usable(self.default_fps) {
            return Err(ConfigError::Invalid {
                field: "default_fps",
                reason: format!("{} is not a usable rate", self.default_fps),
            });
        }
        if self.poll_interval_ms == 0 {
            return Err(ConfigError::Invalid {
                field: "poll_interval_ms",
                reason: "must be at least 1".to_string(),
            });
        }
        if self.update_channel_capacity == 0 {
            return Err(ConfigError::Invalid {
                field: "update_channel_capacity",
                reason: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }

    /// Poll tick interval.
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Frame buffer limit, `None` when uncapped.
    pub fn buffer_capacity(&self) -> Option<usize> {
        (self.max_buffered_frames > 0).then_some(self.max_buffered_frames)
    }

    /// Resolve a normalized save name against `output_dir`.
    pub fn resolve_output(&self, name: PathBuf) -> PathBuf {
        match &self.output_dir {
            Some(dir) if name.is_relative() => dir.join(name),
            _ => name,
        }
    }
}
