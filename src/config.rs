//! Runtime configuration for the telemetry readers.

use crate::error::{MeterError, Result};
use crate::readings::DisplayMode;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Configuration for the meter and its hardware sources.
///
/// Every field has a default, so a config file only needs the keys it
/// wants to override.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MeterConfig {
    /// Which reader to run
    pub mode: DisplayMode,
    /// Polling interval for hardware ticks in milliseconds
    pub interval_ms: u64,
    /// Root of the IIO sysfs tree
    pub iio_root: PathBuf,
    /// Root of the video4linux sysfs class
    pub video_root: PathBuf,
    /// Directory holding the camera device nodes
    pub dev_root: PathBuf,
    /// Path or name of the `v4l2-ctl` binary
    pub v4l2_ctl: String,
    /// Divisor turning `iris_absolute` into an f-number
    pub iris_scale: f32,
    /// Switch the camera to aperture-priority auto exposure on open
    pub auto_exposure: bool,
}

impl Default for MeterConfig {
    fn default() -> Self {
        Self {
            mode: DisplayMode::Illuminance,
            interval_ms: crate::DEFAULT_INTERVAL_MS,
            iio_root: PathBuf::from("/sys/bus/iio/devices"),
            video_root: PathBuf::from("/sys/class/video4linux"),
            dev_root: PathBuf::from("/dev"),
            v4l2_ctl: "v4l2-ctl".to_string(),
            iris_scale: 100.0,
            auto_exposure: true,
        }
    }
}

impl MeterConfig {
    /// Create a configuration for the given mode with default settings.
    pub fn new(mode: DisplayMode) -> Self {
        Self {
            mode,
            ..Default::default()
        }
    }

    /// Load a configuration from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| {
            MeterError::config_error(format!("Failed to read {}: {}", path.display(), e))
        })?;
        let config: Self = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the readers cannot work with.
    pub fn validate(&self) -> Result<()> {
        if self.interval_ms == 0 {
            return Err(MeterError::config_error("interval_ms must be positive"));
        }
        if !(self.iris_scale.is_finite() && self.iris_scale > 0.0) {
            return Err(MeterError::config_error(format!(
                "iris_scale must be a positive number, got {}",
                self.iris_scale
            )));
        }
        Ok(())
    }

    /// Set the display mode.
    pub fn with_mode(mut self, mode: DisplayMode) -> Self {
        self.mode = mode;
        self
    }

    /// Set the polling interval.
    pub fn with_interval_ms(mut self, interval_ms: u64) -> Self {
        self.interval_ms = interval_ms;
        self
    }

    /// Set the IIO sysfs root.
    pub fn with_iio_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.iio_root = root.into();
        self
    }

    /// Set the video4linux sysfs root.
    pub fn with_video_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.video_root = root.into();
        self
    }

    /// Set the device node directory.
    pub fn with_dev_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.dev_root = root.into();
        self
    }

    /// Set the `v4l2-ctl` binary.
    pub fn with_v4l2_ctl(mut self, tool: impl Into<String>) -> Self {
        self.v4l2_ctl = tool.into();
        self
    }

    /// Set the iris scale.
    pub fn with_iris_scale(mut self, scale: f32) -> Self {
        self.iris_scale = scale;
        self
    }

    /// Enable or disable auto exposure on open.
    pub fn with_auto_exposure(mut self, enabled: bool) -> Self {
        self.auto_exposure = enabled;
        self
    }
}
