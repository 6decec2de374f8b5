//! Telemetry samples, their text rendering, and the hardware sources
//! that produce them.
//!
//! Two sources exist, one per [`DisplayMode`]: an IIO ambient-light sensor
//! and a V4L2 camera. Only one is ever used in a session.

pub mod camera;
pub mod data;
pub mod format;
pub mod light;
pub mod traits;

#[cfg(test)]
pub mod mock;

// Re-export commonly used items
pub use camera::V4l2ExposureReader;
pub use data::{Capability, DisplayMode, ExposureSample, IlluminanceSample, Reading};
pub use light::IioLightSensor;
pub use traits::TelemetrySource;

use crate::config::MeterConfig;

/// Build the source for the configured display mode.
pub fn source_for(config: &MeterConfig) -> Box<dyn TelemetrySource> {
    match config.mode {
        DisplayMode::Exposure => Box::new(V4l2ExposureReader::new(config)),
        DisplayMode::Illuminance => Box::new(IioLightSensor::new(config.iio_root.clone())),
    }
}
