//! Value objects produced by the telemetry sources.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// The two mutually exclusive things the meter can display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum DisplayMode {
    /// Camera ISO, shutter speed and aperture
    Exposure,
    /// Ambient light in lux
    Illuminance,
}

impl fmt::Display for DisplayMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DisplayMode::Exposure => write!(f, "exposure"),
            DisplayMode::Illuminance => write!(f, "illuminance"),
        }
    }
}

/// Exposure values reported by the camera for one capture tick.
///
/// Every field is optional: drivers only report the controls they have.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ExposureSample {
    /// Sensor sensitivity (ISO)
    pub sensitivity: Option<i32>,
    /// Exposure duration in nanoseconds
    pub exposure_time_ns: Option<i64>,
    /// Lens aperture as an f-number
    pub aperture_f_number: Option<f32>,
}

impl ExposureSample {
    /// Create a sample with every field present.
    pub fn new(sensitivity: i32, exposure_time_ns: i64, aperture_f_number: f32) -> Self {
        Self {
            sensitivity: Some(sensitivity),
            exposure_time_ns: Some(exposure_time_ns),
            aperture_f_number: Some(aperture_f_number),
        }
    }
}

/// One ambient-light reading.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IlluminanceSample {
    /// Illuminance in lux
    pub lux: f32,
}

impl IlluminanceSample {
    pub fn new(lux: f32) -> Self {
        Self { lux }
    }
}

/// A reading from whichever source is active.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Reading {
    Exposure(ExposureSample),
    Illuminance(IlluminanceSample),
}

impl Reading {
    /// The display mode this reading belongs to.
    pub fn mode(&self) -> DisplayMode {
        match self {
            Reading::Exposure(_) => DisplayMode::Exposure,
            Reading::Illuminance(_) => DisplayMode::Illuminance,
        }
    }

    /// Render the reading as display lines.
    pub fn labels(&self) -> Vec<String> {
        match self {
            Reading::Exposure(sample) => super::format::exposure_labels(sample).to_vec(),
            Reading::Illuminance(sample) => vec![super::format::illuminance_label(sample)],
        }
    }
}

impl From<ExposureSample> for Reading {
    fn from(sample: ExposureSample) -> Self {
        Reading::Exposure(sample)
    }
}

impl From<IlluminanceSample> for Reading {
    fn from(sample: IlluminanceSample) -> Self {
        Reading::Illuminance(sample)
    }
}

/// Outcome of a hardware capability query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Capability {
    /// Hardware present and accessible
    Available { device: PathBuf },
    /// No hardware of this kind on the system
    Missing,
    /// Hardware present but the OS refused access
    PermissionDenied { device: PathBuf },
}

impl Capability {
    pub fn is_available(&self) -> bool {
        matches!(self, Capability::Available { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reading_serialization_is_tagged() {
        let reading = Reading::from(IlluminanceSample::new(12.5));
        let json = serde_json::to_value(reading).unwrap();
        assert_eq!(json["kind"], "illuminance");
        assert_eq!(json["lux"], 12.5);
    }

    #[test]
    fn test_reading_mode() {
        assert_eq!(
            Reading::from(ExposureSample::default()).mode(),
            DisplayMode::Exposure
        );
        assert_eq!(
            Reading::from(IlluminanceSample::new(0.0)).mode(),
            DisplayMode::Illuminance
        );
    }

    #[test]
    fn test_capability_serialization() {
        let missing = serde_json::to_value(Capability::Missing).unwrap();
        assert_eq!(missing["status"], "missing");

        let available = Capability::Available {
            device: PathBuf::from("/dev/video0"),
        };
        assert!(available.is_available());
        let json = serde_json::to_value(&available).unwrap();
        assert_eq!(json["device"], "/dev/video0");
    }
}
