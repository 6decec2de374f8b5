//! Ambient-light sensor access through the Linux IIO sysfs interface.

use crate::error::{MeterError, Result};
use crate::readings::data::{Capability, DisplayMode, IlluminanceSample, Reading};
use crate::readings::traits::TelemetrySource;
use async_trait::async_trait;
use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Attribute already scaled to lux by the driver.
const INPUT_ATTR: &str = "in_illuminance_input";
/// Raw attribute that needs `offset` and `scale` applied.
const RAW_ATTR: &str = "in_illuminance_raw";
const SCALE_ATTR: &str = "in_illuminance_scale";
const OFFSET_ATTR: &str = "in_illuminance_offset";

/// How a sensor exposes its illuminance value.
#[derive(Debug, Clone, PartialEq)]
enum Channel {
    /// Processed value in lux
    Input(PathBuf),
    /// Raw count, converted with `(raw + offset) * scale`
    Raw {
        raw: PathBuf,
        scale: f32,
        offset: f32,
    },
}

impl Channel {
    /// The attribute read on every tick.
    fn value_path(&self) -> &Path {
        match self {
            Channel::Input(path) => path,
            Channel::Raw { raw, .. } => raw,
        }
    }
}

/// An IIO device that reports illuminance.
#[derive(Debug, Clone, PartialEq)]
pub struct LightSensorInfo {
    /// sysfs directory of the device (e.g. `/sys/bus/iio/devices/iio:device0`)
    pub path: PathBuf,
    /// Driver name from the `name` attribute, if present
    pub name: Option<String>,
}

/// Ambient-light source backed by the IIO sysfs tree.
pub struct IioLightSensor {
    root: PathBuf,
    channel: Option<Channel>,
}

impl IioLightSensor {
    /// Create a sensor source that scans the given IIO root.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            channel: None,
        }
    }

    /// List every IIO device under `root` that reports illuminance,
    /// ordered by device name.
    pub fn enumerate(root: &Path) -> Vec<LightSensorInfo> {
        let Ok(entries) = fs::read_dir(root) else {
            return Vec::new();
        };

        let mut devices: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok())
            .filter(|entry| {
                entry
                    .file_name()
                    .to_string_lossy()
                    .starts_with("iio:device")
            })
            .map(|entry| entry.path())
            .filter(|path| path.join(INPUT_ATTR).exists() || path.join(RAW_ATTR).exists())
            .collect();
        devices.sort_by_key(|path| device_index(path));

        devices
            .into_iter()
            .map(|path| LightSensorInfo {
                name: read_trimmed(&path.join("name")),
                path,
            })
            .collect()
    }

    /// The sensor used by default: the first one found.
    pub fn default_sensor(&self) -> Option<LightSensorInfo> {
        Self::enumerate(&self.root).into_iter().next()
    }

    fn resolve_channel(device: &Path) -> Channel {
        let input = device.join(INPUT_ATTR);
        if input.exists() {
            return Channel::Input(input);
        }

        let scale = read_f32(&device.join(SCALE_ATTR)).unwrap_or(1.0);
        let offset = read_f32(&device.join(OFFSET_ATTR)).unwrap_or(0.0);
        Channel::Raw {
            raw: device.join(RAW_ATTR),
            scale,
            offset,
        }
    }

    fn read_channel(channel: &Channel) -> Result<f32> {
        match channel {
            Channel::Input(path) => parse_attr(path),
            Channel::Raw { raw, scale, offset } => {
                let raw = parse_attr(raw)?;
                Ok((raw + offset) * scale)
            }
        }
    }
}

#[async_trait]
impl TelemetrySource for IioLightSensor {
    fn mode(&self) -> DisplayMode {
        DisplayMode::Illuminance
    }

    fn probe(&self) -> Capability {
        let Some(sensor) = self.default_sensor() else {
            return Capability::Missing;
        };
        let channel = Self::resolve_channel(&sensor.path);
        let attr = channel.value_path();
        sensor_capability(&sensor.path, attr, File::open(attr))
    }

    async fn open(&mut self) -> Result<()> {
        let sensor = self
            .default_sensor()
            .ok_or_else(|| MeterError::sensor_error("No light sensor found"))?;
        let channel = Self::resolve_channel(&sensor.path);

        // A first read proves the attribute is readable before we commit.
        Self::read_channel(&channel)?;

        info!(
            "Registered light sensor {} ({})",
            sensor.path.display(),
            sensor.name.as_deref().unwrap_or("unnamed")
        );
        self.channel = Some(channel);
        Ok(())
    }

    async fn next_reading(&mut self) -> Result<Reading> {
        let channel = self
            .channel
            .as_ref()
            .ok_or_else(|| MeterError::sensor_error("Light sensor is not registered"))?;
        let lux = Self::read_channel(channel)?;
        debug!("Light sensor reading: {} lx", lux);
        Ok(IlluminanceSample::new(lux).into())
    }

    async fn close(&mut self) {
        if self.channel.take().is_some() {
            info!("Unregistered light sensor");
        }
    }

    fn is_open(&self) -> bool {
        self.channel.is_some()
    }
}

/// Classify the result of opening a sensor's value attribute.
///
/// Only a refused open changes the outcome; any other failure surfaces when
/// the sensor is opened.
pub fn sensor_capability(device: &Path, attr: &Path, opened: io::Result<File>) -> Capability {
    match opened {
        Err(e) if e.kind() == io::ErrorKind::PermissionDenied => {
            debug!("Reading {} refused: {}", attr.display(), e);
            Capability::PermissionDenied {
                device: attr.to_path_buf(),
            }
        }
        _ => Capability::Available {
            device: device.to_path_buf(),
        },
    }
}

/// Numeric suffix of `iio:deviceN`, so `device10` sorts after `device2`.
fn device_index(path: &Path) -> u32 {
    path.file_name()
        .and_then(|name| name.to_str())
        .and_then(|name| name.strip_prefix("iio:device"))
        .and_then(|index| index.parse().ok())
        .unwrap_or(u32::MAX)
}

fn read_trimmed(path: &Path) -> Option<String> {
    fs::read_to_string(path).ok().map(|s| s.trim().to_string())
}

fn read_f32(path: &Path) -> Option<f32> {
    read_trimmed(path)?.parse().ok()
}

fn parse_attr(path: &Path) -> Result<f32> {
    let text = fs::read_to_string(path).map_err(|e| {
        MeterError::sensor_error(format!("Failed to read {}: {}", path.display(), e))
    })?;
    text.trim().parse::<f32>().map_err(|e| {
        MeterError::parse_error(format!(
            "Invalid value {:?} in {}: {}",
            text.trim(),
            path.display(),
            e
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn add_device(root: &Path, index: u32, attrs: &[(&str, &str)]) -> PathBuf {
        let dir = root.join(format!("iio:device{}", index));
        fs::create_dir_all(&dir).unwrap();
        for (name, value) in attrs {
            fs::write(dir.join(name), format!("{}\n", value)).unwrap();
        }
        dir
    }

    #[tokio::test]
    async fn test_processed_input() {
        let root = tempfile::tempdir().unwrap();
        add_device(root.path(), 0, &[("name", "bh1750"), (INPUT_ATTR, "450")]);

        let mut sensor = IioLightSensor::new(root.path());
        assert!(sensor.probe().is_available());

        sensor.open().await.unwrap();
        let reading = sensor.next_reading().await.unwrap();
        assert_eq!(reading, Reading::Illuminance(IlluminanceSample::new(450.0)));
    }

    #[tokio::test]
    async fn test_raw_with_scale_and_offset() {
        let root = tempfile::tempdir().unwrap();
        add_device(
            root.path(),
            0,
            &[(RAW_ATTR, "100"), (SCALE_ATTR, "0.5"), (OFFSET_ATTR, "4")],
        );

        let mut sensor = IioLightSensor::new(root.path());
        sensor.open().await.unwrap();
        match sensor.next_reading().await.unwrap() {
            Reading::Illuminance(sample) => assert!((sample.lux - 52.0).abs() < 1e-6),
            other => panic!("unexpected reading {:?}", other),
        }
    }

    #[test]
    fn test_missing_sensor() {
        let root = tempfile::tempdir().unwrap();
        // An accelerometer is not a light sensor.
        add_device(root.path(), 0, &[("in_accel_x_raw", "12")]);

        let sensor = IioLightSensor::new(root.path());
        assert_eq!(sensor.probe(), Capability::Missing);

        let nowhere = IioLightSensor::new(root.path().join("absent"));
        assert_eq!(nowhere.probe(), Capability::Missing);
    }

    #[test]
    fn test_enumeration_order() {
        let root = tempfile::tempdir().unwrap();
        add_device(root.path(), 10, &[(INPUT_ATTR, "1")]);
        let second = add_device(root.path(), 2, &[(INPUT_ATTR, "2")]);

        let sensors = IioLightSensor::enumerate(root.path());
        assert_eq!(sensors.len(), 2);
        assert_eq!(sensors[0].path, second);
    }

    #[tokio::test]
    async fn test_disconnect_is_an_error() {
        let root = tempfile::tempdir().unwrap();
        let dir = add_device(root.path(), 0, &[(INPUT_ATTR, "3.5")]);

        let mut sensor = IioLightSensor::new(root.path());
        sensor.open().await.unwrap();
        fs::remove_dir_all(dir).unwrap();

        assert!(sensor.next_reading().await.is_err());
        sensor.close().await;
        assert!(!sensor.is_open());
    }

    #[tokio::test]
    async fn test_garbage_value() {
        let root = tempfile::tempdir().unwrap();
        add_device(root.path(), 0, &[(INPUT_ATTR, "bright")]);

        let mut sensor = IioLightSensor::new(root.path());
        let err = sensor.open().await.unwrap_err();
        assert!(matches!(err, MeterError::Parse(_)));
        assert!(!sensor.is_open());
    }

    #[test]
    fn test_refused_attribute_needs_permission() {
        let device = Path::new("/sys/bus/iio/devices/iio:device0");
        let attr = device.join(INPUT_ATTR);

        let refused = Err(io::Error::from(io::ErrorKind::PermissionDenied));
        assert_eq!(
            sensor_capability(device, &attr, refused),
            Capability::PermissionDenied {
                device: attr.clone()
            }
        );

        let vanished = Err(io::Error::from(io::ErrorKind::NotFound));
        assert!(sensor_capability(device, &attr, vanished).is_available());
    }

    #[test]
    fn test_readable_sensor_is_available() {
        let root = tempfile::tempdir().unwrap();
        let dir = add_device(root.path(), 0, &[(INPUT_ATTR, "7")]);

        let sensor = IioLightSensor::new(root.path());
        assert_eq!(sensor.probe(), Capability::Available { device: dir });
    }
}
