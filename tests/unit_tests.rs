//! Tests for the light meter public API.

use light_meter::readings::format::{
    exposure_labels, illuminance_label, shutter_label, NO_LIGHT_SENSOR,
};
use light_meter::*;
use std::fs;
use std::path::Path;
use std::time::Duration;

fn light_sensor_tree(lux: &str) -> tempfile::TempDir {
    let root = tempfile::tempdir().expect("temp dir");
    let device = root.path().join("iio:device0");
    fs::create_dir_all(&device).unwrap();
    fs::write(device.join("name"), "tsl2591\n").unwrap();
    fs::write(device.join("in_illuminance_input"), format!("{}\n", lux)).unwrap();
    root
}

fn illuminance_config(root: &Path) -> MeterConfig {
    MeterConfig::new(DisplayMode::Illuminance)
        .with_iio_root(root)
        .with_interval_ms(10)
}

/// Sensitivity 100, 1/120 s, f/1.8
#[test]
fn test_exposure_end_to_end() {
    let sample = ExposureSample::new(100, 8_333_333, 1.8);
    assert_eq!(
        exposure_labels(&sample),
        [
            "ISO: 100".to_string(),
            "Shutter Speed: 1/120".to_string(),
            "Aperture: f/1.8".to_string()
        ]
    );
}

#[test]
fn test_illuminance_end_to_end() {
    assert_eq!(
        illuminance_label(&IlluminanceSample::new(450.0)),
        "Light Intensity: 450.0 lx"
    );
}

/// Shutter label follows round(1e9 / t) for every positive duration
#[test]
fn test_shutter_formula() {
    for exposure_time_ns in [1_i64, 125_000, 1_000_000, 8_333_333, 33_333_333, 999_999_999] {
        let expected = (1e9 / exposure_time_ns as f64).round() as i64;
        assert_eq!(
            shutter_label(Some(exposure_time_ns)),
            format!("Shutter Speed: 1/{}", expected)
        );
    }
    assert_eq!(shutter_label(Some(0)), "Shutter Speed: unavailable");
}

#[tokio::test]
async fn test_read_once_from_light_sensor() {
    let root = light_sensor_tree("450");
    let mut meter = Meter::from_config(&illuminance_config(root.path()));

    let frame = meter.read_once().await.expect("reading");
    assert_eq!(frame.mode, DisplayMode::Illuminance);
    assert_eq!(frame.lines, vec!["Light Intensity: 450.0 lx"]);
    assert_eq!(
        frame.reading,
        Some(Reading::Illuminance(IlluminanceSample::new(450.0)))
    );
}

#[tokio::test]
async fn test_missing_light_sensor_shows_fallback() {
    let root = tempfile::tempdir().unwrap();
    let mut meter = Meter::from_config(&illuminance_config(root.path()));

    let activation = meter.on_visible().await.unwrap();
    assert_eq!(activation, Activation::CapabilityMissing);
    assert_eq!(meter.state(), DisplayState::Inactive);
    assert_eq!(meter.panel().current().lines, vec![NO_LIGHT_SENSOR]);
}

#[tokio::test]
async fn test_light_sensor_lifecycle() {
    let root = light_sensor_tree("12.5");
    let mut meter = Meter::from_config(&illuminance_config(root.path()));
    let mut frames = meter.panel().subscribe();

    assert_eq!(meter.on_visible().await.unwrap(), Activation::Started);
    assert_eq!(meter.state(), DisplayState::Active);

    let frame = tokio::time::timeout(Duration::from_secs(2), async {
        loop {
            frames.changed().await.unwrap();
            let frame = frames.borrow_and_update().clone();
            if frame.reading.is_some() {
                return frame;
            }
        }
    })
    .await
    .expect("a reading within two seconds");
    assert_eq!(frame.lines, vec!["Light Intensity: 12.5 lx"]);

    // Latest reading overwrites the previous one. Rename so the sensor never
    // sees a half-written attribute.
    let device = root.path().join("iio:device0");
    fs::write(device.join("next"), "80\n").unwrap();
    fs::rename(device.join("next"), device.join("in_illuminance_input")).unwrap();
    tokio::time::timeout(Duration::from_secs(2), async {
        loop {
            frames.changed().await.unwrap();
            if frames.borrow_and_update().lines == ["Light Intensity: 80.0 lx"] {
                return;
            }
        }
    })
    .await
    .expect("updated reading within two seconds");

    meter.on_hidden().await;
    assert_eq!(meter.state(), DisplayState::Inactive);
}

#[tokio::test]
async fn test_exposure_mode_without_camera() {
    let root = tempfile::tempdir().unwrap();
    let config = MeterConfig::new(DisplayMode::Exposure)
        .with_video_root(root.path())
        .with_dev_root(root.path());
    let mut meter = Meter::from_config(&config);

    let frame = meter.read_once().await.unwrap();
    assert_eq!(frame.lines, vec!["No Camera Found!"]);
    assert!(frame.reading.is_none());
}

#[test]
fn test_error_types() {
    let err = MeterError::camera_error("device vanished");
    assert!(format!("{}", err).contains("device vanished"));

    let err = MeterError::sensor_error("no data");
    assert!(format!("{}", err).contains("Light sensor"));

    let err = MeterError::permission_error("/dev/video0");
    assert!(format!("{}", err).contains("Permission denied"));

    let err = MeterError::config_error("bad interval");
    assert!(format!("{}", err).contains("bad interval"));
}

#[test]
fn test_web_config() {
    let config = WebConfig::default()
        .with_host("127.0.0.1")
        .with_port(9090)
        .with_cors(false)
        .with_max_viewers(2);

    assert_eq!(config.host, "127.0.0.1");
    assert_eq!(config.port, 9090);
    assert!(!config.enable_cors);
    assert_eq!(config.max_viewers, 2);
    assert_eq!(config.bind_address(), "127.0.0.1:9090");
}

#[test]
fn test_frame_json_shape() {
    let panel = DisplayPanel::new(DisplayMode::Exposure);
    panel.show_reading(ExposureSample::new(400, 1_000_000, 2.8).into());

    let json = serde_json::to_value(panel.current()).expect("serialize");
    assert_eq!(json["mode"], "exposure");
    assert_eq!(json["state"], "inactive");
    assert_eq!(json["reading"]["kind"], "exposure");
    assert_eq!(json["reading"]["sensitivity"], 400);
    assert_eq!(json["lines"][1], "Shutter Speed: 1/1000");
    assert!(json.get("timestamp").is_some());
}

#[test]
fn test_blocking_read_with_tokio_test() {
    let root = light_sensor_tree("0");
    let mut sensor = IioLightSensor::new(root.path());

    let reading = tokio_test::block_on(async {
        sensor.open().await?;
        let reading = sensor.next_reading().await;
        sensor.close().await;
        reading
    })
    .expect("reading");
    assert_eq!(reading.labels(), vec!["Light Intensity: 0.0 lx"]);
}
