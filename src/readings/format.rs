//! Text formatting for telemetry samples.
//!
//! Each sample is rendered independently; there is no smoothing or history.

use super::data::{ExposureSample, IlluminanceSample};

/// Shown in place of a value the hardware did not report.
pub const UNAVAILABLE: &str = "unavailable";

/// Shown instead of readings when no ambient-light sensor exists.
pub const NO_LIGHT_SENSOR: &str = "No Light Sensor Found!";

/// Shown instead of readings when no capture device exists.
pub const NO_CAMERA: &str = "No Camera Found!";

/// Shown while camera access is refused.
pub const CAMERA_PERMISSION_REQUIRED: &str = "Camera permission required";

/// Shown while light sensor access is refused.
pub const LIGHT_SENSOR_PERMISSION_REQUIRED: &str = "Light sensor permission required";

/// Shown when the hardware was found but could not be opened.
pub const HARDWARE_UNAVAILABLE: &str = "Hardware could not be opened";

/// Shown after the hardware stopped answering.
pub const HARDWARE_DISCONNECTED: &str = "Hardware disconnected";

/// Render a real number the way the display has always shown floats:
/// whole values keep one decimal place (`450.0`), everything else uses the
/// shortest representation that round-trips (`1.8`). Magnitudes of `1e7` and
/// above, or below `1e-3`, switch to exponent form (`1.0E7`, `2.5E-4`).
pub fn format_real(value: f32) -> String {
    let magnitude = value.abs();
    if value == 0.0 || (1e-3..1e7).contains(&magnitude) {
        if value.fract() == 0.0 {
            format!("{:.1}", value)
        } else {
            format!("{}", value)
        }
    } else {
        let scientific = format!("{:e}", value);
        match scientific.split_once('e') {
            Some((mantissa, exponent)) if mantissa.contains('.') => {
                format!("{}E{}", mantissa, exponent)
            }
            Some((mantissa, exponent)) => format!("{}.0E{}", mantissa, exponent),
            None => scientific,
        }
    }
}

/// `1e9 / exposure_time_ns`, rounded. `None` for zero or negative durations.
pub fn shutter_denominator(exposure_time_ns: i64) -> Option<i64> {
    if exposure_time_ns <= 0 {
        return None;
    }
    Some((1e9 / exposure_time_ns as f64).round() as i64)
}

/// `ISO: <sensitivity>`
pub fn iso_label(sensitivity: Option<i32>) -> String {
    match sensitivity {
        Some(iso) => format!("ISO: {}", iso),
        None => format!("ISO: {}", UNAVAILABLE),
    }
}

/// `Shutter Speed: 1/<denominator>`
pub fn shutter_label(exposure_time_ns: Option<i64>) -> String {
    match exposure_time_ns.and_then(shutter_denominator) {
        Some(denominator) => format!("Shutter Speed: 1/{}", denominator),
        None => format!("Shutter Speed: {}", UNAVAILABLE),
    }
}

/// `Aperture: f/<f-number>`
pub fn aperture_label(aperture_f_number: Option<f32>) -> String {
    match aperture_f_number.filter(|f| f.is_finite()) {
        Some(f_number) => format!("Aperture: f/{}", format_real(f_number)),
        None => format!("Aperture: {}", UNAVAILABLE),
    }
}

/// The three exposure lines, in display order.
pub fn exposure_labels(sample: &ExposureSample) -> [String; 3] {
    [
        iso_label(sample.sensitivity),
        shutter_label(sample.exposure_time_ns),
        aperture_label(sample.aperture_f_number),
    ]
}

/// `Light Intensity: <lux> lx`
pub fn illuminance_label(sample: &IlluminanceSample) -> String {
    if sample.lux.is_finite() {
        format!("Light Intensity: {} lx", format_real(sample.lux))
    } else {
        format!("Light Intensity: {}", UNAVAILABLE)
    }
}
