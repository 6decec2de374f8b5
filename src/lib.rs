//! # Light Meter - Ambient Light and Camera Exposure Telemetry
//!
//! Reads telemetry from a Linux device and shows it as text. Two display
//! modes exist and only one runs at a time:
//!
//! - **Illuminance**: the ambient-light sensor (IIO) in lux
//! - **Exposure**: the camera's ISO, shutter speed and aperture (V4L2)
//!
//! The hardware is held only while the display is visible. A [`Meter`] moves
//! between `Inactive` and `Active` on visibility events and owns a
//! [`Subscription`] while active.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use light_meter::{DisplayMode, Meter, MeterConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = MeterConfig::new(DisplayMode::Illuminance);
//!     let mut meter = Meter::from_config(&config);
//!
//!     let frame = meter.read_once().await?;
//!     for line in frame.lines {
//!         println!("{}", line);
//!     }
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod display;
pub mod error;
pub mod readings;
pub mod web;

// Re-export public API
pub use config::MeterConfig;
pub use display::{
    run_lifecycle, Activation, DisplayFrame, DisplayPanel, DisplayState, LifecycleEvent, Meter,
    Subscription,
};
pub use error::{MeterError, Result};
pub use readings::{
    Capability, DisplayMode, ExposureSample, IioLightSensor, IlluminanceSample, Reading,
    TelemetrySource, V4l2ExposureReader,
};
pub use web::{start_web_server, WebConfig};

/// The default hardware polling interval in milliseconds
pub const DEFAULT_INTERVAL_MS: u64 = 500;

/// The default web server port
pub const DEFAULT_WEB_PORT: u16 = 8080;
