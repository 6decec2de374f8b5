//! Camera exposure telemetry through Video4Linux2.
//!
//! Devices are discovered in the video4linux sysfs class and their control
//! values are read with `v4l2-ctl`, the same way the diagnostics tooling on
//! these boards is usually queried from a shell.

use crate::config::MeterConfig;
use crate::error::{MeterError, Result};
use crate::readings::data::{Capability, DisplayMode, ExposureSample, Reading};
use crate::readings::traits::TelemetrySource;
use async_trait::async_trait;
use serde::Serialize;
use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use tokio::process::Command;
use tracing::{debug, info, warn};

/// `exposure_time_absolute` is expressed in units of 100 µs.
pub const EXPOSURE_UNIT_NS: i64 = 100_000;

/// `auto_exposure` menu entry for aperture-priority mode.
const AUTO_EXPOSURE_APERTURE_PRIORITY: i64 = 3;

const EXPOSURE_CONTROLS: [&str; 2] = ["exposure_time_absolute", "exposure_absolute"];
const ISO_CONTROL: &str = "iso_sensitivity";
const IRIS_CONTROL: &str = "iris_absolute";

/// A capture device found in the video4linux class.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CameraInfo {
    /// Numeric index N of `videoN`
    pub index: u32,
    /// Device node (e.g. `/dev/video0`)
    pub node: PathBuf,
    /// Card name from sysfs, if present
    pub name: Option<String>,
}

/// An opened camera: the device handle stays open while subscribed.
struct OpenCamera {
    _handle: File,
    node: PathBuf,
}

/// Exposure source backed by a V4L2 capture device.
pub struct V4l2ExposureReader {
    video_root: PathBuf,
    dev_root: PathBuf,
    tool: String,
    iris_scale: f32,
    auto_exposure: bool,
    camera: Option<OpenCamera>,
}

impl V4l2ExposureReader {
    /// Create a reader using the roots and tool from `config`.
    pub fn new(config: &MeterConfig) -> Self {
        Self {
            video_root: config.video_root.clone(),
            dev_root: config.dev_root.clone(),
            tool: config.v4l2_ctl.clone(),
            iris_scale: config.iris_scale,
            auto_exposure: config.auto_exposure,
            camera: None,
        }
    }

    /// List capture devices ordered by index.
    pub fn enumerate(video_root: &Path, dev_root: &Path) -> Vec<CameraInfo> {
        let Ok(entries) = fs::read_dir(video_root) else {
            return Vec::new();
        };

        let mut cameras: Vec<CameraInfo> = entries
            .filter_map(|entry| entry.ok())
            .filter_map(|entry| {
                let file_name = entry.file_name().to_string_lossy().to_string();
                let index = file_name.strip_prefix("video")?.parse::<u32>().ok()?;
                let name = fs::read_to_string(entry.path().join("name"))
                    .ok()
                    .map(|s| s.trim().to_string());
                Some(CameraInfo {
                    index,
                    node: dev_root.join(&file_name),
                    name,
                })
            })
            .collect();
        cameras.sort_by_key(|camera| camera.index);
        cameras
    }

    /// The camera used by default: the first one listed.
    pub fn default_camera(&self) -> Option<CameraInfo> {
        Self::enumerate(&self.video_root, &self.dev_root)
            .into_iter()
            .next()
    }

    /// Run `v4l2-ctl` against `node` with the given arguments.
    async fn run_tool(&self, node: &Path, args: &[&str]) -> Result<String> {
        let output = Command::new(&self.tool)
            .arg("-d")
            .arg(node)
            .args(args)
            .output()
            .await
            .map_err(|e| {
                MeterError::camera_error(format!("Failed to run {}: {}", self.tool, e))
            })?;

        if !output.status.success() {
            return Err(MeterError::camera_error(format!(
                "{} {} exited with {}: {}",
                self.tool,
                args.join(" "),
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }

    async fn read_controls(&self, node: &Path) -> Result<HashMap<String, i64>> {
        let listing = self.run_tool(node, &["--list-ctrls-menus"]).await?;
        Ok(parse_ctrl_listing(&listing))
    }
}

#[async_trait]
impl TelemetrySource for V4l2ExposureReader {
    fn mode(&self) -> DisplayMode {
        DisplayMode::Exposure
    }

    fn probe(&self) -> Capability {
        match self.default_camera() {
            Some(camera) => access_capability(&camera.node, open_rw(&camera.node)),
            None => Capability::Missing,
        }
    }

    async fn open(&mut self) -> Result<()> {
        let camera = self
            .default_camera()
            .ok_or_else(|| MeterError::camera_error("No camera found"))?;

        let handle = open_rw(&camera.node).map_err(|e| {
            if e.kind() == io::ErrorKind::PermissionDenied {
                MeterError::permission_error(format!("{}: {}", camera.node.display(), e))
            } else {
                MeterError::camera_error(format!(
                    "Failed to open {}: {}",
                    camera.node.display(),
                    e
                ))
            }
        })?;

        // The handle is dropped on any error below, releasing the device.
        self.read_controls(&camera.node).await?;

        if self.auto_exposure {
            let setting = format!("--set-ctrl=auto_exposure={}", AUTO_EXPOSURE_APERTURE_PRIORITY);
            if let Err(e) = self.run_tool(&camera.node, &[setting.as_str()]).await {
                warn!("Could not enable auto exposure: {}", e);
            }
        }

        info!(
            "Opened camera {} ({})",
            camera.node.display(),
            camera.name.as_deref().unwrap_or("unnamed")
        );
        self.camera = Some(OpenCamera {
            _handle: handle,
            node: camera.node,
        });
        Ok(())
    }

    async fn next_reading(&mut self) -> Result<Reading> {
        let node = self
            .camera
            .as_ref()
            .map(|camera| camera.node.clone())
            .ok_or_else(|| MeterError::camera_error("Camera is not open"))?;

        let controls = self.read_controls(&node).await?;
        let sample = exposure_from_controls(&controls, self.iris_scale);
        debug!("Camera exposure: {:?}", sample);
        Ok(sample.into())
    }

    async fn close(&mut self) {
        if let Some(camera) = self.camera.take() {
            info!("Closed camera {}", camera.node.display());
        }
    }

    fn is_open(&self) -> bool {
        self.camera.is_some()
    }
}

fn open_rw(node: &Path) -> io::Result<File> {
    OpenOptions::new().read(true).write(true).open(node)
}

/// Classify the result of opening a device node.
pub fn access_capability(node: &Path, opened: io::Result<File>) -> Capability {
    match opened {
        Ok(_) => Capability::Available {
            device: node.to_path_buf(),
        },
        Err(e) if e.kind() == io::ErrorKind::PermissionDenied => Capability::PermissionDenied {
            device: node.to_path_buf(),
        },
        Err(e) => {
            debug!("Camera {} not usable: {}", node.display(), e);
            Capability::Missing
        }
    }
}

/// Parse `v4l2-ctl --list-ctrls-menus` output into control name → current value.
///
/// Control lines look like
/// `exposure_time_absolute 0x009a0902 (int) : min=1 max=5000 step=1 default=156 value=156`.
/// An integer-menu control reports the index of its selected entry, so its
/// value is taken from the matching `N: value` menu line that follows it.
/// Integer menus without a matching entry are left out. Section headers and
/// anything without a `value=` field are skipped.
pub fn parse_ctrl_listing(listing: &str) -> HashMap<String, i64> {
    let mut controls = HashMap::new();
    let mut pending_menu: Option<(String, i64)> = None;

    for line in listing.lines() {
        let mut tokens = line.split_whitespace();
        let (Some(first), Some(second)) = (tokens.next(), tokens.next()) else {
            continue;
        };

        if let Some(index) = first.strip_suffix(':').and_then(|i| i.parse::<i64>().ok()) {
            if let Some((name, selected)) = &pending_menu {
                if *selected == index {
                    if let Ok(value) = second.parse::<i64>() {
                        controls.insert(name.clone(), value);
                    }
                }
            }
            continue;
        }

        pending_menu = None;
        if !second.starts_with("0x") {
            continue;
        }

        let mut int_menu = false;
        let mut value = None;
        for token in tokens {
            if token.starts_with("(intmenu)") {
                int_menu = true;
            } else if let Some(raw) = token.strip_prefix("value=") {
                value = raw.parse::<i64>().ok();
                break;
            }
        }

        match value {
            Some(index) if int_menu => pending_menu = Some((first.to_string(), index)),
            Some(value) => {
                controls.insert(first.to_string(), value);
            }
            None => {}
        }
    }

    controls
}

/// Build an exposure sample from V4L2 control values.
pub fn exposure_from_controls(controls: &HashMap<String, i64>, iris_scale: f32) -> ExposureSample {
    let exposure_time_ns = EXPOSURE_CONTROLS
        .iter()
        .find_map(|name| controls.get(*name))
        .map(|units| units.saturating_mul(EXPOSURE_UNIT_NS));

    ExposureSample {
        sensitivity: controls
            .get(ISO_CONTROL)
            .and_then(|iso| i32::try_from(*iso).ok()),
        exposure_time_ns,
        aperture_f_number: controls
            .get(IRIS_CONTROL)
            .map(|iris| *iris as f32 / iris_scale),
    }
}
