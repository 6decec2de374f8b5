//! Visibility-driven lifecycle of a meter display.
//!
//! The hardware is held only while the display is visible: a [`Subscription`]
//! is acquired on [`LifecycleEvent::Visible`] and released on
//! [`LifecycleEvent::Hidden`].

use crate::config::MeterConfig;
use crate::display::panel::{DisplayFrame, DisplayPanel, DisplayState};
use crate::error::{MeterError, Result};
use crate::readings::format::{
    CAMERA_PERMISSION_REQUIRED, HARDWARE_DISCONNECTED, HARDWARE_UNAVAILABLE,
    LIGHT_SENSOR_PERMISSION_REQUIRED, NO_CAMERA, NO_LIGHT_SENSOR,
};
use crate::readings::{source_for, Capability, DisplayMode, TelemetrySource};
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time;
use tracing::{debug, error, info, warn};

/// Something that happened to the display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum LifecycleEvent {
    /// The display became visible
    Visible,
    /// The display stopped being visible
    Hidden,
    /// The user answered the hardware permission prompt
    PermissionResponse { granted: bool },
}

/// Result of trying to activate the display.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Activation {
    /// Hardware acquired and readings are flowing
    Started,
    /// Hardware was already held
    AlreadyActive,
    /// No such hardware on this system; a fallback message is shown
    CapabilityMissing,
    /// Access refused; waiting for the user to grant it
    PermissionPending,
}

/// Scoped hold on an open telemetry source.
///
/// A background task ticks the source at a fixed interval and pushes each
/// reading to the panel. Releasing the subscription (or dropping it) stops
/// the task, which closes the source.
pub struct Subscription {
    stop: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<Box<dyn TelemetrySource>>>,
}

impl Subscription {
    /// Start ticking an already opened source.
    pub fn start(
        mut source: Box<dyn TelemetrySource>,
        panel: DisplayPanel,
        interval: Duration,
    ) -> Self {
        let (stop_tx, mut stop_rx) = oneshot::channel::<()>();

        let task = tokio::spawn(async move {
            let mut ticker = time::interval(interval);
            loop {
                tokio::select! {
                    _ = &mut stop_rx => break,
                    _ = ticker.tick() => match source.next_reading().await {
                        Ok(reading) => panel.show_reading(reading),
                        Err(e) => {
                            error!("{} source failed, releasing hardware: {}", source.mode(), e);
                            panel.show_message(HARDWARE_DISCONNECTED);
                            break;
                        }
                    },
                }
            }
            source.close().await;
            panel.set_state(DisplayState::Inactive);
            source
        });

        Self {
            stop: Some(stop_tx),
            task: Some(task),
        }
    }

    /// Whether the ticking task has ended (released or disconnected).
    pub fn is_finished(&self) -> bool {
        self.task.as_ref().map_or(true, |task| task.is_finished())
    }

    /// Stop ticking and hand back the closed source.
    pub async fn release(mut self) -> Option<Box<dyn TelemetrySource>> {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
        match self.task.take()?.await {
            Ok(source) => Some(source),
            Err(e) => {
                error!("Subscription task failed: {}", e);
                None
            }
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
    }
}

/// A display bound to one telemetry source.
pub struct Meter {
    mode: DisplayMode,
    source: Option<Box<dyn TelemetrySource>>,
    subscription: Option<Subscription>,
    panel: DisplayPanel,
    interval: Duration,
    visible: bool,
    permission_pending: bool,
}

impl Meter {
    /// Create an inactive meter around `source`.
    pub fn new(source: Box<dyn TelemetrySource>, interval: Duration) -> Self {
        let mode = source.mode();
        Self {
            mode,
            source: Some(source),
            subscription: None,
            panel: DisplayPanel::new(mode),
            interval,
            visible: false,
            permission_pending: false,
        }
    }

    /// Create a meter for the mode and hardware described by `config`.
    pub fn from_config(config: &MeterConfig) -> Self {
        Self::new(
            source_for(config),
            Duration::from_millis(config.interval_ms),
        )
    }

    pub fn mode(&self) -> DisplayMode {
        self.mode
    }

    /// Handle to the panel this meter writes to.
    pub fn panel(&self) -> DisplayPanel {
        self.panel.clone()
    }

    pub fn state(&self) -> DisplayState {
        match &self.subscription {
            Some(subscription) if !subscription.is_finished() => DisplayState::Active,
            _ => DisplayState::Inactive,
        }
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    /// Whether activation is waiting on a permission grant.
    pub fn permission_pending(&self) -> bool {
        self.permission_pending
    }

    /// Apply one lifecycle event.
    pub async fn handle(&mut self, event: LifecycleEvent) -> Result<()> {
        debug!("Lifecycle event: {:?}", event);
        match event {
            LifecycleEvent::Visible => self.on_visible().await.map(|_| ()),
            LifecycleEvent::Hidden => {
                self.on_hidden().await;
                Ok(())
            }
            LifecycleEvent::PermissionResponse { granted } => {
                self.on_permission_response(granted).await.map(|_| ())
            }
        }
    }

    /// The display became visible: acquire the hardware if possible.
    pub async fn on_visible(&mut self) -> Result<Activation> {
        self.visible = true;
        self.reap().await;

        if self.subscription.is_some() {
            return Ok(Activation::AlreadyActive);
        }

        let mut source = self.take_source()?;
        match source.probe() {
            Capability::Missing => {
                info!("No {} hardware found", self.mode);
                self.panel.show_message(missing_message(self.mode));
                self.source = Some(source);
                Ok(Activation::CapabilityMissing)
            }
            Capability::PermissionDenied { device } => {
                warn!(
                    "Access to {} denied, waiting for permission",
                    device.display()
                );
                self.permission_pending = true;
                self.panel.show_message(permission_message(self.mode));
                self.source = Some(source);
                Ok(Activation::PermissionPending)
            }
            Capability::Available { device } => {
                self.permission_pending = false;
                if let Err(e) = source.open().await {
                    error!("Failed to open {}: {}", device.display(), e);
                    source.close().await;
                    self.panel.show_message(HARDWARE_UNAVAILABLE);
                    self.source = Some(source);
                    return Err(e);
                }

                info!("Subscribed to {} ({})", device.display(), self.mode);
                self.panel.set_state(DisplayState::Active);
                self.subscription = Some(Subscription::start(
                    source,
                    self.panel.clone(),
                    self.interval,
                ));
                Ok(Activation::Started)
            }
        }
    }

    /// The display stopped being visible: release the hardware.
    pub async fn on_hidden(&mut self) {
        self.visible = false;
        if let Some(subscription) = self.subscription.take() {
            self.source = subscription.release().await;
            info!("Released {} hardware", self.mode);
        }
        self.panel.set_state(DisplayState::Inactive);
    }

    /// The user answered the permission prompt.
    ///
    /// Returns the activation outcome when the answer triggered a new
    /// attempt, `None` otherwise.
    pub async fn on_permission_response(&mut self, granted: bool) -> Result<Option<Activation>> {
        if !granted {
            info!("Permission for {} hardware refused", self.mode);
            return Ok(None);
        }
        if !(self.permission_pending && self.visible) {
            return Ok(None);
        }
        self.on_visible().await.map(Some)
    }

    /// Take a single reading without subscribing, then release the hardware.
    ///
    /// Returns the frame that results, which holds a fallback message when
    /// the hardware is missing or access is refused.
    pub async fn read_once(&mut self) -> Result<DisplayFrame> {
        if self.state() == DisplayState::Active {
            return Ok(self.panel.current());
        }
        self.reap().await;

        let mut source = self.take_source()?;
        match source.probe() {
            Capability::Missing => self.panel.show_message(missing_message(self.mode)),
            Capability::PermissionDenied { .. } => {
                self.panel.show_message(permission_message(self.mode))
            }
            Capability::Available { .. } => {
                let result = match source.open().await {
                    Ok(()) => source.next_reading().await,
                    Err(e) => Err(e),
                };
                source.close().await;
                match result {
                    Ok(reading) => self.panel.show_reading(reading),
                    Err(e) => {
                        self.source = Some(source);
                        return Err(e);
                    }
                }
            }
        }
        self.source = Some(source);
        Ok(self.panel.current())
    }

    /// Reclaim the source from a subscription whose task has ended.
    async fn reap(&mut self) {
        if self.subscription.as_ref().is_some_and(|s| s.is_finished()) {
            if let Some(subscription) = self.subscription.take() {
                self.source = subscription.release().await;
                debug!("Reclaimed {} source after disconnect", self.mode);
            }
        }
    }

    fn take_source(&mut self) -> Result<Box<dyn TelemetrySource>> {
        self.source.take().ok_or_else(|| {
            MeterError::config_error(format!("The {} source is no longer available", self.mode))
        })
    }
}

fn missing_message(mode: DisplayMode) -> &'static str {
    match mode {
        DisplayMode::Exposure => NO_CAMERA,
        DisplayMode::Illuminance => NO_LIGHT_SENSOR,
    }
}

fn permission_message(mode: DisplayMode) -> &'static str {
    match mode {
        DisplayMode::Exposure => CAMERA_PERMISSION_REQUIRED,
        DisplayMode::Illuminance => LIGHT_SENSOR_PERMISSION_REQUIRED,
    }
}

/// Drive `meter` from a stream of lifecycle events until the sender side
/// closes or `shutdown` resolves, then release the hardware and hand the
/// meter back.
pub async fn run_lifecycle(
    mut meter: Meter,
    mut events: mpsc::Receiver<LifecycleEvent>,
    shutdown: impl Future<Output = ()>,
) -> Meter {
    tokio::pin!(shutdown);
    loop {
        tokio::select! {
            biased;
            _ = &mut shutdown => break,
            event = events.recv() => match event {
                Some(event) => {
                    if let Err(e) = meter.handle(event).await {
                        error!("Failed to apply {:?}: {}", event, e);
                    }
                }
                None => break,
            },
        }
    }
    meter.on_hidden().await;
    meter
}
