//! Scripted telemetry source for lifecycle tests.

use super::data::{Capability, DisplayMode, IlluminanceSample, Reading};
use super::traits::TelemetrySource;
use crate::error::{MeterError, Result};
use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Counters shared with the test after the source is boxed.
#[derive(Debug, Default)]
pub struct MockStats {
    pub opens: AtomicUsize,
    pub closes: AtomicUsize,
    pub reads: AtomicUsize,
}

impl MockStats {
    pub fn opens(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }

    pub fn closes(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }

    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }
}

pub struct MockSource {
    mode: DisplayMode,
    capability: Arc<Mutex<Capability>>,
    stats: Arc<MockStats>,
    open_fails: bool,
    fail_after: Option<usize>,
    open: bool,
}

impl MockSource {
    /// An available light sensor that reports 1 lx, 2 lx, 3 lx, ...
    pub fn available(mode: DisplayMode) -> Self {
        Self::with_capability(
            mode,
            Capability::Available {
                device: PathBuf::from("/dev/mock0"),
            },
        )
    }

    pub fn with_capability(mode: DisplayMode, capability: Capability) -> Self {
        Self {
            mode,
            capability: Arc::new(Mutex::new(capability)),
            stats: Arc::new(MockStats::default()),
            open_fails: false,
            fail_after: None,
            open: false,
        }
    }

    /// Fail `open` with a configuration error.
    pub fn failing_open(mut self) -> Self {
        self.open_fails = true;
        self
    }

    /// Fail every read after `reads` successful ones.
    pub fn disconnect_after(mut self, reads: usize) -> Self {
        self.fail_after = Some(reads);
        self
    }

    pub fn stats(&self) -> Arc<MockStats> {
        Arc::clone(&self.stats)
    }

    /// Handle for changing what `probe` reports later.
    pub fn capability_handle(&self) -> Arc<Mutex<Capability>> {
        Arc::clone(&self.capability)
    }
}

#[async_trait]
impl TelemetrySource for MockSource {
    fn mode(&self) -> DisplayMode {
        self.mode
    }

    fn probe(&self) -> Capability {
        self.capability.lock().unwrap().clone()
    }

    async fn open(&mut self) -> Result<()> {
        self.stats.opens.fetch_add(1, Ordering::SeqCst);
        if self.open_fails {
            return Err(MeterError::config_error("mock configure failed"));
        }
        self.open = true;
        Ok(())
    }

    async fn next_reading(&mut self) -> Result<Reading> {
        let count = self.stats.reads.fetch_add(1, Ordering::SeqCst);
        if self.fail_after.is_some_and(|limit| count >= limit) {
            return Err(MeterError::sensor_error("mock disconnected"));
        }
        Ok(IlluminanceSample::new((count + 1) as f32).into())
    }

    async fn close(&mut self) {
        if self.open {
            self.open = false;
            self.stats.closes.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn is_open(&self) -> bool {
        self.open
    }
}
