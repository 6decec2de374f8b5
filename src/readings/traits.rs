//! Traits for telemetry sources.

use crate::error::Result;
use crate::readings::data::{Capability, DisplayMode, Reading};
use async_trait::async_trait;

/// A piece of hardware the meter can subscribe to.
///
/// Implementations hold at most one hardware handle, acquired by [`open`]
/// and released by [`close`]. The meter guarantees `next_reading` is only
/// called between the two.
///
/// [`open`]: TelemetrySource::open
/// [`close`]: TelemetrySource::close
#[async_trait]
pub trait TelemetrySource: Send {
    /// The display mode this source feeds.
    fn mode(&self) -> DisplayMode;

    /// Query whether the hardware exists and may be accessed.
    ///
    /// This never acquires the hardware.
    fn probe(&self) -> Capability;

    /// Acquire the hardware handle.
    async fn open(&mut self) -> Result<()>;

    /// Take one reading from the open hardware.
    async fn next_reading(&mut self) -> Result<Reading>;

    /// Release the hardware handle. Closing a closed source is a no-op.
    async fn close(&mut self);

    /// Whether a hardware handle is currently held.
    fn is_open(&self) -> bool;
}
