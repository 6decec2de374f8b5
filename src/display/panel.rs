//! The text panel: the latest frame shown to the user.

use crate::readings::{DisplayMode, Reading};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::watch;

/// Whether the meter currently holds its hardware.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DisplayState {
    Inactive,
    Active,
}

/// Everything the display shows at one moment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DisplayFrame {
    /// Which reader feeds this display
    pub mode: DisplayMode,
    /// Lifecycle state when the frame was produced
    pub state: DisplayState,
    /// When the frame was produced (Unix timestamp in milliseconds)
    pub timestamp: u64,
    /// Text lines, top to bottom
    pub lines: Vec<String>,
    /// The reading behind the lines, if the frame shows one
    pub reading: Option<Reading>,
}

impl DisplayFrame {
    fn blank(mode: DisplayMode) -> Self {
        Self {
            mode,
            state: DisplayState::Inactive,
            timestamp: now_millis(),
            lines: Vec::new(),
            reading: None,
        }
    }
}

/// Cloneable handle to the displayed frame.
///
/// Every update replaces the whole frame; subscribers see the latest one
/// and may skip intermediate frames.
#[derive(Debug, Clone)]
pub struct DisplayPanel {
    tx: Arc<watch::Sender<DisplayFrame>>,
}

impl DisplayPanel {
    pub fn new(mode: DisplayMode) -> Self {
        let (tx, _rx) = watch::channel(DisplayFrame::blank(mode));
        Self { tx: Arc::new(tx) }
    }

    /// Replace the displayed text with the labels of `reading`.
    pub fn show_reading(&self, reading: Reading) {
        let lines = reading.labels();
        self.tx.send_modify(|frame| {
            frame.timestamp = now_millis();
            frame.lines = lines;
            frame.reading = Some(reading);
        });
    }

    /// Replace the displayed text with a fixed message.
    pub fn show_message(&self, message: impl Into<String>) {
        let message = message.into();
        self.tx.send_modify(|frame| {
            frame.timestamp = now_millis();
            frame.lines = vec![message];
            frame.reading = None;
        });
    }

    pub(crate) fn set_state(&self, state: DisplayState) {
        self.tx.send_if_modified(|frame| {
            if frame.state == state {
                return false;
            }
            frame.state = state;
            true
        });
    }

    /// The frame currently displayed.
    pub fn current(&self) -> DisplayFrame {
        self.tx.borrow().clone()
    }

    /// Receive every subsequent frame change.
    pub fn subscribe(&self) -> watch::Receiver<DisplayFrame> {
        self.tx.subscribe()
    }
}

fn now_millis() -> u64 {
    chrono::Utc::now().timestamp_millis().max(0) as u64
}
