//! Display state: the text panel and the lifecycle that feeds it.

pub mod lifecycle;
pub mod panel;

// Re-export commonly used items
pub use lifecycle::{run_lifecycle, Activation, LifecycleEvent, Meter, Subscription};
pub use panel::{DisplayFrame, DisplayPanel, DisplayState};
