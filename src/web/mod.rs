//! Web display surface for the light meter.
//!
//! The page at `/` shows the panel's text and updates over a WebSocket.
//! The display counts as visible while at least one viewer is connected, so
//! the hardware is only held while someone is watching.

pub mod config;
pub mod handlers;
pub mod router;
pub mod websocket;

// Re-export commonly used items
pub use config::WebConfig;
pub use router::create_app;
pub use websocket::ViewerRegistry;

use crate::display::{run_lifecycle, DisplayPanel, LifecycleEvent, Meter};
use crate::error::{MeterError, Result};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tracing::{error, info};

/// Shared state handed to every handler.
#[derive(Debug, Clone)]
pub struct AppState {
    pub panel: DisplayPanel,
    pub events: mpsc::Sender<LifecycleEvent>,
    pub viewers: Arc<ViewerRegistry>,
    pub config: WebConfig,
}

impl AppState {
    pub fn new(panel: DisplayPanel, events: mpsc::Sender<LifecycleEvent>, config: WebConfig) -> Self {
        let viewers = Arc::new(ViewerRegistry::new(events.clone(), config.max_viewers));
        Self {
            panel,
            events,
            viewers,
            config,
        }
    }
}

/// Serve the web display for `meter` until Ctrl-C, then release the hardware.
pub async fn start_web_server(config: WebConfig, meter: Meter) -> Result<()> {
    let addr = config
        .bind_address()
        .parse::<SocketAddr>()
        .map_err(|e| MeterError::config_error(format!("Invalid bind address: {}", e)))?;

    let (events_tx, events_rx) = mpsc::channel(32);
    let (stop_tx, stop_rx) = oneshot::channel::<()>();
    let state = AppState::new(meter.panel(), events_tx, config);
    let driver = tokio::spawn(run_lifecycle(meter, events_rx, async move {
        let _ = stop_rx.await;
    }));

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| MeterError::web_server_error(format!("Failed to bind to address: {}", e)))?;

    info!("Starting light meter web server on http://{}", addr);
    info!("Display available at http://{}/", addr);
    info!("API endpoint: http://{}/api/reading", addr);
    info!("WebSocket endpoint: ws://{}/ws", addr);

    let served = axum::serve(listener, create_app(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| MeterError::web_server_error(format!("Server error: {}", e)));

    let _ = stop_tx.send(());
    if let Err(e) = driver.await {
        error!("Lifecycle driver failed: {}", e);
    }
    served
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutting down web server");
}
