//! WebSocket viewers: each connected viewer keeps the display visible.

use crate::display::{DisplayFrame, LifecycleEvent};
use crate::web::AppState;
use axum::extract::ws::{Message, WebSocket};
use axum::extract::{State, WebSocketUpgrade};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use futures_util::{SinkExt, StreamExt};
use std::collections::HashMap;
use std::time::SystemTime;
use tokio::sync::{mpsc, RwLock};
use tokio_stream::wrappers::WatchStream;
use tracing::{debug, error, info, warn};

#[derive(Debug)]
struct Viewer {
    id: String,
    connected_at: SystemTime,
}

/// Tracks connected viewers and turns presence into visibility events.
///
/// The first viewer makes the display visible; the last one leaving hides it.
#[derive(Debug)]
pub struct ViewerRegistry {
    viewers: RwLock<HashMap<String, Viewer>>,
    events: mpsc::Sender<LifecycleEvent>,
    max_viewers: usize,
}

impl ViewerRegistry {
    pub fn new(events: mpsc::Sender<LifecycleEvent>, max_viewers: usize) -> Self {
        Self {
            viewers: RwLock::new(HashMap::new()),
            events,
            max_viewers,
        }
    }

    /// Register a viewer. Returns `None` when the viewer limit is reached.
    ///
    /// Visibility events are sent while the registry is locked so that their
    /// order always matches the order of joins and leaves.
    pub async fn join(&self) -> Option<String> {
        let id = uuid::Uuid::new_v4().to_string();
        let mut viewers = self.viewers.write().await;
        if viewers.len() >= self.max_viewers {
            return None;
        }
        viewers.insert(
            id.clone(),
            Viewer {
                id: id.clone(),
                connected_at: SystemTime::now(),
            },
        );

        if viewers.len() == 1 {
            self.notify(LifecycleEvent::Visible).await;
        }
        Some(id)
    }

    /// Unregister a viewer.
    pub async fn leave(&self, id: &str) {
        let mut viewers = self.viewers.write().await;
        if viewers.remove(id).is_some() && viewers.is_empty() {
            self.notify(LifecycleEvent::Hidden).await;
        }
    }

    pub async fn count(&self) -> usize {
        self.viewers.read().await.len()
    }

    /// Describe connected viewers for the health endpoint.
    pub async fn describe(&self) -> Vec<serde_json::Value> {
        let viewers = self.viewers.read().await;
        viewers
            .values()
            .map(|viewer| {
                serde_json::json!({
                    "id": viewer.id,
                    "connected_seconds": viewer.connected_at.elapsed().unwrap_or_default().as_secs(),
                })
            })
            .collect()
    }

    async fn notify(&self, event: LifecycleEvent) {
        if let Err(e) = self.events.send(event).await {
            warn!("Lifecycle driver is gone, dropped {:?}: {}", e.0, e);
        }
    }
}

/// WebSocket upgrade handler.
pub async fn websocket_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    let Some(viewer_id) = state.viewers.join().await else {
        warn!("Rejecting viewer: limit of {} reached", state.config.max_viewers);
        return (StatusCode::SERVICE_UNAVAILABLE, "Too many viewers").into_response();
    };

    let registry = state.viewers.clone();
    let failed_id = viewer_id.clone();
    ws.on_failed_upgrade(move |e| {
        warn!("WebSocket upgrade failed for viewer {}: {}", failed_id, e);
        tokio::spawn(async move { registry.leave(&failed_id).await });
    })
    .on_upgrade(move |socket| handle_websocket(socket, state, viewer_id))
}

/// Stream panel frames to one viewer until either side goes away.
async fn handle_websocket(socket: WebSocket, state: AppState, viewer_id: String) {
    info!("Viewer connected: {}", viewer_id);

    let (mut sender, mut receiver) = socket.split();
    let mut frames = WatchStream::new(state.panel.subscribe());

    let viewer_recv = viewer_id.clone();
    let mut recv_task = tokio::spawn(async move {
        while let Some(msg) = receiver.next().await {
            match msg {
                Ok(Message::Close(_)) => break,
                Ok(other) => debug!("Ignoring message from {}: {:?}", viewer_recv, other),
                Err(e) => {
                    warn!("WebSocket error for viewer {}: {}", viewer_recv, e);
                    break;
                }
            }
        }
    });

    let viewer_send = viewer_id.clone();
    let mut send_task = tokio::spawn(async move {
        // Yields the current frame first, then every change.
        while let Some(frame) = frames.next().await {
            if let Err(e) = send_frame(&mut sender, &frame).await {
                warn!("Failed to send frame to {}: {}", viewer_send, e);
                break;
            }
        }
    });

    tokio::select! {
        _ = &mut recv_task => {
            debug!("Receive task completed for viewer {}", viewer_id);
            send_task.abort();
        }
        _ = &mut send_task => {
            debug!("Send task completed for viewer {}", viewer_id);
            recv_task.abort();
        }
    }

    state.viewers.leave(&viewer_id).await;
    info!("Viewer disconnected: {}", viewer_id);
}

async fn send_frame<S>(sender: &mut S, frame: &DisplayFrame) -> Result<(), axum::Error>
where
    S: futures_util::Sink<Message, Error = axum::Error> + Unpin,
{
    match serde_json::to_string(frame) {
        Ok(json) => sender.send(Message::Text(json)).await,
        Err(e) => {
            error!("Failed to serialize frame: {}", e);
            Ok(())
        }
    }
}
