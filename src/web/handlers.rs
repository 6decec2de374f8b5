//! HTTP handlers for API endpoints.

use crate::display::{DisplayFrame, LifecycleEvent};
use crate::web::AppState;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{Html, Json};
use serde::Deserialize;
use serde_json::json;
use std::path::Path;
use tracing::{error, info};

/// Latest displayed frame as JSON.
pub async fn get_reading(State(state): State<AppState>) -> Json<DisplayFrame> {
    Json(state.panel.current())
}

/// Health check endpoint.
pub async fn health_check(State(state): State<AppState>) -> Json<serde_json::Value> {
    let frame = state.panel.current();
    Json(json!({
        "status": "ok",
        "service": "light-meter",
        "version": env!("CARGO_PKG_VERSION"),
        "mode": frame.mode,
        "state": frame.state,
        "viewers": state.viewers.describe().await,
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

/// Body of `POST /api/permission`.
#[derive(Debug, Deserialize)]
pub struct PermissionAnswer {
    pub granted: bool,
}

/// The user answered the hardware permission prompt.
pub async fn permission_response(
    State(state): State<AppState>,
    Json(body): Json<PermissionAnswer>,
) -> StatusCode {
    info!("Permission response received: granted={}", body.granted);
    match state
        .events
        .send(LifecycleEvent::PermissionResponse {
            granted: body.granted,
        })
        .await
    {
        Ok(()) => StatusCode::ACCEPTED,
        Err(e) => {
            error!("Lifecycle driver is gone: {}", e);
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}

/// Serve `index.html` from the configured static directory.
pub async fn serve_index(State(state): State<AppState>) -> Result<Html<String>, StatusCode> {
    let Some(static_path) = &state.config.static_path else {
        return Ok(Html(DEFAULT_INDEX_HTML.to_string()));
    };

    match tokio::fs::read_to_string(Path::new(static_path).join("index.html")).await {
        Ok(content) => Ok(Html(content)),
        Err(e) => {
            error!("Failed to read index.html: {}", e);
            Err(StatusCode::NOT_FOUND)
        }
    }
}

/// Built-in page used when no static directory is configured.
pub async fn default_index() -> Html<&'static str> {
    Html(DEFAULT_INDEX_HTML)
}

const DEFAULT_INDEX_HTML: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>Light Meter</title>
    <style>
        body {
            font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif;
            background: #111;
            color: #eee;
            display: flex;
            align-items: center;
            justify-content: center;
            min-height: 100vh;
            margin: 0;
        }
        #lines p {
            font-size: 2rem;
            margin: 0.5rem 0;
        }
        #status {
            color: #888;
            font-size: 0.9rem;
        }
        button {
            display: none;
            margin-top: 1rem;
        }
    </style>
</head>
<body>
    <main>
        <div id="lines"><p>Connecting...</p></div>
        <div id="status"></div>
        <button id="grant">I granted access, try again</button>
    </main>
    <script>
        const lines = document.getElementById('lines');
        const status = document.getElementById('status');
        const grant = document.getElementById('grant');

        grant.addEventListener('click', () => {
            fetch('/api/permission', {
                method: 'POST',
                headers: { 'Content-Type': 'application/json' },
                body: JSON.stringify({ granted: true })
            });
        });

        function connect() {
            const proto = location.protocol === 'https:' ? 'wss' : 'ws';
            const ws = new WebSocket(`${proto}://${location.host}/ws`);

            ws.onmessage = (event) => {
                const frame = JSON.parse(event.data);
                lines.replaceChildren(...frame.lines.map((text) => {
                    const p = document.createElement('p');
                    p.textContent = text;
                    return p;
                }));
                status.textContent = `${frame.mode} · ${frame.state}`;
                grant.style.display = frame.lines.some((l) => l.includes('permission')) ? 'block' : 'none';
            };
            ws.onclose = () => {
                status.textContent = 'disconnected, retrying...';
                setTimeout(connect, 2000);
            };
        }

        connect();
    </script>
</body>
</html>
"#;
