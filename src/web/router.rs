//! Web application router and middleware setup.

use crate::web::{handlers, websocket, AppState};
use axum::routing::{get, get_service, post};
use axum::Router;
use std::path::PathBuf;
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    services::ServeDir,
    trace::TraceLayer,
};
use tracing::{info, warn};

/// Create the axum application with all routes and middleware.
pub fn create_app(state: AppState) -> Router {
    let mut app = Router::new()
        .route("/api/reading", get(handlers::get_reading))
        .route("/api/health", get(handlers::health_check))
        .route("/api/permission", post(handlers::permission_response))
        .route("/ws", get(websocket::websocket_handler));

    match state.config.static_path.as_deref().map(PathBuf::from) {
        Some(static_path) if static_path.join("index.html").exists() => {
            info!("Serving static files from: {:?}", static_path);
            app = app
                .nest_service("/static", get_service(ServeDir::new(&static_path)))
                .route("/", get(handlers::serve_index));
        }
        Some(static_path) => {
            warn!(
                "Static path {:?} has no index.html, serving default page",
                static_path
            );
            app = app.route("/", get(handlers::default_index));
        }
        None => {
            app = app.route("/", get(handlers::default_index));
        }
    }

    if state.config.enable_cors {
        app = app.layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        );
    }

    app.layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::display::{DisplayPanel, LifecycleEvent};
    use crate::readings::{DisplayMode, IlluminanceSample};
    use crate::web::WebConfig;
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use tokio::sync::mpsc;
    use tower::ServiceExt;

    fn test_state() -> (AppState, DisplayPanel, mpsc::Receiver<LifecycleEvent>) {
        let panel = DisplayPanel::new(DisplayMode::Illuminance);
        let (tx, rx) = mpsc::channel(8);
        let state = AppState::new(panel.clone(), tx, WebConfig::default());
        (state, panel, rx)
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_reading_endpoint() {
        let (state, panel, _rx) = test_state();
        panel.show_reading(IlluminanceSample::new(450.0).into());

        let response = create_app(state)
            .oneshot(Request::get("/api/reading").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let json = body_json(response).await;
        assert_eq!(json["mode"], "illuminance");
        assert_eq!(json["lines"][0], "Light Intensity: 450.0 lx");
        assert_eq!(json["reading"]["lux"], 450.0);
    }

    #[tokio::test]
    async fn test_health_endpoint() {
        let (state, _panel, _rx) = test_state();

        let response = create_app(state)
            .oneshot(Request::get("/api/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let json = body_json(response).await;
        assert_eq!(json["status"], "ok");
        assert_eq!(json["state"], "inactive");
    }

    #[tokio::test]
    async fn test_permission_endpoint_forwards_event() {
        let (state, _panel, mut rx) = test_state();

        let request = Request::post("/api/permission")
            .header("content-type", "application/json")
            .body(Body::from(r#"{"granted": true}"#))
            .unwrap();
        let response = create_app(state).oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::ACCEPTED);
        assert_eq!(
            rx.recv().await,
            Some(LifecycleEvent::PermissionResponse { granted: true })
        );
    }

    #[tokio::test]
    async fn test_default_index() {
        let (state, _panel, _rx) = test_state();

        let response = create_app(state)
            .oneshot(Request::get("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert!(String::from_utf8_lossy(&bytes).contains("Light Meter"));
    }
}
