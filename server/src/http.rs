use axum::http::StatusCode;
use axum::routing::get;
use axum::Router;
use std::path::Path;
use tower_http::cors::CorsLayer;
use tower_http::services::{ServeDir, ServeFile};
use tower_http::trace::TraceLayer;

use crate::ws::{ws_handler, AppState};

pub const HEALTH_BODY: &str = "Server is up and running!";

pub async fn health() -> (StatusCode, &'static str) {
    (StatusCode::OK, HEALTH_BODY)
}

/// WebSocket endpoint, liveness probe and, when `static_dir` is set, the
/// front-end bundle with an `index.html` fallback for client-side routes.
pub fn router(app_state: AppState, static_dir: Option<&Path>) -> Router {
    let mut app = Router::new()
        .route("/ws", get(ws_handler))
        .route("/health", get(health));

    if let Some(dir) = static_dir {
        let index = ServeFile::new(dir.join("index.html"));
        app = app.fallback_service(ServeDir::new(dir).fallback(index));
    }

    app.layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(app_state)
}
