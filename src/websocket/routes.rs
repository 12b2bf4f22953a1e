use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::get;
use axum::Json;
use std::sync::Arc;

use crate::server::ArenaServer;

use super::handler::websocket_handler;

/// Create the Axum router: WebSocket endpoint plus health surfaces.
pub fn create_router(cors_origins: &str) -> axum::Router<Arc<ArenaServer>> {
    use tower_http::cors::{Any, CorsLayer};
    use tower_http::trace::TraceLayer;

    let cors = if cors_origins == "*" || cors_origins.trim().is_empty() {
        CorsLayer::permissive()
    } else {
        let origins: Vec<_> = cors_origins
            .split(',')
            .filter_map(|s| s.trim().parse::<axum::http::HeaderValue>().ok())
            .collect();

        if origins.is_empty() {
            tracing::warn!("No valid CORS origins configured, using permissive CORS");
            CorsLayer::permissive()
        } else {
            CorsLayer::new()
                .allow_origin(origins)
                .allow_methods(Any)
                .allow_headers(Any)
        }
    };

    axum::Router::new()
        .route("/ws", get(websocket_handler))
        .route("/health", get(health))
        .route("/status", get(status))
        .route("/", get(status))
        .fallback(not_found)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

async fn health(State(server): State<Arc<ArenaServer>>) -> Json<serde_json::Value> {
    Json(server.health_payload().await)
}

async fn status(State(server): State<Arc<ArenaServer>>) -> Json<serde_json::Value> {
    Json(server.status_payload())
}

async fn not_found() -> (StatusCode, &'static str) {
    (StatusCode::NOT_FOUND, "not found")
}
