//! Axum route table: the WebSocket upgrade, the download gateway, and
//! the health endpoint, wired with `tower-http`'s tracing/CORS layers
//! the way the rest of the pack uses `tower-http` (e.g. ZHTP's HTTP
//! gateway).

use axum::routing::get;
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::download::download_content;
use crate::health::health;
use crate::socket::ws_handler;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/ws", get(ws_handler))
        .route("/api/download/{content_id}", get(download_content))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
