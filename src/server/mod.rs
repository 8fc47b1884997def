//! HTTP + WebSocket server exposing sessions to browser clients.

pub mod routes;
pub mod ws;

use std::sync::Arc;

use axum::{Router, routing::get};
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

use crate::session::SessionStore;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<SessionStore>,
}

/// Build the Axum router with the session REST routes and the log WebSocket.
pub fn build_router(store: Arc<SessionStore>) -> Router {
    let state = AppState { store };

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/ws/sessions/{id}", get(ws::ws_handler))
        .merge(routes::api_routes())
        .layer(cors)
        .with_state(state)
}

/// Bind `bind:port` and serve until the listener fails.
pub async fn serve(bind: &str, port: u16, store: Arc<SessionStore>) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(format!("{bind}:{port}")).await?;
    info!(addr = %listener.local_addr()?, "Session server listening");
    axum::serve(listener, build_router(store)).await
}
