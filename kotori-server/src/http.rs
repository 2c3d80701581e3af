//! Health/status HTTP surface.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use tracing::info;

use kotori_core::services::{MessageService, StatusSnapshot};

#[derive(Clone)]
pub struct AppState {
    pub service: Arc<MessageService>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/status", get(status))
        .with_state(state)
}

async fn healthz() -> &'static str {
    "ok"
}

async fn status(State(state): State<AppState>) -> Json<StatusSnapshot> {
    Json(state.service.status())
}

pub async fn serve(addr: SocketAddr, state: AppState) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Status server listening on {addr}");
    axum::serve(listener, router(state)).await
}
