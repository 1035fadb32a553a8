//! # HTTP Server
//!
//! Serves Prometheus metrics and the liveness/readiness probes.

use crate::observability::metrics;
use anyhow::Result;
use axum::{http::StatusCode, response::IntoResponse, routing::get, Router};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::info;

/// Shared server state for the readiness probe
pub struct ServerState {
    pub is_ready: AtomicBool,
}

impl ServerState {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            is_ready: AtomicBool::new(false),
        })
    }
}

/// Starts the HTTP server and marks the state ready once bound
pub async fn start_server(port: u16, state: Arc<ServerState>) -> Result<()> {
    let app = Router::new()
        .route("/metrics", get(metrics_handler))
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        .with_state(state.clone());

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr).await?;

    info!(%addr, "HTTP server listening");
    state.is_ready.store(true, Ordering::Relaxed);

    axum::serve(listener, app).await?;
    Ok(())
}

async fn metrics_handler() -> impl IntoResponse {
    match metrics::gather() {
        Ok(body) => (StatusCode::OK, body),
        Err(err) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("failed to gather metrics: {err}"),
        ),
    }
}

async fn healthz() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}

async fn readyz(
    axum::extract::State(state): axum::extract::State<Arc<ServerState>>,
) -> impl IntoResponse {
    if state.is_ready.load(Ordering::Relaxed) {
        (StatusCode::OK, "ready")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "not ready")
    }
}
