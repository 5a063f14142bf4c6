//! HTTP API.
//!
//! Serves `GET /`, `GET /health`, and `POST /v1/ask` (also reachable as
//! `POST /ask`) over axum.

mod router;
mod schema;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::net::TcpListener;
use tracing::{info, warn};

use crate::answerer::QuestionAnswerer;

pub use router::build_router;
pub use schema::{AskRequest, AskResponse, ErrorResponse};

/// Shared state handed to every request handler.
#[derive(Clone)]
pub struct AppState {
    answerer: Arc<QuestionAnswerer>,
}

impl AppState {
    /// Creates state around an answerer built at startup.
    pub fn new(answerer: QuestionAnswerer) -> Self {
        Self {
            answerer: Arc::new(answerer),
        }
    }

    /// Returns the answerer.
    pub fn answerer(&self) -> &QuestionAnswerer {
        &self.answerer
    }
}

/// Binds `addr` and serves the API until Ctrl-C.
pub async fn serve(addr: SocketAddr, state: AppState) -> Result<()> {
    let model = state.answerer().model().to_string();
    let app = build_router(state);

    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    let local_addr = listener.local_addr().context("Failed to read bound address")?;
    info!(%local_addr, %model, "TerraNaut QnA API listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server failed")?;

    info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(?err, "failed to listen for Ctrl-C; shutting down");
    }
    info!("shutdown signal received");
}
