//! HTTP ingestion: the game client POSTs its state to `/`.

use axum::{
    Json, Router,
    body::Bytes,
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use serde::Deserialize;
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tracing::{debug, info, trace, warn};

use crate::gsi_logic::error::GsiError;
use crate::gsi_logic::model::Snapshot;
use crate::gsi_logic::state::AppState;

pub fn router(app_state: AppState) -> Router {
    Router::new()
        .route("/", post(gsi_handler))
        .route("/health", get(health_handler))
        .route("/status", get(status_handler))
        .with_state(app_state)
}

pub async fn serve(
    listener: TcpListener,
    app_state: AppState,
    mut shutdown: broadcast::Receiver<()>,
) -> std::io::Result<()> {
    axum::serve(listener, router(app_state))
        .with_graceful_shutdown(async move {
            shutdown.recv().await.ok();
            info!("GSI listener shutting down.");
        })
        .await
}

pub async fn run(
    addr: SocketAddr,
    app_state: AppState,
    shutdown: broadcast::Receiver<()>,
) -> std::io::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    info!("GSI listener on http://{}", listener.local_addr()?);
    serve(listener, app_state, shutdown).await
}

async fn gsi_handler(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<StatusCode, GsiError> {
    trace!(payload = %String::from_utf8_lossy(&body), "Received GSI data");

    let snapshot = Snapshot::from_slice(&body).inspect_err(|e| {
        warn!(error = %e, "Rejected GSI payload");
    })?;

    let issued = state
        .submit(&snapshot, snapshot.credential())
        .await
        .inspect_err(|e| warn!(error = %e, "Rejected GSI request"))?;

    debug!(
        id = issued.id,
        cue = ?issued.decision.cue,
        color = %issued.decision.color,
        flash = ?issued.decision.flash,
        "Decision issued"
    );
    Ok(StatusCode::OK)
}

async fn health_handler() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

#[derive(Debug, Deserialize)]
struct StatusQuery {
    #[serde(default)]
    key: String,
}

/// Tracker state is only shown to callers holding the shared secret.
async fn status_handler(
    State(state): State<AppState>,
    Query(query): Query<StatusQuery>,
) -> Result<impl IntoResponse, GsiError> {
    state
        .authorize(&query.key)
        .inspect_err(|e| warn!(error = %e, "Rejected status request"))?;
    Ok(Json(state.status().await))
}
