//! REST endpoints for on-demand runs and operator checks.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use tracing::{info, warn};

use super::reconciler::Reconciler;
use crate::error::ReconcileError;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub reconciler: Arc<Reconciler>,
}

/// Build the Axum router with health, manual-trigger, and list-check routes.
pub fn sync_routes(reconciler: Arc<Reconciler>) -> Router {
    let state = AppState { reconciler };

    Router::new()
        .route("/health", get(health))
        .route("/api/sync", post(trigger_sync))
        .route("/api/lists", get(board_lists))
        .with_state(state)
}

// ── Health ──────────────────────────────────────────────────────────────

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "service": "due-sort"
    }))
}

// ── Manual trigger ──────────────────────────────────────────────────────

async fn trigger_sync(State(state): State<AppState>) -> Response {
    info!("Manual reconciliation requested");

    match state.reconciler.run().await {
        Ok(result) => (StatusCode::OK, Json(serde_json::json!(result))).into_response(),
        Err(e @ ReconcileError::AlreadyRunning) => (
            StatusCode::CONFLICT,
            Json(serde_json::json!({"error": e.to_string()})),
        )
            .into_response(),
        Err(e @ ReconcileError::ListCards(_)) => {
            warn!("Manual reconciliation failed: {}", e);
            (
                StatusCode::BAD_GATEWAY,
                Json(serde_json::json!({"error": e.to_string()})),
            )
                .into_response()
        }
    }
}

// ── Configuration check ─────────────────────────────────────────────────

async fn board_lists(State(state): State<AppState>) -> Response {
    let mapping = state.reconciler.mapping();

    match state.reconciler.board().list_board_lists().await {
        Ok(lists) => {
            let issues = mapping.check_against(&lists);
            (
                StatusCode::OK,
                Json(serde_json::json!({
                    "lists": lists,
                    "mapping": mapping,
                    "issues": issues,
                })),
            )
                .into_response()
        }
        Err(e) => {
            warn!("Failed to fetch board lists: {}", e);
            (
                StatusCode::BAD_GATEWAY,
                Json(serde_json::json!({"error": e.to_string()})),
            )
                .into_response()
        }
    }
}
