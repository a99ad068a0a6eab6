use axum::routing::{get, post};
use axum::{middleware, Json, Router};
use serde_json::{json, Value};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::auth::require_auth;
use crate::handlers::{cycles, fystack, proposals};
use crate::state::AppState;

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

/// Build the full router. Everything under `/api` requires a bearer
/// token except the provider webhook, which stays open.
pub fn router(state: AppState) -> Router {
    let protected = Router::new()
        .route(
            "/workspaces/:workspace_id/proposals",
            get(proposals::list),
        )
        .route("/proposals", post(proposals::create))
        .route("/proposals/:proposal_id", get(proposals::detail))
        .route("/proposals/:proposal_id/submit", post(proposals::submit))
        .route("/proposals/:proposal_id/approve", post(proposals::approve))
        .route("/proposals/:proposal_id/reject", post(proposals::reject))
        .route(
            "/workspaces/:workspace_id/cycles",
            get(cycles::list).post(cycles::create),
        )
        .route("/fystack/assets", get(fystack::assets))
        .route("/fystack/wallets", get(fystack::wallets))
        .route(
            "/fystack/wallets/:wallet_id/creation-status",
            get(fystack::wallet_creation_status),
        )
        .route("/fystack/networks", get(fystack::networks))
        .route("/fystack/workspace-stats", get(fystack::workspace_stats))
        .route(
            "/fystack/withdrawals/:withdrawal_id",
            get(fystack::withdrawal),
        )
        .route(
            "/fystack/workspaces/:workspace_id/wallets",
            post(fystack::create_wallet),
        )
        .layer(middleware::from_fn_with_state(state.clone(), require_auth));

    let open = Router::new().route("/fystack/webhook", post(fystack::webhook));

    Router::new()
        .route("/health", get(health))
        .nest("/api", protected.merge(open))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
