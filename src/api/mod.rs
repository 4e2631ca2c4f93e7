//! Internal stats/control API surface for the UI collaborator: idempotent
//! GET views over the store plus a handful of mutating POST endpoints for worker
//! lifecycle control and insight approval. No auth — this surface is internal-only.

mod handlers;

use crate::config::Config;
use crate::llm::LlmAdapter;
use crate::store::Store;
use crate::workers::Workers;
use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

#[derive(Clone)]
pub struct AppState {
    pub store: Store,
    pub cfg: Arc<Config>,
    pub adapter: Arc<LlmAdapter>,
    pub workers: Arc<Workers>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health_check))
        .route("/api/stats", get(handlers::get_stats))
        .route("/api/snapshot/latest", get(handlers::get_latest_snapshot))
        .route("/api/nodes/:node_id", get(handlers::get_node))
        .route("/api/edges/:edge_id", get(handlers::get_edge))
        .route("/api/workers/:name/start", post(handlers::post_worker_start))
        .route("/api/workers/:name/stop", post(handlers::post_worker_stop))
        .route("/api/workers/:name/step", post(handlers::post_worker_step))
        .route("/api/insights/:insight_id/approve", post(handlers::post_approve_insight))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
