use super::AppState;
use crate::committee::schema::Decision;
use crate::executor::execute_trades;
use crate::market::Quote;
use crate::store::insights::InsightStatus;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;
use std::collections::HashMap;

pub async fn health_check() -> &'static str {
    "ok"
}

#[derive(Serialize)]
pub struct StatsResponse {
    market: crate::workers::supervisor::WorkerStats,
    dream: crate::workers::supervisor::WorkerStats,
    think: crate::workers::supervisor::WorkerStats,
    llm_budget: crate::llm::budget::BudgetStats,
    snapshot_count: i64,
}

pub async fn get_stats(State(state): State<AppState>) -> Result<Json<StatsResponse>, StatusCode> {
    let snapshot_count = state.store.snapshot_count().await.map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
    Ok(Json(StatsResponse {
        market: state.workers.stats_for("market").unwrap_or_default(),
        dream: state.workers.stats_for("dream").unwrap_or_default(),
        think: state.workers.stats_for("think").unwrap_or_default(),
        llm_budget: state.adapter.budget().stats(),
        snapshot_count,
    }))
}

pub async fn get_latest_snapshot(
    State(state): State<AppState>,
) -> Result<Json<crate::store::snapshots::Snapshot>, StatusCode> {
    match state.store.latest_snapshot().await {
        Ok(Some(snapshot)) => Ok(Json(snapshot)),
        Ok(None) => Err(StatusCode::NOT_FOUND),
        Err(_) => Err(StatusCode::INTERNAL_SERVER_ERROR),
    }
}

#[derive(Serialize)]
pub struct NodeDetail {
    node: crate::store::nodes::Node,
    edges: Vec<crate::store::edges::Edge>,
}

pub async fn get_node(
    State(state): State<AppState>,
    Path(node_id): Path<String>,
) -> Result<Json<NodeDetail>, StatusCode> {
    let node = state.store.get_node(&node_id).await.map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
    let Some(node) = node else { return Err(StatusCode::NOT_FOUND) };
    let edges = state.store.edges_of_node(&node_id).await.map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
    Ok(Json(NodeDetail { node, edges }))
}

#[derive(Serialize)]
pub struct EdgeDetail {
    edge: crate::store::edges::Edge,
    channels: HashMap<String, f64>,
}

pub async fn get_edge(
    State(state): State<AppState>,
    Path(edge_id): Path<i64>,
) -> Result<Json<EdgeDetail>, StatusCode> {
    let edge = state.store.get_edge(edge_id).await.map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
    let Some(edge) = edge else { return Err(StatusCode::NOT_FOUND) };
    let channels = state.store.get_edge_channels(edge_id).await.map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
    Ok(Json(EdgeDetail { edge, channels }))
}

pub async fn post_worker_start(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> StatusCode {
    let started = state.workers.start_named(&name, state.store.clone(), state.cfg.clone(), state.adapter.clone());
    if started {
        StatusCode::OK
    } else {
        StatusCode::NOT_FOUND
    }
}

pub async fn post_worker_stop(State(state): State<AppState>, Path(name): Path<String>) -> StatusCode {
    if state.workers.stop_named(&name) {
        StatusCode::OK
    } else {
        StatusCode::NOT_FOUND
    }
}

pub async fn post_worker_step(State(state): State<AppState>, Path(name): Path<String>) -> StatusCode {
    match state.workers.step_named(&name, &state.store, &state.cfg, &state.adapter).await {
        Some(Ok(())) => StatusCode::OK,
        Some(Err(_)) => StatusCode::INTERNAL_SERVER_ERROR,
        None => StatusCode::NOT_FOUND,
    }
}

/// Re-runs execution for a `new`/`queued` insight under the same guard rails used by
/// the Think worker, then transitions its status to `applied`. A second apply on an
/// already-applied insight is rejected.
pub async fn post_approve_insight(
    State(state): State<AppState>,
    Path(insight_id): Path<i64>,
) -> Result<Json<crate::executor::ExecutionResult>, StatusCode> {
    let Some(insight) = state.store.get_insight(insight_id).await.map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)? else {
        return Err(StatusCode::NOT_FOUND);
    };
    if insight.status == InsightStatus::Applied.as_str() {
        return Err(StatusCode::CONFLICT);
    }

    let decisions: Vec<Decision> =
        serde_json::from_str(&insight.decisions_json).map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
    let prices: HashMap<String, Quote> = match insight.evidence_snapshot_id {
        Some(_) => state
            .store
            .latest_snapshot()
            .await
            .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?
            .map(|s| serde_json::from_str(&s.prices_json).unwrap_or_default())
            .unwrap_or_default(),
        None => HashMap::new(),
    };

    let result = execute_trades(&state.store, &state.cfg, &decisions, &prices, "api approve", insight_id)
        .await
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
    state
        .store
        .set_insight_status(insight_id, InsightStatus::Applied)
        .await
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    Ok(Json(result))
}
