// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Event bus introspection endpoints.

use axum::extract::{Query, State};
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::state::AppState;

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/metrics", get(metrics))
        .route("/circuit", get(circuit))
        .route("/dlq", get(dlq_peek))
        .route("/dlq/replay", post(dlq_replay))
        .route("/dlq/clear", delete(dlq_clear))
}

async fn health(State(state): State<AppState>) -> Json<Value> {
    let report = state.bus.health_check();
    Json(json!(report))
}

async fn metrics(State(state): State<AppState>) -> Json<Value> {
    Json(json!(state.bus.metrics()))
}

async fn circuit(State(state): State<AppState>) -> Json<Value> {
    Json(json!(state.bus.circuit().snapshot()))
}

#[derive(Deserialize)]
struct PeekQuery {
    #[serde(default = "default_peek")]
    limit: usize,
}

fn default_peek() -> usize {
    10
}

async fn dlq_peek(State(state): State<AppState>, Query(query): Query<PeekQuery>) -> Json<Value> {
    Json(json!({
        "size": state.bus.dlq().len(),
        "total_added": state.bus.dlq().total_added(),
        "entries": state.bus.dlq().peek(query.limit),
    }))
}

async fn dlq_replay(State(state): State<AppState>) -> Json<Value> {
    let replayed = state.bus.replay_dlq().await;
    Json(json!({"replayed": replayed}))
}

async fn dlq_clear(State(state): State<AppState>) -> Json<Value> {
    Json(json!({"cleared": state.bus.dlq().clear()}))
}
