// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Task manager endpoints.

use axum::extract::{Path, Query, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};
use sf_tasks::{TaskId, TaskRecord, TaskState, TaskType};

use crate::error::ApiError;
use crate::state::AppState;

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list))
        .route("/:id", get(show))
        .route("/:id/cancel", post(cancel))
        .route("/clear-completed", post(clear_completed))
}

#[derive(Deserialize)]
struct ListQuery {
    state: Option<TaskState>,
    #[serde(rename = "type")]
    task_type: Option<TaskType>,
    #[serde(default = "default_limit")]
    limit: usize,
}

fn default_limit() -> usize {
    50
}

async fn list(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Json<Vec<TaskRecord>> {
    Json(state.tasks.list(query.state, query.task_type, query.limit))
}

async fn show(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<TaskRecord>, ApiError> {
    state
        .tasks
        .get(&TaskId::new(id.as_str()))
        .map(Json)
        .ok_or(ApiError::NotFound(format!("task {id}")))
}

async fn cancel(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    let task_id = TaskId::new(id.as_str());
    if state.tasks.get(&task_id).is_none() {
        return Err(ApiError::NotFound(format!("task {id}")));
    }
    Ok(Json(json!({"cancelled": state.tasks.cancel(&task_id)})))
}

async fn clear_completed(State(state): State<AppState>) -> Json<Value> {
    Json(json!({"removed": state.tasks.clear_completed()}))
}
