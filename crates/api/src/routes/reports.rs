// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Report store endpoints.

use axum::extract::{Path, Query, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};
use sf_store::{CacheStats, ReportFilters, ReportId, ReportRecord};

use crate::error::ApiError;
use crate::state::AppState;

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list))
        .route("/:id", get(show).delete(remove))
        .route("/cache/stats", get(cache_stats))
        .route("/cleanup", post(cleanup))
}

#[derive(Deserialize)]
struct ListQuery {
    scan_id: Option<String>,
    status: Option<String>,
    #[serde(default = "default_limit")]
    limit: usize,
    #[serde(default)]
    offset: usize,
}

fn default_limit() -> usize {
    50
}

async fn list(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<ReportRecord>>, ApiError> {
    let filters = ReportFilters {
        scan_id: query.scan_id,
        status: query.status,
    };
    let reports = state.reports.list(&filters, query.limit, query.offset).await?;
    Ok(Json(reports))
}

async fn show(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ReportRecord>, ApiError> {
    state
        .reports
        .get(&ReportId::new(id.as_str()))
        .await?
        .map(Json)
        .ok_or(ApiError::NotFound(format!("report {id}")))
}

async fn remove(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    if state.reports.delete(&ReportId::new(id.as_str())).await? {
        Ok(Json(json!({"removed": true})))
    } else {
        Err(ApiError::NotFound(format!("report {id}")))
    }
}

async fn cache_stats(State(state): State<AppState>) -> Json<CacheStats> {
    Json(state.reports.cache_stats())
}

#[derive(Deserialize)]
struct CleanupQuery {
    max_age_days: Option<u32>,
}

async fn cleanup(
    State(state): State<AppState>,
    Query(query): Query<CleanupQuery>,
) -> Result<Json<Value>, ApiError> {
    let removed = match query.max_age_days {
        Some(days) => state.reports.cleanup_old(days).await?,
        None => state.reports.cleanup().await?,
    };
    Ok(Json(json!({"removed": removed})))
}
