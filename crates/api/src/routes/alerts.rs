// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Alert engine endpoints.

use axum::extract::{Path, Query, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};
use sf_alerts::{Alert, AlertId, AlertSummary, RuleInfo};

use crate::error::ApiError;
use crate::state::AppState;

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list).delete(clear))
        .route("/summary", get(summary))
        .route("/rules", get(rules))
        .route("/ack-all", post(ack_all))
        .route("/:id/ack", post(ack))
}

#[derive(Deserialize)]
struct ListQuery {
    severity: Option<String>,
    #[serde(default)]
    unacknowledged: bool,
}

async fn list(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<Alert>>, ApiError> {
    let mut alerts = match &query.severity {
        Some(severity) => {
            let severity = severity
                .parse()
                .map_err(|e: sf_alerts::AlertError| ApiError::Validation(e.to_string()))?;
            state.alerts.alerts_by_severity(severity)
        }
        None => state.alerts.alerts(),
    };
    if query.unacknowledged {
        alerts.retain(|a| !a.acknowledged);
    }
    Ok(Json(alerts))
}

async fn summary(State(state): State<AppState>) -> Json<AlertSummary> {
    Json(state.alerts.summary())
}

async fn rules(State(state): State<AppState>) -> Json<Vec<RuleInfo>> {
    Json(state.alerts.rules())
}

async fn ack(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    if state.alerts.acknowledge(&AlertId::new(id.as_str())) {
        Ok(Json(json!({"acknowledged": true})))
    } else {
        Err(ApiError::NotFound(format!("alert {id}")))
    }
}

async fn ack_all(State(state): State<AppState>) -> Json<Value> {
    state.alerts.acknowledge_all();
    Json(json!({"acknowledged": "all"}))
}

async fn clear(State(state): State<AppState>) -> Json<Value> {
    state.alerts.clear_alerts();
    Json(json!({"cleared": true}))
}
