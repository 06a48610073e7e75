// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Rate limiter endpoints.

use std::time::Duration;

use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};
use sf_limits::{KeyStats, RateLimit, RateLimitResult};

use crate::error::ApiError;
use crate::state::AppState;

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list))
        .route("/:key", get(stats).put(set_limit).delete(remove_limit))
        .route("/:key/check", post(check))
        .route("/:key/reset", post(reset))
}

async fn list(State(state): State<AppState>) -> Json<Vec<KeyStats>> {
    Json(state.limiter.all_stats())
}

async fn stats(State(state): State<AppState>, Path(key): Path<String>) -> Json<KeyStats> {
    Json(state.limiter.stats(&key))
}

#[derive(Deserialize)]
struct LimitBody {
    requests: u32,
    window_secs: f64,
    #[serde(default)]
    burst: u32,
    #[serde(default)]
    algorithm: Option<String>,
}

async fn set_limit(
    State(state): State<AppState>,
    Path(key): Path<String>,
    Json(body): Json<LimitBody>,
) -> Result<Json<Value>, ApiError> {
    if !body.window_secs.is_finite() || body.window_secs < 0.0 {
        return Err(ApiError::Validation("window_secs must be non-negative".into()));
    }
    let mut limit = RateLimit::new(body.requests, Duration::from_secs_f64(body.window_secs))
        .with_burst(body.burst);
    if let Some(algorithm) = &body.algorithm {
        limit = limit.with_algorithm(
            algorithm
                .parse()
                .map_err(|e: sf_limits::UnknownAlgorithm| ApiError::Validation(e.to_string()))?,
        );
    }
    state.limiter.set_limit(key.as_str(), limit);
    Ok(Json(json!({"key": key, "configured": true})))
}

async fn remove_limit(State(state): State<AppState>, Path(key): Path<String>) -> Json<Value> {
    Json(json!({"removed": state.limiter.remove_limit(&key)}))
}

/// Consume one request for the key; 429 with retry-after when denied.
async fn check(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<RateLimitResult>, ApiError> {
    let result = state.limiter.check(&key);
    if result.allowed {
        Ok(Json(result))
    } else {
        Err(ApiError::RateLimited(result))
    }
}

async fn reset(State(state): State<AppState>, Path(key): Path<String>) -> Json<Value> {
    state.limiter.reset(&key);
    Json(json!({"key": key, "reset": true}))
}
