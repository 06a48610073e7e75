// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! API error mapping.
//!
//! Callers see validation, authorization, and rate-limit errors
//! directly; transport failures surface as a "not delivered" outcome
//! from the core, never as a 5xx from here.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use sf_limits::RateLimitResult;
use thiserror::Error;

/// Errors a handler can surface to the HTTP client.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("not found: {0}")]
    NotFound(String),
    #[error("invalid request: {0}")]
    Validation(String),
    #[error("authentication required")]
    Unauthenticated,
    #[error("forbidden: {0}")]
    Denied(String),
    #[error("rate limited")]
    RateLimited(RateLimitResult),
    #[error("storage error: {0}")]
    Storage(String),
}

impl From<sf_store::StoreError> for ApiError {
    fn from(e: sf_store::StoreError) -> Self {
        ApiError::Storage(e.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::NotFound(what) => (
                StatusCode::NOT_FOUND,
                Json(json!({"error": format!("not found: {what}")})),
            )
                .into_response(),
            ApiError::Validation(message) => (
                StatusCode::BAD_REQUEST,
                Json(json!({"error": message})),
            )
                .into_response(),
            ApiError::Unauthenticated => (
                StatusCode::UNAUTHORIZED,
                Json(json!({"error": "authentication required"})),
            )
                .into_response(),
            ApiError::Denied(reason) => (
                StatusCode::FORBIDDEN,
                Json(json!({"error": reason})),
            )
                .into_response(),
            ApiError::RateLimited(result) => (
                StatusCode::TOO_MANY_REQUESTS,
                Json(json!({
                    "error": "rate limited",
                    "limit": result.limit,
                    "window_secs": result.window.as_secs_f64(),
                    "retry_after_secs": result.retry_after.as_secs_f64(),
                })),
            )
                .into_response(),
            ApiError::Storage(message) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({"error": message})),
            )
                .into_response(),
        }
    }
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
