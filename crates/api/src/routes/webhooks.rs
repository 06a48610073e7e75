// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Webhook registry and delivery-history endpoints.

use std::collections::HashMap;
use std::time::Duration;

use axum::extract::{Path, Query, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{json, Value};
use sf_webhooks::{
    DeliveryRecord, NotificationStats, RedactedWebhook, WebhookConfig, WebhookId,
};

use crate::auth::Identity;
use crate::error::ApiError;
use crate::state::AppState;

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list).post(create))
        .route("/:id", get(show).delete(remove))
        .route("/:id/test", post(test))
        .route("/:id/deliveries", get(deliveries))
}

pub(crate) fn notifications_router() -> Router<AppState> {
    Router::new()
        .route("/stats", get(stats))
        .route("/deliveries", get(all_deliveries))
}

async fn list(State(state): State<AppState>) -> Json<Vec<RedactedWebhook>> {
    let mut webhooks: Vec<RedactedWebhook> = state
        .notifications
        .list_webhooks()
        .iter()
        .map(WebhookConfig::redacted)
        .collect();
    webhooks.sort_by(|a, b| a.url.cmp(&b.url));
    Json(webhooks)
}

#[derive(Deserialize)]
struct CreateWebhook {
    url: String,
    #[serde(default)]
    secret: String,
    #[serde(default)]
    event_types: Vec<String>,
    #[serde(default)]
    headers: HashMap<String, String>,
    #[serde(default)]
    timeout_secs: Option<f64>,
    #[serde(default)]
    max_retries: Option<u32>,
    #[serde(default)]
    description: String,
}

async fn create(
    State(state): State<AppState>,
    identity: Identity,
    Json(body): Json<CreateWebhook>,
) -> Result<Json<RedactedWebhook>, ApiError> {
    if body.url.is_empty() {
        return Err(ApiError::Validation("url must not be empty".into()));
    }
    let timeout = match body.timeout_secs {
        Some(secs) if secs.is_finite() && secs > 0.0 => Duration::from_secs_f64(secs),
        Some(_) => return Err(ApiError::Validation("timeout_secs must be positive".into())),
        None => state.webhook_default_timeout,
    };

    let mut config = WebhookConfig::new(body.url)
        .with_secret(body.secret)
        .with_event_types(body.event_types)
        .with_timeout(timeout)
        .with_description(body.description);
    for (name, value) in body.headers {
        config = config.with_header(name, value);
    }
    if let Some(max_retries) = body.max_retries {
        config = config.with_max_retries(max_retries);
    }

    let redacted = config.redacted();
    tracing::info!(
        subject = %identity.subject,
        role = %identity.role,
        url = %redacted.url,
        "webhook registered via api"
    );
    state.notifications.add_webhook(config);
    Ok(Json(redacted))
}

async fn show(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<RedactedWebhook>, ApiError> {
    state
        .notifications
        .get_webhook(&WebhookId::new(id.as_str()))
        .map(|c| Json(c.redacted()))
        .ok_or(ApiError::NotFound(format!("webhook {id}")))
}

async fn remove(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Value>, ApiError> {
    if state.notifications.remove_webhook(&WebhookId::new(id.as_str())) {
        Ok(Json(json!({"removed": true})))
    } else {
        Err(ApiError::NotFound(format!("webhook {id}")))
    }
}

async fn test(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<DeliveryRecord>, ApiError> {
    state
        .notifications
        .test_webhook(&WebhookId::new(id.as_str()))
        .await
        .map(Json)
        .ok_or(ApiError::NotFound(format!("webhook {id}")))
}

#[derive(Deserialize)]
struct HistoryQuery {
    #[serde(default = "default_limit")]
    limit: usize,
}

fn default_limit() -> usize {
    50
}

async fn deliveries(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<HistoryQuery>,
) -> Json<Vec<DeliveryRecord>> {
    Json(
        state
            .notifications
            .get_delivery_history(Some(&WebhookId::new(id.as_str())), query.limit),
    )
}

async fn all_deliveries(
    State(state): State<AppState>,
    Query(query): Query<HistoryQuery>,
) -> Json<Vec<DeliveryRecord>> {
    Json(state.notifications.get_delivery_history(None, query.limit))
}

async fn stats(State(state): State<AppState>) -> Json<NotificationStats> {
    Json(state.notifications.stats())
}
