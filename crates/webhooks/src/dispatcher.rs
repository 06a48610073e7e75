// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Webhook dispatcher: signed HTTP POST with retries and history.
//!
//! Wire format is fixed: the body is
//! `{"event_type": ..., "timestamp": ..., "payload": ...}` and a
//! non-empty secret adds `X-SpiderFoot-Signature: sha256=<hex hmac>` over
//! those exact bytes. The ambient correlation id, when present, rides
//! along as `X-Request-ID`.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use hmac::{Hmac, Mac};
use parking_lot::Mutex;
use serde::Serialize;
use sf_core::{context, Clock, IdMint, RandomIds};
use sha2::Sha256;
use tracing::{info, warn};

use crate::{WebhookConfig, WebhookId};

/// User-Agent sent on every delivery.
pub const WEBHOOK_USER_AGENT: &str = "SpiderFoot-Webhook/1.0";

/// Header carrying the event type.
pub const EVENT_HEADER: &str = "X-SpiderFoot-Event";

/// Header carrying the body signature.
pub const SIGNATURE_HEADER: &str = "X-SpiderFoot-Signature";

/// Backoff between attempts is capped at this many seconds.
const MAX_BACKOFF_SECS: u64 = 30;

sf_core::string_id! {
    /// Unique identifier for one delivery attempt sequence.
    pub struct DeliveryId;
}

/// Delivery lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryStatus {
    Pending,
    Success,
    Failed,
    Retrying,
}

/// Audit record for one webhook POST attempt sequence.
#[derive(Debug, Clone, Serialize)]
pub struct DeliveryRecord {
    pub delivery_id: DeliveryId,
    pub webhook_id: WebhookId,
    pub event_type: String,
    pub status: DeliveryStatus,
    pub attempts: u32,
    pub status_code: Option<u16>,
    pub error: Option<String>,
    /// Epoch seconds.
    pub created_at: f64,
    pub completed_at: Option<f64>,
    pub payload_size: usize,
}

/// Aggregate delivery stats over the retained history.
#[derive(Debug, Clone, Serialize)]
pub struct DeliveryStats {
    pub total_deliveries: usize,
    pub successful: usize,
    pub failed: usize,
    /// Percentage of retained deliveries that succeeded.
    pub success_rate: f64,
}

#[derive(Serialize)]
struct WebhookBody<'a> {
    event_type: &'a str,
    timestamp: f64,
    payload: &'a serde_json::Value,
}

type HmacSha256 = Hmac<Sha256>;

/// Hex HMAC-SHA256 of `body` under `secret`. `None` only if the key is
/// rejected, which HMAC-SHA256 never does for any length.
pub fn signature(secret: &str, body: &[u8]) -> Option<String> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).ok()?;
    mac.update(body);
    Some(hex::encode(mac.finalize().into_bytes()))
}

/// Sends HTTP POST requests to webhook endpoints.
pub struct WebhookDispatcher {
    client: reqwest::Client,
    clock: Arc<dyn Clock>,
    max_history: usize,
    history: Mutex<VecDeque<DeliveryRecord>>,
    ids: RandomIds,
}

impl WebhookDispatcher {
    /// Default history of 200 delivery records.
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self::with_history(200, clock)
    }

    pub fn with_history(max_history: usize, clock: Arc<dyn Clock>) -> Self {
        Self {
            client: reqwest::Client::new(),
            clock,
            max_history: max_history.max(1),
            history: Mutex::new(VecDeque::new()),
            ids: RandomIds,
        }
    }

    /// Deliver a payload to one endpoint, retrying per its config.
    ///
    /// The returned record is appended to the history only after the
    /// attempt sequence terminates.
    pub async fn deliver(
        &self,
        config: &WebhookConfig,
        event_type: &str,
        payload: &serde_json::Value,
    ) -> DeliveryRecord {
        let body = WebhookBody {
            event_type,
            timestamp: self.clock.epoch_secs(),
            payload,
        };
        let body_bytes = serde_json::to_vec(&body).unwrap_or_default();

        let mut record = DeliveryRecord {
            delivery_id: DeliveryId::new(self.ids.mint()),
            webhook_id: config.id.clone(),
            event_type: event_type.to_string(),
            status: DeliveryStatus::Pending,
            attempts: 0,
            status_code: None,
            error: None,
            created_at: self.clock.epoch_secs(),
            completed_at: None,
            payload_size: body_bytes.len(),
        };

        let request_id = context::current_request_id();
        let signed = if config.secret.is_empty() {
            None
        } else {
            signature(&config.secret, &body_bytes)
        };

        let mut last_error = String::new();
        let max_attempts = config.max_retries.max(1);
        for attempt in 1..=max_attempts {
            record.attempts = attempt;
            record.status = DeliveryStatus::Retrying;

            let mut request = self
                .client
                .post(&config.url)
                .timeout(config.timeout)
                .header("Content-Type", "application/json")
                .header("User-Agent", WEBHOOK_USER_AGENT)
                .header(EVENT_HEADER, event_type);
            for (name, value) in &config.headers {
                request = request.header(name.as_str(), value.as_str());
            }
            if let Some(request_id) = &request_id {
                request = request.header(context::REQUEST_ID_HEADER, request_id.as_str());
            }
            if let Some(signed) = &signed {
                request = request.header(SIGNATURE_HEADER, format!("sha256={signed}"));
            }

            match request.body(body_bytes.clone()).send().await {
                Ok(response) => {
                    let code = response.status().as_u16();
                    record.status_code = Some(code);
                    if response.status().is_success() {
                        record.status = DeliveryStatus::Success;
                        record.completed_at = Some(self.clock.epoch_secs());
                        info!(
                            event = event_type,
                            url = %config.url,
                            code,
                            "webhook delivered"
                        );
                        break;
                    }
                    last_error = format!("HTTP {code}");
                    warn!(
                        event = event_type,
                        url = %config.url,
                        code,
                        attempt,
                        max = max_attempts,
                        "webhook returned non-2xx"
                    );
                }
                Err(e) => {
                    last_error = e.to_string();
                    warn!(
                        event = event_type,
                        url = %config.url,
                        error = %last_error,
                        attempt,
                        max = max_attempts,
                        "webhook request failed"
                    );
                }
            }

            if attempt < max_attempts {
                let backoff = 2u64.pow(attempt - 1).min(MAX_BACKOFF_SECS);
                tokio::time::sleep(Duration::from_secs(backoff)).await;
            }
        }

        if record.status != DeliveryStatus::Success {
            record.status = DeliveryStatus::Failed;
            record.error = Some(last_error);
            record.completed_at = Some(self.clock.epoch_secs());
        }

        let mut history = self.history.lock();
        if history.len() >= self.max_history {
            history.pop_front();
        }
        history.push_back(record.clone());
        record
    }

    /// Recent delivery records, newest first, optionally filtered.
    pub fn get_history(&self, webhook_id: Option<&WebhookId>, limit: usize) -> Vec<DeliveryRecord> {
        let history = self.history.lock();
        history
            .iter()
            .rev()
            .filter(|r| webhook_id.map(|id| &r.webhook_id == id).unwrap_or(true))
            .take(limit)
            .cloned()
            .collect()
    }

    pub fn clear_history(&self) -> usize {
        let mut history = self.history.lock();
        let count = history.len();
        history.clear();
        count
    }

    pub fn stats(&self) -> DeliveryStats {
        let history = self.history.lock();
        let total = history.len();
        let successful = history
            .iter()
            .filter(|r| r.status == DeliveryStatus::Success)
            .count();
        let failed = history
            .iter()
            .filter(|r| r.status == DeliveryStatus::Failed)
            .count();
        DeliveryStats {
            total_deliveries: total,
            successful,
            failed,
            success_rate: if total > 0 {
                successful as f64 / total as f64 * 100.0
            } else {
                0.0
            },
        }
    }
}

#[cfg(test)]
#[path = "dispatcher_tests.rs"]
mod tests;
