// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Notification manager: webhook registry and event routing.
//!
//! The central hub connecting internal event sources (task manager,
//! alert engine, scan events) to outbound webhook delivery. Webhooks
//! filter by event type so only relevant notifications dispatch.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::Serialize;
use serde_json::json;
use sf_alerts::AlertEngine;
use sf_core::{context, Clock};
use sf_tasks::TaskManager;
use tracing::{debug, info};

use crate::{DeliveryRecord, DeliveryStats, WebhookConfig, WebhookDispatcher, WebhookId};

/// Registry stats plus delivery aggregates.
#[derive(Debug, Clone, Serialize)]
pub struct NotificationStats {
    pub webhooks_registered: usize,
    pub webhooks_enabled: usize,
    pub delivery: DeliveryStats,
}

/// Routes events to registered webhook endpoints.
pub struct NotificationManager {
    webhooks: Mutex<HashMap<WebhookId, WebhookConfig>>,
    dispatcher: Arc<WebhookDispatcher>,
    clock: Arc<dyn Clock>,
}

impl NotificationManager {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        let dispatcher = Arc::new(WebhookDispatcher::new(Arc::clone(&clock)));
        Self::with_dispatcher(dispatcher, clock)
    }

    /// Share a dispatcher (and therefore its delivery history) with the
    /// caller.
    pub fn with_dispatcher(dispatcher: Arc<WebhookDispatcher>, clock: Arc<dyn Clock>) -> Self {
        Self {
            webhooks: Mutex::new(HashMap::new()),
            dispatcher,
            clock,
        }
    }

    pub fn dispatcher(&self) -> &Arc<WebhookDispatcher> {
        &self.dispatcher
    }

    // ------------------------------------------------------------------
    // Webhook CRUD
    // ------------------------------------------------------------------

    /// Register a webhook endpoint. Returns its id.
    pub fn add_webhook(&self, config: WebhookConfig) -> WebhookId {
        let id = config.id.clone();
        info!(
            webhook = %id.short(8),
            url = %config.url,
            events = ?config.event_types,
            "webhook registered"
        );
        self.webhooks.lock().insert(id.clone(), config);
        id
    }

    /// Remove a webhook. Returns true if it existed.
    pub fn remove_webhook(&self, webhook_id: &WebhookId) -> bool {
        self.webhooks.lock().remove(webhook_id).is_some()
    }

    pub fn get_webhook(&self, webhook_id: &WebhookId) -> Option<WebhookConfig> {
        self.webhooks.lock().get(webhook_id).cloned()
    }

    pub fn list_webhooks(&self) -> Vec<WebhookConfig> {
        self.webhooks.lock().values().cloned().collect()
    }

    /// Mutate a webhook in place. Returns false for unknown ids.
    pub fn update_webhook(
        &self,
        webhook_id: &WebhookId,
        update: impl FnOnce(&mut WebhookConfig),
    ) -> bool {
        let mut webhooks = self.webhooks.lock();
        match webhooks.get_mut(webhook_id) {
            Some(config) => {
                update(config);
                true
            }
            None => false,
        }
    }

    // ------------------------------------------------------------------
    // Dispatch
    // ------------------------------------------------------------------

    /// Deliver to every enabled webhook matching the event type. Returns
    /// one record per attempted delivery.
    pub async fn notify(
        &self,
        event_type: &str,
        payload: &serde_json::Value,
    ) -> Vec<DeliveryRecord> {
        let targets: Vec<WebhookConfig> = {
            let webhooks = self.webhooks.lock();
            webhooks
                .values()
                .filter(|c| c.enabled && c.matches_event(event_type))
                .cloned()
                .collect()
        };
        if targets.is_empty() {
            return Vec::new();
        }

        let mut records = Vec::with_capacity(targets.len());
        for config in targets {
            records.push(self.dispatcher.deliver(&config, event_type, payload).await);
        }
        records
    }

    /// Fire-and-forget delivery on the runtime, carrying the caller's
    /// correlation context into the spawned task.
    pub fn notify_async(self: &Arc<Self>, event_type: String, payload: serde_json::Value) {
        let manager = Arc::clone(self);
        let ctx = context::current();
        tokio::spawn(async move {
            let deliver = async {
                let records = manager.notify(&event_type, &payload).await;
                debug!(event = %event_type, deliveries = records.len(), "async notify done");
            };
            match ctx {
                Some(ctx) => context::scope(ctx, deliver).await,
                None => deliver.await,
            }
        });
    }

    /// Send a test event to one webhook. `None` if the id is unknown.
    pub async fn test_webhook(&self, webhook_id: &WebhookId) -> Option<DeliveryRecord> {
        let config = self.get_webhook(webhook_id)?;
        let payload = json!({
            "message": "SpiderFoot webhook test",
            "timestamp": self.clock.epoch_secs(),
            "webhook_id": webhook_id,
        });
        Some(self.dispatcher.deliver(&config, "webhook.test", &payload).await)
    }

    // ------------------------------------------------------------------
    // Integration wiring
    // ------------------------------------------------------------------

    /// Register as a task-completion listener: every terminal task
    /// becomes a `task.{state}` event.
    pub fn wire_task_manager(self: &Arc<Self>, tasks: &TaskManager) {
        let manager = Arc::clone(self);
        tasks.on_task_complete(move |record| {
            let payload = serde_json::to_value(record).unwrap_or(serde_json::Value::Null);
            manager.notify_async(format!("task.{}", record.state), payload);
        });
        info!("notification manager wired to task manager");
    }

    /// Register as an alert handler: every alert becomes an
    /// `alert.{severity}` event.
    pub fn wire_alert_engine(self: &Arc<Self>, engine: &AlertEngine) {
        let manager = Arc::clone(self);
        engine.add_handler(move |alert| {
            let payload = serde_json::to_value(alert).unwrap_or(serde_json::Value::Null);
            manager.notify_async(format!("alert.{}", alert.severity), payload);
            Ok(())
        });
        info!("notification manager wired to alert engine");
    }

    // ------------------------------------------------------------------
    // Introspection
    // ------------------------------------------------------------------

    pub fn get_delivery_history(
        &self,
        webhook_id: Option<&WebhookId>,
        limit: usize,
    ) -> Vec<DeliveryRecord> {
        self.dispatcher.get_history(webhook_id, limit)
    }

    pub fn stats(&self) -> NotificationStats {
        let webhooks = self.webhooks.lock();
        NotificationStats {
            webhooks_registered: webhooks.len(),
            webhooks_enabled: webhooks.values().filter(|c| c.enabled).count(),
            delivery: self.dispatcher.stats(),
        }
    }
}

#[cfg(test)]
#[path = "manager_tests.rs"]
mod tests;
