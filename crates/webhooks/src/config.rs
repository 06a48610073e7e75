// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Webhook endpoint configuration.

use std::collections::HashMap;
use std::time::Duration;

use serde::Serialize;
use sf_core::{IdMint, RandomIds};

sf_core::string_id! {
    /// Unique identifier for a registered webhook endpoint.
    pub struct WebhookId;
}

/// Configuration for a single webhook endpoint.
#[derive(Debug, Clone)]
pub struct WebhookConfig {
    pub id: WebhookId,
    pub url: String,
    /// HMAC-SHA256 signing secret; empty disables signing.
    pub secret: String,
    /// Extra headers sent with every delivery.
    pub headers: HashMap<String, String>,
    /// Event-type filters; empty means all events.
    pub event_types: Vec<String>,
    pub enabled: bool,
    pub timeout: Duration,
    pub max_retries: u32,
    pub description: String,
}

impl WebhookConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            id: WebhookId::new(RandomIds.mint()),
            url: url.into(),
            secret: String::new(),
            headers: HashMap::new(),
            event_types: Vec::new(),
            enabled: true,
            timeout: Duration::from_secs(10),
            max_retries: 3,
            description: String::new(),
        }
    }

    pub fn with_secret(mut self, secret: impl Into<String>) -> Self {
        self.secret = secret.into();
        self
    }

    pub fn with_event_types<I, S>(mut self, event_types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.event_types = event_types.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    /// Whether this webhook should receive the given event type: the
    /// filter list is empty, contains the type, or contains a dotted
    /// prefix of it.
    pub fn matches_event(&self, event_type: &str) -> bool {
        if self.event_types.is_empty() {
            return true;
        }
        self.event_types.iter().any(|filter| {
            event_type == filter || event_type.starts_with(&format!("{filter}."))
        })
    }

    /// Listing view with secrets masked.
    pub fn redacted(&self) -> RedactedWebhook {
        let mut header_names: Vec<String> = self.headers.keys().cloned().collect();
        header_names.sort_unstable();
        RedactedWebhook {
            id: self.id.clone(),
            url: self.url.clone(),
            secret_set: !self.secret.is_empty(),
            header_names,
            event_types: self.event_types.clone(),
            enabled: self.enabled,
            timeout_secs: self.timeout.as_secs_f64(),
            max_retries: self.max_retries,
            description: self.description.clone(),
        }
    }
}

/// Safe-to-serialize webhook view (no secret, no header values).
#[derive(Debug, Clone, Serialize)]
pub struct RedactedWebhook {
    pub id: WebhookId,
    pub url: String,
    pub secret_set: bool,
    pub header_names: Vec<String>,
    pub event_types: Vec<String>,
    pub enabled: bool,
    pub timeout_secs: f64,
    pub max_retries: u32,
    pub description: String,
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
