// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Alert rules and triggered alert instances.

use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use sf_core::{IdMint, RandomIds};

use crate::{AlertCondition, AlertContext, AlertError};

sf_core::string_id! {
    /// Unique identifier for a triggered alert.
    pub struct AlertId;
}

/// Alert severity levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertSeverity {
    Critical,
    High,
    Medium,
    Low,
    Info,
}

impl AlertSeverity {
    pub const ALL: [AlertSeverity; 5] = [
        AlertSeverity::Critical,
        AlertSeverity::High,
        AlertSeverity::Medium,
        AlertSeverity::Low,
        AlertSeverity::Info,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AlertSeverity::Critical => "critical",
            AlertSeverity::High => "high",
            AlertSeverity::Medium => "medium",
            AlertSeverity::Low => "low",
            AlertSeverity::Info => "info",
        }
    }
}

impl std::fmt::Display for AlertSeverity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for AlertSeverity {
    type Err = AlertError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "critical" => Ok(AlertSeverity::Critical),
            "high" => Ok(AlertSeverity::High),
            "medium" => Ok(AlertSeverity::Medium),
            "low" => Ok(AlertSeverity::Low),
            "info" => Ok(AlertSeverity::Info),
            other => Err(AlertError::UnknownSeverity(other.to_string())),
        }
    }
}

/// A triggered alert instance.
#[derive(Debug, Clone, Serialize)]
pub struct Alert {
    pub id: AlertId,
    pub rule_name: String,
    pub severity: AlertSeverity,
    pub message: String,
    /// Epoch seconds when the rule fired.
    pub timestamp: f64,
    /// Snapshot of the triggering context.
    pub context: AlertContext,
    pub acknowledged: bool,
}

/// A named predicate plus metadata that may emit alerts.
#[derive(Debug, Clone)]
pub struct AlertRule {
    pub name: String,
    pub severity: AlertSeverity,
    pub message_template: String,
    pub conditions: Vec<AlertCondition>,
    /// Any condition triggers when true; otherwise all must match.
    pub match_any: bool,
    /// Minimum gap between alerts from this rule.
    pub cooldown: Duration,
    /// Lifetime alert quota (0 = unbounded).
    pub max_alerts: u32,
    pub enabled: bool,
    alert_count: u32,
    last_alert: Option<Instant>,
    ids: RandomIds,
}

impl AlertRule {
    pub fn new(name: impl Into<String>, severity: AlertSeverity) -> Self {
        let name = name.into();
        Self {
            message_template: format!("Alert: {name}"),
            name,
            severity,
            conditions: Vec::new(),
            match_any: false,
            cooldown: Duration::ZERO,
            max_alerts: 0,
            enabled: true,
            alert_count: 0,
            last_alert: None,
            ids: RandomIds,
        }
    }

    /// Message template with `{key}` placeholders resolved from the
    /// triggering context.
    pub fn with_message(mut self, template: impl Into<String>) -> Self {
        self.message_template = template.into();
        self
    }

    pub fn with_condition(mut self, condition: AlertCondition) -> Self {
        self.conditions.push(condition);
        self
    }

    pub fn match_any(mut self, any: bool) -> Self {
        self.match_any = any;
        self
    }

    pub fn with_cooldown(mut self, cooldown: Duration) -> Self {
        self.cooldown = cooldown;
        self
    }

    pub fn with_max_alerts(mut self, max_alerts: u32) -> Self {
        self.max_alerts = max_alerts;
        self
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    pub fn alert_count(&self) -> u32 {
        self.alert_count
    }

    /// Evaluate against a context. `now`/`epoch` come from the engine's
    /// clock so rules stay testable.
    pub fn evaluate(&mut self, context: &AlertContext, now: Instant, epoch: f64) -> Option<Alert> {
        if !self.enabled || self.conditions.is_empty() {
            return None;
        }
        if self.max_alerts > 0 && self.alert_count >= self.max_alerts {
            return None;
        }
        if self.cooldown > Duration::ZERO {
            if let Some(last) = self.last_alert {
                if now.duration_since(last) < self.cooldown {
                    return None;
                }
            }
        }

        let triggered = if self.match_any {
            self.conditions.iter().any(|c| c.evaluate(context))
        } else {
            self.conditions.iter().all(|c| c.evaluate(context))
        };
        if !triggered {
            return None;
        }

        self.alert_count += 1;
        self.last_alert = Some(now);

        Some(Alert {
            id: AlertId::new(self.ids.mint()),
            rule_name: self.name.clone(),
            severity: self.severity,
            message: self.render_message(context),
            timestamp: epoch,
            context: context.clone(),
            acknowledged: false,
        })
    }

    /// Interpolate `{key}` placeholders. Any placeholder missing from the
    /// context collapses the whole render to the raw template.
    fn render_message(&self, context: &AlertContext) -> String {
        let mut message = self.message_template.clone();
        for placeholder in placeholders(&self.message_template) {
            let value = if placeholder == "rule_name" {
                Some(self.name.clone())
            } else {
                context.get(&placeholder).map(render_value)
            };
            match value {
                Some(value) => {
                    message = message.replace(&format!("{{{placeholder}}}"), &value);
                }
                None => return self.message_template.clone(),
            }
        }
        message
    }

    /// Zero the counters, re-arming a quota-exhausted rule.
    pub fn reset(&mut self) {
        self.alert_count = 0;
        self.last_alert = None;
    }
}

fn render_value(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn placeholders(template: &str) -> Vec<String> {
    let mut found = Vec::new();
    let mut rest = template;
    while let Some(open) = rest.find('{') {
        let tail = &rest[open + 1..];
        match tail.find('}') {
            Some(close) => {
                let name = &tail[..close];
                if !name.is_empty() && !found.iter().any(|f| f == name) {
                    found.push(name.to_string());
                }
                rest = &tail[close + 1..];
            }
            None => break,
        }
    }
    found
}

#[cfg(test)]
#[path = "rule_tests.rs"]
mod tests;
