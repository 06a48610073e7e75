// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Alert engine: rule registry, evaluation loop, handlers, history.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::Serialize;
use sf_core::Clock;
use tracing::debug;

use crate::{Alert, AlertContext, AlertId, AlertRule, AlertSeverity};

/// Callback invoked for every fired alert. Errors are logged and
/// isolated; one failing handler never starves the others.
pub type AlertHandler = Arc<dyn Fn(&Alert) -> Result<(), String> + Send + Sync>;

/// Aggregate view for status endpoints.
#[derive(Debug, Clone, Serialize)]
pub struct AlertSummary {
    pub total_rules: usize,
    pub enabled_rules: usize,
    pub total_alerts: usize,
    pub unacknowledged: usize,
    pub by_severity: HashMap<String, usize>,
}

/// Introspection snapshot of one rule.
#[derive(Debug, Clone, Serialize)]
pub struct RuleInfo {
    pub name: String,
    pub severity: AlertSeverity,
    pub enabled: bool,
    pub match_any: bool,
    pub cooldown_secs: f64,
    pub max_alerts: u32,
    pub alert_count: u32,
    pub conditions: Vec<&'static str>,
}

struct EngineInner {
    rules: HashMap<String, AlertRule>,
    alerts: Vec<Alert>,
}

/// Evaluates event contexts against all registered rules.
pub struct AlertEngine {
    clock: Arc<dyn Clock>,
    max_history: usize,
    inner: Mutex<EngineInner>,
    handlers: Mutex<Vec<AlertHandler>>,
}

impl AlertEngine {
    /// Default history cap of 1000 alerts.
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self::with_history(1000, clock)
    }

    pub fn with_history(max_history: usize, clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            max_history: max_history.max(1),
            inner: Mutex::new(EngineInner {
                rules: HashMap::new(),
                alerts: Vec::new(),
            }),
            handlers: Mutex::new(Vec::new()),
        }
    }

    // ------------------------------------------------------------------
    // Rules
    // ------------------------------------------------------------------

    /// Register a rule. An existing rule of the same name is replaced.
    pub fn add_rule(&self, rule: AlertRule) {
        self.inner.lock().rules.insert(rule.name.clone(), rule);
    }

    pub fn remove_rule(&self, name: &str) -> bool {
        self.inner.lock().rules.remove(name).is_some()
    }

    /// Snapshot of a rule (counters included), or None.
    pub fn get_rule(&self, name: &str) -> Option<AlertRule> {
        self.inner.lock().rules.get(name).cloned()
    }

    /// Flip a rule on or off. Returns false for unknown rules.
    pub fn set_rule_enabled(&self, name: &str, enabled: bool) -> bool {
        let mut inner = self.inner.lock();
        match inner.rules.get_mut(name) {
            Some(rule) => {
                rule.enabled = enabled;
                true
            }
            None => false,
        }
    }

    pub fn rules(&self) -> Vec<RuleInfo> {
        let inner = self.inner.lock();
        let mut rules: Vec<RuleInfo> = inner
            .rules
            .values()
            .map(|rule| RuleInfo {
                name: rule.name.clone(),
                severity: rule.severity,
                enabled: rule.enabled,
                match_any: rule.match_any,
                cooldown_secs: rule.cooldown.as_secs_f64(),
                max_alerts: rule.max_alerts,
                alert_count: rule.alert_count(),
                conditions: rule.conditions.iter().map(|c| c.kind()).collect(),
            })
            .collect();
        rules.sort_by(|a, b| a.name.cmp(&b.name));
        rules
    }

    // ------------------------------------------------------------------
    // Handlers
    // ------------------------------------------------------------------

    pub fn add_handler(&self, handler: impl Fn(&Alert) -> Result<(), String> + Send + Sync + 'static) {
        self.handlers.lock().push(Arc::new(handler));
    }

    // ------------------------------------------------------------------
    // Evaluation
    // ------------------------------------------------------------------

    /// Evaluate every enabled rule against a context. Returns the alerts
    /// that fired. Handlers run after the engine lock is released.
    pub fn process_event(&self, context: &AlertContext) -> Vec<Alert> {
        let now = self.clock.now();
        let epoch = self.clock.epoch_secs();

        let triggered: Vec<Alert> = {
            let mut inner = self.inner.lock();
            let fired: Vec<Alert> = inner
                .rules
                .values_mut()
                .filter_map(|rule| rule.evaluate(context, now, epoch))
                .collect();
            inner.alerts.extend(fired.iter().cloned());
            let len = inner.alerts.len();
            if len > self.max_history {
                inner.alerts.drain(..len - self.max_history);
            }
            fired
        };

        let handlers = self.handlers.lock().clone();
        for alert in &triggered {
            for handler in &handlers {
                if let Err(e) = handler(alert) {
                    debug!(rule = %alert.rule_name, error = %e, "alert handler failed");
                }
            }
        }

        triggered
    }

    // ------------------------------------------------------------------
    // History
    // ------------------------------------------------------------------

    pub fn alerts(&self) -> Vec<Alert> {
        self.inner.lock().alerts.clone()
    }

    pub fn alerts_by_severity(&self, severity: AlertSeverity) -> Vec<Alert> {
        self.inner
            .lock()
            .alerts
            .iter()
            .filter(|a| a.severity == severity)
            .cloned()
            .collect()
    }

    pub fn unacknowledged(&self) -> Vec<Alert> {
        self.inner
            .lock()
            .alerts
            .iter()
            .filter(|a| !a.acknowledged)
            .cloned()
            .collect()
    }

    /// Mark one alert acknowledged. Returns false if unknown.
    pub fn acknowledge(&self, alert_id: &AlertId) -> bool {
        let mut inner = self.inner.lock();
        match inner.alerts.iter_mut().find(|a| &a.id == alert_id) {
            Some(alert) => {
                alert.acknowledged = true;
                true
            }
            None => false,
        }
    }

    pub fn acknowledge_all(&self) {
        for alert in self.inner.lock().alerts.iter_mut() {
            alert.acknowledged = true;
        }
    }

    /// Acknowledgement never deletes; this does.
    pub fn clear_alerts(&self) {
        self.inner.lock().alerts.clear();
    }

    /// Reset all rule counters and clear the history.
    pub fn reset(&self) {
        let mut inner = self.inner.lock();
        for rule in inner.rules.values_mut() {
            rule.reset();
        }
        inner.alerts.clear();
    }

    pub fn summary(&self) -> AlertSummary {
        let inner = self.inner.lock();
        let mut by_severity = HashMap::new();
        for severity in AlertSeverity::ALL {
            by_severity.insert(
                severity.as_str().to_string(),
                inner
                    .alerts
                    .iter()
                    .filter(|a| a.severity == severity)
                    .count(),
            );
        }
        AlertSummary {
            total_rules: inner.rules.len(),
            enabled_rules: inner.rules.values().filter(|r| r.enabled).count(),
            total_alerts: inner.alerts.len(),
            unacknowledged: inner.alerts.iter().filter(|a| !a.acknowledged).count(),
            by_severity,
        }
    }
}

#[cfg(test)]
#[path = "engine_tests.rs"]
mod tests;
