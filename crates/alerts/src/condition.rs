// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Alert conditions and the event context they evaluate against.

use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;

use regex::Regex;
use serde::Serialize;
use sf_core::EventEnvelope;
use thiserror::Error;

/// Errors from building rules and conditions.
#[derive(Debug, Error)]
pub enum AlertError {
    #[error("unknown comparison operator: {0}")]
    UnknownOperator(String),
    #[error("unknown severity: {0}")]
    UnknownSeverity(String),
    #[error("invalid pattern: {0}")]
    InvalidPattern(#[from] regex::Error),
}

/// Comparison operators for numeric conditions.
///
/// The operator set is closed; unknown names are rejected when a rule is
/// built, not at evaluation time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Cmp {
    Gte,
    Lte,
    Gt,
    Lt,
    Eq,
}

impl Cmp {
    pub fn compare(&self, actual: f64, expected: f64) -> bool {
        match self {
            Cmp::Gte => actual >= expected,
            Cmp::Lte => actual <= expected,
            Cmp::Gt => actual > expected,
            Cmp::Lt => actual < expected,
            Cmp::Eq => actual == expected,
        }
    }
}

impl FromStr for Cmp {
    type Err = AlertError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "gte" => Ok(Cmp::Gte),
            "lte" => Ok(Cmp::Lte),
            "gt" => Ok(Cmp::Gt),
            "lt" => Ok(Cmp::Lt),
            "eq" => Ok(Cmp::Eq),
            other => Err(AlertError::UnknownOperator(other.to_string())),
        }
    }
}

/// Key/value snapshot of an event, the evaluation target for rules.
///
/// Well-known keys: `event_type`, `data`, `module`, `scan_id`, `topic`,
/// `risk_score`, `rate`, `count`. Arbitrary keys are allowed and feed
/// message-template interpolation.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct AlertContext(HashMap<String, serde_json::Value>);

impl AlertContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn set(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&serde_json::Value> {
        self.0.get(key)
    }

    pub fn str_value(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(|v| v.as_str())
    }

    pub fn num(&self, key: &str) -> Option<f64> {
        self.0.get(key).and_then(|v| v.as_f64())
    }

    pub fn event_type(&self) -> Option<&str> {
        self.str_value("event_type")
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &serde_json::Value)> {
        self.0.iter()
    }

    /// Snapshot the fields of a bus envelope that rules care about.
    pub fn from_envelope(envelope: &EventEnvelope) -> Self {
        Self::new()
            .set("event_type", envelope.event_type.clone())
            .set("data", envelope.data.to_wire_string())
            .set("module", envelope.module.clone())
            .set("scan_id", envelope.scan_id.clone())
            .set("topic", envelope.topic.clone())
            .set("risk_score", envelope.risk)
            .set("confidence", envelope.confidence)
    }
}

type CustomCheck = Arc<dyn Fn(&AlertContext) -> bool + Send + Sync>;

/// A single condition that can trigger an alert.
#[derive(Clone)]
pub enum AlertCondition {
    /// Exact event-type match.
    EventType { value: String },
    /// Regex search over the context's `data` string.
    Pattern { regex: Regex },
    /// Numeric comparison against `risk_score`.
    Severity { cmp: Cmp, value: f64 },
    /// Numeric comparison against `rate`.
    Rate { cmp: Cmp, value: f64 },
    /// Numeric comparison against `count`.
    Count { cmp: Cmp, value: f64 },
    /// Caller-supplied predicate.
    Custom { check: CustomCheck },
}

impl AlertCondition {
    pub fn event_type(value: impl Into<String>) -> Self {
        AlertCondition::EventType {
            value: value.into(),
        }
    }

    /// Compiles the regex up front; invalid patterns fail rule creation.
    pub fn pattern(pattern: &str) -> Result<Self, AlertError> {
        Ok(AlertCondition::Pattern {
            regex: Regex::new(pattern)?,
        })
    }

    pub fn severity(cmp: Cmp, value: f64) -> Self {
        AlertCondition::Severity { cmp, value }
    }

    pub fn rate(cmp: Cmp, value: f64) -> Self {
        AlertCondition::Rate { cmp, value }
    }

    pub fn count(cmp: Cmp, value: f64) -> Self {
        AlertCondition::Count { cmp, value }
    }

    pub fn custom(check: impl Fn(&AlertContext) -> bool + Send + Sync + 'static) -> Self {
        AlertCondition::Custom {
            check: Arc::new(check),
        }
    }

    pub fn evaluate(&self, context: &AlertContext) -> bool {
        match self {
            AlertCondition::EventType { value } => context.event_type() == Some(value.as_str()),
            AlertCondition::Pattern { regex } => context
                .str_value("data")
                .map(|data| regex.is_match(data))
                .unwrap_or(false),
            AlertCondition::Severity { cmp, value } => {
                cmp.compare(context.num("risk_score").unwrap_or(0.0), *value)
            }
            AlertCondition::Rate { cmp, value } => {
                cmp.compare(context.num("rate").unwrap_or(0.0), *value)
            }
            AlertCondition::Count { cmp, value } => {
                cmp.compare(context.num("count").unwrap_or(0.0), *value)
            }
            AlertCondition::Custom { check } => check(context),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            AlertCondition::EventType { .. } => "event_type",
            AlertCondition::Pattern { .. } => "pattern",
            AlertCondition::Severity { .. } => "severity",
            AlertCondition::Rate { .. } => "rate",
            AlertCondition::Count { .. } => "count",
            AlertCondition::Custom { .. } => "custom",
        }
    }
}

impl std::fmt::Debug for AlertCondition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AlertCondition::EventType { value } => {
                f.debug_struct("EventType").field("value", value).finish()
            }
            AlertCondition::Pattern { regex } => f
                .debug_struct("Pattern")
                .field("regex", &regex.as_str())
                .finish(),
            AlertCondition::Severity { cmp, value } => f
                .debug_struct("Severity")
                .field("cmp", cmp)
                .field("value", value)
                .finish(),
            AlertCondition::Rate { cmp, value } => f
                .debug_struct("Rate")
                .field("cmp", cmp)
                .field("value", value)
                .finish(),
            AlertCondition::Count { cmp, value } => f
                .debug_struct("Count")
                .field("cmp", cmp)
                .field("value", value)
                .finish(),
            AlertCondition::Custom { .. } => f.debug_struct("Custom").finish_non_exhaustive(),
        }
    }
}

#[cfg(test)]
#[path = "condition_tests.rs"]
mod tests;
