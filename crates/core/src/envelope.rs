// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Event envelope — the unit of pub/sub traffic.
//!
//! Envelopes are immutable after construction: producers build one with the
//! constructor plus `with_*` methods and publish it; consumers only read.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Sentinel parent hash for events with no source event.
pub const ROOT_EVENT_HASH: &str = "ROOT";

/// Payload of an envelope: raw text or structured JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EnvelopeData {
    Text(String),
    Structured(serde_json::Value),
}

impl EnvelopeData {
    /// Borrow the payload as a string when it is raw text.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            EnvelopeData::Text(s) => Some(s),
            EnvelopeData::Structured(_) => None,
        }
    }

    /// Render the payload as a string: text verbatim, structured as JSON.
    pub fn to_wire_string(&self) -> String {
        match self {
            EnvelopeData::Text(s) => s.clone(),
            EnvelopeData::Structured(v) => v.to_string(),
        }
    }
}

impl From<&str> for EnvelopeData {
    fn from(s: &str) -> Self {
        EnvelopeData::Text(s.to_string())
    }
}

impl From<String> for EnvelopeData {
    fn from(s: String) -> Self {
        EnvelopeData::Text(s)
    }
}

impl From<serde_json::Value> for EnvelopeData {
    fn from(v: serde_json::Value) -> Self {
        EnvelopeData::Structured(v)
    }
}

/// Envelope wrapping an event for transport over the bus.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventEnvelope {
    /// Fully-qualified topic, `{prefix}.{scan_id}.{event_type}`.
    pub topic: String,
    pub scan_id: String,
    /// OSINT event kind, e.g. `IP_ADDRESS`, `DOMAIN_NAME`. Open set.
    pub event_type: String,
    /// Producing module name.
    pub module: String,
    pub data: EnvelopeData,
    /// Fingerprint of the parent event, or [`ROOT_EVENT_HASH`].
    #[serde(default = "default_source_hash")]
    pub source_event_hash: String,
    #[serde(default = "default_score")]
    pub confidence: u8,
    #[serde(default = "default_score")]
    pub visibility: u8,
    #[serde(default)]
    pub risk: u8,
    /// Creation time, seconds since the Unix epoch.
    #[serde(default)]
    pub timestamp: f64,
    #[serde(default)]
    pub metadata: HashMap<String, serde_json::Value>,
}

fn default_source_hash() -> String {
    ROOT_EVENT_HASH.to_string()
}

fn default_score() -> u8 {
    100
}

impl EventEnvelope {
    /// Create an envelope with default scores and a `ROOT` parent.
    pub fn new(
        topic: impl Into<String>,
        scan_id: impl Into<String>,
        event_type: impl Into<String>,
        module: impl Into<String>,
        data: impl Into<EnvelopeData>,
    ) -> Self {
        Self {
            topic: topic.into(),
            scan_id: scan_id.into(),
            event_type: event_type.into(),
            module: module.into(),
            data: data.into(),
            source_event_hash: default_source_hash(),
            confidence: 100,
            visibility: 100,
            risk: 0,
            timestamp: 0.0,
            metadata: HashMap::new(),
        }
    }

    pub fn with_source_event_hash(mut self, hash: impl Into<String>) -> Self {
        self.source_event_hash = hash.into();
        self
    }

    /// Scores are clamped to the 0–100 range.
    pub fn with_scores(mut self, confidence: u8, visibility: u8, risk: u8) -> Self {
        self.confidence = confidence.min(100);
        self.visibility = visibility.min(100);
        self.risk = risk.min(100);
        self
    }

    pub fn with_risk(mut self, risk: u8) -> Self {
        self.risk = risk.min(100);
        self
    }

    pub fn with_timestamp(mut self, epoch_secs: f64) -> Self {
        self.timestamp = epoch_secs;
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    /// Stable fingerprint over `(event_type, data, module)`.
    ///
    /// Two envelopes carrying the same finding from the same module hash
    /// identically regardless of topic, scores, or timestamps.
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.event_type.as_bytes());
        hasher.update([0]);
        hasher.update(self.data.to_wire_string().as_bytes());
        hasher.update([0]);
        hasher.update(self.module.as_bytes());
        hex::encode(hasher.finalize())
    }
}

#[cfg(test)]
#[path = "envelope_tests.rs"]
mod tests;
