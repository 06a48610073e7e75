// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Report records and query filters.

use serde::{Deserialize, Serialize};

sf_core::string_id! {
    /// Unique identifier for a stored report.
    pub struct ReportId;
}

/// A generated report with its metadata.
///
/// `status` and `report_type` are open string sets — the report pipeline
/// defines them, the store only persists and filters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportRecord {
    pub report_id: ReportId,
    pub scan_id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default = "default_status")]
    pub status: String,
    #[serde(default = "default_report_type")]
    pub report_type: String,
    #[serde(default)]
    pub progress_pct: f64,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub executive_summary: Option<String>,
    #[serde(default)]
    pub recommendations: Option<String>,
    #[serde(default)]
    pub sections: Vec<serde_json::Value>,
    #[serde(default)]
    pub metadata: serde_json::Map<String, serde_json::Value>,
    #[serde(default)]
    pub generation_time_ms: f64,
    #[serde(default)]
    pub total_tokens_used: i64,
    /// Epoch seconds; preserved across updates.
    #[serde(default)]
    pub created_at: f64,
    /// Epoch seconds; refreshed on every save.
    #[serde(default)]
    pub updated_at: f64,
}

fn default_status() -> String {
    "pending".to_string()
}

fn default_report_type() -> String {
    "full".to_string()
}

impl ReportRecord {
    pub fn new(report_id: ReportId, scan_id: impl Into<String>) -> Self {
        Self {
            report_id,
            scan_id: scan_id.into(),
            title: String::new(),
            status: default_status(),
            report_type: default_report_type(),
            progress_pct: 0.0,
            message: String::new(),
            executive_summary: None,
            recommendations: None,
            sections: Vec::new(),
            metadata: serde_json::Map::new(),
            generation_time_ms: 0.0,
            total_tokens_used: 0,
            created_at: 0.0,
            updated_at: 0.0,
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn with_status(mut self, status: impl Into<String>) -> Self {
        self.status = status.into();
        self
    }
}

/// Query filters for listing reports.
#[derive(Debug, Clone, Default)]
pub struct ReportFilters {
    pub scan_id: Option<String>,
    pub status: Option<String>,
}

impl ReportFilters {
    pub fn scan(scan_id: impl Into<String>) -> Self {
        Self {
            scan_id: Some(scan_id.into()),
            status: None,
        }
    }

    pub fn status(status: impl Into<String>) -> Self {
        Self {
            scan_id: None,
            status: Some(status.into()),
        }
    }

    pub fn matches(&self, record: &ReportRecord) -> bool {
        self.scan_id
            .as_deref()
            .map(|s| record.scan_id == s)
            .unwrap_or(true)
            && self
                .status
                .as_deref()
                .map(|s| record.status == s)
                .unwrap_or(true)
    }
}

#[cfg(test)]
#[path = "record_tests.rs"]
mod tests;
