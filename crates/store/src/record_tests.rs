// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

fn record(scan: &str, status: &str) -> ReportRecord {
    ReportRecord::new(ReportId::new("r1"), scan).with_status(status)
}

#[test]
fn defaults() {
    let record = ReportRecord::new(ReportId::new("r1"), "scan1");
    assert_eq!(record.status, "pending");
    assert_eq!(record.report_type, "full");
    assert_eq!(record.progress_pct, 0.0);
    assert!(record.sections.is_empty());
}

#[test]
fn serde_round_trip() {
    let mut record = record("scan1", "completed").with_title("Exposure report");
    record.sections.push(serde_json::json!({"heading": "Hosts"}));
    record
        .metadata
        .insert("format".to_string(), serde_json::json!("pdf"));

    let json = serde_json::to_string(&record).unwrap();
    let back: ReportRecord = serde_json::from_str(&json).unwrap();
    assert_eq!(back, record);
}

#[test]
fn deserialize_fills_missing_fields() {
    let back: ReportRecord =
        serde_json::from_str(r#"{"report_id": "r9", "scan_id": "s1"}"#).unwrap();
    assert_eq!(back.status, "pending");
    assert_eq!(back.report_type, "full");
    assert_eq!(back.created_at, 0.0);
}

#[yare::parameterized(
    no_filters        = { ReportFilters::default(), true },
    scan_match        = { ReportFilters::scan("scan1"), true },
    scan_mismatch     = { ReportFilters::scan("scan2"), false },
    status_match      = { ReportFilters::status("completed"), true },
    status_mismatch   = { ReportFilters::status("pending"), false },
)]
fn filter_matching(filters: ReportFilters, expected: bool) {
    assert_eq!(filters.matches(&record("scan1", "completed")), expected);
}

#[test]
fn combined_filters_require_both() {
    let filters = ReportFilters {
        scan_id: Some("scan1".to_string()),
        status: Some("pending".to_string()),
    };
    assert!(!filters.matches(&record("scan1", "completed")));
    assert!(filters.matches(&record("scan1", "pending")));
}
