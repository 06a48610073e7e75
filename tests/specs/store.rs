// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Report persistence round trips.

use std::sync::Arc;
use std::time::Duration;

use sf_core::FakeClock;
use sf_store::{MemoryBackend, ReportId, ReportRecord, ReportStore};

#[tokio::test]
async fn save_then_get_is_equal_modulo_updated_at() {
    let clock = FakeClock::new();
    let store = ReportStore::new(Arc::new(MemoryBackend::new()), Arc::new(clock.clone()));

    let mut report = ReportRecord::new(ReportId::new("rep-1"), "scan1").with_title("Exposure");
    report.sections.push(serde_json::json!({"heading": "Hosts", "count": 12}));
    let id = store.save(report).await.unwrap();

    let first = store.get(&id).await.unwrap().unwrap();
    assert_eq!(first.title, "Exposure");

    // Re-save later: only updated_at moves.
    clock.advance(Duration::from_secs(30));
    store.save(first.clone()).await.unwrap();
    let second = store.get(&id).await.unwrap().unwrap();

    assert_eq!(second.created_at, first.created_at);
    assert_eq!(second.updated_at, first.updated_at + 30.0);
    let mut normalized = second;
    normalized.updated_at = first.updated_at;
    assert_eq!(normalized, first);
}
