// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-memory report backend for tests and ephemeral deployments.

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::{ReportBackend, ReportFilters, ReportId, ReportRecord, StoreError};

/// Map-backed storage guarded by a single lock.
#[derive(Default)]
pub struct MemoryBackend {
    records: Mutex<HashMap<ReportId, ReportRecord>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ReportBackend for MemoryBackend {
    async fn save(&self, record: &ReportRecord) -> Result<(), StoreError> {
        self.records
            .lock()
            .insert(record.report_id.clone(), record.clone());
        Ok(())
    }

    async fn get(&self, report_id: &ReportId) -> Result<Option<ReportRecord>, StoreError> {
        Ok(self.records.lock().get(report_id).cloned())
    }

    async fn delete(&self, report_id: &ReportId) -> Result<bool, StoreError> {
        Ok(self.records.lock().remove(report_id).is_some())
    }

    async fn list(
        &self,
        filters: &ReportFilters,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<ReportRecord>, StoreError> {
        let mut records: Vec<ReportRecord> = self
            .records
            .lock()
            .values()
            .filter(|r| filters.matches(r))
            .cloned()
            .collect();
        records.sort_by(|a, b| b.created_at.total_cmp(&a.created_at));
        Ok(records.into_iter().skip(offset).take(limit).collect())
    }

    async fn count(&self, scan_id: Option<&str>) -> Result<usize, StoreError> {
        let records = self.records.lock();
        Ok(match scan_id {
            Some(scan_id) => records.values().filter(|r| r.scan_id == scan_id).count(),
            None => records.len(),
        })
    }

    async fn cleanup_before(&self, cutoff_epoch: f64) -> Result<usize, StoreError> {
        let mut records = self.records.lock();
        let before = records.len();
        records.retain(|_, r| r.created_at >= cutoff_epoch);
        Ok(before - records.len())
    }
}

#[cfg(test)]
#[path = "memory_tests.rs"]
mod tests;
