// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Storage contract and the cache-fronted facade.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use sf_core::Clock;
use thiserror::Error;
use tracing::debug;

use crate::{CacheStats, LruCache, ReportFilters, ReportId, ReportRecord};

/// Errors from report storage.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("storage backend error: {0}")]
    Backend(String),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Persistence contract implemented by each backend.
///
/// Backends store records verbatim; timestamp stamping is the facade's
/// job so the invariant lives in one place.
#[async_trait]
pub trait ReportBackend: Send + Sync {
    async fn save(&self, record: &ReportRecord) -> Result<(), StoreError>;

    async fn get(&self, report_id: &ReportId) -> Result<Option<ReportRecord>, StoreError>;

    /// Returns true if the record existed.
    async fn delete(&self, report_id: &ReportId) -> Result<bool, StoreError>;

    /// Newest first, paged.
    async fn list(
        &self,
        filters: &ReportFilters,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<ReportRecord>, StoreError>;

    async fn count(&self, scan_id: Option<&str>) -> Result<usize, StoreError>;

    /// Delete records created before `cutoff_epoch`. Returns the count
    /// removed.
    async fn cleanup_before(&self, cutoff_epoch: f64) -> Result<usize, StoreError>;
}

/// Unified report storage with caching.
///
/// Reads consult the cache first; saves update both; deletes invalidate.
/// `updated_at` is refreshed on every save and `created_at` is preserved
/// across updates.
pub struct ReportStore {
    backend: Arc<dyn ReportBackend>,
    cache: LruCache,
    clock: Arc<dyn Clock>,
    auto_cleanup_days: u32,
}

impl ReportStore {
    /// Defaults: 100-entry cache, one-hour TTL, 90-day auto cleanup.
    pub fn new(backend: Arc<dyn ReportBackend>, clock: Arc<dyn Clock>) -> Self {
        Self::with_cache(backend, 100, Duration::from_secs(3600), clock)
    }

    pub fn with_cache(
        backend: Arc<dyn ReportBackend>,
        cache_max_size: usize,
        cache_ttl: Duration,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let cache = LruCache::new(cache_max_size, cache_ttl, Arc::clone(&clock));
        Self {
            backend,
            cache,
            clock,
            auto_cleanup_days: 90,
        }
    }

    pub fn with_auto_cleanup_days(mut self, days: u32) -> Self {
        self.auto_cleanup_days = days;
        self
    }

    /// Persist a report. Returns its id.
    pub async fn save(&self, mut record: ReportRecord) -> Result<ReportId, StoreError> {
        let now = self.clock.epoch_secs();
        record.updated_at = now;
        if record.created_at == 0.0 {
            record.created_at = now;
        }
        self.backend.save(&record).await?;
        let report_id = record.report_id.clone();
        self.cache.put(record);
        Ok(report_id)
    }

    /// Fetch by id, cache first.
    pub async fn get(&self, report_id: &ReportId) -> Result<Option<ReportRecord>, StoreError> {
        if let Some(record) = self.cache.get(report_id) {
            return Ok(Some(record));
        }
        let record = self.backend.get(report_id).await?;
        if let Some(record) = &record {
            self.cache.put(record.clone());
        }
        Ok(record)
    }

    /// Apply a mutation to an existing report. Returns false if it does
    /// not exist. `created_at` survives whatever the mutation does.
    pub async fn update(
        &self,
        report_id: &ReportId,
        mutate: impl FnOnce(&mut ReportRecord) + Send,
    ) -> Result<bool, StoreError> {
        let Some(mut record) = self.backend.get(report_id).await? else {
            return Ok(false);
        };
        let created_at = record.created_at;
        mutate(&mut record);
        record.report_id = report_id.clone();
        record.created_at = created_at;
        record.updated_at = self.clock.epoch_secs();
        self.backend.save(&record).await?;
        self.cache.put(record);
        Ok(true)
    }

    /// Delete a report, invalidating its cache entry.
    pub async fn delete(&self, report_id: &ReportId) -> Result<bool, StoreError> {
        self.cache.invalidate(report_id);
        self.backend.delete(report_id).await
    }

    pub async fn list(
        &self,
        filters: &ReportFilters,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<ReportRecord>, StoreError> {
        self.backend.list(filters, limit, offset).await
    }

    pub async fn count(&self, scan_id: Option<&str>) -> Result<usize, StoreError> {
        self.backend.count(scan_id).await
    }

    /// Delete reports older than `max_age_days` (0 disables). Returns
    /// the count removed.
    pub async fn cleanup_old(&self, max_age_days: u32) -> Result<usize, StoreError> {
        if max_age_days == 0 {
            return Ok(0);
        }
        let cutoff = self.clock.epoch_secs() - max_age_days as f64 * 86_400.0;
        let removed = self.backend.cleanup_before(cutoff).await?;
        if removed > 0 {
            debug!(removed, max_age_days, "old reports cleaned up");
        }
        Ok(removed)
    }

    /// Run cleanup with the configured retention.
    pub async fn cleanup(&self) -> Result<usize, StoreError> {
        self.cleanup_old(self.auto_cleanup_days).await
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;
