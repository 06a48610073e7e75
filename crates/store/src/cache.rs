// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! LRU cache with TTL expiry for report reads.

use std::sync::Arc;
use std::time::{Duration, Instant};

use indexmap::IndexMap;
use parking_lot::Mutex;
use serde::Serialize;
use sf_core::Clock;

use crate::{ReportId, ReportRecord};

/// Hit/miss counters for the cache.
#[derive(Debug, Clone, Serialize)]
pub struct CacheStats {
    pub size: usize,
    pub max_size: usize,
    pub hits: u64,
    pub misses: u64,
    pub hit_rate: f64,
}

struct CacheInner {
    // Insertion order doubles as recency order: entries move to the back
    // on access.
    entries: IndexMap<ReportId, (ReportRecord, Instant)>,
    hits: u64,
    misses: u64,
}

/// Thread-safe LRU cache with TTL expiration.
///
/// TTL of zero disables expiry; eviction on size cap drops the least
/// recently used entry.
pub struct LruCache {
    max_size: usize,
    ttl: Duration,
    clock: Arc<dyn Clock>,
    inner: Mutex<CacheInner>,
}

impl LruCache {
    pub fn new(max_size: usize, ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            max_size: max_size.max(1),
            ttl,
            clock,
            inner: Mutex::new(CacheInner {
                entries: IndexMap::new(),
                hits: 0,
                misses: 0,
            }),
        }
    }

    /// Fetch a record; expired entries are removed and count as misses.
    pub fn get(&self, report_id: &ReportId) -> Option<ReportRecord> {
        let mut inner = self.inner.lock();
        let Some((record, stored_at)) = inner.entries.get(report_id).cloned() else {
            inner.misses += 1;
            return None;
        };

        if self.ttl > Duration::ZERO && self.clock.now().duration_since(stored_at) > self.ttl {
            inner.entries.shift_remove(report_id);
            inner.misses += 1;
            return None;
        }

        // Refresh recency.
        inner.entries.shift_remove(report_id);
        inner.entries.insert(report_id.clone(), (record.clone(), stored_at));
        inner.hits += 1;
        Some(record)
    }

    /// Insert or refresh a record, evicting the least recently used
    /// entry at capacity.
    pub fn put(&self, record: ReportRecord) {
        let mut inner = self.inner.lock();
        let key = record.report_id.clone();
        inner.entries.shift_remove(&key);
        if inner.entries.len() >= self.max_size {
            inner.entries.shift_remove_index(0);
        }
        inner.entries.insert(key, (record, self.clock.now()));
    }

    /// Drop a record. Returns true if it was cached.
    pub fn invalidate(&self, report_id: &ReportId) -> bool {
        self.inner.lock().entries.shift_remove(report_id).is_some()
    }

    pub fn clear(&self) {
        let mut inner = self.inner.lock();
        inner.entries.clear();
        inner.hits = 0;
        inner.misses = 0;
    }

    pub fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().entries.is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        let inner = self.inner.lock();
        let total = inner.hits + inner.misses;
        CacheStats {
            size: inner.entries.len(),
            max_size: self.max_size,
            hits: inner.hits,
            misses: inner.misses,
            hit_rate: if total > 0 {
                inner.hits as f64 / total as f64 * 100.0
            } else {
                0.0
            },
        }
    }
}

#[cfg(test)]
#[path = "cache_tests.rs"]
mod tests;
