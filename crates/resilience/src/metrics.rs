// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Counters for event bus operations.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use parking_lot::Mutex;
use serde::Serialize;
use sf_core::Clock;

/// Per-topic publish count for the snapshot's fanout table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TopicCount {
    pub topic: String,
    pub count: u64,
}

/// Counters plus derived rates, taken under one lock acquisition.
#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    pub published: u64,
    pub publish_failed: u64,
    pub consumed: u64,
    pub consume_errors: u64,
    pub circuit_opened: u64,
    pub circuit_closed: u64,
    pub dlq_added: u64,
    pub dlq_replayed: u64,
    pub retries: u64,
    pub uptime_seconds: f64,
    pub publish_rate_per_sec: f64,
    /// Ten busiest topics, descending.
    pub top_topics: Vec<TopicCount>,
}

#[derive(Default)]
struct Counters {
    published: u64,
    publish_failed: u64,
    consumed: u64,
    consume_errors: u64,
    circuit_opened: u64,
    circuit_closed: u64,
    dlq_added: u64,
    dlq_replayed: u64,
    retries: u64,
}

struct MetricsInner {
    counters: Counters,
    topics: HashMap<String, u64>,
    started: Instant,
}

/// Thread-safe metrics collector.
pub struct BusMetrics {
    clock: Arc<dyn Clock>,
    inner: Mutex<MetricsInner>,
}

impl BusMetrics {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        let started = clock.now();
        Self {
            clock,
            inner: Mutex::new(MetricsInner {
                counters: Counters::default(),
                topics: HashMap::new(),
                started,
            }),
        }
    }

    pub fn inc_published(&self) {
        self.inner.lock().counters.published += 1;
    }

    pub fn inc_publish_failed(&self) {
        self.inner.lock().counters.publish_failed += 1;
    }

    pub fn inc_consumed(&self) {
        self.inner.lock().counters.consumed += 1;
    }

    pub fn inc_consume_errors(&self) {
        self.inner.lock().counters.consume_errors += 1;
    }

    pub fn inc_circuit_opened(&self) {
        self.inner.lock().counters.circuit_opened += 1;
    }

    pub fn inc_circuit_closed(&self) {
        self.inner.lock().counters.circuit_closed += 1;
    }

    pub fn inc_dlq_added(&self) {
        self.inner.lock().counters.dlq_added += 1;
    }

    pub fn add_dlq_replayed(&self, count: u64) {
        self.inner.lock().counters.dlq_replayed += count;
    }

    pub fn inc_retries(&self) {
        self.inner.lock().counters.retries += 1;
    }

    /// Record topic fanout for a successful publish.
    pub fn inc_topic(&self, topic: &str) {
        let mut inner = self.inner.lock();
        *inner.topics.entry(topic.to_string()).or_insert(0) += 1;
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        let inner = self.inner.lock();
        let uptime = self.clock.now().duration_since(inner.started).as_secs_f64();
        let rate = if uptime > 0.0 {
            inner.counters.published as f64 / uptime
        } else {
            0.0
        };

        let mut top: Vec<TopicCount> = inner
            .topics
            .iter()
            .map(|(topic, count)| TopicCount {
                topic: topic.clone(),
                count: *count,
            })
            .collect();
        top.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.topic.cmp(&b.topic)));
        top.truncate(10);

        MetricsSnapshot {
            published: inner.counters.published,
            publish_failed: inner.counters.publish_failed,
            consumed: inner.counters.consumed,
            consume_errors: inner.counters.consume_errors,
            circuit_opened: inner.counters.circuit_opened,
            circuit_closed: inner.counters.circuit_closed,
            dlq_added: inner.counters.dlq_added,
            dlq_replayed: inner.counters.dlq_replayed,
            retries: inner.counters.retries,
            uptime_seconds: uptime,
            publish_rate_per_sec: rate,
            top_topics: top,
        }
    }

    pub fn reset(&self) {
        let mut inner = self.inner.lock();
        inner.counters = Counters::default();
        inner.topics.clear();
        inner.started = self.clock.now();
    }
}

#[cfg(test)]
#[path = "metrics_tests.rs"]
mod tests;
