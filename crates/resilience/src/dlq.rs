// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Dead-letter queue for envelopes the middleware could not deliver.
//!
//! Bounded FIFO: at capacity, the oldest entry is dropped on insert.

use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::Serialize;
use sf_core::{Clock, EventEnvelope};

/// A failed publish captured for later inspection or replay.
#[derive(Debug, Clone, Serialize)]
pub struct DeadLetterEntry {
    pub envelope: EventEnvelope,
    pub error: String,
    /// Epoch seconds when the entry was captured.
    pub timestamp: f64,
    /// Publish attempts made before dead-lettering (0 for circuit rejects).
    pub attempts: u32,
}

struct DlqInner {
    items: VecDeque<DeadLetterEntry>,
    total_added: u64,
}

/// Bounded store of undeliverable envelopes.
pub struct DeadLetterQueue {
    max_size: usize,
    clock: Arc<dyn Clock>,
    inner: Mutex<DlqInner>,
}

impl DeadLetterQueue {
    pub fn new(max_size: usize, clock: Arc<dyn Clock>) -> Self {
        Self {
            max_size: max_size.max(1),
            clock,
            inner: Mutex::new(DlqInner {
                items: VecDeque::new(),
                total_added: 0,
            }),
        }
    }

    /// Capture a failed envelope. Drops the oldest entry at capacity.
    pub fn push(&self, envelope: EventEnvelope, error: impl Into<String>, attempts: u32) {
        let entry = DeadLetterEntry {
            envelope,
            error: error.into(),
            timestamp: self.clock.epoch_secs(),
            attempts,
        };
        let mut inner = self.inner.lock();
        if inner.items.len() >= self.max_size {
            inner.items.pop_front();
        }
        inner.items.push_back(entry);
        inner.total_added += 1;
    }

    /// Re-append an entry after a failed replay. Does not count as a new
    /// addition.
    pub fn requeue(&self, entry: DeadLetterEntry) {
        let mut inner = self.inner.lock();
        if inner.items.len() >= self.max_size {
            inner.items.pop_front();
        }
        inner.items.push_back(entry);
    }

    /// Remove and return the oldest entry.
    pub fn pop(&self) -> Option<DeadLetterEntry> {
        self.inner.lock().items.pop_front()
    }

    /// The `n` most recent entries, oldest of them first.
    pub fn peek(&self, n: usize) -> Vec<DeadLetterEntry> {
        let inner = self.inner.lock();
        let skip = inner.items.len().saturating_sub(n);
        inner.items.iter().skip(skip).cloned().collect()
    }

    /// Drop everything; returns the number of entries removed.
    pub fn clear(&self) -> usize {
        let mut inner = self.inner.lock();
        let count = inner.items.len();
        inner.items.clear();
        count
    }

    pub fn len(&self) -> usize {
        self.inner.lock().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().items.is_empty()
    }

    /// Lifetime count of entries captured (replay requeues excluded).
    pub fn total_added(&self) -> u64 {
        self.inner.lock().total_added
    }
}

#[cfg(test)]
#[path = "dlq_tests.rs"]
mod tests;
