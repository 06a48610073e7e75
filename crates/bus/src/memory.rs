// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-memory event bus.
//!
//! Default backend for development, tests, and single-instance
//! deployments. Each subscription owns a bounded queue drained by its own
//! dispatch task; publish enqueues to every matching queue. A full queue
//! fails delivery to that subscription only.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use parking_lot::Mutex;
use sf_core::{Backend, BusConfig, EventEnvelope, IdMint, RandomIds, TopicPattern};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::{BusError, EventBus, EventCallback, SubscriptionId};

struct Subscription {
    pattern: TopicPattern,
    queue: mpsc::Sender<EventEnvelope>,
    dispatch: JoinHandle<()>,
}

/// In-memory event bus using bounded tokio channels.
pub struct MemoryBus {
    config: BusConfig,
    running: AtomicBool,
    subs: Mutex<HashMap<SubscriptionId, Subscription>>,
    ids: RandomIds,
}

impl MemoryBus {
    pub fn new(config: BusConfig) -> Self {
        Self {
            config,
            running: AtomicBool::new(false),
            subs: Mutex::new(HashMap::new()),
            ids: RandomIds,
        }
    }

    /// Total number of active subscriptions.
    pub fn subscriber_count(&self) -> usize {
        self.subs.lock().len()
    }

    /// Number of distinct patterns with subscribers.
    pub fn topic_count(&self) -> usize {
        let subs = self.subs.lock();
        let mut patterns: Vec<&str> = subs.values().map(|s| s.pattern.as_str()).collect();
        patterns.sort_unstable();
        patterns.dedup();
        patterns.len()
    }

    /// Pending event count for a subscription (0 if unknown).
    pub fn queue_depth(&self, subscription_id: &SubscriptionId) -> usize {
        let subs = self.subs.lock();
        subs.get(subscription_id)
            .map(|s| s.queue.max_capacity() - s.queue.capacity())
            .unwrap_or(0)
    }
}

#[async_trait]
impl EventBus for MemoryBus {
    async fn connect(&self) -> Result<(), BusError> {
        self.running.store(true, Ordering::SeqCst);
        debug!("in-memory event bus connected");
        Ok(())
    }

    async fn disconnect(&self) -> Result<(), BusError> {
        self.running.store(false, Ordering::SeqCst);
        let drained: Vec<Subscription> = {
            let mut subs = self.subs.lock();
            subs.drain().map(|(_, sub)| sub).collect()
        };
        for sub in drained {
            sub.dispatch.abort();
        }
        debug!("in-memory event bus disconnected");
        Ok(())
    }

    async fn publish(&self, envelope: EventEnvelope) -> Result<bool, BusError> {
        if !self.running.load(Ordering::SeqCst) {
            return Err(BusError::NotConnected);
        }

        let matching: Vec<(SubscriptionId, mpsc::Sender<EventEnvelope>)> = {
            let subs = self.subs.lock();
            subs.iter()
                .filter(|(_, sub)| sub.pattern.matches(&envelope.topic))
                .map(|(id, sub)| (id.clone(), sub.queue.clone()))
                .collect()
        };

        let mut delivered = false;
        for (sub_id, queue) in matching {
            match queue.try_send(envelope.clone()) {
                Ok(()) => delivered = true,
                Err(mpsc::error::TrySendError::Full(_)) => {
                    warn!(
                        subscription = %sub_id.short(8),
                        topic = %envelope.topic,
                        "subscription queue full, dropping delivery"
                    );
                }
                Err(mpsc::error::TrySendError::Closed(_)) => {
                    debug!(subscription = %sub_id.short(8), "queue closed mid-publish");
                }
            }
        }

        Ok(delivered)
    }

    async fn subscribe(
        &self,
        pattern: &str,
        callback: EventCallback,
    ) -> Result<SubscriptionId, BusError> {
        let pattern = TopicPattern::parse(pattern)?;
        let sub_id = SubscriptionId::new(self.ids.mint());
        let (tx, mut rx) = mpsc::channel::<EventEnvelope>(self.config.queue_capacity());

        let loop_id = sub_id.clone();
        let dispatch = tokio::spawn(async move {
            while let Some(envelope) = rx.recv().await {
                let topic = envelope.topic.clone();
                if let Err(e) = (callback)(envelope).await {
                    warn!(
                        subscription = %loop_id.short(8),
                        topic = %topic,
                        error = %e,
                        "subscriber callback failed"
                    );
                }
            }
        });

        debug!(subscription = %sub_id.short(8), pattern = %pattern, "subscribed");
        self.subs.lock().insert(
            sub_id.clone(),
            Subscription {
                pattern,
                queue: tx,
                dispatch,
            },
        );
        Ok(sub_id)
    }

    async fn unsubscribe(&self, subscription_id: &SubscriptionId) -> Result<(), BusError> {
        let removed = self.subs.lock().remove(subscription_id);
        if let Some(sub) = removed {
            sub.dispatch.abort();
            debug!(subscription = %subscription_id.short(8), "unsubscribed");
        }
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    fn backend(&self) -> Backend {
        Backend::Memory
    }
}

#[cfg(test)]
#[path = "memory_tests.rs"]
mod tests;
