// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared helpers for the behavioral specs.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use sf_bus::{callback, BusError, EventBus, EventCallback, SubscriptionId};
use sf_core::{Backend, EventEnvelope};

pub fn envelope(topic: &str) -> EventEnvelope {
    let event_type = topic.rsplit('.').next().unwrap_or_default().to_string();
    EventEnvelope::new(topic, "scan1", event_type, "sfp_spec", "payload")
}

/// Callback that appends every delivered envelope to a shared vector.
pub fn recording_callback() -> (EventCallback, Arc<Mutex<Vec<EventEnvelope>>>) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let cb = callback(move |env| {
        let sink = Arc::clone(&sink);
        async move {
            sink.lock().push(env);
            Ok(())
        }
    });
    (cb, seen)
}

/// Wait for background dispatch loops to drain.
pub async fn settle() {
    tokio::time::sleep(Duration::from_millis(30)).await;
}

/// Inner bus whose publish always raises a transport error.
pub struct BrokenBus {
    connected: AtomicBool,
    pub publish_calls: AtomicU32,
}

impl BrokenBus {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            connected: AtomicBool::new(false),
            publish_calls: AtomicU32::new(0),
        })
    }
}

#[async_trait]
impl EventBus for BrokenBus {
    async fn connect(&self) -> Result<(), BusError> {
        self.connected.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn disconnect(&self) -> Result<(), BusError> {
        self.connected.store(false, Ordering::SeqCst);
        Ok(())
    }

    async fn publish(&self, _envelope: EventEnvelope) -> Result<bool, BusError> {
        self.publish_calls.fetch_add(1, Ordering::SeqCst);
        Err(BusError::Transport("backend unreachable".to_string()))
    }

    async fn subscribe(
        &self,
        _pattern: &str,
        _callback: EventCallback,
    ) -> Result<SubscriptionId, BusError> {
        Ok(SubscriptionId::new("broken-sub"))
    }

    async fn unsubscribe(&self, _subscription_id: &SubscriptionId) -> Result<(), BusError> {
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    fn backend(&self) -> Backend {
        Backend::Memory
    }
}
