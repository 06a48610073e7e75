// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Middleware behavior against a failing backend.

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use crate::prelude::*;
use sf_bus::EventBus;
use sf_core::FakeClock;
use sf_resilience::{CircuitState, ResilientBus, ResilientConfig};

fn config() -> ResilientConfig {
    ResilientConfig {
        max_publish_retries: 1,
        retry_backoff_base: Duration::from_millis(1),
        circuit_failure_threshold: 2,
        circuit_recovery_timeout: Duration::from_millis(100),
        circuit_half_open_max: 1,
        dlq_max_size: 100,
        health_check_interval: Duration::ZERO,
    }
}

#[tokio::test]
async fn failing_backend_trips_circuit_and_dead_letters_everything() {
    let inner = BrokenBus::new();
    let clock = FakeClock::new();
    let bus = ResilientBus::new(
        Arc::clone(&inner) as Arc<dyn EventBus>,
        config(),
        Arc::new(clock.clone()),
    );
    bus.connect().await.unwrap();

    // First two publishes attempt the backend and fail.
    assert!(!bus.publish(envelope("sf.scan1.A")).await.unwrap());
    assert!(!bus.publish(envelope("sf.scan1.B")).await.unwrap());
    assert_eq!(inner.publish_calls.load(Ordering::SeqCst), 2);
    assert_eq!(bus.circuit().state(), CircuitState::Open);

    // Third is rejected at admission: no backend call, reason recorded.
    assert!(!bus.publish(envelope("sf.scan1.C")).await.unwrap());
    assert_eq!(inner.publish_calls.load(Ordering::SeqCst), 2);

    assert_eq!(bus.dlq().len(), 3);
    let entries = bus.dlq().peek(3);
    assert!(entries[0].error.contains("backend unreachable"));
    assert!(entries[1].error.contains("backend unreachable"));
    assert_eq!(entries[2].error, "circuit_open");
    assert_eq!(entries[2].attempts, 0);

    // After the recovery window the circuit half-opens for a probe.
    clock.advance(Duration::from_millis(150));
    assert_eq!(bus.circuit().state(), CircuitState::HalfOpen);
}

#[tokio::test]
async fn dlq_drops_oldest_at_capacity() {
    let inner = BrokenBus::new();
    let mut cfg = config();
    cfg.dlq_max_size = 2;
    cfg.circuit_failure_threshold = 100; // keep the circuit closed
    let bus = ResilientBus::new(
        inner as Arc<dyn EventBus>,
        cfg,
        Arc::new(FakeClock::new()),
    );
    bus.connect().await.unwrap();

    for topic in ["sf.s.A", "sf.s.B", "sf.s.C"] {
        bus.publish(envelope(topic)).await.unwrap();
    }

    assert_eq!(bus.dlq().len(), 2);
    let kinds: Vec<String> = bus
        .dlq()
        .peek(10)
        .iter()
        .map(|e| e.envelope.event_type.clone())
        .collect();
    assert_eq!(kinds, vec!["B", "C"]);
    assert_eq!(bus.dlq().total_added(), 3);
}
