// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::callback;
use std::sync::Arc;
use std::time::Duration;

fn envelope(topic: &str) -> EventEnvelope {
    let event_type = topic.rsplit('.').next().unwrap_or_default().to_string();
    EventEnvelope::new(topic, "scan1", event_type, "sfp_test", "data")
}

/// Collects delivered envelopes for assertions.
fn recording_callback() -> (EventCallback, Arc<Mutex<Vec<EventEnvelope>>>) {
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

async fn settle() {
    // Let dispatch loops drain their queues.
    tokio::time::sleep(Duration::from_millis(20)).await;
}

#[tokio::test]
async fn publish_before_connect_is_a_transport_error() {
    let bus = MemoryBus::new(BusConfig::default());
    let err = bus.publish(envelope("sf.scan1.IP_ADDRESS")).await.unwrap_err();
    assert!(matches!(err, BusError::NotConnected));
}

#[tokio::test]
async fn publish_without_subscribers_returns_false() {
    let bus = MemoryBus::new(BusConfig::default());
    bus.connect().await.unwrap();
    let delivered = bus.publish(envelope("sf.scan1.IP_ADDRESS")).await.unwrap();
    assert!(!delivered);
}

#[tokio::test]
async fn wildcard_subscription_receives_matching_topics_in_order() {
    let bus = MemoryBus::new(BusConfig::default());
    bus.connect().await.unwrap();

    let (cb, seen) = recording_callback();
    bus.subscribe("sf.scan1.*", cb).await.unwrap();

    bus.publish(envelope("sf.scan1.IP_ADDRESS")).await.unwrap();
    bus.publish(envelope("sf.scan1.DOMAIN_NAME")).await.unwrap();
    bus.publish(envelope("sf.scan2.IP_ADDRESS")).await.unwrap();
    settle().await;

    let topics: Vec<String> = seen.lock().iter().map(|e| e.topic.clone()).collect();
    assert_eq!(topics, vec!["sf.scan1.IP_ADDRESS", "sf.scan1.DOMAIN_NAME"]);
}

#[tokio::test]
async fn round_trip_preserves_envelope_fields() {
    let bus = MemoryBus::new(BusConfig::default());
    bus.connect().await.unwrap();

    let (cb, seen) = recording_callback();
    bus.subscribe("sf.scan1.IP_ADDRESS", cb).await.unwrap();

    let sent = envelope("sf.scan1.IP_ADDRESS")
        .with_risk(42)
        .with_timestamp(1_700_000_000.25)
        .with_metadata("k", serde_json::json!([1, 2]));
    bus.publish(sent.clone()).await.unwrap();
    settle().await;

    assert_eq!(seen.lock().as_slice(), &[sent]);
}

#[tokio::test]
async fn multiple_subscribers_each_receive_once() {
    let bus = MemoryBus::new(BusConfig::default());
    bus.connect().await.unwrap();

    let (cb1, seen1) = recording_callback();
    let (cb2, seen2) = recording_callback();
    bus.subscribe("sf.scan1.IP_ADDRESS", cb1).await.unwrap();
    bus.subscribe("sf.>", cb2).await.unwrap();

    let delivered = bus.publish(envelope("sf.scan1.IP_ADDRESS")).await.unwrap();
    settle().await;

    assert!(delivered);
    assert_eq!(seen1.lock().len(), 1);
    assert_eq!(seen2.lock().len(), 1);
}

#[tokio::test]
async fn unsubscribe_stops_delivery_and_is_idempotent() {
    let bus = MemoryBus::new(BusConfig::default());
    bus.connect().await.unwrap();

    let (cb, seen) = recording_callback();
    let sub_id = bus.subscribe("sf.scan1.*", cb).await.unwrap();
    bus.publish(envelope("sf.scan1.IP_ADDRESS")).await.unwrap();
    settle().await;

    bus.unsubscribe(&sub_id).await.unwrap();
    // Second call is a no-op.
    bus.unsubscribe(&sub_id).await.unwrap();

    let delivered = bus.publish(envelope("sf.scan1.IP_ADDRESS")).await.unwrap();
    settle().await;

    assert!(!delivered);
    assert_eq!(seen.lock().len(), 1);
}

#[tokio::test]
async fn full_queue_fails_only_that_subscription() {
    let config = BusConfig {
        batch_size: 0, // queue capacity floor of 10
        ..BusConfig::default()
    };
    let bus = MemoryBus::new(config);
    bus.connect().await.unwrap();

    // A stalled subscriber whose callback never completes.
    let stalled = callback(|_env| async {
        tokio::time::sleep(Duration::from_secs(3600)).await;
        Ok(())
    });
    let stalled_id = bus.subscribe("sf.scan1.*", stalled).await.unwrap();
    let (cb, seen) = recording_callback();
    bus.subscribe("sf.scan1.*", cb).await.unwrap();

    // One in-flight + 10 queued saturates the stalled subscription.
    for _ in 0..12 {
        bus.publish(envelope("sf.scan1.IP_ADDRESS")).await.unwrap();
    }
    settle().await;

    // The healthy subscriber saw everything; the stalled queue is
    // saturated (one delivery may be in flight).
    assert_eq!(seen.lock().len(), 12);
    assert!(bus.queue_depth(&stalled_id) >= 9);
}

#[tokio::test]
async fn callback_errors_are_contained() {
    let bus = MemoryBus::new(BusConfig::default());
    bus.connect().await.unwrap();

    let calls = Arc::new(Mutex::new(0u32));
    let counter = Arc::clone(&calls);
    let failing = callback(move |_env| {
        let counter = Arc::clone(&counter);
        async move {
            *counter.lock() += 1;
            Err(crate::SubscriberError::new("boom"))
        }
    });
    bus.subscribe("sf.scan1.*", failing).await.unwrap();

    bus.publish(envelope("sf.scan1.IP_ADDRESS")).await.unwrap();
    bus.publish(envelope("sf.scan1.IP_ADDRESS")).await.unwrap();
    settle().await;

    // Both deliveries ran; the error did not kill the dispatch loop.
    assert_eq!(*calls.lock(), 2);
}

#[tokio::test]
async fn disconnect_tears_down_subscriptions() {
    let bus = MemoryBus::new(BusConfig::default());
    bus.connect().await.unwrap();

    let (cb, _seen) = recording_callback();
    bus.subscribe("sf.>", cb).await.unwrap();
    assert_eq!(bus.subscriber_count(), 1);

    bus.disconnect().await.unwrap();
    assert!(!bus.is_connected());
    assert_eq!(bus.subscriber_count(), 0);

    // Reconnect is idempotent and starts clean.
    bus.connect().await.unwrap();
    assert!(bus.is_connected());
    let delivered = bus.publish(envelope("sf.scan1.IP_ADDRESS")).await.unwrap();
    assert!(!delivered);
}

#[tokio::test]
async fn topic_count_dedupes_patterns() {
    let bus = MemoryBus::new(BusConfig::default());
    bus.connect().await.unwrap();

    let (cb1, _) = recording_callback();
    let (cb2, _) = recording_callback();
    let (cb3, _) = recording_callback();
    bus.subscribe("sf.scan1.*", cb1).await.unwrap();
    bus.subscribe("sf.scan1.*", cb2).await.unwrap();
    bus.subscribe("sf.scan2.*", cb3).await.unwrap();

    assert_eq!(bus.subscriber_count(), 3);
    assert_eq!(bus.topic_count(), 2);
}

#[tokio::test]
async fn invalid_pattern_is_rejected_at_subscribe() {
    let bus = MemoryBus::new(BusConfig::default());
    bus.connect().await.unwrap();
    let (cb, _) = recording_callback();
    let err = bus.subscribe("sf.>.IP_ADDRESS", cb).await.unwrap_err();
    assert!(matches!(err, BusError::InvalidPattern(_)));
}
