// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Pub/sub routing through the in-memory backend.

use crate::prelude::*;
use sf_bus::{EventBus, MemoryBus};
use sf_core::BusConfig;

#[tokio::test]
async fn wildcard_subscription_sees_only_its_scan_in_order() {
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
async fn tail_wildcard_alone_matches_everything() {
    let bus = MemoryBus::new(BusConfig::default());
    bus.connect().await.unwrap();

    let (cb, seen) = recording_callback();
    bus.subscribe(">", cb).await.unwrap();

    for topic in ["sf.scan1.IP_ADDRESS", "sf.scan2.DOMAIN_NAME", "other.x.y"] {
        bus.publish(envelope(topic)).await.unwrap();
    }
    settle().await;

    assert_eq!(seen.lock().len(), 3);
}

#[tokio::test]
async fn round_trip_preserves_every_field() {
    let bus = MemoryBus::new(BusConfig::default());
    bus.connect().await.unwrap();

    let (cb, seen) = recording_callback();
    bus.subscribe("sf.scan1.IP_ADDRESS", cb).await.unwrap();

    let sent = envelope("sf.scan1.IP_ADDRESS")
        .with_scores(90, 80, 70)
        .with_timestamp(1_700_000_000.125)
        .with_source_event_hash("abcd1234")
        .with_metadata("chain_depth", serde_json::json!(3));
    bus.publish(sent.clone()).await.unwrap();
    settle().await;

    assert_eq!(seen.lock().as_slice(), &[sent]);
}
