// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use sf_core::FakeClock;
use std::time::Duration;

fn metrics() -> (BusMetrics, FakeClock) {
    let clock = FakeClock::new();
    (BusMetrics::new(Arc::new(clock.clone())), clock)
}

#[test]
fn counters_accumulate() {
    let (m, _clock) = metrics();
    m.inc_published();
    m.inc_published();
    m.inc_publish_failed();
    m.inc_consumed();
    m.inc_consume_errors();
    m.inc_retries();
    m.inc_dlq_added();
    m.add_dlq_replayed(3);

    let snap = m.snapshot();
    assert_eq!(snap.published, 2);
    assert_eq!(snap.publish_failed, 1);
    assert_eq!(snap.consumed, 1);
    assert_eq!(snap.consume_errors, 1);
    assert_eq!(snap.retries, 1);
    assert_eq!(snap.dlq_added, 1);
    assert_eq!(snap.dlq_replayed, 3);
}

#[test]
fn publish_rate_uses_uptime() {
    let (m, clock) = metrics();
    for _ in 0..10 {
        m.inc_published();
    }
    clock.advance(Duration::from_secs(5));
    let snap = m.snapshot();
    assert_eq!(snap.uptime_seconds, 5.0);
    assert_eq!(snap.publish_rate_per_sec, 2.0);
}

#[test]
fn top_topics_sorted_and_capped() {
    let (m, _clock) = metrics();
    for n in 0..15 {
        let topic = format!("sf.scan1.T{n:02}");
        for _ in 0..=n {
            m.inc_topic(&topic);
        }
    }
    let snap = m.snapshot();
    assert_eq!(snap.top_topics.len(), 10);
    assert_eq!(snap.top_topics[0].topic, "sf.scan1.T14");
    assert_eq!(snap.top_topics[0].count, 15);
    // Strictly non-increasing counts.
    for pair in snap.top_topics.windows(2) {
        assert!(pair[0].count >= pair[1].count);
    }
}

#[test]
fn reset_zeroes_everything() {
    let (m, clock) = metrics();
    m.inc_published();
    m.inc_topic("sf.scan1.X");
    clock.advance(Duration::from_secs(10));
    m.reset();

    let snap = m.snapshot();
    assert_eq!(snap.published, 0);
    assert!(snap.top_topics.is_empty());
    assert_eq!(snap.uptime_seconds, 0.0);
}
