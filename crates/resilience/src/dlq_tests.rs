// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use sf_core::FakeClock;

fn envelope(n: u32) -> EventEnvelope {
    EventEnvelope::new(
        format!("sf.scan1.E{n}"),
        "scan1",
        format!("E{n}"),
        "sfp_test",
        "data",
    )
}

fn dlq(max: usize) -> DeadLetterQueue {
    DeadLetterQueue::new(max, Arc::new(FakeClock::new()))
}

#[test]
fn push_and_pop_fifo() {
    let q = dlq(10);
    q.push(envelope(1), "boom", 3);
    q.push(envelope(2), "boom", 3);

    let first = q.pop().unwrap();
    assert_eq!(first.envelope.event_type, "E1");
    assert_eq!(first.error, "boom");
    assert_eq!(first.attempts, 3);
    assert_eq!(first.timestamp, 1_700_000_000.0);

    assert_eq!(q.pop().unwrap().envelope.event_type, "E2");
    assert!(q.pop().is_none());
}

#[test]
fn capacity_drops_oldest() {
    let q = dlq(3);
    for n in 1..=5 {
        q.push(envelope(n), "err", 1);
    }
    assert_eq!(q.len(), 3);
    let kinds: Vec<String> = q.peek(10).iter().map(|e| e.envelope.event_type.clone()).collect();
    assert_eq!(kinds, vec!["E3", "E4", "E5"]);
    assert_eq!(q.total_added(), 5);
}

#[test]
fn peek_returns_most_recent_without_removing() {
    let q = dlq(10);
    for n in 1..=4 {
        q.push(envelope(n), "err", 1);
    }
    let kinds: Vec<String> = q.peek(2).iter().map(|e| e.envelope.event_type.clone()).collect();
    assert_eq!(kinds, vec!["E3", "E4"]);
    assert_eq!(q.len(), 4);
}

#[test]
fn clear_reports_count() {
    let q = dlq(10);
    q.push(envelope(1), "err", 1);
    q.push(envelope(2), "err", 1);
    assert_eq!(q.clear(), 2);
    assert!(q.is_empty());
    // Lifetime counter is unaffected by clears.
    assert_eq!(q.total_added(), 2);
}

#[test]
fn requeue_does_not_count_as_added() {
    let q = dlq(10);
    q.push(envelope(1), "err", 2);
    let entry = q.pop().unwrap();
    q.requeue(entry);
    assert_eq!(q.len(), 1);
    assert_eq!(q.total_added(), 1);
}
