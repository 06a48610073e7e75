// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use serde_json::json;

fn sample() -> EventEnvelope {
    EventEnvelope::new(
        "sf.scan1.IP_ADDRESS",
        "scan1",
        "IP_ADDRESS",
        "sfp_dnsresolve",
        "1.2.3.4",
    )
}

#[test]
fn defaults_match_contract() {
    let env = sample();
    assert_eq!(env.source_event_hash, ROOT_EVENT_HASH);
    assert_eq!(env.confidence, 100);
    assert_eq!(env.visibility, 100);
    assert_eq!(env.risk, 0);
    assert_eq!(env.timestamp, 0.0);
    assert!(env.metadata.is_empty());
}

#[test]
fn scores_clamp_to_100() {
    let env = sample().with_scores(200, 150, 255);
    assert_eq!(env.confidence, 100);
    assert_eq!(env.visibility, 100);
    assert_eq!(env.risk, 100);
}

#[test]
fn serde_round_trip_preserves_all_fields() {
    let env = sample()
        .with_risk(60)
        .with_timestamp(1_700_000_000.5)
        .with_metadata("source", json!("passive"))
        .with_source_event_hash("abc123");
    let json = serde_json::to_string(&env).unwrap();
    let back: EventEnvelope = serde_json::from_str(&json).unwrap();
    assert_eq!(back, env);
}

#[test]
fn text_data_round_trips_as_string() {
    let json = serde_json::to_value(&EnvelopeData::Text("raw".into())).unwrap();
    assert_eq!(json, json!("raw"));
    let back: EnvelopeData = serde_json::from_value(json).unwrap();
    assert_eq!(back, EnvelopeData::Text("raw".into()));
}

#[test]
fn structured_data_round_trips_as_object() {
    let data = EnvelopeData::Structured(json!({"host": "example.com", "port": 443}));
    let json = serde_json::to_value(&data).unwrap();
    let back: EnvelopeData = serde_json::from_value(json).unwrap();
    assert_eq!(back, data);
}

#[test]
fn wire_string_renders_both_variants() {
    assert_eq!(EnvelopeData::Text("abc".into()).to_wire_string(), "abc");
    assert_eq!(
        EnvelopeData::Structured(json!({"a": 1})).to_wire_string(),
        "{\"a\":1}"
    );
}

#[test]
fn fingerprint_is_stable_over_identity_fields() {
    let a = sample();
    let b = sample().with_risk(99).with_timestamp(123.0);
    // Topic/scores/timestamp do not change the fingerprint.
    assert_eq!(a.fingerprint(), b.fingerprint());
}

#[test]
fn fingerprint_differs_by_module() {
    let a = sample();
    let mut b = sample();
    b.module = "sfp_other".into();
    assert_ne!(a.fingerprint(), b.fingerprint());
}

#[test]
fn fingerprint_differs_by_data() {
    let a = sample();
    let b = EventEnvelope::new(
        "sf.scan1.IP_ADDRESS",
        "scan1",
        "IP_ADDRESS",
        "sfp_dnsresolve",
        "5.6.7.8",
    );
    assert_ne!(a.fingerprint(), b.fingerprint());
}
