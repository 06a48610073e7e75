// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::{AlertCondition, Cmp};
use sf_core::FakeClock;
use std::time::Duration;

fn engine() -> (AlertEngine, FakeClock) {
    let clock = FakeClock::new();
    (AlertEngine::new(Arc::new(clock.clone())), clock)
}

fn ip_rule() -> AlertRule {
    AlertRule::new("high-risk-ip", AlertSeverity::Medium)
        .with_condition(AlertCondition::event_type("IP_ADDRESS"))
        .with_condition(AlertCondition::severity(Cmp::Gte, 50.0))
}

fn ip_event(risk: i64) -> AlertContext {
    AlertContext::new()
        .set("event_type", "IP_ADDRESS")
        .set("risk_score", risk)
        .set("data", "1.2.3.4")
}

#[test]
fn process_event_fires_matching_rules() {
    let (engine, _clock) = engine();
    engine.add_rule(ip_rule());
    engine.add_rule(
        AlertRule::new("never", AlertSeverity::Low)
            .with_condition(AlertCondition::event_type("EMAILADDR")),
    );

    let fired = engine.process_event(&ip_event(60));
    assert_eq!(fired.len(), 1);
    assert_eq!(fired[0].rule_name, "high-risk-ip");
    assert_eq!(engine.alerts().len(), 1);
}

#[test]
fn cooldown_applies_across_process_calls() {
    let (engine, clock) = engine();
    engine.add_rule(ip_rule().with_cooldown(Duration::from_secs(1)));

    assert_eq!(engine.process_event(&ip_event(60)).len(), 1);
    assert_eq!(engine.process_event(&ip_event(60)).len(), 0);

    clock.advance(Duration::from_millis(1100));
    assert_eq!(engine.process_event(&ip_event(60)).len(), 1);
}

#[test]
fn handlers_receive_alerts_and_failures_are_isolated() {
    let (engine, _clock) = engine();
    engine.add_rule(ip_rule());

    let seen = Arc::new(Mutex::new(Vec::new()));
    engine.add_handler(|_alert| Err("handler down".to_string()));
    let sink = Arc::clone(&seen);
    engine.add_handler(move |alert| {
        sink.lock().push(alert.rule_name.clone());
        Ok(())
    });

    engine.process_event(&ip_event(60));
    assert_eq!(seen.lock().as_slice(), &["high-risk-ip".to_string()]);
}

#[test]
fn replacing_a_rule_resets_its_behavior() {
    let (engine, _clock) = engine();
    engine.add_rule(ip_rule().with_max_alerts(1));
    engine.process_event(&ip_event(60));
    assert_eq!(engine.process_event(&ip_event(60)).len(), 0);

    // Re-adding under the same name installs fresh counters.
    engine.add_rule(ip_rule().with_max_alerts(1));
    assert_eq!(engine.process_event(&ip_event(60)).len(), 1);
}

#[test]
fn set_rule_enabled_toggles_firing() {
    let (engine, _clock) = engine();
    engine.add_rule(ip_rule());

    assert!(engine.set_rule_enabled("high-risk-ip", false));
    assert_eq!(engine.process_event(&ip_event(60)).len(), 0);

    assert!(engine.set_rule_enabled("high-risk-ip", true));
    assert_eq!(engine.process_event(&ip_event(60)).len(), 1);

    assert!(!engine.set_rule_enabled("missing", true));
}

#[test]
fn history_is_bounded_to_most_recent() {
    let clock = FakeClock::new();
    let engine = AlertEngine::with_history(3, Arc::new(clock.clone()));
    engine.add_rule(ip_rule().with_message("risk {risk_score}"));

    for risk in [51, 52, 53, 54, 55] {
        engine.process_event(&ip_event(risk));
    }

    let messages: Vec<String> = engine.alerts().iter().map(|a| a.message.clone()).collect();
    assert_eq!(messages, vec!["risk 53", "risk 54", "risk 55"]);
}

#[test]
fn acknowledge_single_and_all() {
    let (engine, _clock) = engine();
    engine.add_rule(ip_rule());
    engine.process_event(&ip_event(60));
    engine.process_event(&ip_event(70));

    let first_id = engine.alerts()[0].id.clone();
    assert!(engine.acknowledge(&first_id));
    assert!(!engine.acknowledge(&AlertId::new("missing")));
    assert_eq!(engine.unacknowledged().len(), 1);

    engine.acknowledge_all();
    assert!(engine.unacknowledged().is_empty());
    // Acknowledgement does not delete.
    assert_eq!(engine.alerts().len(), 2);
}

#[test]
fn severity_filter_and_summary() {
    let (engine, _clock) = engine();
    engine.add_rule(ip_rule());
    engine.add_rule(
        AlertRule::new("critical-exposure", AlertSeverity::Critical)
            .with_condition(AlertCondition::severity(Cmp::Gte, 90.0)),
    );

    engine.process_event(&ip_event(95));

    assert_eq!(engine.alerts_by_severity(AlertSeverity::Critical).len(), 1);
    assert_eq!(engine.alerts_by_severity(AlertSeverity::Medium).len(), 1);
    assert_eq!(engine.alerts_by_severity(AlertSeverity::Low).len(), 0);

    let summary = engine.summary();
    assert_eq!(summary.total_rules, 2);
    assert_eq!(summary.enabled_rules, 2);
    assert_eq!(summary.total_alerts, 2);
    assert_eq!(summary.unacknowledged, 2);
    assert_eq!(summary.by_severity["critical"], 1);
    assert_eq!(summary.by_severity["medium"], 1);
    assert_eq!(summary.by_severity["info"], 0);
}

#[test]
fn reset_rearms_rules_and_clears_history() {
    let (engine, _clock) = engine();
    engine.add_rule(ip_rule().with_max_alerts(1));
    engine.process_event(&ip_event(60));
    assert_eq!(engine.process_event(&ip_event(60)).len(), 0);

    engine.reset();
    assert!(engine.alerts().is_empty());
    assert_eq!(engine.process_event(&ip_event(60)).len(), 1);
}

#[test]
fn rules_listing_describes_registrations() {
    let (engine, _clock) = engine();
    engine.add_rule(ip_rule().with_cooldown(Duration::from_secs(5)).with_max_alerts(3));

    let rules = engine.rules();
    assert_eq!(rules.len(), 1);
    let info = &rules[0];
    assert_eq!(info.name, "high-risk-ip");
    assert_eq!(info.severity, AlertSeverity::Medium);
    assert_eq!(info.cooldown_secs, 5.0);
    assert_eq!(info.max_alerts, 3);
    assert_eq!(info.conditions, vec!["event_type", "severity"]);
}

#[test]
fn remove_rule_stops_evaluation() {
    let (engine, _clock) = engine();
    engine.add_rule(ip_rule());
    assert!(engine.remove_rule("high-risk-ip"));
    assert!(!engine.remove_rule("high-risk-ip"));
    assert!(engine.process_event(&ip_event(60)).is_empty());
}
