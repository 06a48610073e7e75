// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Alert rule cooldown behavior.

use std::sync::Arc;
use std::time::Duration;

use sf_alerts::{AlertCondition, AlertContext, AlertEngine, AlertRule, AlertSeverity, Cmp};
use sf_core::FakeClock;

#[tokio::test]
async fn cooldown_gates_identical_back_to_back_events() {
    let clock = FakeClock::new();
    let engine = AlertEngine::new(Arc::new(clock.clone()));
    engine.add_rule(
        AlertRule::new("risky-ip", AlertSeverity::Medium)
            .with_cooldown(Duration::from_secs(1))
            .with_condition(AlertCondition::event_type("IP_ADDRESS"))
            .with_condition(AlertCondition::severity(Cmp::Gte, 50.0)),
    );

    let event = AlertContext::new()
        .set("event_type", "IP_ADDRESS")
        .set("risk_score", 60);

    // First fires, identical second is inside the cooldown.
    assert_eq!(engine.process_event(&event).len(), 1);
    assert_eq!(engine.process_event(&event).len(), 0);

    // Past the cooldown the rule fires again.
    clock.advance(Duration::from_millis(1100));
    assert_eq!(engine.process_event(&event).len(), 1);

    let alerts = engine.alerts();
    assert_eq!(alerts.len(), 2);
    assert!(alerts.iter().all(|a| a.severity == AlertSeverity::Medium));
}
