// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use serde_json::json;

fn ctx() -> AlertContext {
    AlertContext::new()
        .set("event_type", "IP_ADDRESS")
        .set("data", "malware.example.com resolved to 1.2.3.4")
        .set("risk_score", 60)
}

#[yare::parameterized(
    gte = { "gte", Cmp::Gte },
    lte = { "lte", Cmp::Lte },
    gt  = { "gt", Cmp::Gt },
    lt  = { "lt", Cmp::Lt },
    eq  = { "eq", Cmp::Eq },
)]
fn cmp_from_str(input: &str, expected: Cmp) {
    assert_eq!(input.parse::<Cmp>().unwrap(), expected);
}

#[test]
fn unknown_operator_rejected_at_parse() {
    let err = "contains".parse::<Cmp>().unwrap_err();
    assert!(matches!(err, AlertError::UnknownOperator(_)));
}

#[yare::parameterized(
    gte_equal = { Cmp::Gte, 50.0, 50.0, true },
    gte_above = { Cmp::Gte, 60.0, 50.0, true },
    gte_below = { Cmp::Gte, 40.0, 50.0, false },
    lte_below = { Cmp::Lte, 40.0, 50.0, true },
    gt_equal  = { Cmp::Gt, 50.0, 50.0, false },
    lt_below  = { Cmp::Lt, 40.0, 50.0, true },
    eq_match  = { Cmp::Eq, 50.0, 50.0, true },
    eq_differ = { Cmp::Eq, 50.1, 50.0, false },
)]
fn cmp_semantics(cmp: Cmp, actual: f64, expected: f64, outcome: bool) {
    assert_eq!(cmp.compare(actual, expected), outcome);
}

#[test]
fn event_type_condition_is_exact() {
    let cond = AlertCondition::event_type("IP_ADDRESS");
    assert!(cond.evaluate(&ctx()));
    assert!(!cond.evaluate(&AlertContext::new().set("event_type", "DOMAIN_NAME")));
    assert!(!cond.evaluate(&AlertContext::new()));
}

#[test]
fn pattern_condition_searches_data() {
    let cond = AlertCondition::pattern(r"malware\.").unwrap();
    assert!(cond.evaluate(&ctx()));
    assert!(!cond.evaluate(&AlertContext::new().set("data", "benign.example.com")));
    // Non-string data never matches.
    assert!(!cond.evaluate(&AlertContext::new().set("data", json!({"a": 1}))));
}

#[test]
fn invalid_pattern_fails_construction() {
    assert!(matches!(
        AlertCondition::pattern("(unclosed"),
        Err(AlertError::InvalidPattern(_))
    ));
}

#[test]
fn severity_condition_reads_risk_score() {
    assert!(AlertCondition::severity(Cmp::Gte, 50.0).evaluate(&ctx()));
    assert!(!AlertCondition::severity(Cmp::Gte, 70.0).evaluate(&ctx()));
    // Missing risk_score evaluates as zero.
    assert!(AlertCondition::severity(Cmp::Lt, 1.0).evaluate(&AlertContext::new()));
}

#[test]
fn rate_and_count_conditions() {
    let context = AlertContext::new().set("rate", 12.5).set("count", 100);
    assert!(AlertCondition::rate(Cmp::Gt, 10.0).evaluate(&context));
    assert!(AlertCondition::count(Cmp::Eq, 100.0).evaluate(&context));
    assert!(!AlertCondition::count(Cmp::Lt, 100.0).evaluate(&context));
}

#[test]
fn custom_condition_invokes_closure() {
    let cond = AlertCondition::custom(|ctx| ctx.str_value("module") == Some("sfp_shodan"));
    assert!(cond.evaluate(&AlertContext::new().set("module", "sfp_shodan")));
    assert!(!cond.evaluate(&AlertContext::new()));
}

#[test]
fn context_from_envelope_snapshots_fields() {
    let envelope = EventEnvelope::new(
        "sf.scan1.IP_ADDRESS",
        "scan1",
        "IP_ADDRESS",
        "sfp_dnsresolve",
        "1.2.3.4",
    )
    .with_risk(60);
    let context = AlertContext::from_envelope(&envelope);
    assert_eq!(context.event_type(), Some("IP_ADDRESS"));
    assert_eq!(context.str_value("data"), Some("1.2.3.4"));
    assert_eq!(context.num("risk_score"), Some(60.0));
    assert_eq!(context.str_value("scan_id"), Some("scan1"));
}

#[test]
fn kind_names_every_variant() {
    assert_eq!(AlertCondition::event_type("X").kind(), "event_type");
    assert_eq!(AlertCondition::pattern("x").unwrap().kind(), "pattern");
    assert_eq!(AlertCondition::severity(Cmp::Gte, 1.0).kind(), "severity");
    assert_eq!(AlertCondition::rate(Cmp::Gte, 1.0).kind(), "rate");
    assert_eq!(AlertCondition::count(Cmp::Gte, 1.0).kind(), "count");
    assert_eq!(AlertCondition::custom(|_| true).kind(), "custom");
}
