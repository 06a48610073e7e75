// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[yare::parameterized(
    empty_filter_matches_all   = { &[], "scan.complete", true },
    exact_match                = { &["scan.complete"], "scan.complete", true },
    dotted_prefix              = { &["scan"], "scan.complete", true },
    deep_prefix                = { &["alert"], "alert.critical.new", true },
    no_match                   = { &["scan"], "alert.critical", false },
    prefix_requires_dot        = { &["scan"], "scanner.start", false },
    any_filter_suffices        = { &["task", "alert"], "alert.high", true },
)]
fn event_filtering(filters: &[&str], event_type: &str, expected: bool) {
    let config = WebhookConfig::new("https://example.com/hook")
        .with_event_types(filters.iter().copied());
    assert_eq!(config.matches_event(event_type), expected);
}

#[test]
fn defaults() {
    let config = WebhookConfig::new("https://example.com/hook");
    assert!(config.enabled);
    assert!(config.secret.is_empty());
    assert!(config.event_types.is_empty());
    assert_eq!(config.timeout, Duration::from_secs(10));
    assert_eq!(config.max_retries, 3);
}

#[test]
fn ids_are_unique() {
    let a = WebhookConfig::new("https://example.com/a");
    let b = WebhookConfig::new("https://example.com/b");
    assert_ne!(a.id, b.id);
}

#[test]
fn redacted_masks_sensitive_values() {
    let config = WebhookConfig::new("https://example.com/hook")
        .with_secret("s3cret")
        .with_header("Authorization", "Bearer token")
        .with_header("X-Team", "osint")
        .with_description("slack bridge");

    let redacted = config.redacted();
    assert!(redacted.secret_set);
    assert_eq!(redacted.header_names, vec!["Authorization", "X-Team"]);
    assert_eq!(redacted.description, "slack bridge");

    let json = serde_json::to_string(&redacted).unwrap();
    assert!(!json.contains("s3cret"));
    assert!(!json.contains("Bearer token"));
}
