// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Whole-fabric data flow: scan event in, webhook out.

use std::io::Read;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use sf_alerts::{AlertCondition, AlertRule, AlertSeverity, Cmp};
use sf_bus::EventBus;
use sf_core::EventEnvelope;
use sf_daemon::{lifecycle, FabricConfig};
use sf_webhooks::WebhookConfig;

fn serve_once() -> (String, Arc<Mutex<Option<(String, Vec<u8>)>>>) {
    let server = tiny_http::Server::http("127.0.0.1:0").unwrap();
    let url = format!("http://{}/hook", server.server_addr());
    let captured = Arc::new(Mutex::new(None));
    let sink = Arc::clone(&captured);

    std::thread::spawn(move || {
        let Ok(mut request) = server.recv() else { return };
        let event = request
            .headers()
            .iter()
            .find(|h| {
                h.field
                    .as_str()
                    .as_str()
                    .eq_ignore_ascii_case("x-spiderfoot-event")
            })
            .map(|h| h.value.as_str().to_string())
            .unwrap_or_default();
        let mut body = Vec::new();
        let _ = request.as_reader().read_to_end(&mut body);
        *sink.lock() = Some((event, body));
        let _ = request.respond(tiny_http::Response::empty(200));
    });

    (url, captured)
}

#[tokio::test]
async fn scan_event_flows_to_alert_and_out_through_a_webhook() {
    let (url, captured) = serve_once();

    let fabric = lifecycle::startup(&FabricConfig::default()).await.unwrap();

    // Observers: a rule that trips on risky IPs, a webhook for alerts.
    fabric.alerts.add_rule(
        AlertRule::new("risky-ip", AlertSeverity::High)
            .with_message("{rule_name}: {data}")
            .with_condition(AlertCondition::event_type("IP_ADDRESS"))
            .with_condition(AlertCondition::severity(Cmp::Gte, 50.0)),
    );
    fabric.notifications.add_webhook(
        WebhookConfig::new(url.as_str())
            .with_event_types(["alert"])
            .with_max_retries(1),
    );

    // A scanner module publishes a finding.
    let envelope = EventEnvelope::new(
        "sf.scan1.IP_ADDRESS",
        "scan1",
        "IP_ADDRESS",
        "sfp_dnsresolve",
        "203.0.113.7",
    )
    .with_risk(75);
    assert!(fabric.bus.publish(envelope).await.unwrap());

    // Bus dispatch, rule evaluation, async notify, HTTP delivery.
    let mut delivered = None;
    for _ in 0..300 {
        if let Some(capture) = captured.lock().clone() {
            delivered = Some(capture);
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    let (event, body) = delivered.expect("webhook never fired");
    assert_eq!(event, "alert.high");
    let body: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(body["payload"]["rule_name"], "risky-ip");
    assert_eq!(body["payload"]["message"], "risky-ip: 203.0.113.7");

    // The fabric accounted for the publish.
    assert_eq!(fabric.bus.metrics().published, 1);
    assert_eq!(fabric.bus.metrics().consumed, 1);

    lifecycle::shutdown(fabric).await;
}
