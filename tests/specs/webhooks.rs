// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Signed webhook delivery against a live endpoint.

use std::io::Read;
use std::sync::Arc;

use hmac::{Hmac, Mac};
use parking_lot::Mutex;
use sf_core::FakeClock;
use sf_webhooks::{DeliveryStatus, WebhookConfig, WebhookDispatcher};
use sha2::Sha256;

fn serve_once() -> (String, Arc<Mutex<Option<(Vec<u8>, String)>>>) {
    let server = tiny_http::Server::http("127.0.0.1:0").unwrap();
    let url = format!("http://{}/hook", server.server_addr());
    let captured = Arc::new(Mutex::new(None));
    let sink = Arc::clone(&captured);

    std::thread::spawn(move || {
        let Ok(mut request) = server.recv() else { return };
        let signature = request
            .headers()
            .iter()
            .find(|h| {
                h.field
                    .as_str()
                    .as_str()
                    .eq_ignore_ascii_case("x-spiderfoot-signature")
            })
            .map(|h| h.value.as_str().to_string())
            .unwrap_or_default();
        let mut body = Vec::new();
        let _ = request.as_reader().read_to_end(&mut body);
        *sink.lock() = Some((body, signature));
        let _ = request.respond(tiny_http::Response::empty(200));
    });

    (url, captured)
}

#[tokio::test]
async fn delivery_is_signed_over_the_exact_body_bytes() {
    let (url, captured) = serve_once();
    let dispatcher = WebhookDispatcher::new(Arc::new(FakeClock::new()));
    let config = WebhookConfig::new(url.as_str()).with_secret("s3cret");

    let record = dispatcher
        .deliver(&config, "t", &serde_json::json!({"a": 1}))
        .await;

    assert_eq!(record.status, DeliveryStatus::Success);
    assert_eq!(record.attempts, 1);

    let (body, signature_header) = captured.lock().clone().unwrap();
    assert_eq!(
        body,
        b"{\"event_type\":\"t\",\"timestamp\":1700000000.0,\"payload\":{\"a\":1}}"
    );

    // Independent HMAC-SHA256 computation over the received bytes.
    let mut mac = Hmac::<Sha256>::new_from_slice(b"s3cret").unwrap();
    mac.update(&body);
    let expected = format!("sha256={}", hex::encode(mac.finalize().into_bytes()));
    assert_eq!(signature_header, expected);
}
