// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Request-correlation middleware.
//!
//! For every inbound request: read or mint `X-Request-ID`, bind the
//! ambient [`RequestContext`] for the request scope, echo the id on the
//! response, and log start/end with timing. Requests slower than the
//! configured threshold log at warning.

use std::time::Duration;

use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::Response;
use sf_core::context::{self, REQUEST_ID_HEADER};
use sf_core::RequestContext;
use tracing::{info, info_span, warn, Instrument};

/// Middleware knobs.
#[derive(Debug, Clone)]
pub struct TracingConfig {
    /// Trust a client-supplied `X-Request-ID` instead of minting one.
    pub trust_client_id: bool,
    /// Requests slower than this log at warning level.
    pub slow_threshold: Duration,
}

impl Default for TracingConfig {
    fn default() -> Self {
        Self {
            trust_client_id: true,
            slow_threshold: Duration::from_secs(5),
        }
    }
}

pub(crate) async fn trace_requests(
    State(config): State<TracingConfig>,
    request: Request,
    next: Next,
) -> Response {
    let client_id = request
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string);
    let request_id = match client_id {
        Some(id) if config.trust_client_id && !id.is_empty() => id,
        _ => RequestContext::generate_request_id(),
    };

    let method = request.method().to_string();
    let path = request.uri().path().to_string();
    let ctx = RequestContext::new(request_id.clone(), method.clone(), path.clone());

    let span = info_span!(
        "request",
        request_id = %request_id,
        method = %method,
        path = %path,
    );

    let start = std::time::Instant::now();
    let mut response = context::scope(ctx, next.run(request).instrument(span)).await;

    if let Ok(header_value) = request_id.parse() {
        response
            .headers_mut()
            .insert(REQUEST_ID_HEADER, header_value);
    }

    let elapsed = start.elapsed();
    let status = response.status().as_u16();
    if elapsed > config.slow_threshold {
        warn!(
            request_id = %request_id,
            method = %method,
            path = %path,
            status,
            elapsed_ms = elapsed.as_millis() as u64,
            "slow request"
        );
    } else {
        info!(
            request_id = %request_id,
            method = %method,
            path = %path,
            status,
            elapsed_ms = elapsed.as_millis() as u64,
            "request completed"
        );
    }

    response
}
