// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Route assembly.

mod alerts;
mod bus;
mod limits;
mod reports;
mod tasks;
mod webhooks;

use axum::{middleware, Router};
use tower_http::trace::TraceLayer;

use crate::auth;
use crate::state::AppState;
use crate::tracing_mw::{self, TracingConfig};

/// Build the full API router: correlation tracing outermost, then the
/// authentication gate, then the handlers.
pub fn router(state: AppState, tracing: TracingConfig) -> Router {
    Router::new()
        .nest("/api/bus", bus::router())
        .nest("/api/tasks", tasks::router())
        .nest("/api/rate-limits", limits::router())
        .nest("/api/alerts", alerts::router())
        .nest("/api/webhooks", webhooks::router())
        .nest("/api/notifications", webhooks::notifications_router())
        .nest("/api/reports", reports::router())
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth::require_auth,
        ))
        .layer(middleware::from_fn_with_state(
            tracing,
            tracing_mw::trace_requests,
        ))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[cfg(test)]
#[path = "router_tests.rs"]
mod tests;
